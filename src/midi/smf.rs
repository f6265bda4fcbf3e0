// Standard MIDI file decoding
//
// Converts midly's track events into our TimedMidiMessage stream, with tick
// positions rescaled from the file's resolution to MIDI_IMPORT_SCALE.

use crate::error::{EngineError, EngineResult};
use crate::midi::event::{MIDI_IMPORT_SCALE, MidiMessage, TimedMidiMessage};
use midly::{MetaMessage, MidiMessage as MidlyMessage, Smf, Timing, TrackEventKind};

/// Resolution assumed for SMPTE-timed files
const FALLBACK_PPQ: u16 = 480;

/// One decoded track of a MIDI file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTrack {
    pub name: Option<String>,
    /// Messages in file order, which is non-decreasing in time
    pub messages: Vec<TimedMidiMessage>,
}

fn convert_midly_message(message: MidlyMessage) -> Option<MidiMessage> {
    match message {
        MidlyMessage::NoteOn { key, vel } => Some(if vel.as_int() == 0 {
            MidiMessage::NoteOff { key: key.as_int() }
        } else {
            MidiMessage::NoteOn {
                key: key.as_int(),
                velocity: vel.as_int(),
            }
        }),
        MidlyMessage::NoteOff { key, .. } => Some(MidiMessage::NoteOff { key: key.as_int() }),
        _ => None,
    }
}

fn convert_meta_message(message: MetaMessage) -> Option<MidiMessage> {
    match message {
        MetaMessage::TimeSignature(numerator, denominator_power, _, _) => {
            Some(MidiMessage::TimeSignature {
                numerator,
                denominator: 1u8.checked_shl(denominator_power as u32).unwrap_or(4),
            })
        }
        MetaMessage::KeySignature(sharps_or_flats, minor) => Some(MidiMessage::KeySignature {
            sharps_or_flats,
            minor,
        }),
        MetaMessage::Marker(text) | MetaMessage::CuePoint(text) => {
            Some(MidiMessage::Marker(String::from_utf8_lossy(text).into_owned()))
        }
        _ => None,
    }
}

/// Decode a standard MIDI file into per-track message streams
pub fn decode_smf(bytes: &[u8]) -> EngineResult<Vec<DecodedTrack>> {
    let smf = Smf::parse(bytes)
        .map_err(|e| EngineError::MidiError(format!("Failed to parse MIDI file: {}", e)))?;

    let ppq = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(_, _) => {
            log::warn!("SMPTE timing is not supported, assuming {} ticks per beat", FALLBACK_PPQ);
            FALLBACK_PPQ
        }
    }
    .max(1);
    let scale = MIDI_IMPORT_SCALE / ppq as f64;

    let tracks = smf
        .tracks
        .iter()
        .map(|track| {
            let mut decoded = DecodedTrack::default();
            let mut tick = 0u64;

            for event in track {
                tick += event.delta.as_int() as u64;

                let message = match event.kind {
                    TrackEventKind::Midi { message, .. } => convert_midly_message(message),
                    TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                        decoded.name = Some(String::from_utf8_lossy(name).into_owned());
                        None
                    }
                    TrackEventKind::Meta(meta) => convert_meta_message(meta),
                    _ => None,
                };

                if let Some(message) = message {
                    decoded
                        .messages
                        .push(TimedMidiMessage::new(tick as f64 * scale, message));
                }
            }

            decoded
        })
        .collect::<Vec<_>>();

    log::debug!("Decoded MIDI file: {} tracks at {} ppq", tracks.len(), ppq);
    Ok(tracks)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Format 0 file, 96 ppq: 3/4 at beat 0, G major at beat 1, a C4 note
    /// from beat 1 to beat 2, and a marker at beat 2
    pub(crate) fn sample_smf() -> Vec<u8> {
        let mut track = vec![
            0x00, 0xFF, 0x03, 0x04, b'L', b'e', b'a', b'd', // track name
            0x00, 0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08, // 3/4
            0x60, 0xFF, 0x59, 0x02, 0x01, 0x00, // G major
            0x00, 0x90, 0x3C, 0x64, // note on
            0x60, 0x80, 0x3C, 0x40, // note off
            0x00, 0xFF, 0x06, 0x03, b'E', b'n', b'd', // marker
        ];
        track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1, 0, 96]);
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&track);
        bytes
    }

    #[test]
    fn test_decode_sample_file() {
        let tracks = decode_smf(&sample_smf()).unwrap();
        assert_eq!(tracks.len(), 1);

        let track = &tracks[0];
        assert_eq!(track.name.as_deref(), Some("Lead"));
        assert_eq!(track.messages.len(), 5);
        assert_eq!(
            track.messages[0].message,
            MidiMessage::TimeSignature { numerator: 3, denominator: 4 }
        );
        assert_eq!(track.messages[1].beat(), 1.0);
        assert_eq!(
            track.messages[1].message,
            MidiMessage::KeySignature { sharps_or_flats: 1, minor: false }
        );
        assert_eq!(track.messages[3].beat(), 2.0);
        assert_eq!(track.messages[3].message, MidiMessage::NoteOff { key: 60 });
        assert_eq!(track.messages[4].message, MidiMessage::Marker("End".to_string()));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode_smf(b"not a midi file"),
            Err(EngineError::MidiError(_))
        ));
    }
}
