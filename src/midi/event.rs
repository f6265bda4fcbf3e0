// MIDI messages exchanged with external sources
//
// Only the subset the sequences understand is represented: meter and key
// meta events, note on/off and marker text. Timestamps are in import ticks,
// `MIDI_IMPORT_SCALE` ticks per beat.

/// Import ticks per beat
pub const MIDI_IMPORT_SCALE: f64 = 48.0;

#[derive(Debug, Clone, PartialEq)]
pub enum MidiMessage {
    TimeSignature { numerator: u8, denominator: u8 },
    KeySignature { sharps_or_flats: i8, minor: bool },
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8 },
    Marker(String),
}

impl MidiMessage {
    pub fn is_time_signature(&self) -> bool {
        matches!(self, MidiMessage::TimeSignature { .. })
    }

    pub fn is_key_signature(&self) -> bool {
        matches!(self, MidiMessage::KeySignature { .. })
    }

    pub fn is_note(&self) -> bool {
        matches!(self, MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. })
    }
}

/// A message at an absolute position, in import ticks
#[derive(Debug, Clone, PartialEq)]
pub struct TimedMidiMessage {
    pub timestamp: f64,
    pub message: MidiMessage,
}

impl TimedMidiMessage {
    pub fn new(timestamp: f64, message: MidiMessage) -> Self {
        Self { timestamp, message }
    }

    pub fn beat(&self) -> f64 {
        self.timestamp / MIDI_IMPORT_SCALE
    }
}

/// Stable sort by timestamp, keeping the emission order of simultaneous messages
pub fn sort_by_timestamp(messages: &mut [TimedMidiMessage]) {
    messages.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}
