// Key signature event and the scale it refers to

use crate::event::{AnyEvent, EventId, EventKind, SequenceEvent, export_timestamp, import_beat, round_beat};
use crate::midi::{MidiMessage, TimedMidiMessage};
use crate::record::Record;
use crate::sequence::{AnySequence, MidiSequence};
use std::fmt;

const SCALE_TAG: &str = "scale";
const KEYS_IN_OCTAVE: u8 = 12;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A named set of semitone offsets from the root key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    name: String,
    keys: Vec<u8>,
}

impl Scale {
    /// Creates a scale; offsets are reduced to one octave, sorted and deduplicated
    pub fn new(name: impl Into<String>, keys: impl IntoIterator<Item = u8>) -> Self {
        let mut keys: Vec<u8> = keys.into_iter().map(|k| k % KEYS_IN_OCTAVE).collect();
        keys.sort_unstable();
        keys.dedup();
        Self {
            name: name.into(),
            keys,
        }
    }

    pub fn major() -> Self {
        Self::new("Major", [0, 2, 4, 5, 7, 9, 11])
    }

    pub fn natural_minor() -> Self {
        Self::new("Minor", [0, 2, 3, 5, 7, 8, 10])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[u8] {
        &self.keys
    }

    /// Whether the scale has a minor third and no major third
    pub fn is_minor(&self) -> bool {
        self.keys.contains(&3) && !self.keys.contains(&4)
    }

    fn serialize(&self) -> Record {
        let keys = self
            .keys
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Record::new(SCALE_TAG)
            .with_attribute("name", &self.name)
            .with_attribute("keys", keys)
    }

    fn deserialize(&mut self, record: &Record) {
        self.name = record.string_attribute("name", &self.name);
        if let Some(raw) = record.attribute("keys") {
            let parsed: Result<Vec<u8>, _> = raw.split_whitespace().map(str::parse).collect();
            match parsed {
                Ok(keys) if !keys.is_empty() => *self = Scale::new(self.name.clone(), keys),
                _ => log::warn!("Corrupt scale keys \"{}\", keeping {}", raw, self.name),
            }
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::major()
    }
}

/// A key change at a given beat: root key (0 = C) plus scale
#[derive(Debug, Clone, PartialEq)]
pub struct KeySignatureEvent {
    id: EventId,
    beat: f32,
    root_key: u8,
    scale: Scale,
}

impl KeySignatureEvent {
    pub fn new(id: EventId, beat: f32, root_key: u8, scale: Scale) -> Self {
        Self {
            id,
            beat: round_beat(beat),
            root_key: root_key % KEYS_IN_OCTAVE,
            scale,
        }
    }

    pub fn root_key(&self) -> u8 {
        self.root_key
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn with_root_key(&self, root_key: u8) -> Self {
        Self {
            root_key: root_key % KEYS_IN_OCTAVE,
            ..self.clone()
        }
    }

    pub fn with_scale(&self, scale: Scale) -> Self {
        Self {
            scale,
            ..self.clone()
        }
    }

    pub fn root_key_name(&self) -> &'static str {
        NOTE_NAMES[self.root_key as usize]
    }

    /// Root key and scale for a standard MIDI key signature
    fn from_sharps_or_flats(sharps_or_flats: i8, minor: bool) -> (u8, Scale) {
        // Each sharp moves the major root a fifth up
        let major_root = (sharps_or_flats as i32 * 7).rem_euclid(12) as u8;
        if minor {
            ((major_root + 9) % KEYS_IN_OCTAVE, Scale::natural_minor())
        } else {
            (major_root, Scale::major())
        }
    }

    /// Standard MIDI key signature for this key; scales other than major and
    /// minor are written as whichever of the two they resemble
    fn sharps_or_flats(&self) -> (i8, bool) {
        let minor = self.scale.is_minor();
        let major_root = if minor {
            (self.root_key + 3) % KEYS_IN_OCTAVE
        } else {
            self.root_key
        };
        let fifths = (major_root as i32 * 7).rem_euclid(12);
        let sharps_or_flats = if fifths > 6 { fifths - 12 } else { fifths };
        (sharps_or_flats as i8, minor)
    }
}

impl fmt::Display for KeySignatureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.root_key_name(), self.scale.name, self.beat)
    }
}

impl SequenceEvent for KeySignatureEvent {
    const KIND: EventKind = EventKind::KeySignature;

    fn id(&self) -> &str {
        &self.id
    }

    fn beat(&self) -> f32 {
        self.beat
    }

    fn set_id(&mut self, id: EventId) {
        self.id = id;
    }

    fn set_beat(&mut self, beat: f32) {
        self.beat = round_beat(beat);
    }

    fn blank() -> Self {
        Self::new(EventId::new(), 0.0, 0, Scale::major())
    }

    fn serialize(&self) -> Record {
        Record::new(Self::KIND.record_tag())
            .with_attribute("id", &self.id)
            .with_attribute("start", self.beat)
            .with_attribute("key", self.root_key)
            .with_child(self.scale.serialize())
    }

    fn deserialize(&mut self, record: &Record) {
        self.id = record.string_attribute("id", &self.id);
        self.beat = round_beat(record.parse_attribute("start", self.beat));
        self.root_key = record.parse_attribute("key", self.root_key) % KEYS_IN_OCTAVE;
        if let Some(scale) = record.child(SCALE_TAG) {
            self.scale.deserialize(scale);
        }
    }

    fn reset(&mut self) {
        self.beat = 0.0;
        self.root_key = 0;
        self.scale = Scale::major();
    }

    fn apply_changes(&mut self, other: &Self) {
        debug_assert_eq!(self.id, other.id, "applying changes of a different event");
        self.beat = other.beat;
        self.root_key = other.root_key;
        self.scale = other.scale.clone();
    }

    fn to_any(&self) -> AnyEvent {
        AnyEvent::KeySignature(self.clone())
    }

    fn export_midi(&self, out: &mut Vec<TimedMidiMessage>) {
        let (sharps_or_flats, minor) = self.sharps_or_flats();
        out.push(TimedMidiMessage::new(
            export_timestamp(self.beat),
            MidiMessage::KeySignature {
                sharps_or_flats,
                minor,
            },
        ));
    }

    fn import_midi(
        messages: &[TimedMidiMessage],
        next_id: &mut dyn FnMut() -> EventId,
    ) -> Vec<Self> {
        messages
            .iter()
            .filter_map(|m| match m.message {
                MidiMessage::KeySignature {
                    sharps_or_flats,
                    minor,
                } => {
                    let (root_key, scale) = Self::from_sharps_or_flats(sharps_or_flats, minor);
                    Some(Self::new(next_id(), import_beat(m.timestamp), root_key, scale))
                }
                _ => None,
            })
            .collect()
    }

    fn sequence(sequence: &AnySequence) -> Option<&MidiSequence<Self>> {
        match sequence {
            AnySequence::KeySignatures(s) => Some(s),
            _ => None,
        }
    }

    fn sequence_mut(sequence: &mut AnySequence) -> Option<&mut MidiSequence<Self>> {
        match sequence {
            AnySequence::KeySignatures(s) => Some(s),
            _ => None,
        }
    }

    fn into_any_sequence(sequence: MidiSequence<Self>) -> AnySequence {
        AnySequence::KeySignatures(sequence)
    }
}
