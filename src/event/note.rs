// Note event
// A note is a key held from its start beat for `length` beats

use crate::event::{
    AnyEvent, BEATS_RESOLUTION, EventId, EventKind, SequenceEvent, export_timestamp, import_beat,
    round_beat,
};
use crate::midi::{MidiMessage, TimedMidiMessage};
use crate::record::Record;
use crate::sequence::{AnySequence, MidiSequence};
use std::collections::HashMap;
use std::collections::VecDeque;

const MIN_LENGTH: f32 = 1.0 / BEATS_RESOLUTION;
const MAX_KEY: u8 = 127;
const DEFAULT_KEY: u8 = 60;
const DEFAULT_LENGTH: f32 = 1.0;
const DEFAULT_VELOCITY: f32 = 0.75;

/// A musical note in a sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    id: EventId,
    beat: f32,

    /// MIDI note number (0-127, where 60 = C4)
    key: u8,

    /// Duration in beats, snapped to the grid, never shorter than one step
    length: f32,

    /// Normalized velocity (0.0 to 1.0)
    velocity: f32,
}

impl Note {
    pub fn new(id: EventId, beat: f32, key: u8, length: f32, velocity: f32) -> Self {
        Self {
            id,
            beat: round_beat(beat),
            key: key.min(MAX_KEY),
            length: sanitize_length(length),
            velocity: velocity.clamp(0.0, 1.0),
        }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn with_key(&self, key: u8) -> Self {
        Self {
            key: key.min(MAX_KEY),
            ..self.clone()
        }
    }

    pub fn with_length(&self, length: f32) -> Self {
        Self {
            length: sanitize_length(length),
            ..self.clone()
        }
    }

    pub fn with_velocity(&self, velocity: f32) -> Self {
        Self {
            velocity: velocity.clamp(0.0, 1.0),
            ..self.clone()
        }
    }

    /// Check if this note sounds at a given beat
    pub fn contains_beat(&self, beat: f32) -> bool {
        beat >= self.beat && beat < self.end_beat()
    }
}

fn sanitize_length(length: f32) -> f32 {
    round_beat(length).max(MIN_LENGTH)
}

impl SequenceEvent for Note {
    const KIND: EventKind = EventKind::Note;

    fn id(&self) -> &str {
        &self.id
    }

    fn beat(&self) -> f32 {
        self.beat
    }

    fn end_beat(&self) -> f32 {
        self.beat + self.length
    }

    fn set_id(&mut self, id: EventId) {
        self.id = id;
    }

    fn set_beat(&mut self, beat: f32) {
        self.beat = round_beat(beat);
    }

    fn blank() -> Self {
        Self::new(EventId::new(), 0.0, DEFAULT_KEY, DEFAULT_LENGTH, DEFAULT_VELOCITY)
    }

    fn serialize(&self) -> Record {
        Record::new(Self::KIND.record_tag())
            .with_attribute("id", &self.id)
            .with_attribute("start", self.beat)
            .with_attribute("key", self.key)
            .with_attribute("length", self.length)
            .with_attribute("velocity", self.velocity)
    }

    fn deserialize(&mut self, record: &Record) {
        self.id = record.string_attribute("id", &self.id);
        self.beat = round_beat(record.parse_attribute("start", self.beat));
        self.key = record.parse_attribute("key", self.key).min(MAX_KEY);
        self.length = sanitize_length(record.parse_attribute("length", self.length));
        self.velocity = record
            .parse_attribute("velocity", self.velocity)
            .clamp(0.0, 1.0);
    }

    fn reset(&mut self) {
        self.beat = 0.0;
        self.key = DEFAULT_KEY;
        self.length = DEFAULT_LENGTH;
        self.velocity = DEFAULT_VELOCITY;
    }

    fn apply_changes(&mut self, other: &Self) {
        debug_assert_eq!(self.id, other.id, "applying changes of a different note");
        self.beat = other.beat;
        self.key = other.key;
        self.length = other.length;
        self.velocity = other.velocity;
    }

    fn to_any(&self) -> AnyEvent {
        AnyEvent::Note(self.clone())
    }

    fn export_midi(&self, out: &mut Vec<TimedMidiMessage>) {
        let velocity = (self.velocity * 127.0).round().clamp(1.0, 127.0) as u8;
        out.push(TimedMidiMessage::new(
            export_timestamp(self.beat),
            MidiMessage::NoteOn {
                key: self.key,
                velocity,
            },
        ));
        out.push(TimedMidiMessage::new(
            export_timestamp(self.end_beat()),
            MidiMessage::NoteOff { key: self.key },
        ));
    }

    /// Pairs each note-on with the next note-off of the same key; notes left
    /// hanging at the end of the stream get the default length
    fn import_midi(
        messages: &[TimedMidiMessage],
        next_id: &mut dyn FnMut() -> EventId,
    ) -> Vec<Self> {
        let mut held: HashMap<u8, VecDeque<(f64, u8)>> = HashMap::new();
        let mut notes = Vec::new();

        for m in messages {
            match m.message {
                MidiMessage::NoteOn { key, velocity } if velocity > 0 => {
                    held.entry(key).or_default().push_back((m.timestamp, velocity));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key } => {
                    if let Some((start, velocity)) =
                        held.get_mut(&key).and_then(|queue| queue.pop_front())
                    {
                        let beat = import_beat(start);
                        let length = import_beat(m.timestamp) - beat;
                        notes.push(Self::new(
                            next_id(),
                            beat,
                            key,
                            length,
                            velocity as f32 / 127.0,
                        ));
                    }
                }
                _ => {}
            }
        }

        let mut hanging: Vec<(u8, f64, u8)> = held
            .into_iter()
            .flat_map(|(key, queue)| queue.into_iter().map(move |(t, v)| (key, t, v)))
            .collect();
        hanging.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (key, start, velocity) in hanging {
            log::warn!("Note {} at tick {} has no note-off", key, start);
            notes.push(Self::new(
                next_id(),
                import_beat(start),
                key,
                DEFAULT_LENGTH,
                velocity as f32 / 127.0,
            ));
        }

        notes
    }

    fn sequence(sequence: &AnySequence) -> Option<&MidiSequence<Self>> {
        match sequence {
            AnySequence::Notes(s) => Some(s),
            _ => None,
        }
    }

    fn sequence_mut(sequence: &mut AnySequence) -> Option<&mut MidiSequence<Self>> {
        match sequence {
            AnySequence::Notes(s) => Some(s),
            _ => None,
        }
    }

    fn into_any_sequence(sequence: MidiSequence<Self>) -> AnySequence {
        AnySequence::Notes(sequence)
    }
}
