// Time signature event

use crate::event::{AnyEvent, EventId, EventKind, SequenceEvent, export_timestamp, import_beat, round_beat};
use crate::midi::{MidiMessage, TimedMidiMessage};
use crate::record::Record;
use crate::sequence::{AnySequence, MidiSequence};
use std::fmt;

const DEFAULT_NUMERATOR: u8 = 4;
const DEFAULT_DENOMINATOR: u8 = 4;
const MAX_METER_VALUE: u8 = 64;

/// A meter change at a given beat
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignatureEvent {
    id: EventId,
    beat: f32,
    numerator: u8,
    denominator: u8,
}

impl TimeSignatureEvent {
    /// Creates a time signature; out-of-range meters are clamped, a
    /// denominator that is not a power of two falls back to 4
    pub fn new(id: EventId, beat: f32, numerator: u8, denominator: u8) -> Self {
        Self {
            id,
            beat: round_beat(beat),
            numerator: sanitize_numerator(numerator),
            denominator: sanitize_denominator(denominator),
        }
    }

    pub fn numerator(&self) -> u8 {
        self.numerator
    }

    pub fn denominator(&self) -> u8 {
        self.denominator
    }

    pub fn with_meter(&self, numerator: u8, denominator: u8) -> Self {
        Self {
            numerator: sanitize_numerator(numerator),
            denominator: sanitize_denominator(denominator),
            ..self.clone()
        }
    }

    /// Length of one bar in beats (quarter notes)
    pub fn bar_length_in_beats(&self) -> f32 {
        self.numerator as f32 * 4.0 / self.denominator as f32
    }
}

fn sanitize_numerator(numerator: u8) -> u8 {
    numerator.clamp(1, MAX_METER_VALUE)
}

fn sanitize_denominator(denominator: u8) -> u8 {
    if denominator.is_power_of_two() && denominator <= MAX_METER_VALUE {
        denominator
    } else {
        DEFAULT_DENOMINATOR
    }
}

impl fmt::Display for TimeSignatureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} @ {}", self.numerator, self.denominator, self.beat)
    }
}

impl SequenceEvent for TimeSignatureEvent {
    const KIND: EventKind = EventKind::TimeSignature;

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
        Self::new(EventId::new(), 0.0, DEFAULT_NUMERATOR, DEFAULT_DENOMINATOR)
    }

    fn serialize(&self) -> Record {
        Record::new(Self::KIND.record_tag())
            .with_attribute("id", &self.id)
            .with_attribute("start", self.beat)
            .with_attribute("numerator", self.numerator)
            .with_attribute("denominator", self.denominator)
    }

    fn deserialize(&mut self, record: &Record) {
        self.id = record.string_attribute("id", &self.id);
        self.beat = round_beat(record.parse_attribute("start", self.beat));
        self.numerator = sanitize_numerator(record.parse_attribute("numerator", self.numerator));
        self.denominator =
            sanitize_denominator(record.parse_attribute("denominator", self.denominator));
    }

    fn reset(&mut self) {
        self.beat = 0.0;
        self.numerator = DEFAULT_NUMERATOR;
        self.denominator = DEFAULT_DENOMINATOR;
    }

    fn apply_changes(&mut self, other: &Self) {
        debug_assert_eq!(self.id, other.id, "applying changes of a different event");
        self.beat = other.beat;
        self.numerator = other.numerator;
        self.denominator = other.denominator;
    }

    fn to_any(&self) -> AnyEvent {
        AnyEvent::TimeSignature(self.clone())
    }

    fn export_midi(&self, out: &mut Vec<TimedMidiMessage>) {
        out.push(TimedMidiMessage::new(
            export_timestamp(self.beat),
            MidiMessage::TimeSignature {
                numerator: self.numerator,
                denominator: self.denominator,
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
                MidiMessage::TimeSignature {
                    numerator,
                    denominator,
                } => Some(Self::new(
                    next_id(),
                    import_beat(m.timestamp),
                    numerator,
                    denominator,
                )),
                _ => None,
            })
            .collect()
    }

    fn sequence(sequence: &AnySequence) -> Option<&MidiSequence<Self>> {
        match sequence {
            AnySequence::TimeSignatures(s) => Some(s),
            _ => None,
        }
    }

    fn sequence_mut(sequence: &mut AnySequence) -> Option<&mut MidiSequence<Self>> {
        match sequence {
            AnySequence::TimeSignatures(s) => Some(s),
            _ => None,
        }
    }

    fn into_any_sequence(sequence: MidiSequence<Self>) -> AnySequence {
        AnySequence::TimeSignatures(sequence)
    }
}
