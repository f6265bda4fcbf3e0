// Annotation event - a coloured text marker on the timeline

use crate::event::{AnyEvent, EventId, EventKind, SequenceEvent, export_timestamp, import_beat, round_beat};
use crate::midi::{MidiMessage, TimedMidiMessage};
use crate::record::Record;
use crate::sequence::{AnySequence, MidiSequence};

const DEFAULT_COLOUR: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEvent {
    id: EventId,
    beat: f32,
    description: String,
    /// ARGB
    colour: u32,
    length: f32,
}

impl AnnotationEvent {
    pub fn new(id: EventId, beat: f32, description: impl Into<String>, colour: u32) -> Self {
        Self {
            id,
            beat: round_beat(beat),
            description: description.into(),
            colour,
            length: 0.0,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn colour(&self) -> u32 {
        self.colour
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self.clone()
        }
    }

    pub fn with_colour(&self, colour: u32) -> Self {
        Self {
            colour,
            ..self.clone()
        }
    }

    pub fn with_length(&self, length: f32) -> Self {
        Self {
            length: round_beat(length).max(0.0),
            ..self.clone()
        }
    }
}

impl SequenceEvent for AnnotationEvent {
    const KIND: EventKind = EventKind::Annotation;

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
        Self::new(EventId::new(), 0.0, String::new(), DEFAULT_COLOUR)
    }

    fn serialize(&self) -> Record {
        Record::new(Self::KIND.record_tag())
            .with_attribute("id", &self.id)
            .with_attribute("start", self.beat)
            .with_attribute("text", &self.description)
            .with_attribute("colour", format!("{:08x}", self.colour))
            .with_attribute("length", self.length)
    }

    fn deserialize(&mut self, record: &Record) {
        self.id = record.string_attribute("id", &self.id);
        self.beat = round_beat(record.parse_attribute("start", self.beat));
        self.description = record.string_attribute("text", &self.description);
        if let Some(raw) = record.attribute("colour") {
            match u32::from_str_radix(raw.trim(), 16) {
                Ok(colour) => self.colour = colour,
                Err(_) => log::warn!("Corrupt annotation colour \"{}\"", raw),
            }
        }
        self.length = round_beat(record.parse_attribute("length", self.length)).max(0.0);
    }

    fn reset(&mut self) {
        self.beat = 0.0;
        self.description.clear();
        self.colour = DEFAULT_COLOUR;
        self.length = 0.0;
    }

    fn apply_changes(&mut self, other: &Self) {
        debug_assert_eq!(self.id, other.id, "applying changes of a different annotation");
        self.beat = other.beat;
        self.description = other.description.clone();
        self.colour = other.colour;
        self.length = other.length;
    }

    fn to_any(&self) -> AnyEvent {
        AnyEvent::Annotation(self.clone())
    }

    fn export_midi(&self, out: &mut Vec<TimedMidiMessage>) {
        out.push(TimedMidiMessage::new(
            export_timestamp(self.beat),
            MidiMessage::Marker(self.description.clone()),
        ));
    }

    fn import_midi(
        messages: &[TimedMidiMessage],
        next_id: &mut dyn FnMut() -> EventId,
    ) -> Vec<Self> {
        messages
            .iter()
            .filter_map(|m| match &m.message {
                MidiMessage::Marker(text) => Some(Self::new(
                    next_id(),
                    import_beat(m.timestamp),
                    text.clone(),
                    DEFAULT_COLOUR,
                )),
                _ => None,
            })
            .collect()
    }

    fn sequence(sequence: &AnySequence) -> Option<&MidiSequence<Self>> {
        match sequence {
            AnySequence::Annotations(s) => Some(s),
            _ => None,
        }
    }

    fn sequence_mut(sequence: &mut AnySequence) -> Option<&mut MidiSequence<Self>> {
        match sequence {
            AnySequence::Annotations(s) => Some(s),
            _ => None,
        }
    }

    fn into_any_sequence(sequence: MidiSequence<Self>) -> AnySequence {
        AnySequence::Annotations(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let annotation = AnnotationEvent::new("a1".to_string(), 32.0, "Chorus", 0xFF00_80FF)
            .with_length(8.0);
        let mut restored = AnnotationEvent::blank();
        restored.deserialize(&annotation.serialize());
        assert_eq!(restored, annotation);
        assert_eq!(restored.end_beat(), 40.0);
    }

    #[test]
    fn test_corrupt_colour_is_ignored() {
        let mut annotation = AnnotationEvent::blank();
        annotation.deserialize(
            &Record::new("annotation")
                .with_attribute("colour", "not-hex")
                .with_attribute("text", "Verse"),
        );
        assert_eq!(annotation.colour(), DEFAULT_COLOUR);
        assert_eq!(annotation.description(), "Verse");
    }

    #[test]
    fn test_reset() {
        let mut annotation = AnnotationEvent::new("a".to_string(), 4.0, "Bridge", 1);
        annotation.reset();
        assert_eq!(annotation.description(), "");
        assert_eq!(annotation.beat(), 0.0);
        assert_eq!(annotation.id(), "a");
    }
}
