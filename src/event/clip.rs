// Clip - one placement of a track's pattern on the timeline

use crate::event::{AnyEvent, EventId, EventKind, SequenceEvent, round_beat};
use crate::midi::TimedMidiMessage;
use crate::record::Record;
use crate::sequence::{AnySequence, MidiSequence};

/// A clip only has a start beat; its content is the owning pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    id: EventId,
    beat: f32,
}

impl Clip {
    pub fn new(id: EventId, beat: f32) -> Self {
        Self {
            id,
            beat: round_beat(beat),
        }
    }

    pub fn start_beat(&self) -> f32 {
        self.beat
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }
}

impl SequenceEvent for Clip {
    const KIND: EventKind = EventKind::Clip;

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
        Self::new(EventId::new(), 0.0)
    }

    fn serialize(&self) -> Record {
        Record::new(Self::KIND.record_tag())
            .with_attribute("id", &self.id)
            .with_attribute("start", self.beat)
    }

    fn deserialize(&mut self, record: &Record) {
        self.id = record.string_attribute("id", &self.id);
        self.beat = round_beat(record.parse_attribute("start", self.beat));
    }

    fn reset(&mut self) {
        self.beat = 0.0;
    }

    fn apply_changes(&mut self, other: &Self) {
        debug_assert_eq!(self.id, other.id, "applying changes of a different clip");
        self.beat = other.beat;
    }

    fn to_any(&self) -> AnyEvent {
        AnyEvent::Clip(self.clone())
    }

    /// An imported track gets a single clip at the start
    fn import_midi(
        _messages: &[TimedMidiMessage],
        next_id: &mut dyn FnMut() -> EventId,
    ) -> Vec<Self> {
        vec![Self::new(next_id(), 0.0)]
    }

    fn sequence(sequence: &AnySequence) -> Option<&MidiSequence<Self>> {
        match sequence {
            AnySequence::Pattern(s) => Some(s),
            _ => None,
        }
    }

    fn sequence_mut(sequence: &mut AnySequence) -> Option<&mut MidiSequence<Self>> {
        match sequence {
            AnySequence::Pattern(s) => Some(s),
            _ => None,
        }
    }

    fn into_any_sequence(sequence: MidiSequence<Self>) -> AnySequence {
        AnySequence::Pattern(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_beat_is_rounded() {
        let clip = Clip::new("c".to_string(), 4.0);
        let moved = clip.with_delta_beat(0.51);
        assert_eq!(moved.start_beat(), 4.5);
        assert_eq!(moved.id(), "c");
    }

    #[test]
    fn test_copy_with_new_id() {
        let mut pattern = MidiSequence::<Clip>::new();
        let clip = Clip::new("c".to_string(), 2.0);
        let copy = clip.copy_with_new_id(&mut pattern);
        assert_ne!(copy.id(), clip.id());
        assert_eq!(copy.start_beat(), clip.start_beat());
        assert!(copy.is_valid());
        assert!(!Clip::blank().is_valid());
    }

    #[test]
    fn test_reset_keeps_id() {
        let mut clip = Clip::new("c".to_string(), 9.0);
        clip.reset();
        assert_eq!(clip.beat(), 0.0);
        assert_eq!(clip.id(), "c");
    }
}
