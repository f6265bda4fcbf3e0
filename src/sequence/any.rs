// Type-erased sequence, one variant per event kind

use crate::event::{
    AnnotationEvent, Clip, EventKind, KeySignatureEvent, Note, SequenceEvent, TimeSignatureEvent,
};
use crate::midi::TimedMidiMessage;
use crate::record::Record;
use crate::sequence::{BeatRange, MidiSequence};

#[derive(Debug, Clone)]
pub enum AnySequence {
    TimeSignatures(MidiSequence<TimeSignatureEvent>),
    KeySignatures(MidiSequence<KeySignatureEvent>),
    Pattern(MidiSequence<Clip>),
    Notes(MidiSequence<Note>),
    Annotations(MidiSequence<AnnotationEvent>),
}

/// Run `$body` with `$s` bound to the inner sequence, whatever its kind
macro_rules! with_sequence {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            AnySequence::TimeSignatures($s) => $body,
            AnySequence::KeySignatures($s) => $body,
            AnySequence::Pattern($s) => $body,
            AnySequence::Notes($s) => $body,
            AnySequence::Annotations($s) => $body,
        }
    };
}

impl AnySequence {
    /// An empty sequence holding events of `kind`
    pub fn new(kind: EventKind) -> Self {
        match kind {
            EventKind::TimeSignature => AnySequence::TimeSignatures(MidiSequence::new()),
            EventKind::KeySignature => AnySequence::KeySignatures(MidiSequence::new()),
            EventKind::Clip => AnySequence::Pattern(MidiSequence::new()),
            EventKind::Note => AnySequence::Notes(MidiSequence::new()),
            EventKind::Annotation => AnySequence::Annotations(MidiSequence::new()),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            AnySequence::TimeSignatures(_) => EventKind::TimeSignature,
            AnySequence::KeySignatures(_) => EventKind::KeySignature,
            AnySequence::Pattern(_) => EventKind::Clip,
            AnySequence::Notes(_) => EventKind::Note,
            AnySequence::Annotations(_) => EventKind::Annotation,
        }
    }

    pub fn len(&self) -> usize {
        with_sequence!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        with_sequence!(self, s => s.is_empty())
    }

    pub fn beat_range(&self) -> BeatRange {
        with_sequence!(self, s => s.beat_range())
    }

    pub fn serialize(&self) -> Record {
        with_sequence!(self, s => s.serialize())
    }

    pub fn deserialize(&mut self, record: &Record) {
        with_sequence!(self, s => s.deserialize(record))
    }

    pub fn reset(&mut self) {
        with_sequence!(self, s => s.reset())
    }

    pub fn import_midi(&mut self, messages: &[TimedMidiMessage]) {
        with_sequence!(self, s => s.import_midi(messages))
    }

    pub fn export_midi(&self) -> &[TimedMidiMessage] {
        with_sequence!(self, s => s.export_midi())
    }

    /// Downcast to the concrete sequence for `E`
    pub fn downcast<E: SequenceEvent>(&self) -> Option<&MidiSequence<E>> {
        E::sequence(self)
    }

    pub fn downcast_mut<E: SequenceEvent>(&mut self) -> Option<&mut MidiSequence<E>> {
        E::sequence_mut(self)
    }
}

impl<E: SequenceEvent> From<MidiSequence<E>> for AnySequence {
    fn from(sequence: MidiSequence<E>) -> Self {
        E::into_any_sequence(sequence)
    }
}
