// Event value types
//
// Every event kind carries a beat position and an id that is unique within
// its owning sequence. Events are plain values: a sequence stores its own
// copies, and edits replace or patch those copies through `apply_changes`.

pub mod annotation;
pub mod clip;
pub mod key_signature;
pub mod note;
pub mod time_signature;

pub use annotation::AnnotationEvent;
pub use clip::Clip;
pub use key_signature::{KeySignatureEvent, Scale};
pub use note::Note;
pub use time_signature::TimeSignatureEvent;

use crate::midi::TimedMidiMessage;
use crate::record::Record;
use crate::sequence::{AnySequence, MidiSequence};
use std::cmp::Ordering;
use std::fmt;

/// Identifier of an event, unique within one sequence
pub type EventId = String;

/// Number of grid steps per beat; every beat position is snapped to this grid
pub const BEATS_RESOLUTION: f32 = 16.0;

/// Snap a beat position to the sub-beat grid; negative zero becomes zero
pub fn round_beat(beat: f32) -> f32 {
    (beat * BEATS_RESOLUTION).round() / BEATS_RESOLUTION + 0.0
}

/// The closed set of event kinds a sequence can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TimeSignature,
    KeySignature,
    Clip,
    Note,
    Annotation,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::TimeSignature,
        EventKind::KeySignature,
        EventKind::Clip,
        EventKind::Note,
        EventKind::Annotation,
    ];

    /// Tag of a single persisted event of this kind
    pub fn record_tag(self) -> &'static str {
        match self {
            EventKind::TimeSignature => "timeSignature",
            EventKind::KeySignature => "keySignature",
            EventKind::Clip => "clip",
            EventKind::Note => "note",
            EventKind::Annotation => "annotation",
        }
    }

    /// Tag of the root record of a persisted sequence of this kind
    pub fn sequence_tag(self) -> &'static str {
        match self {
            EventKind::TimeSignature => "timeSignatures",
            EventKind::KeySignature => "keySignatures",
            EventKind::Clip => "pattern",
            EventKind::Note => "notes",
            EventKind::Annotation => "annotations",
        }
    }

    pub fn from_record_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.record_tag() == tag)
    }

    pub fn from_sequence_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.sequence_tag() == tag)
    }

    /// Human-readable name, used in action descriptions
    pub fn display_name(self) -> &'static str {
        match self {
            EventKind::TimeSignature => "time signature",
            EventKind::KeySignature => "key signature",
            EventKind::Clip => "clip",
            EventKind::Note => "note",
            EventKind::Annotation => "annotation",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Capabilities shared by every event kind
///
/// Two events are the same event when their ids match, whatever their
/// positions. Ordering only ever looks at the beat.
pub trait SequenceEvent: Clone + fmt::Debug + PartialEq + 'static {
    const KIND: EventKind;

    fn id(&self) -> &str;

    fn beat(&self) -> f32;

    /// Last beat covered by this event; differs from `beat` for events with a length
    fn end_beat(&self) -> f32 {
        self.beat()
    }

    /// Reassign the id; used when copying an event into another sequence
    fn set_id(&mut self, id: EventId);

    /// Move the event; the position is snapped to the beat grid
    fn set_beat(&mut self, beat: f32);

    /// A default-valued event with an empty id, to be filled by `deserialize`
    fn blank() -> Self;

    fn serialize(&self) -> Record;

    /// Read attributes from `record`; missing or corrupt ones keep current values
    fn deserialize(&mut self, record: &Record);

    /// Restore default payload and beat, keeping the id
    fn reset(&mut self);

    /// Copy every field but the id from `other`, which must be the same event
    fn apply_changes(&mut self, other: &Self);

    fn to_any(&self) -> AnyEvent;

    /// Append the MIDI messages this event renders to
    fn export_midi(&self, _out: &mut Vec<TimedMidiMessage>) {}

    /// Build events of this kind from an ordered external message stream
    fn import_midi(
        messages: &[TimedMidiMessage],
        next_id: &mut dyn FnMut() -> EventId,
    ) -> Vec<Self>;

    /// Borrow the sequence of this kind out of a type-erased sequence
    fn sequence(sequence: &AnySequence) -> Option<&MidiSequence<Self>>;

    fn sequence_mut(sequence: &mut AnySequence) -> Option<&mut MidiSequence<Self>>;

    fn into_any_sequence(sequence: MidiSequence<Self>) -> AnySequence;

    fn is_same_event(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Ordering used by the sorted store: by beat only, equal beats compare equal
    fn compare_beats(&self, other: &Self) -> Ordering {
        // Adding zero folds -0.0 into 0.0 so both compare equal
        (self.beat() + 0.0).total_cmp(&(other.beat() + 0.0))
    }

    fn with_beat(&self, beat: f32) -> Self {
        let mut copy = self.clone();
        copy.set_beat(beat);
        copy
    }

    fn with_delta_beat(&self, delta: f32) -> Self {
        self.with_beat(self.beat() + delta)
    }

    /// Copy with every attribute present in `record` applied, keeping the id unless overridden
    fn with_parameters(&self, record: &Record) -> Self {
        let mut copy = self.clone();
        copy.deserialize(record);
        copy
    }

    /// Copy that belongs to `owner`, with a fresh id generated there
    fn copy_with_new_id(&self, owner: &mut MidiSequence<Self>) -> Self {
        let mut copy = self.clone();
        copy.set_id(owner.create_unique_event_id());
        copy
    }
}

/// Owned snapshot of an event of any kind, as handed to listeners
#[derive(Debug, Clone, PartialEq)]
pub enum AnyEvent {
    TimeSignature(TimeSignatureEvent),
    KeySignature(KeySignatureEvent),
    Clip(Clip),
    Note(Note),
    Annotation(AnnotationEvent),
}

impl AnyEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AnyEvent::TimeSignature(_) => EventKind::TimeSignature,
            AnyEvent::KeySignature(_) => EventKind::KeySignature,
            AnyEvent::Clip(_) => EventKind::Clip,
            AnyEvent::Note(_) => EventKind::Note,
            AnyEvent::Annotation(_) => EventKind::Annotation,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AnyEvent::TimeSignature(e) => e.id(),
            AnyEvent::KeySignature(e) => e.id(),
            AnyEvent::Clip(e) => e.id(),
            AnyEvent::Note(e) => e.id(),
            AnyEvent::Annotation(e) => e.id(),
        }
    }

    pub fn beat(&self) -> f32 {
        match self {
            AnyEvent::TimeSignature(e) => e.beat(),
            AnyEvent::KeySignature(e) => e.beat(),
            AnyEvent::Clip(e) => e.beat(),
            AnyEvent::Note(e) => e.beat(),
            AnyEvent::Annotation(e) => e.beat(),
        }
    }
}

/// Timestamp in import ticks to a grid-snapped beat
pub(crate) fn import_beat(timestamp: f64) -> f32 {
    round_beat((timestamp / crate::midi::MIDI_IMPORT_SCALE) as f32)
}

/// Beat to a timestamp in import ticks
pub(crate) fn export_timestamp(beat: f32) -> f64 {
    beat as f64 * crate::midi::MIDI_IMPORT_SCALE
}
