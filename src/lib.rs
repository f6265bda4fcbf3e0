// Sequence engine - undoable multi-track MIDI sequence editing

pub mod config;
pub mod error;
pub mod event;
pub mod midi;
pub mod notify;
pub mod project;
pub mod record;
pub mod sequence;
pub mod transport;
pub mod undo;

// Re-export commonly used types for convenience
pub use config::{EngineConfig, UndoConfig};
pub use error::{EngineError, EngineResult};
pub use event::{
    AnnotationEvent, AnyEvent, BEATS_RESOLUTION, Clip, EventId, EventKind, KeySignatureEvent,
    Note, Scale, SequenceEvent, TimeSignatureEvent, round_beat,
};
pub use midi::{DecodedTrack, MIDI_IMPORT_SCALE, MidiMessage, TimedMidiMessage, decode_smf};
pub use notify::{ListenerHandle, Notification, SequenceListener};
pub use project::{Project, Track, TrackArena, TrackHandle, TrackId};
pub use record::Record;
pub use sequence::{AnySequence, BeatRange, MidiSequence, SequenceEditor};
pub use transport::PlayheadPosition;
pub use undo::{EventAction, UndoAction, UndoError, UndoResult, UndoStack};
