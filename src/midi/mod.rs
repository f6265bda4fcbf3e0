// MIDI import/export plumbing for sequences

pub mod event;
pub mod smf;

pub use event::{MIDI_IMPORT_SCALE, MidiMessage, TimedMidiMessage, sort_by_timestamp};
pub use smf::{DecodedTrack, decode_smf};
