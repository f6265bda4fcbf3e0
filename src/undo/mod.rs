// Undo/Redo system
//
// Every undoable edit is an action performed through the `UndoStack`.
// Actions mutate sequences through the trusted `SequenceEditor` reached from
// the track arena, never through the undoable `Project` API.

pub mod actions;
pub mod stack;

pub use actions::{EventAction, deserialize_action};
pub use stack::UndoStack;

use crate::project::TrackArena;
use crate::record::Record;
use std::any::Any;

/// Result type for undo log operations
pub type UndoResult<T> = Result<T, UndoError>;

/// Errors reported by the undo log
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UndoError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Action failed: {0}")]
    ActionFailed(String),
}

/// A reversible edit
///
/// `perform` and `undo` must be exact inverses. Both return false when the
/// target could not be found, in which case nothing was changed.
pub trait UndoAction: Any {
    fn perform(&mut self, tracks: &mut TrackArena) -> bool;

    fn undo(&mut self, tracks: &mut TrackArena) -> bool;

    /// Rough memory cost, used to bound the history
    fn size_in_units(&self) -> usize {
        1
    }

    /// Human-readable description (e.g. "Change note")
    fn description(&self) -> String;

    /// Merge `next`, performed right after `self`, into one action going
    /// from `self`'s initial state to `next`'s final state. Returns None
    /// when the two cannot be merged.
    fn create_coalesced_action(&self, _next: &dyn UndoAction) -> Option<Box<dyn UndoAction>> {
        None
    }

    fn serialize(&self) -> Record;

    fn as_any(&self) -> &dyn Any;
}
