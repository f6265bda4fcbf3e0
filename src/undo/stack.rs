// UndoStack - history of performed actions with a redo tail

use crate::config::UndoConfig;
use crate::project::TrackArena;
use crate::record::Record;
use crate::undo::{UndoAction, UndoError, UndoResult, deserialize_action};
use std::collections::VecDeque;

const HISTORY_TAG: &str = "undoStack";
const UNDO_TAG: &str = "undo";
const REDO_TAG: &str = "redo";

/// Manages action execution and undo/redo
///
/// The stack keeps two lists:
/// - History: actions that have been performed and can be undone (most recent at the back)
/// - Redo tail: actions that have been undone and can be redone (most recent at the back)
///
/// Performing a new action clears the redo tail. Consecutive actions may be
/// coalesced into one history entry unless a checkpoint separates them.
///
/// # Memory Management
/// Each action reports a cost. When the summed cost goes over
/// `max_units`, the oldest history entries are dropped, but never below
/// `min_entries_to_keep` entries.
pub struct UndoStack {
    history: VecDeque<Box<dyn UndoAction>>,

    redo_tail: VecDeque<Box<dyn UndoAction>>,

    /// Summed cost of history and redo tail
    total_units: usize,

    /// Set by `checkpoint`, undo and redo; the next perform will not coalesce
    coalescing_barrier: bool,

    config: UndoConfig,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_config(UndoConfig::default())
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            history: VecDeque::new(),
            redo_tail: VecDeque::new(),
            total_units: 0,
            coalescing_barrier: true,
            config,
        }
    }

    pub fn config(&self) -> &UndoConfig {
        &self.config
    }

    /// Perform an action and record it
    ///
    /// This will:
    /// 1. Perform the action (nothing is recorded if it fails)
    /// 2. Clear the redo tail
    /// 3. Merge it into the previous entry, or append it
    /// 4. Trim history if needed
    ///
    /// # Errors
    /// Returns `ActionFailed` if the action's target could not be found.
    pub fn perform(
        &mut self,
        mut action: Box<dyn UndoAction>,
        tracks: &mut TrackArena,
    ) -> UndoResult<()> {
        if !action.perform(tracks) {
            return Err(UndoError::ActionFailed(action.description()));
        }

        self.clear_redo_tail();

        let coalesced = if self.coalescing_barrier {
            None
        } else {
            self.history
                .back()
                .and_then(|last| last.create_coalesced_action(action.as_ref()))
        };

        match coalesced {
            Some(merged) => {
                log::debug!("Coalesced: {}", merged.description());
                if let Some(last) = self.history.pop_back() {
                    self.total_units -= last.size_in_units();
                }
                self.push_history(merged);
            }
            None => {
                log::debug!("Performed: {}", action.description());
                self.push_history(action);
            }
        }

        self.coalescing_barrier = false;
        self.trim();
        Ok(())
    }

    /// Undo the last action
    ///
    /// Returns the description of the undone action. An action whose undo
    /// fails is dropped from the history.
    ///
    /// # Errors
    /// Returns an error if:
    /// - There are no actions to undo
    /// - The undo operation fails
    pub fn undo(&mut self, tracks: &mut TrackArena) -> UndoResult<String> {
        let mut action = self.history.pop_back().ok_or(UndoError::NothingToUndo)?;
        self.coalescing_barrier = true;

        let description = action.description();
        if !action.undo(tracks) {
            self.total_units -= action.size_in_units();
            log::error!("Undo failed, dropping: {}", description);
            return Err(UndoError::ActionFailed(description));
        }

        log::debug!("Undone: {}", description);
        self.redo_tail.push_back(action);
        Ok(description)
    }

    /// Redo the last undone action
    ///
    /// # Errors
    /// Returns an error if:
    /// - There are no actions to redo
    /// - Performing it again fails
    pub fn redo(&mut self, tracks: &mut TrackArena) -> UndoResult<String> {
        let mut action = self.redo_tail.pop_back().ok_or(UndoError::NothingToRedo)?;
        self.coalescing_barrier = true;

        let description = action.description();
        if !action.perform(tracks) {
            self.total_units -= action.size_in_units();
            log::error!("Redo failed, dropping: {}", description);
            return Err(UndoError::ActionFailed(description));
        }

        log::debug!("Redone: {}", description);
        self.history.push_back(action);
        Ok(description)
    }

    /// Start a new gesture: the next action will not be merged with earlier ones
    pub fn checkpoint(&mut self) {
        self.coalescing_barrier = true;
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_tail.is_empty()
    }

    /// Description of the action that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.history.back().map(|a| a.description())
    }

    /// Description of the action that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_tail.back().map(|a| a.description())
    }

    pub fn undo_count(&self) -> usize {
        self.history.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_tail.len()
    }

    pub fn total_units(&self) -> usize {
        self.total_units
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.history.clear();
        self.redo_tail.clear();
        self.total_units = 0;
        self.coalescing_barrier = true;
    }

    fn push_history(&mut self, action: Box<dyn UndoAction>) {
        self.total_units += action.size_in_units();
        self.history.push_back(action);
    }

    fn clear_redo_tail(&mut self) {
        for action in self.redo_tail.drain(..) {
            self.total_units -= action.size_in_units();
        }
    }

    fn trim(&mut self) {
        while self.total_units > self.config.max_units
            && self.history.len() > self.config.min_entries_to_keep
        {
            match self.history.pop_front() {
                Some(oldest) => {
                    self.total_units -= oldest.size_in_units();
                    log::debug!("Evicted from history: {}", oldest.description());
                }
                None => break,
            }
        }
    }

    //===------------------------------------------------------------------===//
    // Persistence
    //===------------------------------------------------------------------===//

    pub fn serialize(&self) -> Record {
        let mut undo = Record::new(UNDO_TAG);
        undo.children = self.history.iter().map(|a| a.serialize()).collect();

        let mut redo = Record::new(REDO_TAG);
        redo.children = self.redo_tail.iter().map(|a| a.serialize()).collect();

        Record::new(HISTORY_TAG).with_child(undo).with_child(redo)
    }

    /// Replace the history with actions read from `record` (the undo stack
    /// root or its parent). Unreadable actions are skipped.
    pub fn deserialize(&mut self, record: &Record) {
        self.clear();

        let Some(root) = record.find_root(HISTORY_TAG) else {
            return;
        };

        let read = |tag: &str| -> VecDeque<Box<dyn UndoAction>> {
            root.child(tag)
                .map(|list| list.children.iter().filter_map(deserialize_action).collect())
                .unwrap_or_default()
        };

        self.history = read(UNDO_TAG);
        self.redo_tail = read(REDO_TAG);
        self.total_units = self
            .history
            .iter()
            .chain(self.redo_tail.iter())
            .map(|a| a.size_in_units())
            .sum();

        log::debug!(
            "Loaded undo history: {} undo, {} redo entries",
            self.history.len(),
            self.redo_tail.len()
        );
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::Cell;
    use std::rc::Rc;

    // Mock action for testing; `value` is a shared counter standing in for
    // the edited state
    struct MockAction {
        delta: i32,
        value: Rc<Cell<i32>>,
        size: usize,
        fail: bool,
        mergeable: bool,
    }

    impl MockAction {
        fn new(delta: i32, value: &Rc<Cell<i32>>) -> Self {
            Self {
                delta,
                value: Rc::clone(value),
                size: 1,
                fail: false,
                mergeable: false,
            }
        }

        fn mergeable(mut self) -> Self {
            self.mergeable = true;
            self
        }

        fn sized(mut self, size: usize) -> Self {
            self.size = size;
            self
        }
    }

    impl UndoAction for MockAction {
        fn perform(&mut self, _tracks: &mut TrackArena) -> bool {
            if self.fail {
                return false;
            }
            self.value.set(self.value.get() + self.delta);
            true
        }

        fn undo(&mut self, _tracks: &mut TrackArena) -> bool {
            self.value.set(self.value.get() - self.delta);
            true
        }

        fn size_in_units(&self) -> usize {
            self.size
        }

        fn description(&self) -> String {
            format!("Add {}", self.delta)
        }

        fn create_coalesced_action(&self, next: &dyn UndoAction) -> Option<Box<dyn UndoAction>> {
            let next = next.as_any().downcast_ref::<MockAction>()?;
            if !(self.mergeable && next.mergeable) {
                return None;
            }
            Some(Box::new(MockAction::new(self.delta + next.delta, &self.value).mergeable()))
        }

        fn serialize(&self) -> Record {
            Record::new("mock")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn setup() -> (UndoStack, TrackArena, Rc<Cell<i32>>) {
        (UndoStack::new(), TrackArena::new(), Rc::new(Cell::new(0)))
    }

    #[test]
    fn test_perform_action() {
        let (mut stack, mut tracks, value) = setup();

        stack
            .perform(Box::new(MockAction::new(42, &value)), &mut tracks)
            .unwrap();

        assert_eq!(value.get(), 42);
        assert_eq!(stack.undo_count(), 1);
        assert_eq!(stack.redo_count(), 0);
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_undo() {
        let (mut stack, mut tracks, value) = setup();
        stack
            .perform(Box::new(MockAction::new(42, &value)), &mut tracks)
            .unwrap();

        let description = stack.undo(&mut tracks).unwrap();
        assert_eq!(description, "Add 42");
        assert_eq!(value.get(), 0);
        assert_eq!(stack.undo_count(), 0);
        assert_eq!(stack.redo_count(), 1);
    }

    #[test]
    fn test_redo() {
        let (mut stack, mut tracks, value) = setup();
        stack
            .perform(Box::new(MockAction::new(42, &value)), &mut tracks)
            .unwrap();
        stack.undo(&mut tracks).unwrap();

        let description = stack.redo(&mut tracks).unwrap();
        assert_eq!(description, "Add 42");
        assert_eq!(value.get(), 42);
        assert_eq!(stack.undo_count(), 1);
        assert_eq!(stack.redo_count(), 0);
    }

    #[test]
    fn test_redo_tail_cleared_on_new_action() {
        let (mut stack, mut tracks, value) = setup();

        // Perform, undo, then perform a new action
        stack
            .perform(Box::new(MockAction::new(1, &value)), &mut tracks)
            .unwrap();
        stack.undo(&mut tracks).unwrap();
        stack
            .perform(Box::new(MockAction::new(2, &value)), &mut tracks)
            .unwrap();

        assert!(!stack.can_redo());
        assert_eq!(stack.redo_count(), 0);
        assert_eq!(stack.total_units(), 1);
    }

    #[test]
    fn test_failed_perform_is_not_recorded() {
        let (mut stack, mut tracks, value) = setup();
        stack
            .perform(Box::new(MockAction::new(1, &value)), &mut tracks)
            .unwrap();
        stack.undo(&mut tracks).unwrap();

        let mut failing = MockAction::new(5, &value);
        failing.fail = true;
        let result = stack.perform(Box::new(failing), &mut tracks);

        assert_eq!(result, Err(UndoError::ActionFailed("Add 5".to_string())));
        assert_eq!(stack.undo_count(), 0);
        // The redo tail survives a failed perform
        assert_eq!(stack.redo_count(), 1);
    }

    #[test]
    fn test_coalescing_and_checkpoint() {
        let (mut stack, mut tracks, value) = setup();

        stack
            .perform(Box::new(MockAction::new(1, &value).mergeable()), &mut tracks)
            .unwrap();
        stack
            .perform(Box::new(MockAction::new(2, &value).mergeable()), &mut tracks)
            .unwrap();
        assert_eq!(stack.undo_count(), 1);
        assert_eq!(stack.undo_description().as_deref(), Some("Add 3"));

        stack.checkpoint();
        stack
            .perform(Box::new(MockAction::new(4, &value).mergeable()), &mut tracks)
            .unwrap();
        assert_eq!(stack.undo_count(), 2);
        assert_eq!(value.get(), 7);

        stack.undo(&mut tracks).unwrap();
        stack.undo(&mut tracks).unwrap();
        assert_eq!(value.get(), 0);
    }

    #[test]
    fn test_no_coalescing_across_undo() {
        let (mut stack, mut tracks, value) = setup();
        stack
            .perform(Box::new(MockAction::new(1, &value).mergeable()), &mut tracks)
            .unwrap();
        stack
            .perform(Box::new(MockAction::new(1, &value).mergeable()), &mut tracks)
            .unwrap();
        stack.undo(&mut tracks).unwrap();
        stack.redo(&mut tracks).unwrap();
        stack
            .perform(Box::new(MockAction::new(1, &value).mergeable()), &mut tracks)
            .unwrap();

        assert_eq!(stack.undo_count(), 2);
    }

    #[test]
    fn test_history_limit() {
        let config = UndoConfig {
            max_units: 10,
            min_entries_to_keep: 3,
            persist_history: false,
        };
        let mut stack = UndoStack::with_config(config);
        let mut tracks = TrackArena::new();
        let value = Rc::new(Cell::new(0));

        // 5 actions of 4 units each, more than the limit
        for i in 0..5 {
            stack
                .perform(Box::new(MockAction::new(i, &value).sized(4)), &mut tracks)
                .unwrap();
        }

        // Over the ceiling, but the minimum entry count wins
        assert_eq!(stack.undo_count(), 3);
        assert_eq!(stack.total_units(), 12);
        assert_eq!(stack.undo_description().as_deref(), Some("Add 4"));
    }

    #[test]
    fn test_undo_with_empty_stack() {
        let (mut stack, mut tracks, _) = setup();
        assert_eq!(stack.undo(&mut tracks), Err(UndoError::NothingToUndo));
    }

    #[test]
    fn test_redo_with_empty_stack() {
        let (mut stack, mut tracks, _) = setup();
        assert_eq!(stack.redo(&mut tracks), Err(UndoError::NothingToRedo));
    }

    #[test]
    fn test_clear() {
        let (mut stack, mut tracks, value) = setup();
        stack
            .perform(Box::new(MockAction::new(1, &value)), &mut tracks)
            .unwrap();
        stack.clear();
        assert!(!stack.can_undo());
        assert_eq!(stack.total_units(), 0);
    }

    #[test]
    fn test_deserialize_without_history_is_empty() {
        let mut stack = UndoStack::new();
        stack.deserialize(&Record::new("project"));
        assert_eq!(stack.undo_count(), 0);
        assert_eq!(stack.redo_count(), 0);
    }
}
