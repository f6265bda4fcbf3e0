// Project - tracks, undo history and listeners of one document
//
// This is the public, undoable editing surface. Every edit is wrapped in an
// `EventAction` and performed through the undo stack; notifications queued
// while it runs are delivered once it has finished.

pub mod arena;
pub mod serialization;
pub mod types;

pub use arena::TrackArena;
pub use types::{Track, TrackHandle, TrackId};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::event::{
    AnnotationEvent, Clip, EventId, EventKind, KeySignatureEvent, Note, SequenceEvent,
    TimeSignatureEvent,
};
use crate::midi::{DecodedTrack, TimedMidiMessage, decode_smf};
use crate::notify::{Dispatcher, ListenerHandle, Notification};
use crate::sequence::{BeatRange, MidiSequence, SequenceEditor};
use crate::transport::PlayheadPosition;
use crate::undo::{EventAction, UndoAction, UndoResult, UndoStack};
use std::collections::HashSet;
use std::sync::Arc;

pub struct Project {
    tracks: TrackArena,
    undo_stack: UndoStack,
    dispatcher: Dispatcher,

    /// Union of the beat ranges of all non-empty tracks
    beat_range: BeatRange,

    playhead: Arc<PlayheadPosition>,
    config: EngineConfig,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            tracks: TrackArena::new(),
            undo_stack: UndoStack::with_config(config.undo.clone()),
            dispatcher: Dispatcher::new(),
            beat_range: BeatRange::default(),
            playhead: PlayheadPosition::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared playhead, readable from the playback thread
    pub fn playhead(&self) -> Arc<PlayheadPosition> {
        Arc::clone(&self.playhead)
    }

    pub fn beat_range(&self) -> BeatRange {
        self.beat_range
    }

    //===------------------------------------------------------------------===//
    // Tracks
    //===------------------------------------------------------------------===//

    /// Add an empty track holding events of `kind`
    pub fn add_track(&mut self, name: impl Into<String>, kind: EventKind) -> TrackId {
        let track = Track::new(name, kind);
        let id = track.id();
        log::debug!("Added {} track \"{}\" ({})", kind, track.name, id);
        self.tracks.insert(track);
        id
    }

    /// Remove a track. Undo history referring to it can no longer be
    /// replayed, so the whole history is cleared.
    pub fn remove_track(&mut self, id: &TrackId) -> Option<Track> {
        let handle = self.tracks.handle_of(id)?;
        let track = self.tracks.remove(handle)?;
        self.undo_stack.clear();
        log::debug!("Removed track \"{}\" ({})", track.name, id);
        self.flush_notifications();
        Some(track)
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.get_by_id(id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn handle_of(&self, id: &TrackId) -> Option<TrackHandle> {
        self.tracks.handle_of(id)
    }

    /// The `E` sequence of a track
    pub fn sequence<E: SequenceEvent>(&self, track: &TrackId) -> Option<&MidiSequence<E>> {
        self.tracks.get_by_id(track).and_then(|t| E::sequence(&t.sequence))
    }

    /// Like `sequence`, but unknown tracks and kind mismatches are errors
    pub fn try_sequence<E: SequenceEvent>(&self, track: &TrackId) -> EngineResult<&MidiSequence<E>> {
        let found = self
            .tracks
            .get_by_id(track)
            .ok_or_else(|| EngineError::UnknownTrack(track.to_string()))?;
        E::sequence(&found.sequence)
            .ok_or_else(|| EngineError::WrongSequenceKind(track.to_string(), E::KIND.display_name()))
    }

    /// A fresh id for an event about to be added to `track`
    pub fn create_event_id<E: SequenceEvent>(&mut self, track: &TrackId) -> Option<EventId> {
        let track = self.tracks.get_by_id_mut(track)?;
        E::sequence_mut(&mut track.sequence).map(|s| s.create_unique_event_id())
    }

    //===------------------------------------------------------------------===//
    // Undoable edits
    //===------------------------------------------------------------------===//

    /// Insert a copy of `event`; one undo step
    pub fn insert<E: SequenceEvent>(&mut self, track: &TrackId, event: &E) -> bool {
        self.perform(Box::new(EventAction::Insert {
            track: *track,
            event: event.clone(),
        }))
    }

    /// Remove the event with `event`'s id; false if it is not found
    pub fn remove<E: SequenceEvent>(&mut self, track: &TrackId, event: &E) -> bool {
        let Some(stored) = self.stored_event(track, event) else {
            return false;
        };
        self.perform(Box::new(EventAction::Remove {
            track: *track,
            event: stored,
        }))
    }

    /// Change the stored state `old` into `new`; false if `old` is not found
    pub fn change<E: SequenceEvent>(&mut self, track: &TrackId, old: &E, new: &E) -> bool {
        let Some(before) = self.stored_event(track, old) else {
            return false;
        };
        self.perform(Box::new(EventAction::Change {
            track: *track,
            before,
            after: new.clone(),
        }))
    }

    pub fn insert_group<E: SequenceEvent>(&mut self, track: &TrackId, events: &[E]) -> bool {
        if events.is_empty() {
            return true;
        }
        self.perform(Box::new(EventAction::GroupInsert {
            track: *track,
            events: events.to_vec(),
        }))
    }

    /// Remove every listed event that is found, as one undo step. An event
    /// listed twice is removed once.
    pub fn remove_group<E: SequenceEvent>(&mut self, track: &TrackId, events: &[E]) -> bool {
        let mut seen = HashSet::new();
        let stored: Vec<E> = events
            .iter()
            .filter(|e| seen.insert(e.id().to_string()))
            .filter_map(|e| self.stored_event(track, e))
            .collect();
        if stored.is_empty() {
            return true;
        }
        self.perform(Box::new(EventAction::GroupRemove {
            track: *track,
            events: stored,
        }))
    }

    /// Apply `before[i] -> after[i]` for every pair found, as one undo step
    pub fn change_group<E: SequenceEvent>(
        &mut self,
        track: &TrackId,
        before: &[E],
        after: &[E],
    ) -> bool {
        if before.len() != after.len() {
            debug_assert!(false, "group change with {} old and {} new states", before.len(), after.len());
            log::error!(
                "Group change rejected: {} old states but {} new states",
                before.len(),
                after.len()
            );
            return false;
        }

        // A repeated id keeps only its first pair
        let mut seen = HashSet::new();
        let (stored, changed): (Vec<E>, Vec<E>) = before
            .iter()
            .zip(after)
            .filter(|(old, _)| seen.insert(old.id().to_string()))
            .filter_map(|(old, new)| Some((self.stored_event(track, old)?, new.clone())))
            .unzip();
        if stored.is_empty() {
            return true;
        }
        self.perform(Box::new(EventAction::GroupChange {
            track: *track,
            before: stored,
            after: changed,
        }))
    }

    /// Perform any action through the undo stack
    pub fn perform(&mut self, action: Box<dyn UndoAction>) -> bool {
        let result = self.undo_stack.perform(action, &mut self.tracks);
        self.flush_notifications();
        match result {
            Ok(()) => true,
            Err(e) => {
                log::debug!("{}", e);
                false
            }
        }
    }

    fn stored_event<E: SequenceEvent>(&self, track: &TrackId, event: &E) -> Option<E> {
        let sequence = self.sequence::<E>(track)?;
        sequence
            .index_of_sorted(event)
            .and_then(|i| sequence.get(i))
            .cloned()
    }

    //===------------------------------------------------------------------===//
    // Direct edits
    //===------------------------------------------------------------------===//

    /// Edit a sequence without recording undo history. Notifications are
    /// delivered when `f` returns. None if the track is unknown or holds
    /// another event kind.
    pub fn edit<E, R, F>(&mut self, track: &TrackId, f: F) -> Option<R>
    where
        E: SequenceEvent,
        F: FnOnce(&mut SequenceEditor<'_, E>) -> R,
    {
        let result = {
            let mut editor = self.tracks.editor::<E>(track)?;
            f(&mut editor)
        };
        self.flush_notifications();
        Some(result)
    }

    /// Replace a track's content with events read from external MIDI
    /// messages. This is a load-time operation: it clears the undo history.
    pub fn import_midi<E: SequenceEvent>(&mut self, track: &TrackId, messages: &[TimedMidiMessage]) -> bool {
        let Some(mut editor) = self.tracks.editor::<E>(track) else {
            return false;
        };
        editor.import_midi(messages);

        self.undo_stack.clear();
        self.flush_notifications();
        true
    }

    /// Import a decoded MIDI track into an existing track of any kind
    pub fn import_midi_track(&mut self, track: &TrackId, decoded: &DecodedTrack) -> EngineResult<()> {
        let kind = self
            .tracks
            .get_by_id(track)
            .map(Track::kind)
            .ok_or_else(|| EngineError::UnknownTrack(track.to_string()))?;

        let messages = &decoded.messages;
        match kind {
            EventKind::TimeSignature => self.import_midi::<TimeSignatureEvent>(track, messages),
            EventKind::KeySignature => self.import_midi::<KeySignatureEvent>(track, messages),
            EventKind::Clip => self.import_midi::<Clip>(track, messages),
            EventKind::Note => self.import_midi::<Note>(track, messages),
            EventKind::Annotation => self.import_midi::<AnnotationEvent>(track, messages),
        };
        Ok(())
    }

    /// Decode a standard MIDI file and add one track of `kind` per file track
    pub fn import_midi_file(&mut self, bytes: &[u8], kind: EventKind) -> EngineResult<Vec<TrackId>> {
        let decoded = decode_smf(bytes)?;

        let mut ids = Vec::with_capacity(decoded.len());
        for (i, track) in decoded.iter().enumerate() {
            let name = track
                .name
                .clone()
                .unwrap_or_else(|| format!("Track {}", i + 1));
            let id = self.add_track(name, kind);
            self.import_midi_track(&id, track)?;
            ids.push(id);
        }
        Ok(ids)
    }

    //===------------------------------------------------------------------===//
    // Undo log
    //===------------------------------------------------------------------===//

    /// Undo the last action, returning its description
    pub fn undo(&mut self) -> UndoResult<String> {
        let result = self.undo_stack.undo(&mut self.tracks);
        self.flush_notifications();
        result
    }

    /// Redo the last undone action, returning its description
    pub fn redo(&mut self) -> UndoResult<String> {
        let result = self.undo_stack.redo(&mut self.tracks);
        self.flush_notifications();
        result
    }

    /// Start a new gesture: the next change will not merge with earlier ones
    pub fn checkpoint(&mut self) {
        self.undo_stack.checkpoint();
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.undo_stack.redo_count()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.undo_stack.redo_description()
    }

    pub fn clear_undo_history(&mut self) {
        self.undo_stack.clear();
    }

    //===------------------------------------------------------------------===//
    // Listeners
    //===------------------------------------------------------------------===//

    pub fn add_listener(&mut self, listener: ListenerHandle) {
        self.dispatcher.add_listener(listener);
    }

    pub fn remove_listener(&mut self, listener: &ListenerHandle) -> bool {
        self.dispatcher.remove_listener(listener)
    }

    /// Deliver everything queued by the last operation, ending with the
    /// project range if it moved
    fn flush_notifications(&mut self) {
        let mut pending = self.tracks.take_notifications();

        let range = self
            .tracks
            .iter()
            .filter(|t| !t.sequence.is_empty())
            .map(Track::beat_range)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        if range != self.beat_range {
            self.beat_range = range;
            pending.push(Notification::ProjectBeatRangeChanged { range });
        }

        self.dispatcher.deliver(&mut pending);
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
