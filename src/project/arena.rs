// TrackArena - generational storage for tracks
//
// Tracks live in reusable slots. Removing a track bumps its slot's
// generation so outstanding handles stop resolving. Sequence edits made
// through `editor` queue their notifications in the arena's outbox.

use crate::event::SequenceEvent;
use crate::notify::Notification;
use crate::project::types::{Track, TrackHandle, TrackId};
use crate::sequence::SequenceEditor;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct TrackSlot {
    generation: u32,
    track: Option<Track>,
}

#[derive(Debug, Default)]
pub struct TrackArena {
    slots: Vec<TrackSlot>,
    free: Vec<usize>,
    handles: HashMap<TrackId, TrackHandle>,
    outbox: Vec<Notification>,
}

impl TrackArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a track; a track with the same id is replaced
    pub fn insert(&mut self, track: Track) -> TrackHandle {
        if let Some(handle) = self.handle_of(&track.id()) {
            self.remove(handle);
        }

        let id = track.id();
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(TrackSlot::default());
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.track = Some(track);
        let handle = TrackHandle {
            index: index as u32,
            generation: slot.generation,
        };
        self.handles.insert(id, handle);
        handle
    }

    pub fn remove(&mut self, handle: TrackHandle) -> Option<Track> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }

        let track = slot.track.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index as usize);
        self.handles.remove(&track.id());
        Some(track)
    }

    pub fn get(&self, handle: TrackHandle) -> Option<&Track> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.track.as_ref())
    }

    pub fn handle_of(&self, id: &TrackId) -> Option<TrackHandle> {
        self.handles.get(id).copied()
    }

    pub fn get_by_id(&self, id: &TrackId) -> Option<&Track> {
        self.get(self.handle_of(id)?)
    }

    pub(crate) fn get_by_id_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        let handle = self.handle_of(id)?;
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.track.as_mut())
    }

    /// Live tracks in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.slots.iter().filter_map(|slot| slot.track.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Trusted, non-undoable editor for the `E` sequence of a track.
    /// None if the track is unknown or holds another event kind.
    pub fn editor<E: SequenceEvent>(&mut self, id: &TrackId) -> Option<SequenceEditor<'_, E>> {
        let handle = self.handle_of(id)?;
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }

        let track = slot.track.as_mut()?;
        let kind = track.kind();
        let Some(sequence) = E::sequence_mut(&mut track.sequence) else {
            log::warn!("Track {} holds {} events, not {}", id, kind, E::KIND);
            return None;
        };
        Some(SequenceEditor::new(*id, sequence, &mut self.outbox))
    }

    pub(crate) fn push_notification(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }

    pub(crate) fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }
}
