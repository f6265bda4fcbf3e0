// SequenceEditor - trusted, non-undoable mutation of one sequence
//
// Undo actions and `Project::edit` reach sequences through this type only.
// Every mutation appends its notifications to the owning project's outbox;
// nothing is delivered until the surrounding operation has finished.

use crate::event::{EventId, SequenceEvent};
use crate::midi::TimedMidiMessage;
use crate::notify::Notification;
use crate::project::TrackId;
use crate::record::Record;
use crate::sequence::{BeatRange, MidiSequence};

pub struct SequenceEditor<'a, E: SequenceEvent> {
    track: TrackId,
    sequence: &'a mut MidiSequence<E>,
    outbox: &'a mut Vec<Notification>,
}

impl<'a, E: SequenceEvent> SequenceEditor<'a, E> {
    pub(crate) fn new(
        track: TrackId,
        sequence: &'a mut MidiSequence<E>,
        outbox: &'a mut Vec<Notification>,
    ) -> Self {
        Self {
            track,
            sequence,
            outbox,
        }
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    /// Read access to the sequence being edited
    pub fn sequence(&self) -> &MidiSequence<E> {
        self.sequence
    }

    pub fn create_unique_event_id(&mut self) -> EventId {
        self.sequence.create_unique_event_id()
    }

    //===------------------------------------------------------------------===//
    // Single-event edits
    //===------------------------------------------------------------------===//

    /// Store a copy of `event` at its sorted position.
    ///
    /// An id already present in the sequence is a caller bug: it trips a
    /// debug assertion and the event is not inserted.
    pub fn insert(&mut self, event: &E) -> bool {
        if !self.add_event(event) {
            return false;
        }
        self.push_range_update();
        true
    }

    /// Remove the stored event with `event`'s id, searched at `event`'s beat.
    /// Returns false if there is no such event.
    pub fn remove(&mut self, event: &E) -> bool {
        if !self.remove_event(event) {
            return false;
        }
        self.push_range_update();
        self.push_post_removal();
        true
    }

    /// Replace the stored state `old` with `new`, which must carry the same
    /// id. The event moves to its new sorted position. Returns false if
    /// `old` is not found.
    pub fn change(&mut self, old: &E, new: &E) -> bool {
        if !self.change_event(old, new) {
            return false;
        }
        self.push_range_update();
        true
    }

    //===------------------------------------------------------------------===//
    // Group edits
    //===------------------------------------------------------------------===//

    /// Insert every event, in order, with a single range update at the end
    pub fn insert_group(&mut self, events: &[E]) -> bool {
        let mut added = 0;
        for event in events {
            if self.can_add(event) {
                self.sequence.push_unchecked(event.clone());
                self.outbox.push(Notification::EventAdded {
                    track: self.track,
                    event: event.to_any(),
                });
                added += 1;
            }
        }
        if added > 0 {
            self.sequence.sort();
        }
        log::trace!("Inserted {}/{} {} events", added, events.len(), E::KIND);

        self.push_range_update();
        true
    }

    /// Remove every event that is found; one post-removal notification at the end
    pub fn remove_group(&mut self, events: &[E]) -> bool {
        for event in events {
            if !self.remove_event(event) {
                log::debug!("Group removal skipped missing {} \"{}\"", E::KIND, event.id());
            }
        }

        self.push_range_update();
        self.push_post_removal();
        true
    }

    /// Apply `before[i] -> after[i]` for every pair.
    ///
    /// The lists must have equal length; otherwise nothing is changed.
    pub fn change_group(&mut self, before: &[E], after: &[E]) -> bool {
        if before.len() != after.len() {
            debug_assert!(false, "group change with {} old and {} new states", before.len(), after.len());
            log::error!(
                "Group change of {} rejected: {} old states but {} new states",
                E::KIND,
                before.len(),
                after.len()
            );
            return false;
        }

        for (old, new) in before.iter().zip(after) {
            if !self.change_event(old, new) {
                log::debug!("Group change skipped missing {} \"{}\"", E::KIND, old.id());
            }
        }

        self.push_range_update();
        true
    }

    //===------------------------------------------------------------------===//
    // Whole-content replacement
    //===------------------------------------------------------------------===//

    pub fn import_midi(&mut self, messages: &[TimedMidiMessage]) {
        let previous = self.sequence.beat_range();
        self.sequence.import_midi(messages);
        self.push_reloaded(previous);
    }

    pub fn deserialize(&mut self, record: &Record) {
        let previous = self.sequence.beat_range();
        self.sequence.deserialize(record);
        self.push_reloaded(previous);
    }

    pub fn reset(&mut self) {
        let previous = self.sequence.beat_range();
        self.sequence.reset();
        self.push_reloaded(previous);
    }

    //===------------------------------------------------------------------===//
    // Internals
    //===------------------------------------------------------------------===//

    fn can_add(&self, event: &E) -> bool {
        if self.sequence.contains_id(event.id()) {
            debug_assert!(false, "duplicate {} id \"{}\"", E::KIND, event.id());
            log::error!("Refusing to insert {} with duplicate id \"{}\"", E::KIND, event.id());
            return false;
        }
        true
    }

    fn add_event(&mut self, event: &E) -> bool {
        if !self.can_add(event) {
            return false;
        }
        let index = self.sequence.insert_sorted(event.clone());
        log::trace!("Inserted {} \"{}\" at index {}", E::KIND, event.id(), index);

        self.outbox.push(Notification::EventAdded {
            track: self.track,
            event: event.to_any(),
        });
        true
    }

    fn remove_event(&mut self, event: &E) -> bool {
        let Some(index) = self.sequence.index_of_sorted(event) else {
            return false;
        };

        // Listeners see the stored state, not the caller's copy
        let stored = self.sequence.remove_at(index);
        log::trace!("Removed {} \"{}\" from index {}", E::KIND, stored.id(), index);

        self.outbox.push(Notification::EventRemoved {
            track: self.track,
            event: stored.to_any(),
        });
        true
    }

    fn change_event(&mut self, old: &E, new: &E) -> bool {
        if !old.is_same_event(new) {
            debug_assert!(false, "change from \"{}\" to a different id \"{}\"", old.id(), new.id());
            log::error!(
                "Refusing to change {} \"{}\" into a different id \"{}\"",
                E::KIND,
                old.id(),
                new.id()
            );
            return false;
        }

        let Some(index) = self.sequence.index_of_sorted(old) else {
            return false;
        };

        let mut stored = self.sequence.remove_at(index);
        let snapshot = stored.to_any();
        stored.apply_changes(new);
        let changed = stored.to_any();
        let new_index = self.sequence.insert_sorted(stored);
        log::trace!("Changed {} \"{}\", index {} -> {}", E::KIND, new.id(), index, new_index);

        self.outbox.push(Notification::EventChanged {
            track: self.track,
            old: snapshot,
            new: changed,
        });
        true
    }

    fn push_range_update(&mut self) {
        if self.sequence.update_beat_range() {
            self.outbox.push(Notification::BeatRangeChanged {
                track: self.track,
                range: self.sequence.beat_range(),
            });
        }
    }

    fn push_post_removal(&mut self) {
        self.outbox
            .push(Notification::EventRemovedPostAction { track: self.track });
    }

    fn push_reloaded(&mut self, previous: BeatRange) {
        self.outbox
            .push(Notification::SequenceReloaded { track: self.track });
        if self.sequence.beat_range() != previous {
            self.outbox.push(Notification::BeatRangeChanged {
                track: self.track,
                range: self.sequence.beat_range(),
            });
        }
    }
}
