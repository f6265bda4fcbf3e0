// Sequence container
//
// An ordered store of events of one kind, sorted by beat. Equal beats keep
// their insertion order. The container also tracks which ids are in use,
// the covered beat range, and a lazily built MIDI export.
//
// Edits that listeners must hear about go through `SequenceEditor`; the
// methods here that mutate are load-time operations (deserialize, import,
// reset) or crate-internal primitives.

pub mod any;
pub mod editor;

pub use any::AnySequence;
pub use editor::SequenceEditor;

use crate::event::{EventId, SequenceEvent};
use crate::midi::{MidiMessage, TimedMidiMessage, sort_by_timestamp};
use crate::record::Record;
use rand::Rng;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::HashSet;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INITIAL_ID_LENGTH: usize = 2;
const ID_ATTEMPTS_PER_LENGTH: usize = 32;

/// First and last beat covered by a sequence; both 0 when it is empty
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatRange {
    pub first: f32,
    pub last: f32,
}

impl BeatRange {
    pub fn new(first: f32, last: f32) -> Self {
        Self { first, last }
    }

    pub fn length(&self) -> f32 {
        self.last - self.first
    }

    /// Smallest range covering both
    pub fn union(&self, other: &BeatRange) -> BeatRange {
        BeatRange::new(self.first.min(other.first), self.last.max(other.last))
    }
}

/// Sorted events of one kind for one track
#[derive(Debug, Clone)]
pub struct MidiSequence<E: SequenceEvent> {
    events: Vec<E>,

    /// Ids of the events currently stored
    used_ids: HashSet<EventId>,

    /// Ids reserved outside `used_ids` until `reset`: handed out but not yet
    /// stored, or removed while an undo step may still restore them
    issued_ids: HashSet<EventId>,

    beat_range: BeatRange,

    export_cache: OnceCell<Vec<TimedMidiMessage>>,
}

impl<E: SequenceEvent> Default for MidiSequence<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: SequenceEvent> MidiSequence<E> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            used_ids: HashSet::new(),
            issued_ids: HashSet::new(),
            beat_range: BeatRange::default(),
            export_cache: OnceCell::new(),
        }
    }

    //===------------------------------------------------------------------===//
    // Queries
    //===------------------------------------------------------------------===//

    /// All events, sorted by beat
    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.events.get(index)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.used_ids.contains(id)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&E> {
        self.events.iter().find(|e| e.id() == id)
    }

    /// Events starting in `[start, end)`
    pub fn events_in_range(&self, start: f32, end: f32) -> &[E] {
        let from = self.events.partition_point(|e| e.beat() < start);
        let to = self.events.partition_point(|e| e.beat() < end).max(from);
        &self.events[from..to]
    }

    pub fn beat_range(&self) -> BeatRange {
        self.beat_range
    }

    pub fn first_beat(&self) -> f32 {
        self.beat_range.first
    }

    pub fn last_beat(&self) -> f32 {
        self.beat_range.last
    }

    /// Index of the stored event with the same id as `event`, searched
    /// among the stored events at `event`'s beat
    pub fn index_of_sorted(&self, event: &E) -> Option<usize> {
        let lower = self
            .events
            .partition_point(|e| e.compare_beats(event) == Ordering::Less);
        let upper = self
            .events
            .partition_point(|e| e.compare_beats(event) != Ordering::Greater);
        (lower..upper).find(|&i| self.events[i].is_same_event(event))
    }

    //===------------------------------------------------------------------===//
    // Ids
    //===------------------------------------------------------------------===//

    /// Generate an id not used by, or previously handed out for, this sequence
    pub fn create_unique_event_id(&mut self) -> EventId {
        let mut rng = rand::thread_rng();
        let mut length = INITIAL_ID_LENGTH;

        loop {
            for _ in 0..ID_ATTEMPTS_PER_LENGTH {
                let id: EventId = (0..length)
                    .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
                    .collect();
                if !self.used_ids.contains(&id) && !self.issued_ids.contains(&id) {
                    self.issued_ids.insert(id.clone());
                    return id;
                }
            }
            length += 1;
        }
    }

    //===------------------------------------------------------------------===//
    // Primitives used by SequenceEditor
    //===------------------------------------------------------------------===//

    /// Insert after every stored event with the same beat; returns the index
    pub(crate) fn insert_sorted(&mut self, event: E) -> usize {
        let index = self
            .events
            .partition_point(|e| e.compare_beats(&event) != Ordering::Greater);
        self.register_id(event.id());
        self.events.insert(index, event);
        self.export_cache.take();
        index
    }

    fn register_id(&mut self, id: &str) {
        let id = self.issued_ids.take(id).unwrap_or_else(|| id.to_string());
        self.used_ids.insert(id);
    }

    /// Append without ordering or duplicate checks; callers `sort` afterwards
    pub(crate) fn push_unchecked(&mut self, event: E) {
        self.register_id(event.id());
        self.events.push(event);
        self.export_cache.take();
    }

    /// Stable sort by beat: equal beats keep their current order
    pub(crate) fn sort(&mut self) {
        self.events.sort_by(|a, b| a.compare_beats(b));
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> E {
        let removed = self.events.remove(index);
        if let Some(id) = self.used_ids.take(removed.id()) {
            self.issued_ids.insert(id);
        }
        self.export_cache.take();
        removed
    }

    /// Recompute the cached range; returns whether it changed
    pub(crate) fn update_beat_range(&mut self) -> bool {
        let range = match self.events.first() {
            Some(first) => BeatRange::new(
                first.beat(),
                self.events
                    .iter()
                    .map(|e| e.end_beat())
                    .fold(f32::MIN, f32::max),
            ),
            None => BeatRange::default(),
        };
        let changed = range != self.beat_range;
        self.beat_range = range;
        changed
    }

    //===------------------------------------------------------------------===//
    // Load-time operations
    //===------------------------------------------------------------------===//

    /// Empty the sequence without touching anything else
    pub fn reset(&mut self) {
        self.events.clear();
        self.used_ids.clear();
        self.issued_ids.clear();
        self.beat_range = BeatRange::default();
        self.export_cache.take();
    }

    /// Add events without sorting; duplicates of stored ids are dropped.
    /// Callers must `sort` afterwards.
    fn push_unsorted(&mut self, event: E) -> bool {
        if self.used_ids.contains(event.id()) {
            log::warn!(
                "Dropping {} with duplicate id \"{}\" at beat {}",
                E::KIND,
                event.id(),
                event.beat()
            );
            return false;
        }
        self.push_unchecked(event);
        true
    }

    /// Replace the content with events decoded from an external MIDI stream
    pub fn import_midi(&mut self, messages: &[TimedMidiMessage]) {
        self.reset();

        let imported = E::import_midi(messages, &mut || self.create_unique_event_id());
        for event in imported {
            self.push_unsorted(event);
        }

        self.sort();
        self.update_beat_range();
        log::debug!("Imported {} {} events", self.events.len(), E::KIND);
    }

    /// Emit one root record holding every event. Children come out in
    /// reverse beat order; readers must not rely on the order.
    pub fn serialize(&self) -> Record {
        let mut root = Record::new(E::KIND.sequence_tag());
        root.children = self.events.iter().rev().map(|e| e.serialize()).collect();
        root
    }

    /// Replace the content with the events under the sequence root found in
    /// `record` (the record itself or its direct child). A missing root
    /// leaves the sequence empty.
    pub fn deserialize(&mut self, record: &Record) {
        self.reset();

        let Some(root) = record.find_root(E::KIND.sequence_tag()) else {
            log::debug!("No <{}> root, {} sequence left empty", E::KIND.sequence_tag(), E::KIND);
            return;
        };

        let mut first_beat = f32::MAX;
        let mut last_beat = f32::MIN;

        for child in root.children_with_tag(E::KIND.record_tag()) {
            let mut event = E::blank();
            event.deserialize(child);
            if event.id().is_empty() {
                event.set_id(self.create_unique_event_id());
            }

            let (beat, end_beat) = (event.beat(), event.end_beat());
            if self.push_unsorted(event) {
                first_beat = first_beat.min(beat);
                last_beat = last_beat.max(end_beat);
            }
        }

        self.sort();
        self.beat_range = if self.events.is_empty() {
            BeatRange::default()
        } else {
            BeatRange::new(first_beat, last_beat)
        };
    }

    //===------------------------------------------------------------------===//
    // Derived data
    //===------------------------------------------------------------------===//

    /// MIDI rendering of the whole sequence, rebuilt after any change
    pub fn export_midi(&self) -> &[TimedMidiMessage] {
        self.export_cache.get_or_init(|| {
            let mut messages = Vec::with_capacity(self.events.len());
            for event in &self.events {
                event.export_midi(&mut messages);
            }
            sort_by_timestamp(&mut messages);
            messages
        })
    }

    /// Number of note-on messages in the export, handy for playback stats
    pub fn exported_note_count(&self) -> usize {
        self.export_midi()
            .iter()
            .filter(|m| matches!(m.message, MidiMessage::NoteOn { .. }))
            .count()
    }
}

impl<'a, E: SequenceEvent> IntoIterator for &'a MidiSequence<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Note, TimeSignatureEvent};
    use rand::seq::SliceRandom;

    fn signature(seq: &mut MidiSequence<TimeSignatureEvent>, beat: f32, n: u8) -> TimeSignatureEvent {
        TimeSignatureEvent::new(seq.create_unique_event_id(), beat, n, 4)
    }

    #[test]
    fn test_insert_keeps_beat_order_and_insertion_order_for_ties() {
        let mut seq = MidiSequence::new();
        let a = signature(&mut seq, 8.0, 3);
        let b = signature(&mut seq, 0.0, 4);
        let c = signature(&mut seq, 8.0, 5);

        seq.insert_sorted(a.clone());
        seq.insert_sorted(b.clone());
        seq.insert_sorted(c.clone());

        let order: Vec<&str> = seq.iter().map(|e| e.id()).collect();
        assert_eq!(order, vec![b.id(), a.id(), c.id()]);
    }

    #[test]
    fn test_nudge_below_zero_ties_with_zero() {
        let mut seq = MidiSequence::new();
        let first = signature(&mut seq, 0.0, 4);
        let nudged = signature(&mut seq, -0.01, 3);

        seq.insert_sorted(first.clone());
        seq.insert_sorted(nudged.clone());

        let order: Vec<&str> = seq.iter().map(|e| e.id()).collect();
        assert_eq!(order, vec![first.id(), nudged.id()]);
        assert_eq!(seq.index_of_sorted(&nudged.with_beat(0.0)), Some(1));
    }

    #[test]
    fn test_index_of_sorted_matches_by_id() {
        let mut seq = MidiSequence::new();
        let a = signature(&mut seq, 4.0, 3);
        let b = signature(&mut seq, 4.0, 5);
        seq.insert_sorted(a.clone());
        seq.insert_sorted(b.clone());

        // Payload differs but the id matches
        assert_eq!(seq.index_of_sorted(&b.with_meter(7, 8)), Some(1));
        assert_eq!(seq.index_of_sorted(&a), Some(0));

        // Stale beat is not found
        assert_eq!(seq.index_of_sorted(&a.with_beat(5.0)), None);
    }

    #[test]
    fn test_unique_ids() {
        let mut seq = MidiSequence::<TimeSignatureEvent>::new();
        let ids: HashSet<EventId> = (0..2000).map(|_| seq.create_unique_event_id()).collect();
        assert_eq!(ids.len(), 2000);
    }

    #[test]
    fn test_stored_ids_leave_the_reservation_until_removed() {
        let mut seq = MidiSequence::new();
        let a = signature(&mut seq, 0.0, 4);
        let b = signature(&mut seq, 1.0, 3);
        assert_eq!(seq.issued_ids.len(), 2);

        seq.insert_sorted(a.clone());
        seq.insert_sorted(b.clone());
        assert!(seq.issued_ids.is_empty());
        assert_eq!(seq.used_ids.len(), 2);

        let index = seq.index_of_sorted(&a).unwrap();
        seq.remove_at(index);
        assert!(!seq.contains_id(a.id()));
        assert!(seq.issued_ids.contains(a.id()));

        seq.reset();
        assert!(seq.issued_ids.is_empty());
    }

    #[test]
    fn test_beat_range_uses_end_beat() {
        let mut seq = MidiSequence::<Note>::new();
        let long = Note::new(seq.create_unique_event_id(), 1.0, 60, 10.0, 0.5);
        let late = Note::new(seq.create_unique_event_id(), 4.0, 62, 1.0, 0.5);
        seq.insert_sorted(long);
        seq.insert_sorted(late);

        assert!(seq.update_beat_range());
        assert_eq!(seq.beat_range(), BeatRange::new(1.0, 11.0));
        assert!(!seq.update_beat_range());
    }

    #[test]
    fn test_sort_invariant_on_random_inserts() {
        let mut rng = rand::thread_rng();
        let mut beats: Vec<f32> = (0..200).map(|i| (i % 37) as f32 * 0.25).collect();
        beats.shuffle(&mut rng);

        let mut seq = MidiSequence::new();
        for beat in beats {
            let e = signature(&mut seq, beat, 4);
            seq.insert_sorted(e);
        }
        for _ in 0..50 {
            let index = rng.gen_range(0..seq.len());
            seq.remove_at(index);
        }

        assert!(seq.events().windows(2).all(|w| w[0].beat() <= w[1].beat()));
        assert_eq!(seq.used_ids.len(), seq.len());
    }

    #[test]
    fn test_events_in_range() {
        let mut seq = MidiSequence::new();
        for beat in [0.0, 1.0, 2.0, 3.0] {
            let e = signature(&mut seq, beat, 4);
            seq.insert_sorted(e);
        }
        let slice = seq.events_in_range(1.0, 3.0);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].beat(), 1.0);
        assert!(seq.events_in_range(5.0, 1.0).is_empty());
    }

    #[test]
    fn test_serialize_round_trip_ignores_child_order() {
        let mut seq = MidiSequence::new();
        for (beat, n) in [(0.0, 4), (8.0, 3), (8.0, 5), (16.0, 7)] {
            let e = signature(&mut seq, beat, n);
            seq.insert_sorted(e);
        }
        seq.update_beat_range();

        let mut record = seq.serialize();
        assert_eq!(record.tag, "timeSignatures");
        record.children.reverse();

        let mut restored = MidiSequence::<TimeSignatureEvent>::new();
        restored.deserialize(&record);

        assert_eq!(restored.len(), 4);
        assert_eq!(restored.beat_range(), BeatRange::new(0.0, 16.0));
        for event in seq.iter() {
            assert_eq!(restored.find_by_id(event.id()), Some(event));
        }
        assert!(restored.events().windows(2).all(|w| w[0].beat() <= w[1].beat()));
    }

    #[test]
    fn test_deserialize_missing_root_yields_empty() {
        let mut seq = MidiSequence::<TimeSignatureEvent>::new();
        let e = signature(&mut seq, 1.0, 4);
        seq.insert_sorted(e);

        seq.deserialize(&Record::new("somethingElse"));
        assert!(seq.is_empty());
        assert_eq!(seq.beat_range(), BeatRange::default());
    }

    #[test]
    fn test_deserialize_drops_duplicate_ids() {
        let record = Record::new("timeSignatures")
            .with_child(Record::new("timeSignature").with_attribute("id", "a").with_attribute("start", 0))
            .with_child(Record::new("timeSignature").with_attribute("id", "a").with_attribute("start", 4))
            .with_child(Record::new("timeSignature").with_attribute("start", 2));

        let mut seq = MidiSequence::<TimeSignatureEvent>::new();
        seq.deserialize(&record);

        assert_eq!(seq.len(), 2);
        assert_eq!(seq.find_by_id("a").map(|e| e.beat()), Some(0.0));
        assert!(seq.iter().all(|e| !e.id().is_empty()));
    }

    #[test]
    fn test_export_cache_is_invalidated() {
        let mut seq = MidiSequence::<Note>::new();
        let note = Note::new(seq.create_unique_event_id(), 0.0, 60, 1.0, 1.0);
        seq.insert_sorted(note);
        assert_eq!(seq.exported_note_count(), 1);

        let other = Note::new(seq.create_unique_event_id(), 2.0, 64, 1.0, 1.0);
        seq.insert_sorted(other);
        assert_eq!(seq.exported_note_count(), 2);
        assert_eq!(seq.export_midi().len(), 4);

        seq.remove_at(0);
        assert_eq!(seq.exported_note_count(), 1);
    }
}
