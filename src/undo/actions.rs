// Event actions - the six undoable edit shapes, generic over the event kind

use crate::event::{
    AnnotationEvent, Clip, EventKind, KeySignatureEvent, Note, SequenceEvent, TimeSignatureEvent,
};
use crate::project::{TrackArena, TrackId};
use crate::record::Record;
use crate::undo::UndoAction;
use std::any::Any;

const KIND_ATTRIBUTE: &str = "kind";
const TRACK_ATTRIBUTE: &str = "track";
const BEFORE_TAG: &str = "before";
const AFTER_TAG: &str = "after";

/// An undoable edit of one track's sequence
///
/// Removal and change actions store the event state found in the sequence,
/// so undo restores it exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction<E: SequenceEvent> {
    Insert { track: TrackId, event: E },
    Remove { track: TrackId, event: E },
    Change { track: TrackId, before: E, after: E },
    GroupInsert { track: TrackId, events: Vec<E> },
    GroupRemove { track: TrackId, events: Vec<E> },
    GroupChange { track: TrackId, before: Vec<E>, after: Vec<E> },
}

impl<E: SequenceEvent> EventAction<E> {
    pub fn track(&self) -> TrackId {
        match self {
            EventAction::Insert { track, .. }
            | EventAction::Remove { track, .. }
            | EventAction::Change { track, .. }
            | EventAction::GroupInsert { track, .. }
            | EventAction::GroupRemove { track, .. }
            | EventAction::GroupChange { track, .. } => *track,
        }
    }

    /// Record tag naming the shape
    fn shape_tag(&self) -> &'static str {
        match self {
            EventAction::Insert { .. } => "insert",
            EventAction::Remove { .. } => "remove",
            EventAction::Change { .. } => "change",
            EventAction::GroupInsert { .. } => "groupInsert",
            EventAction::GroupRemove { .. } => "groupRemove",
            EventAction::GroupChange { .. } => "groupChange",
        }
    }

    /// Apply this action forward (`forward == true`) or backward
    fn apply(&self, tracks: &mut TrackArena, forward: bool) -> bool {
        let Some(mut editor) = tracks.editor::<E>(&self.track()) else {
            log::warn!("{}: track {} not found", self.description(), self.track());
            return false;
        };

        match (self, forward) {
            (EventAction::Insert { event, .. }, true) | (EventAction::Remove { event, .. }, false) => {
                editor.insert(event)
            }
            (EventAction::Insert { event, .. }, false) | (EventAction::Remove { event, .. }, true) => {
                editor.remove(event)
            }
            (EventAction::Change { before, after, .. }, true) => editor.change(before, after),
            (EventAction::Change { before, after, .. }, false) => editor.change(after, before),
            (EventAction::GroupInsert { events, .. }, true)
            | (EventAction::GroupRemove { events, .. }, false) => editor.insert_group(events),
            (EventAction::GroupInsert { events, .. }, false)
            | (EventAction::GroupRemove { events, .. }, true) => editor.remove_group(events),
            (EventAction::GroupChange { before, after, .. }, true) => {
                editor.change_group(before, after)
            }
            (EventAction::GroupChange { before, after, .. }, false) => {
                editor.change_group(after, before)
            }
        }
    }

    /// Read an action of this event kind; None if the record is malformed
    pub fn deserialize(record: &Record) -> Option<Self> {
        let track = match record.attribute(TRACK_ATTRIBUTE).map(str::parse::<TrackId>) {
            Some(Ok(track)) => track,
            _ => {
                log::warn!("Skipping <{}> action without a valid track", record.tag);
                return None;
            }
        };

        let single = || read_events::<E>(record).into_iter().next();
        let pair = |tag: &str| record.child(tag).map(read_events::<E>).unwrap_or_default();

        let action = match record.tag.as_str() {
            "insert" => EventAction::Insert { track, event: single()? },
            "remove" => EventAction::Remove { track, event: single()? },
            "change" => {
                let before = pair(BEFORE_TAG).into_iter().next()?;
                let after = pair(AFTER_TAG).into_iter().next()?;
                EventAction::Change { track, before, after }
            }
            "groupInsert" => EventAction::GroupInsert { track, events: read_events(record) },
            "groupRemove" => EventAction::GroupRemove { track, events: read_events(record) },
            "groupChange" => {
                let before = pair(BEFORE_TAG);
                let after = pair(AFTER_TAG);
                if before.len() != after.len() {
                    log::warn!("Skipping group change with mismatched state lists");
                    return None;
                }
                EventAction::GroupChange { track, before, after }
            }
            other => {
                log::warn!("Unknown action shape <{}>", other);
                return None;
            }
        };
        Some(action)
    }
}

/// Events of kind `E` among the direct children of `record`; events
/// without an id are skipped
fn read_events<E: SequenceEvent>(record: &Record) -> Vec<E> {
    record
        .children_with_tag(E::KIND.record_tag())
        .filter_map(|child| {
            let mut event = E::blank();
            event.deserialize(child);
            if event.id().is_empty() {
                log::warn!("Skipping {} without id in undo history", E::KIND);
                None
            } else {
                Some(event)
            }
        })
        .collect()
}

fn events_record<E: SequenceEvent>(tag: &str, events: &[E]) -> Record {
    let mut record = Record::new(tag);
    record.children = events.iter().map(|e| e.serialize()).collect();
    record
}

fn plural(kind: EventKind, count: usize) -> String {
    format!("{} {}s", count, kind.display_name())
}

fn same_ids<E: SequenceEvent>(a: &[E], b: &[E]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_same_event(y))
}

impl<E: SequenceEvent> UndoAction for EventAction<E> {
    fn perform(&mut self, tracks: &mut TrackArena) -> bool {
        self.apply(tracks, true)
    }

    fn undo(&mut self, tracks: &mut TrackArena) -> bool {
        self.apply(tracks, false)
    }

    fn size_in_units(&self) -> usize {
        match self {
            EventAction::Insert { .. } | EventAction::Remove { .. } => 1,
            EventAction::Change { .. } => 2,
            EventAction::GroupInsert { events, .. } | EventAction::GroupRemove { events, .. } => {
                events.len().max(1)
            }
            EventAction::GroupChange { before, after, .. } => (before.len() + after.len()).max(1),
        }
    }

    fn description(&self) -> String {
        let kind = E::KIND;
        match self {
            EventAction::Insert { .. } => format!("Insert {}", kind),
            EventAction::Remove { .. } => format!("Remove {}", kind),
            EventAction::Change { .. } => format!("Change {}", kind),
            EventAction::GroupInsert { events, .. } => format!("Insert {}", plural(kind, events.len())),
            EventAction::GroupRemove { events, .. } => format!("Remove {}", plural(kind, events.len())),
            EventAction::GroupChange { before, .. } => format!("Change {}", plural(kind, before.len())),
        }
    }

    fn create_coalesced_action(&self, next: &dyn UndoAction) -> Option<Box<dyn UndoAction>> {
        let next = next.as_any().downcast_ref::<EventAction<E>>()?;
        if self.track() != next.track() {
            return None;
        }

        match (self, next) {
            (
                EventAction::Change { track, before, after },
                EventAction::Change { before: next_before, after: next_after, .. },
            ) if after.is_same_event(next_before) => Some(Box::new(EventAction::Change {
                track: *track,
                before: before.clone(),
                after: next_after.clone(),
            })),
            (
                EventAction::GroupChange { track, before, after },
                EventAction::GroupChange { before: next_before, after: next_after, .. },
            ) if same_ids(after, next_before) => Some(Box::new(EventAction::GroupChange {
                track: *track,
                before: before.clone(),
                after: next_after.clone(),
            })),
            _ => None,
        }
    }

    fn serialize(&self) -> Record {
        let mut record = Record::new(self.shape_tag())
            .with_attribute(KIND_ATTRIBUTE, E::KIND.record_tag())
            .with_attribute(TRACK_ATTRIBUTE, self.track());

        match self {
            EventAction::Insert { event, .. } | EventAction::Remove { event, .. } => {
                record.add_child(event.serialize());
            }
            EventAction::Change { before, after, .. } => {
                record.add_child(events_record(BEFORE_TAG, std::slice::from_ref(before)));
                record.add_child(events_record(AFTER_TAG, std::slice::from_ref(after)));
            }
            EventAction::GroupInsert { events, .. } | EventAction::GroupRemove { events, .. } => {
                record.children = events.iter().map(|e| e.serialize()).collect();
            }
            EventAction::GroupChange { before, after, .. } => {
                record.add_child(events_record(BEFORE_TAG, before));
                record.add_child(events_record(AFTER_TAG, after));
            }
        }
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rebuild a persisted action of any event kind
pub fn deserialize_action(record: &Record) -> Option<Box<dyn UndoAction>> {
    let Some(kind) = record
        .attribute(KIND_ATTRIBUTE)
        .and_then(EventKind::from_record_tag)
    else {
        log::warn!("Skipping <{}> action of unknown event kind", record.tag);
        return None;
    };

    fn boxed<E: SequenceEvent>(record: &Record) -> Option<Box<dyn UndoAction>> {
        EventAction::<E>::deserialize(record).map(|a| Box::new(a) as Box<dyn UndoAction>)
    }

    match kind {
        EventKind::TimeSignature => boxed::<TimeSignatureEvent>(record),
        EventKind::KeySignature => boxed::<KeySignatureEvent>(record),
        EventKind::Clip => boxed::<Clip>(record),
        EventKind::Note => boxed::<Note>(record),
        EventKind::Annotation => boxed::<AnnotationEvent>(record),
    }
}
