// Change notifications from sequences to their listeners
//
// Sequences never call listeners directly. Every edit appends messages to an
// outbox in the order they happen, and the project delivers the outbox once
// the whole operation (including every member of a group edit) has finished.
//
// Ordering within one operation:
// - per-event messages (added / removed / changed) in member order,
//   a removal message always carries the event as it was before removal
// - at most one BeatRangeChanged per touched track, only if its range moved
// - exactly one EventRemovedPostAction after a single or group removal
// - at most one ProjectBeatRangeChanged, last

use crate::event::AnyEvent;
use crate::project::TrackId;
use crate::sequence::BeatRange;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    EventAdded {
        track: TrackId,
        event: AnyEvent,
    },
    EventRemoved {
        track: TrackId,
        event: AnyEvent,
    },
    EventRemovedPostAction {
        track: TrackId,
    },
    EventChanged {
        track: TrackId,
        old: AnyEvent,
        new: AnyEvent,
    },
    BeatRangeChanged {
        track: TrackId,
        range: BeatRange,
    },
    /// The whole content of a sequence was replaced (import, load, reset)
    SequenceReloaded {
        track: TrackId,
    },
    ProjectBeatRangeChanged {
        range: BeatRange,
    },
}

impl Notification {
    /// Call the matching listener method
    pub fn dispatch(&self, listener: &mut dyn SequenceListener) {
        match self {
            Notification::EventAdded { track, event } => listener.on_event_added(*track, event),
            Notification::EventRemoved { track, event } => {
                listener.on_event_removed(*track, event)
            }
            Notification::EventRemovedPostAction { track } => {
                listener.on_event_removed_post_action(*track)
            }
            Notification::EventChanged { track, old, new } => {
                listener.on_event_changed(*track, old, new)
            }
            Notification::BeatRangeChanged { track, range } => {
                listener.on_beat_range_changed(*track, *range)
            }
            Notification::SequenceReloaded { track } => listener.on_sequence_reloaded(*track),
            Notification::ProjectBeatRangeChanged { range } => {
                listener.on_project_beat_range_changed(*range)
            }
        }
    }

    /// Whether this message can move a track's beat range
    pub fn affects_beat_range(&self) -> bool {
        matches!(
            self,
            Notification::BeatRangeChanged { .. } | Notification::SequenceReloaded { .. }
        )
    }
}

/// Observer of sequence changes (roll views, minimaps, project aggregators)
///
/// Every method has an empty default so listeners implement only what they
/// care about.
pub trait SequenceListener {
    fn on_event_added(&mut self, _track: TrackId, _event: &AnyEvent) {}

    fn on_event_removed(&mut self, _track: TrackId, _event: &AnyEvent) {}

    /// Called once after a removal, or after a whole group removal
    fn on_event_removed_post_action(&mut self, _track: TrackId) {}

    fn on_event_changed(&mut self, _track: TrackId, _old: &AnyEvent, _new: &AnyEvent) {}

    fn on_beat_range_changed(&mut self, _track: TrackId, _range: BeatRange) {}

    fn on_sequence_reloaded(&mut self, _track: TrackId) {}

    fn on_project_beat_range_changed(&mut self, _range: BeatRange) {}
}

/// Shared handle to a listener; the model runs on a single thread
pub type ListenerHandle = Rc<RefCell<dyn SequenceListener>>;

/// Registered listeners, in registration order
#[derive(Default)]
pub struct Dispatcher {
    listeners: Vec<ListenerHandle>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: ListenerHandle) {
        if !self.listeners.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            self.listeners.push(listener);
        }
    }

    /// Returns false if the listener was not registered
    pub fn remove_listener(&mut self, listener: &ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Rc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver and consume every pending notification, oldest first
    pub fn deliver(&self, pending: &mut Vec<Notification>) {
        for notification in pending.drain(..) {
            for listener in &self.listeners {
                notification.dispatch(&mut *listener.borrow_mut());
            }
        }
    }
}
