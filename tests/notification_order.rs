// Integration tests for listener notification ordering

mod common;

use common::{meter, note, project_with_track};
use sequence_engine::{
    AnyEvent, BeatRange, EventKind, ListenerHandle, Note, SequenceEvent, SequenceListener,
    TimeSignatureEvent, TrackId,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Added(String),
    Removed(String),
    PostAction,
    Changed(String, f32, f32),
    Range(f32, f32),
    Reloaded,
    Project(f32, f32),
}

#[derive(Default)]
struct Recorder {
    seen: Vec<Seen>,
}

impl SequenceListener for Recorder {
    fn on_event_added(&mut self, _track: TrackId, event: &AnyEvent) {
        self.seen.push(Seen::Added(event.id().to_string()));
    }

    fn on_event_removed(&mut self, _track: TrackId, event: &AnyEvent) {
        self.seen.push(Seen::Removed(event.id().to_string()));
    }

    fn on_event_removed_post_action(&mut self, _track: TrackId) {
        self.seen.push(Seen::PostAction);
    }

    fn on_event_changed(&mut self, _track: TrackId, old: &AnyEvent, new: &AnyEvent) {
        self.seen
            .push(Seen::Changed(new.id().to_string(), old.beat(), new.beat()));
    }

    fn on_beat_range_changed(&mut self, _track: TrackId, range: BeatRange) {
        self.seen.push(Seen::Range(range.first, range.last));
    }

    fn on_sequence_reloaded(&mut self, _track: TrackId) {
        self.seen.push(Seen::Reloaded);
    }

    fn on_project_beat_range_changed(&mut self, range: BeatRange) {
        self.seen.push(Seen::Project(range.first, range.last));
    }
}

fn attach(project: &mut sequence_engine::Project) -> Rc<RefCell<Recorder>> {
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    project.add_listener(recorder.clone());
    recorder
}

fn take(recorder: &Rc<RefCell<Recorder>>) -> Vec<Seen> {
    std::mem::take(&mut recorder.borrow_mut().seen)
}

#[test]
fn test_single_edits() {
    let (mut project, track) = project_with_track(EventKind::Note);
    let recorder = attach(&mut project);

    let a = note(&mut project, &track, 2.0, 60);
    project.insert(&track, &a);
    assert_eq!(
        take(&recorder),
        vec![Seen::Added(a.id().to_string()), Seen::Range(2.0, 3.0), Seen::Project(2.0, 3.0)]
    );

    let moved = a.with_beat(4.0);
    project.change(&track, &a, &moved);
    assert_eq!(
        take(&recorder),
        vec![
            Seen::Changed(a.id().to_string(), 2.0, 4.0),
            Seen::Range(4.0, 5.0),
            Seen::Project(4.0, 5.0),
        ]
    );

    project.remove(&track, &moved);
    assert_eq!(
        take(&recorder),
        vec![
            Seen::Removed(a.id().to_string()),
            Seen::Range(0.0, 0.0),
            Seen::PostAction,
            Seen::Project(0.0, 0.0),
        ]
    );
}

#[test]
fn test_group_insert_batches_range_update() {
    let (mut project, track) = project_with_track(EventKind::TimeSignature);
    let recorder = attach(&mut project);

    let events: Vec<TimeSignatureEvent> =
        (1..=4).map(|i| meter(&mut project, &track, i as f32 * 2.0, 4, 4)).collect();
    project.insert_group(&track, &events);

    let mut expected: Vec<Seen> = events.iter().map(|e| Seen::Added(e.id().to_string())).collect();
    expected.push(Seen::Range(2.0, 8.0));
    expected.push(Seen::Project(2.0, 8.0));
    assert_eq!(take(&recorder), expected);
}

#[test]
fn test_undo_of_group_insert_notifies_like_group_remove() {
    let (mut project, track) = project_with_track(EventKind::TimeSignature);
    let events: Vec<TimeSignatureEvent> =
        (0..3).map(|i| meter(&mut project, &track, i as f32, 4, 4)).collect();
    project.insert_group(&track, &events);

    let recorder = attach(&mut project);
    project.undo().unwrap();

    let seen = take(&recorder);
    let removed = seen.iter().filter(|s| matches!(s, Seen::Removed(_))).count();
    let post = seen.iter().filter(|s| **s == Seen::PostAction).count();
    let ranges = seen.iter().filter(|s| matches!(s, Seen::Range(..))).count();
    assert_eq!((removed, post, ranges), (3, 1, 1));
    assert_eq!(seen.last(), Some(&Seen::Project(0.0, 0.0)));
}

#[test]
fn test_listener_sees_final_state_after_group_change() {
    // A listener that queries the sequence from a callback would observe
    // the finished batch; here the recorded range is the final one
    let (mut project, track) = project_with_track(EventKind::Note);
    let notes: Vec<Note> = (0..4).map(|i| note(&mut project, &track, i as f32, 60)).collect();
    project.insert_group(&track, &notes);

    let recorder = attach(&mut project);
    let shifted: Vec<Note> = notes.iter().map(|n| n.with_delta_beat(8.0)).collect();
    project.change_group(&track, &notes, &shifted);

    let seen = take(&recorder);
    let changed = seen.iter().filter(|s| matches!(s, Seen::Changed(..))).count();
    assert_eq!(changed, 4);
    assert_eq!(&seen[4..], &[Seen::Range(8.0, 12.0), Seen::Project(8.0, 12.0)]);
}

#[test]
fn test_failed_edits_are_silent() {
    let (mut project, track) = project_with_track(EventKind::TimeSignature);
    let recorder = attach(&mut project);
    let ghost = meter(&mut project, &track, 1.0, 4, 4);

    assert!(!project.remove(&track, &ghost));
    assert!(!project.change(&track, &ghost, &ghost.with_meter(3, 4)));
    assert!(take(&recorder).is_empty());
}

#[test]
fn test_reload_and_removed_listener() {
    let (mut project, track) = project_with_track(EventKind::TimeSignature);
    let event = meter(&mut project, &track, 4.0, 4, 4);
    project.insert(&track, &event);

    let recorder = attach(&mut project);
    let text = project.to_ron_string().unwrap();
    project.load_ron(&text).unwrap();
    assert_eq!(take(&recorder), vec![Seen::Reloaded]);

    project.edit::<TimeSignatureEvent, _, _>(&track, |editor| editor.reset());
    assert_eq!(
        take(&recorder),
        vec![Seen::Reloaded, Seen::Range(0.0, 0.0), Seen::Project(0.0, 0.0)]
    );

    let handle: ListenerHandle = recorder.clone();
    assert!(project.remove_listener(&handle));
    project.insert(&track, &event);
    assert!(take(&recorder).is_empty());
}
