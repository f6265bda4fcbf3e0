// Shared helpers for integration tests

#![allow(dead_code)]

use sequence_engine::{EventKind, Note, Project, TimeSignatureEvent, TrackId};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn project_with_track(kind: EventKind) -> (Project, TrackId) {
    init_logging();
    let mut project = Project::new();
    let track = project.add_track("Test", kind);
    (project, track)
}

pub fn meter(project: &mut Project, track: &TrackId, beat: f32, numerator: u8, denominator: u8) -> TimeSignatureEvent {
    let id = project
        .create_event_id::<TimeSignatureEvent>(track)
        .expect("time signature track");
    TimeSignatureEvent::new(id, beat, numerator, denominator)
}

pub fn note(project: &mut Project, track: &TrackId, beat: f32, key: u8) -> Note {
    let id = project.create_event_id::<Note>(track).expect("note track");
    Note::new(id, beat, key, 1.0, 0.8)
}

/// (id, beat, numerator, denominator) of every meter, in iteration order
pub fn meter_tuples(project: &Project, track: &TrackId) -> Vec<(String, f32, u8, u8)> {
    project
        .sequence::<TimeSignatureEvent>(track)
        .expect("time signature track")
        .iter()
        .map(|e| {
            use sequence_engine::SequenceEvent;
            (e.id().to_string(), e.beat(), e.numerator(), e.denominator())
        })
        .collect()
}
