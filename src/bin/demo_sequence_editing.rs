// Quick demonstration of undoable sequence editing
// Run with: RUST_LOG=debug cargo run --bin demo_sequence_editing

use sequence_engine::{
    AnyEvent, BeatRange, EventKind, Note, Project, SequenceEvent, SequenceListener,
    TimeSignatureEvent, TrackId,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Prints every notification it receives
struct PrintingListener;

impl SequenceListener for PrintingListener {
    fn on_event_added(&mut self, _track: TrackId, event: &AnyEvent) {
        println!("   + {} \"{}\" at beat {}", event.kind(), event.id(), event.beat());
    }

    fn on_event_removed(&mut self, _track: TrackId, event: &AnyEvent) {
        println!("   - {} \"{}\" at beat {}", event.kind(), event.id(), event.beat());
    }

    fn on_event_changed(&mut self, _track: TrackId, old: &AnyEvent, new: &AnyEvent) {
        println!("   ~ {} \"{}\" beat {} -> {}", new.kind(), new.id(), old.beat(), new.beat());
    }

    fn on_project_beat_range_changed(&mut self, range: BeatRange) {
        println!("   project range now {}..{}", range.first, range.last);
    }
}

fn print_meters(project: &Project, track: &TrackId) {
    if let Some(sequence) = project.sequence::<TimeSignatureEvent>(track) {
        let meters: Vec<String> = sequence.iter().map(|e| e.to_string()).collect();
        println!("   meters: [{}]", meters.join(", "));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("🎵 Sequence Engine - Undoable Editing Demo");
    println!("==========================================");

    let mut project = Project::new();
    project.add_listener(Rc::new(RefCell::new(PrintingListener)));

    let meters = project.add_track("Meter", EventKind::TimeSignature);
    let lead = project.add_track("Lead", EventKind::Note);

    println!("\n📝 Inserting time signatures:");
    let id = project.create_event_id::<TimeSignatureEvent>(&meters).ok_or("no meter track")?;
    let four_four = TimeSignatureEvent::new(id, 0.0, 4, 4);
    project.insert(&meters, &four_four);
    let id = project.create_event_id::<TimeSignatureEvent>(&meters).ok_or("no meter track")?;
    project.insert(&meters, &TimeSignatureEvent::new(id, 8.0, 3, 4));
    print_meters(&project, &meters);

    println!("\n🎹 Inserting a group of notes:");
    let mut notes = Vec::new();
    for (i, key) in [60u8, 64, 67, 72].into_iter().enumerate() {
        let id = project.create_event_id::<Note>(&lead).ok_or("no lead track")?;
        notes.push(Note::new(id, i as f32, key, 1.0, 0.8));
    }
    project.insert_group(&lead, &notes);

    println!("\n🖱️  Dragging a note (one gesture, three steps):");
    project.checkpoint();
    let mut current = notes[0].clone();
    for step in 1..=3 {
        let moved = current.with_beat(step as f32 * 0.5);
        project.change(&lead, &current, &moved);
        current = moved;
    }
    println!("   undo history: {} entries", project.undo_count());

    println!("\n🔁 Changing the first meter to 6/8:");
    project.change(&meters, &four_four, &four_four.with_meter(6, 8));
    print_meters(&project, &meters);

    println!("\n↩️  Undo:");
    while project.can_undo() {
        let description = project.undo()?;
        println!("   undid \"{}\"", description);
    }
    print_meters(&project, &meters);

    println!("\n↪️  Redo everything:");
    while project.can_redo() {
        let description = project.redo()?;
        println!("   redid \"{}\"", description);
    }

    let text = project.to_ron_string()?;
    println!("\n💾 Serialized project: {} bytes of RON", text.len());
    let restored = Project::from_ron_str(&text)?;
    println!(
        "📂 Restored {} tracks, {} undo entries, range {:?}",
        restored.track_count(),
        restored.undo_count(),
        restored.beat_range()
    );

    if let Some(sequence) = restored.sequence::<Note>(&lead) {
        println!("   {} notes, first at beat {}", sequence.len(), sequence.first_beat());
        println!("   {} MIDI messages on export", sequence.export_midi().len());
    }

    println!("\n✅ Done");
    Ok(())
}
