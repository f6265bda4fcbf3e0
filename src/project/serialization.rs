// Project persistence
//
// A project saves as one `project` record: a `track` child per track
// (attributes `id` and `name`, the sequence root as its only child) and,
// when enabled, the undo history.

use crate::error::{EngineError, EngineResult};
use crate::event::EventKind;
use crate::notify::Notification;
use crate::project::{Project, Track, TrackArena, TrackId};
use crate::record::Record;
use crate::sequence::AnySequence;

const PROJECT_TAG: &str = "project";
const TRACK_TAG: &str = "track";

impl Project {
    pub fn serialize(&self) -> Record {
        let mut root = Record::new(PROJECT_TAG);

        for track in self.tracks.iter() {
            root.add_child(
                Record::new(TRACK_TAG)
                    .with_attribute("id", track.id())
                    .with_attribute("name", &track.name)
                    .with_child(track.sequence.serialize()),
            );
        }

        if self.config.undo.persist_history {
            root.add_child(self.undo_stack.serialize());
        }
        root
    }

    /// Replace tracks (and, if persisted, undo history) with the content of
    /// `record`. Listeners get one reload notification per loaded track.
    ///
    /// # Errors
    /// Fails without touching the project if the root or a track id is
    /// missing or unreadable. Tracks without a sequence are skipped.
    pub fn deserialize(&mut self, record: &Record) -> EngineResult<()> {
        let root = record.find_root(PROJECT_TAG).ok_or_else(|| {
            EngineError::InvalidStructure(format!("Missing <{}> root", PROJECT_TAG))
        })?;

        let mut tracks = TrackArena::new();
        for track_record in root.children_with_tag(TRACK_TAG) {
            let Some(track) = read_track(track_record)? else {
                continue;
            };
            tracks.push_notification(Notification::SequenceReloaded { track: track.id() });
            tracks.insert(track);
        }

        // Pending notifications of the replaced arena are dropped with it
        self.tracks = tracks;
        self.undo_stack.clear();
        if self.config.undo.persist_history {
            self.undo_stack.deserialize(root);
        }

        log::debug!(
            "Loaded project: {} tracks, {} undo entries",
            self.tracks.len(),
            self.undo_stack.undo_count()
        );
        self.flush_notifications();
        Ok(())
    }

    /// Serialize to RON text
    pub fn to_ron_string(&self) -> EngineResult<String> {
        self.serialize().to_ron_string()
    }

    /// Load from RON text, replacing the current content
    pub fn load_ron(&mut self, ron_data: &str) -> EngineResult<()> {
        self.deserialize(&Record::from_ron_str(ron_data)?)
    }

    /// Build a project with default configuration from RON text
    pub fn from_ron_str(ron_data: &str) -> EngineResult<Self> {
        let mut project = Project::new();
        project.load_ron(ron_data)?;
        Ok(project)
    }
}

/// `Ok(None)` for a track without a sequence, which is skipped
fn read_track(record: &Record) -> EngineResult<Option<Track>> {
    let raw_id = record
        .attribute("id")
        .ok_or_else(|| EngineError::InvalidStructure("Track without id".to_string()))?;
    let id: TrackId = raw_id
        .parse()
        .map_err(|e| EngineError::InvalidStructure(format!("Invalid track id \"{}\": {}", raw_id, e)))?;

    let Some((kind, sequence_record)) = record
        .children
        .iter()
        .find_map(|child| EventKind::from_sequence_tag(&child.tag).map(|kind| (kind, child)))
    else {
        log::warn!("Skipping track {} without a sequence", id);
        return Ok(None);
    };

    let mut sequence = AnySequence::new(kind);
    sequence.deserialize(sequence_record);

    Ok(Some(Track::with_sequence(
        id,
        record.string_attribute("name", ""),
        sequence,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeySignatureEvent, Note, Scale, SequenceEvent};

    #[test]
    fn test_project_round_trip() {
        let mut project = Project::new();
        let keys = project.add_track("Keys", EventKind::KeySignature);
        let notes = project.add_track("Lead", EventKind::Note);

        let id = project.create_event_id::<KeySignatureEvent>(&keys).unwrap();
        project.insert(&keys, &KeySignatureEvent::new(id, 0.0, 2, Scale::natural_minor()));
        for i in 0..4 {
            let id = project.create_event_id::<Note>(&notes).unwrap();
            project.insert(&notes, &Note::new(id, i as f32, 60 + i, 1.0, 0.8));
        }

        let text = project.to_ron_string().unwrap();
        let restored = Project::from_ron_str(&text).unwrap();

        assert_eq!(restored.track_count(), 2);
        assert_eq!(restored.track(&notes).map(|t| t.name.as_str()), Some("Lead"));
        assert_eq!(
            restored.sequence::<Note>(&notes).unwrap().events(),
            project.sequence::<Note>(&notes).unwrap().events()
        );
        assert_eq!(
            restored.sequence::<KeySignatureEvent>(&keys).unwrap().events(),
            project.sequence::<KeySignatureEvent>(&keys).unwrap().events()
        );
        assert_eq!(restored.undo_count(), 5);
        assert_eq!(restored.beat_range(), project.beat_range());
    }

    #[test]
    fn test_restored_history_can_undo() {
        let mut project = Project::new();
        let notes = project.add_track("Lead", EventKind::Note);
        let id = project.create_event_id::<Note>(&notes).unwrap();
        let note = Note::new(id, 2.0, 64, 1.0, 0.5);
        project.insert(&notes, &note);
        project.change(&notes, &note, &note.with_key(67));

        let mut restored = Project::from_ron_str(&project.to_ron_string().unwrap()).unwrap();
        assert_eq!(restored.undo().unwrap(), "Change note");
        assert_eq!(
            restored.sequence::<Note>(&notes).unwrap().find_by_id(note.id()),
            Some(&note)
        );
        restored.undo().unwrap();
        assert!(restored.sequence::<Note>(&notes).unwrap().is_empty());
    }

    #[test]
    fn test_history_not_persisted_when_disabled() {
        let mut config = crate::config::EngineConfig::default();
        config.undo.persist_history = false;
        let mut project = Project::with_config(config);
        let notes = project.add_track("Lead", EventKind::Note);
        let id = project.create_event_id::<Note>(&notes).unwrap();
        project.insert(&notes, &Note::new(id, 0.0, 60, 1.0, 0.5));

        let record = project.serialize();
        assert!(record.child("undoStack").is_none());
    }

    #[test]
    fn test_invalid_documents() {
        let mut project = Project::new();
        assert!(matches!(
            project.deserialize(&Record::new("song")),
            Err(EngineError::InvalidStructure(_))
        ));

        let no_id = Record::new("project").with_child(Record::new("track"));
        assert!(project.deserialize(&no_id).is_err());


        assert!(Project::from_ron_str("not ron at all (").is_err());
    }

    #[test]
    fn test_track_without_sequence_is_skipped() {
        let kept = TrackId::new();
        let record = Record::new("project")
            .with_child(Record::new("track").with_attribute("id", TrackId::new()))
            .with_child(
                Record::new("track")
                    .with_attribute("id", kept)
                    .with_attribute("name", "Lead")
                    .with_child(Record::new(EventKind::Note.sequence_tag())),
            );

        let mut project = Project::new();
        project.deserialize(&record).unwrap();
        assert_eq!(project.track_count(), 1);
        assert_eq!(project.track(&kept).map(|t| t.name.as_str()), Some("Lead"));
    }
}
