// Types for tracks

use crate::event::EventKind;
use crate::sequence::{AnySequence, BeatRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable track identifier
///
/// Undo actions and persisted documents address tracks by this id, so it
/// survives save/load and arena slot reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(TrackId)
    }
}

/// Position of a track in the arena
///
/// A handle goes stale once its track is removed, even if the slot is
/// later reused by another track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// A named lane owning one sequence
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    /// Track name
    pub name: String,
    pub(crate) sequence: AnySequence,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: EventKind) -> Self {
        Self::with_sequence(TrackId::new(), name, AnySequence::new(kind))
    }

    pub(crate) fn with_sequence(id: TrackId, name: impl Into<String>, sequence: AnySequence) -> Self {
        Self {
            id,
            name: name.into(),
            sequence,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.sequence.kind()
    }

    pub fn sequence(&self) -> &AnySequence {
        &self.sequence
    }

    pub fn beat_range(&self) -> BeatRange {
        self.sequence.beat_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_round_trip() {
        let id = TrackId::new();
        assert_eq!(id.to_string().parse::<TrackId>().unwrap(), id);
        assert!("track-7".parse::<TrackId>().is_err());
        assert_ne!(TrackId::new(), id);
    }

    #[test]
    fn test_new_track_is_empty() {
        let track = Track::new("Meter", EventKind::TimeSignature);
        assert_eq!(track.kind(), EventKind::TimeSignature);
        assert!(track.sequence().is_empty());
        assert_eq!(track.beat_range(), BeatRange::default());
    }
}
