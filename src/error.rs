// Error types shared by the document codec, MIDI decoding and the project API

/// Engine error types
///
/// Not-found conditions on sequence edits are not errors; they are reported
/// through `bool` returns. These variants cover codec and lookup failures
/// that a caller has to surface to the user.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    #[error("MIDI error: {0}")]
    MidiError(String),

    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error("Track {0} does not hold a {1} sequence")]
    WrongSequenceKind(String, &'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
