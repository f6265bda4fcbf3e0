// Engine configuration
//
// Everything here has a sensible default; a host application may override
// values by loading a JSON document.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};

/// Default ceiling for the summed cost of undo history entries
pub const DEFAULT_MAX_UNDO_UNITS: usize = 30000;

/// Default number of history entries kept even when over the cost ceiling
pub const DEFAULT_MIN_ENTRIES_TO_KEEP: usize = 30;

/// Undo log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Total cost (see `UndoAction::size_in_units`) above which the oldest
    /// history entries are evicted
    pub max_units: usize,

    /// Eviction never shrinks the history below this many entries
    pub min_entries_to_keep: usize,

    /// Whether the undo history is written into saved documents
    pub persist_history: bool,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_units: DEFAULT_MAX_UNDO_UNITS,
            min_entries_to_keep: DEFAULT_MIN_ENTRIES_TO_KEEP,
            persist_history: true,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub undo: UndoConfig,
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this configuration to pretty-printed JSON
    pub fn to_json_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.undo.max_units, 30000);
        assert_eq!(config.undo.min_entries_to_keep, 30);
        assert!(config.undo.persist_history);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "undo": { "max_units": 10 } }"#).unwrap();
        assert_eq!(config.undo.max_units, 10);
        assert_eq!(config.undo.min_entries_to_keep, DEFAULT_MIN_ENTRIES_TO_KEEP);
    }

    #[test]
    fn test_invalid_json() {
        assert!(EngineConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EngineConfig::default();
        config.undo.persist_history = false;
        let json = config.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }
}
