// Persisted record tree
//
// Sequences, events and undo actions persist themselves as a small tree of
// tagged records with string attributes. The tree is embedded in whatever
// document the host application saves; on its own it round-trips through RON.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// One element of the persisted tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub tag: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Record>,
}

impl Record {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag == tag
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Display) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    /// Builder form of `set_attribute`
    pub fn with_attribute(mut self, name: &str, value: impl Display) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Parse an attribute, falling back to `default` when it is missing or corrupt
    pub fn parse_attribute<T: FromStr>(&self, name: &str, default: T) -> T {
        match self.attributes.get(name) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Corrupt attribute {}=\"{}\" in <{}>", name, raw, self.tag);
                default
            }),
            None => default,
        }
    }

    pub fn string_attribute(&self, name: &str, default: &str) -> String {
        self.attribute(name).unwrap_or(default).to_string()
    }

    pub fn add_child(&mut self, child: Record) {
        self.children.push(child);
    }

    pub fn with_child(mut self, child: Record) -> Self {
        self.children.push(child);
        self
    }

    /// First direct child with the given tag
    pub fn child(&self, tag: &str) -> Option<&Record> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children with the given tag, in document order
    pub fn children_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Returns `self` if it carries `tag`, otherwise its first child that does
    pub fn find_root(&self, tag: &str) -> Option<&Record> {
        if self.has_tag(tag) {
            Some(self)
        } else {
            self.child(tag)
        }
    }

    /// Serialize this tree to RON
    pub fn to_ron_string(&self) -> EngineResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            EngineError::SerializationError(format!("Failed to serialize to RON: {}", e))
        })
    }

    /// Parse a tree from RON
    pub fn from_ron_str(ron_data: &str) -> EngineResult<Self> {
        ron::from_str(ron_data).map_err(|e| {
            EngineError::SerializationError(format!("Failed to deserialize from RON: {}", e))
        })
    }
}
