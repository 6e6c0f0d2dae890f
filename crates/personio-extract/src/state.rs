//! Bookmark state carried between runs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{TapError, TapResult};

/// State document: `{"bookmarks": {stream: {replication_key: value}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currently_syncing: Option<String>,
}

impl State {
    /// Loads a state file written by an earlier run.
    pub fn from_file(path: impl AsRef<Path>) -> TapResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&raw)
            .map_err(|e| TapError::Config(format!("invalid state file {}: {e}", path.display())))
    }

    /// Bookmark value for a stream's replication key.
    #[must_use]
    pub fn bookmark(&self, stream: &str, key: &str) -> Option<&Value> {
        self.bookmarks.get(stream).and_then(|b| b.get(key))
    }

    pub fn set_bookmark(&mut self, stream: &str, key: &str, value: Value) {
        self.bookmarks
            .entry(stream.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Serializes the state for a STATE message.
    pub fn to_value(&self) -> TapResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
