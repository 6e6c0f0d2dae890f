//! Catalog model, discovery and stream selection.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::state::State;
use crate::streams::StreamRegistry;
use crate::{TapError, TapResult};

/// Metadata attached to a schema location.
///
/// An empty breadcrumb addresses the stream itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// One stream in a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    pub schema: Value,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_method: Option<String>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    fn stream_metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .map(|m| &m.metadata)
    }

    /// Explicit `selected` wins, then the legacy schema flag, then `selected-by-default`.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        let meta = self.stream_metadata();
        if let Some(selected) = meta.and_then(|m| m.get("selected")).and_then(Value::as_bool) {
            return selected;
        }
        if let Some(selected) = self.schema.get("selected").and_then(Value::as_bool) {
            return selected;
        }
        meta.and_then(|m| m.get("selected-by-default"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Replication key from the entry, falling back to stream metadata.
    #[must_use]
    pub fn replication_key(&self) -> Option<&str> {
        self.replication_key.as_deref().or_else(|| {
            self.stream_metadata()
                .and_then(|m| m.get("replication-key"))
                .and_then(Value::as_str)
        })
    }
}

/// The set of streams offered or selected for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Loads a catalog file.
    pub fn from_file(path: impl AsRef<Path>) -> TapResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog: Self = serde_json::from_str(&raw)
            .map_err(|e| TapError::Catalog(format!("invalid catalog {}: {e}", path.display())))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Builds the catalog of every registered stream. No network I/O.
    #[must_use]
    pub fn discover(registry: &StreamRegistry) -> Self {
        let streams = registry
            .iter()
            .map(|def| {
                let mut meta = Map::new();
                meta.insert("inclusion".into(), json!("available"));
                meta.insert("selected-by-default".into(), json!(true));
                meta.insert("table-key-properties".into(), json!(def.key_properties));
                match &def.replication_key {
                    Some(key) => {
                        meta.insert("forced-replication-method".into(), json!("INCREMENTAL"));
                        meta.insert("valid-replication-keys".into(), json!([key]));
                    }
                    None => {
                        meta.insert("forced-replication-method".into(), json!("FULL_TABLE"));
                    }
                }

                CatalogEntry {
                    tap_stream_id: def.id.clone(),
                    stream: def.id.clone(),
                    schema: def.schema.clone(),
                    key_properties: def.key_properties.clone(),
                    replication_key: def.replication_key.clone(),
                    replication_method: None,
                    metadata: vec![MetadataEntry {
                        breadcrumb: Vec::new(),
                        metadata: meta,
                    }],
                }
            })
            .collect();
        Self { streams }
    }

    /// Rejects duplicate stream ids.
    pub fn validate(&self) -> TapResult<()> {
        for (i, entry) in self.streams.iter().enumerate() {
            if self.streams[..i]
                .iter()
                .any(|e| e.tap_stream_id == entry.tap_stream_id)
            {
                return Err(TapError::Catalog(format!(
                    "duplicate stream id: {}",
                    entry.tap_stream_id
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get_stream(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|s| s.tap_stream_id == tap_stream_id)
    }

    /// Selected streams in sync order: an interrupted stream first, then catalog order.
    #[must_use]
    pub fn selected_streams(&self, state: &State) -> Vec<&CatalogEntry> {
        let mut selected: Vec<&CatalogEntry> =
            self.streams.iter().filter(|s| s.is_selected()).collect();
        if let Some(current) = state.currently_syncing.as_deref() {
            if let Some(pos) = selected.iter().position(|s| s.tap_stream_id == current) {
                let entry = selected.remove(pos);
                selected.insert(0, entry);
            }
        }
        selected
    }
}
