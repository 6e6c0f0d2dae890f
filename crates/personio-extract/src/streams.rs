//! Static definitions of the Personio streams.
//!
//! Each stream knows its endpoint path, which query parameters the endpoint
//! accepts, how the pagination offset advances, and how its records are
//! normalized. Lookups are by stream identifier only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transform::RecordTransform;
use crate::{TapError, TapResult};

/// Query parameters a listing endpoint may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryParam {
    StartDate,
    EndDate,
    Limit,
    Offset,
}

impl QueryParam {
    /// Wire name of the parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueryParam::StartDate => "start_date",
            QueryParam::EndDate => "end_date",
            QueryParam::Limit => "limit",
            QueryParam::Offset => "offset",
        }
    }

    /// All parameters, in request order.
    pub const ALL: [QueryParam; 4] = [
        QueryParam::StartDate,
        QueryParam::EndDate,
        QueryParam::Limit,
        QueryParam::Offset,
    ];
}

/// How the `offset` parameter advances between pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetStep {
    /// Offset counts records: advance by `limit`.
    #[default]
    PageSize,
    /// Offset counts pages: advance by one.
    Single,
}

impl OffsetStep {
    /// Returns the offset for the page after `offset`.
    #[must_use]
    pub fn advance(self, offset: u64, limit: u32) -> u64 {
        match self {
            OffsetStep::PageSize => offset + u64::from(limit),
            OffsetStep::Single => offset + 1,
        }
    }
}

/// One extractable Personio resource.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDefinition {
    /// Stream identifier, unique within a registry.
    pub id: String,
    /// Path below `/company/` when the endpoint is nested under another resource.
    pub sub_path: Option<String>,
    /// Query parameters the endpoint filters on. The date window and paging
    /// parameters are sent to every endpoint regardless.
    pub query_params: Vec<QueryParam>,
    /// Related operation paths. Informational only.
    pub sub_operations: Vec<String>,
    pub offset_step: OffsetStep,
    pub transform: RecordTransform,
    pub key_properties: Vec<String>,
    pub replication_key: Option<String>,
    /// JSON schema of emitted records.
    pub schema: Value,
}

impl StreamDefinition {
    /// Creates a direct (non-nested) stream with no query parameters.
    pub fn new(id: impl Into<String>, schema: Value) -> Self {
        Self {
            id: id.into(),
            sub_path: None,
            query_params: Vec::new(),
            sub_operations: Vec::new(),
            offset_step: OffsetStep::default(),
            transform: RecordTransform::default(),
            key_properties: Vec::new(),
            replication_key: None,
            schema,
        }
    }

    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn with_query_params(mut self, params: &[QueryParam]) -> Self {
        self.query_params = params.to_vec();
        self
    }

    pub fn with_sub_operations(mut self, ops: &[&str]) -> Self {
        self.sub_operations = ops.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn with_offset_step(mut self, step: OffsetStep) -> Self {
        self.offset_step = step;
        self
    }

    pub fn with_transform(mut self, transform: RecordTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_key_properties(mut self, keys: &[&str]) -> Self {
        self.key_properties = keys.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn with_replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    /// Whether the endpoint lives under another resource's path.
    #[must_use]
    pub fn is_sub_resource(&self) -> bool {
        self.sub_path.is_some()
    }

    /// Path below `/company/`.
    #[must_use]
    pub fn path(&self) -> &str {
        self.sub_path.as_deref().unwrap_or(&self.id)
    }

    #[must_use]
    pub fn accepts(&self, param: QueryParam) -> bool {
        self.query_params.contains(&param)
    }
}

/// Lookup table of stream definitions keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct StreamRegistry {
    streams: Vec<StreamDefinition>,
}

fn bundled_schema(id: &str, raw: &str) -> TapResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| TapError::Catalog(format!("bundled schema for {id} is invalid: {e}")))
}

impl StreamRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The streams this tap knows how to extract.
    pub fn personio() -> TapResult<Self> {
        use QueryParam::{EndDate, Limit, Offset, StartDate};

        let mut registry = Self::new();
        registry.insert(
            StreamDefinition::new(
                "employees",
                bundled_schema("employees", include_str!("../schemas/employees.json"))?,
            )
            .with_query_params(&[Limit, Offset])
            .with_sub_operations(&[
                "{employee_id}",
                "{employee_id}/absences/balance",
                "custom-attributes",
                "attributes",
                "{employee_id}/profile-picture/{width}",
            ])
            .with_transform(RecordTransform::FlattenAttributeValues),
        );
        registry.insert(
            StreamDefinition::new(
                "attendances",
                bundled_schema("attendances", include_str!("../schemas/attendances.json"))?,
            )
            .with_query_params(&[StartDate, EndDate, Limit, Offset])
            .with_key_properties(&["id"]),
        );
        registry.insert(
            StreamDefinition::new(
                "projects",
                bundled_schema("projects", include_str!("../schemas/projects.json"))?,
            )
            .with_sub_path("attendances/projects")
            .with_key_properties(&["id"]),
        );
        registry.insert(
            StreamDefinition::new(
                "time-offs",
                bundled_schema("time-offs", include_str!("../schemas/time-offs.json"))?,
            )
            .with_query_params(&[StartDate, EndDate, Limit, Offset])
            .with_offset_step(OffsetStep::Single),
        );
        Ok(registry)
    }

    /// Adds a definition, replacing any existing one with the same id.
    pub fn insert(&mut self, definition: StreamDefinition) {
        match self.streams.iter_mut().find(|s| s.id == definition.id) {
            Some(existing) => *existing = definition,
            None => self.streams.push(definition),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamDefinition> {
        self.streams.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
