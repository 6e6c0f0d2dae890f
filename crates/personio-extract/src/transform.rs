//! Record normalization applied before emission.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-stream record normalization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTransform {
    /// Emit the record unchanged.
    #[default]
    Passthrough,
    /// Replace every `attributes.<name>` wrapper `{"value": x, ..}` with `x`.
    FlattenAttributeValues,
}

impl RecordTransform {
    /// Applies the transform to one raw record.
    #[must_use]
    pub fn apply(self, record: Value) -> Value {
        match self {
            RecordTransform::Passthrough => record,
            RecordTransform::FlattenAttributeValues => flatten_attribute_values(record),
        }
    }
}

/// Flattens one level of attribute wrappers.
///
/// Entries that are not objects or carry no `value` key are left as they are.
fn flatten_attribute_values(mut record: Value) -> Value {
    if let Some(attributes) = record.get_mut("attributes").and_then(Value::as_object_mut) {
        for entry in attributes.values_mut() {
            if let Some(inner) = entry.as_object_mut().and_then(|obj| obj.remove("value")) {
                *entry = inner;
            }
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_attribute_values() {
        let raw = json!({"attributes": {"first_name": {"value": "Ana"}}});
        let flat = RecordTransform::FlattenAttributeValues.apply(raw);
        assert_eq!(flat, json!({"attributes": {"first_name": "Ana"}}));
    }

    #[test]
    fn test_flatten_keeps_nested_values_intact() {
        let raw = json!({
            "type": "Employee",
            "attributes": {
                "id": {"label": "ID", "value": 42, "type": "integer"},
                "department": {
                    "label": "Department",
                    "value": {"type": "Department", "attributes": {"name": "R&D"}}
                }
            }
        });
        let flat = RecordTransform::FlattenAttributeValues.apply(raw);
        assert_eq!(flat["type"], "Employee");
        assert_eq!(flat["attributes"]["id"], 42);
        assert_eq!(
            flat["attributes"]["department"],
            json!({"type": "Department", "attributes": {"name": "R&D"}})
        );
    }

    #[test]
    fn test_flatten_leaves_unwrapped_entries() {
        let raw = json!({"attributes": {"plain": "x", "no_value": {"label": "y"}}});
        let flat = RecordTransform::FlattenAttributeValues.apply(raw.clone());
        assert_eq!(flat, raw);
    }

    #[test]
    fn test_flatten_without_attributes() {
        let raw = json!({"id": 1});
        assert_eq!(RecordTransform::FlattenAttributeValues.apply(raw.clone()), raw);
    }

    #[test]
    fn test_passthrough() {
        let raw = json!({"attributes": {"first_name": {"value": "Ana"}}});
        assert_eq!(RecordTransform::Passthrough.apply(raw.clone()), raw);
    }
}
