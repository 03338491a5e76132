//! Model directory entries and response-shape normalization.

use serde::Deserialize;
use serde_json::Value;

/// One entry from the server's model listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
}

/// Normalize the two listing shapes servers actually send: an object with a
/// `data` array (LM Studio, OpenAI) or a bare top-level array. Anything else
/// is treated as "no models" rather than an error, since directory responses
/// vary by server implementation.
pub fn models_from_value(value: &Value) -> Vec<ModelDescriptor> {
    let entries = match value {
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(entries)) => entries,
            _ => return Vec::new(),
        },
        Value::Array(entries) => entries,
        _ => return Vec::new(),
    };
    serde_json::from_value(Value::Array(entries.clone())).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_with_data_array() {
        let value = json!({"data": [{"id": "m1"}, {"id": "m2"}]});
        let models = models_from_value(&value);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "m1");
        assert_eq!(models[1].id, "m2");
    }

    #[test]
    fn bare_array() {
        let value = json!([{"id": "a", "owned_by": "organization_owner", "created": 1700000000}]);
        let models = models_from_value(&value);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "a");
        assert_eq!(models[0].owned_by.as_deref(), Some("organization_owner"));
        assert_eq!(models[0].created, Some(1700000000));
    }

    #[test]
    fn unknown_shapes_yield_empty_list() {
        assert!(models_from_value(&json!({"models": ["x"]})).is_empty());
        assert!(models_from_value(&json!("just a string")).is_empty());
        assert!(models_from_value(&json!(42)).is_empty());
        assert!(models_from_value(&json!(null)).is_empty());
    }

    #[test]
    fn entries_missing_ids_make_the_shape_unknown() {
        let value = json!({"data": [{"name": "no-id-field"}]});
        assert!(models_from_value(&value).is_empty());
    }

    #[test]
    fn optional_fields_default_to_none() {
        let value = json!({"data": [{"id": "bare"}]});
        let models = models_from_value(&value);
        assert_eq!(models[0].owned_by, None);
        assert_eq!(models[0].created, None);
    }
}
