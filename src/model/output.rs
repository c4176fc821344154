//! Output model
//!
//! The exported configuration: one JSON value per declared field key.
//! Controls never write here directly, they hand back a [`FieldChange`]
//! that the app applies.

use crate::errors::{AppError, AppResult};
use crate::model::schema::{FieldSchema, FieldType};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A single `(key, value)` edit emitted by a control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub key: String,
    pub value: Value,
}

impl FieldChange {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputModel {
    declared: IndexMap<String, FieldType>,
    values: Map<String, Value>,
}

impl OutputModel {
    /// Build the model with one default slot per schema field
    pub fn from_schema(schema: &FieldSchema) -> Self {
        let mut model = Self::default();
        for def in schema.iter() {
            model.declared.insert(def.key.clone(), def.field_type);
            model
                .values
                .insert(def.key.clone(), def.field_type.default_output());
        }
        model
    }

    pub fn declares(&self, key: &str) -> bool {
        self.declared.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Text form of a value, as used for the template context and hooks
    pub fn get_text(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Apply one change; keys outside the schema are a wiring defect
    pub fn apply(&mut self, change: FieldChange) -> AppResult<()> {
        if !self.declares(&change.key) {
            return Err(AppError::Wiring(format!(
                "change for undeclared key '{}'",
                change.key
            )));
        }
        self.values.insert(change.key, change.value);
        Ok(())
    }

    /// Replace every value with a loaded document
    pub fn replace(&mut self, values: Map<String, Value>) {
        self.values = values;
    }

    pub fn to_json_pretty(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a saved document; anything but a JSON object is rejected
    pub fn parse_document(contents: &str) -> AppResult<Map<String, Value>> {
        match serde_json::from_str::<Value>(contents)? {
            Value::Object(map) => Ok(map),
            other => Err(AppError::Json(format!(
                "expected a JSON object, found {}",
                type_name(&other)
            ))),
        }
    }
}

/// Serializes as the bare document, without the declared types
impl Serialize for OutputModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::FieldDefinition;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> FieldSchema {
        let mut schema = FieldSchema::new();
        schema.insert(FieldDefinition::new("object_name", FieldType::Text, "Object"));
        schema.insert(FieldDefinition::new("active", FieldType::Boolean, "Active"));
        schema.insert(FieldDefinition::new("batch", FieldType::Number, "Batch"));
        schema.insert(FieldDefinition::new("fields", FieldType::Table, "Fields"));
        schema
    }

    #[test]
    fn test_defaults_follow_schema_order() {
        let model = OutputModel::from_schema(&schema());
        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({"object_name": "", "active": false, "batch": 0, "fields": []})
        );
        let document = OutputModel::parse_document(&model.to_json_pretty().unwrap()).unwrap();
        let keys: Vec<&String> = document.keys().collect();
        assert_eq!(keys, vec!["object_name", "active", "batch", "fields"]);
    }

    #[test]
    fn test_apply_undeclared_key_is_wiring_error() {
        let mut model = OutputModel::from_schema(&schema());
        let err = model
            .apply(FieldChange::new("nope", json!("x")))
            .unwrap_err();
        assert!(matches!(err, AppError::Wiring(_)));
    }

    #[test]
    fn test_last_write_wins() {
        let mut model = OutputModel::from_schema(&schema());
        model.apply(FieldChange::new("batch", json!(3))).unwrap();
        model.apply(FieldChange::new("batch", json!(7))).unwrap();
        assert_eq!(model.get("batch"), Some(&json!(7)));
    }

    #[test]
    fn test_save_then_load_is_identity() {
        let mut model = OutputModel::from_schema(&schema());
        model
            .apply(FieldChange::new("object_name", json!("клиенты")))
            .unwrap();
        model
            .apply(FieldChange::new(
                "fields",
                json!([{"name": "id", "active": 1}, {"name": "title", "active": 0}]),
            ))
            .unwrap();

        let saved = model.to_json_pretty().unwrap();
        assert!(saved.contains("клиенты"));

        let mut reloaded = OutputModel::from_schema(&schema());
        reloaded.replace(OutputModel::parse_document(&saved).unwrap());
        assert_eq!(reloaded, model);
    }

    #[test]
    fn test_empty_table_survives_round_trip() {
        let model = OutputModel::from_schema(&schema());
        let saved = model.to_json_pretty().unwrap();
        let loaded = OutputModel::parse_document(&saved).unwrap();
        assert_eq!(loaded.get("fields"), Some(&json!([])));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = OutputModel::parse_document("[1, 2]").unwrap_err();
        assert!(err.message().contains("an array"));
    }

    #[test]
    fn test_get_text_stringifies_scalars() {
        let mut model = OutputModel::from_schema(&schema());
        model.apply(FieldChange::new("batch", json!(12))).unwrap();
        assert_eq!(model.get_text("batch"), "12");
        assert_eq!(model.get_text("object_name"), "");
        assert_eq!(model.get_text("missing"), "");
    }
}
