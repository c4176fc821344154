//! Field, page and column definitions
//!
//! These mirror `config/config_fields.json` and `config/config_pages.json`.
//! The field map is ordered so forms and defaults follow the document order.

use crate::errors::{AppError, AppResult};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Default lower bound of number controls
pub const NUMBER_MIN: i64 = -999_999;
/// Default upper bound of number controls
pub const NUMBER_MAX: i64 = 999_999;

/// Key of the synthetic delete-row column appended to every table
pub const ACTION_COLUMN_KEY: &str = "action";

/// Closed set of field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Select,
    Boolean,
    Number,
    Array,
    Table,
}

impl FieldType {
    /// Value an output model slot holds before any control has emitted
    pub fn default_output(&self) -> Value {
        match self {
            FieldType::Text | FieldType::Select | FieldType::Array => Value::String(String::new()),
            FieldType::Number => Value::from(0),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Table => Value::Array(Vec::new()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Select => "select",
            FieldType::Boolean => "boolean",
            FieldType::Number => "number",
            FieldType::Array => "array",
            FieldType::Table => "table",
        }
    }
}

/// One choice of a select control
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    /// Display name shown in the dropdown
    pub name: String,
    /// Value written to the output model
    pub value: Value,
}

impl SelectOption {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Option whose display name doubles as its value
    pub fn plain(name: impl Into<String>) -> Self {
        let name = name.into();
        let value = Value::String(name.clone());
        Self { name, value }
    }

    /// Accepts `"name"` or `{"name": .., "value": ..}`
    fn from_json(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => Some(Self::plain(s.clone())),
            Value::Object(map) => {
                let name = map.get("name")?.as_str()?.to_string();
                let value = map
                    .get("value")
                    .cloned()
                    .unwrap_or_else(|| Value::String(name.clone()));
                Some(Self { name, value })
            }
            Value::Number(n) => Some(Self::new(n.to_string(), raw.clone())),
            _ => None,
        }
    }
}

/// Column types of a table field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Select,
    Number,
    Boolean,
    Action,
}

/// How a column header claims horizontal space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    Stretch,
    Fixed(u16),
}

impl ColumnType {
    pub fn resize_policy(&self) -> ResizePolicy {
        match self {
            ColumnType::Text => ResizePolicy::Stretch,
            ColumnType::Select => ResizePolicy::Stretch,
            ColumnType::Number => ResizePolicy::Fixed(10),
            ColumnType::Boolean => ResizePolicy::Fixed(6),
            ColumnType::Action => ResizePolicy::Fixed(3),
        }
    }

    /// Minimum width for stretch columns that still carry a preferred size
    pub fn preferred_width(&self) -> u16 {
        match self {
            ColumnType::Select => 18,
            ColumnType::Text => 12,
            other => match other.resize_policy() {
                ResizePolicy::Fixed(w) => w,
                ResizePolicy::Stretch => 12,
            },
        }
    }

    /// Field type used to build the cell control
    pub fn cell_type(&self) -> Option<FieldType> {
        match self {
            ColumnType::Text => Some(FieldType::Text),
            ColumnType::Select => Some(FieldType::Select),
            ColumnType::Number => Some(FieldType::Number),
            ColumnType::Boolean => Some(FieldType::Boolean),
            ColumnType::Action => None,
        }
    }
}

/// One column of a table field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    /// Choices of a select column; older documents keep them under `value`
    #[serde(default, alias = "value", deserialize_with = "lenient_list")]
    pub values: Vec<Value>,
}

impl ColumnDefinition {
    /// The synthetic delete-row column
    pub fn action() -> Self {
        Self {
            key: ACTION_COLUMN_KEY.to_string(),
            name: String::new(),
            column_type: ColumnType::Action,
            values: Vec::new(),
        }
    }

    pub fn is_action(&self) -> bool {
        self.column_type == ColumnType::Action
    }

    /// Field definition used to build a cell control for this column
    pub fn as_field(&self) -> Option<FieldDefinition> {
        let field_type = self.column_type.cell_type()?;
        Some(FieldDefinition {
            key: self.key.clone(),
            field_type,
            name: self.name.clone(),
            values: self.values.clone(),
            ..FieldDefinition::default()
        })
    }
}

/// One schema entry of `config_fields.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldDefinition {
    /// Filled from the document's map key
    #[serde(skip)]
    pub key: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// `[{name, value}]` for select, `[ColumnDefinition]` for table
    #[serde(default, deserialize_with = "lenient_list")]
    pub values: Vec<Value>,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, field_type: FieldType, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            field_type,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.values = values;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn options(&self) -> Vec<SelectOption> {
        self.values.iter().filter_map(SelectOption::from_json).collect()
    }

    /// Declared data columns of a table field (the action column is not included)
    pub fn columns(&self) -> AppResult<Vec<ColumnDefinition>> {
        self.values
            .iter()
            .map(|raw| {
                serde_json::from_value::<ColumnDefinition>(raw.clone()).map_err(|e| {
                    AppError::SchemaLoad(format!("bad column in table field '{}': {}", self.key, e))
                })
            })
            .filter(|col| !matches!(col, Ok(c) if c.is_action()))
            .collect()
    }

    /// Number bounds with the control defaults applied
    pub fn bounds(&self) -> (i64, i64) {
        let min = self.min.unwrap_or(NUMBER_MIN);
        let max = self.max.unwrap_or(NUMBER_MAX);
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }
}

/// Accept a list, treat anything else (`""`, `null`) as empty
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

/// Ordered map of field definitions keyed by field key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSchema {
    fields: IndexMap<String, FieldDefinition>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(contents: &str) -> AppResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::new());
        }
        let raw: IndexMap<String, FieldDefinition> = serde_json::from_str(contents)
            .map_err(|e| AppError::SchemaLoad(format!("config_fields.json: {}", e)))?;
        let mut schema = Self::new();
        for (key, def) in raw {
            schema.insert(FieldDefinition { key: key.clone(), ..def });
        }
        Ok(schema)
    }

    pub fn insert(&mut self, def: FieldDefinition) {
        self.fields.insert(def.key.clone(), def);
    }

    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Table fields in document order
    pub fn table_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.iter().filter(|f| f.field_type == FieldType::Table)
    }

    /// Check pages against the field set, returning one message per problem
    pub fn validate(&self, pages: &PagesDocument) -> Vec<String> {
        let mut problems = Vec::new();
        for page in &pages.pages {
            for key in &page.fields {
                if !self.contains(key) {
                    problems.push(format!(
                        "page '{}' references unknown field '{}'",
                        page.name, key
                    ));
                }
            }
        }
        for def in self.table_fields() {
            if let Err(e) = def.columns() {
                problems.push(e.message().to_string());
            }
        }
        problems
    }
}

/// A named group of fields shown together on one tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PageDefinition {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl PageDefinition {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

/// Contents of `config_pages.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PagesDocument {
    #[serde(default)]
    pub pages: Vec<PageDefinition>,
}

impl PagesDocument {
    pub fn from_json_str(contents: &str) -> AppResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(contents)
            .map_err(|e| AppError::SchemaLoad(format!("config_pages.json: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &str = r#"{
        "object_name": {"type": "text", "name": "Object", "help": "Target object"},
        "load_type": {"type": "select", "name": "Load type",
                      "values": [{"name": "Full", "value": "full"}, {"name": "Delta", "value": "delta"}]},
        "active": {"type": "boolean", "name": "Active"},
        "batch": {"type": "number", "name": "Batch", "min": 1, "max": 100},
        "tags": {"type": "array", "name": "Tags"},
        "fields": {"type": "table", "name": "Fields", "values": [
            {"key": "name", "name": "Name", "type": "text", "value": ""},
            {"key": "kind", "name": "Kind", "type": "select", "value": ["table", "view"]},
            {"key": "size", "name": "Size", "type": "number"},
            {"key": "active", "name": "Active", "type": "boolean", "value": true}
        ]}
    }"#;

    #[test]
    fn test_parse_fields_keeps_document_order() {
        let schema = FieldSchema::from_json_str(FIELDS).unwrap();
        let keys: Vec<&str> = schema.keys().collect();
        assert_eq!(keys, vec!["object_name", "load_type", "active", "batch", "tags", "fields"]);
        assert_eq!(schema.get("object_name").unwrap().key, "object_name");
        assert_eq!(schema.get("batch").unwrap().bounds(), (1, 100));
    }

    #[test]
    fn test_select_options_accept_objects_and_strings() {
        let schema = FieldSchema::from_json_str(FIELDS).unwrap();
        let options = schema.get("load_type").unwrap().options();
        assert_eq!(options[1], SelectOption::new("Delta", json!("delta")));

        let columns = schema.get("fields").unwrap().columns().unwrap();
        let kind = columns.iter().find(|c| c.key == "kind").unwrap();
        assert_eq!(kind.as_field().unwrap().options(), vec![SelectOption::plain("table"), SelectOption::plain("view")]);
    }

    #[test]
    fn test_columns_ignore_non_list_value() {
        let schema = FieldSchema::from_json_str(FIELDS).unwrap();
        let columns = schema.get("fields").unwrap().columns().unwrap();
        assert_eq!(columns.len(), 4);
        assert!(columns[0].values.is_empty());
        assert!(columns[3].values.is_empty());
    }

    #[test]
    fn test_default_outputs_by_type() {
        assert_eq!(FieldType::Text.default_output(), json!(""));
        assert_eq!(FieldType::Array.default_output(), json!(""));
        assert_eq!(FieldType::Number.default_output(), json!(0));
        assert_eq!(FieldType::Boolean.default_output(), json!(false));
        assert_eq!(FieldType::Table.default_output(), json!([]));
    }

    #[test]
    fn test_resize_policy() {
        assert_eq!(ColumnType::Text.resize_policy(), ResizePolicy::Stretch);
        assert_eq!(ColumnType::Select.resize_policy(), ResizePolicy::Stretch);
        assert!(matches!(ColumnType::Number.resize_policy(), ResizePolicy::Fixed(_)));
        assert!(matches!(ColumnType::Boolean.resize_policy(), ResizePolicy::Fixed(_)));
        assert!(matches!(ColumnType::Action.resize_policy(), ResizePolicy::Fixed(_)));
    }

    #[test]
    fn test_validate_reports_unknown_page_keys() {
        let schema = FieldSchema::from_json_str(FIELDS).unwrap();
        let pages: PagesDocument = serde_json::from_value(json!({
            "pages": [{"name": "main", "title": "Main", "fields": ["object_name", "missing"]}]
        }))
        .unwrap();
        let problems = schema.validate(&pages);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("missing"));
    }

    #[test]
    fn test_empty_documents_are_empty_schemas() {
        assert!(FieldSchema::from_json_str("  ").unwrap().is_empty());
        assert!(PagesDocument::from_json_str("").unwrap().pages.is_empty());
    }

    #[test]
    fn test_corrupt_document_is_schema_load_error() {
        let err = FieldSchema::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, AppError::SchemaLoad(_)));
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let mut def = FieldDefinition::new("n", FieldType::Number, "N");
        def.min = Some(10);
        def.max = Some(-10);
        assert_eq!(def.bounds(), (-10, 10));
    }
}
