//! Typed field controls
//!
//! `FieldControl::create` turns one [`FieldDefinition`] into the control state
//! for its type. Every mutator hands back the [`FieldChange`] the app applies
//! to the output model.

use crate::errors::{AppError, AppResult};
use crate::model::output::{FieldChange, OutputModel};
use crate::model::schema::{FieldDefinition, FieldType, SelectOption};
use crate::model::table::TableModel;
use serde_json::Value;

/// Read any JSON scalar as a checkbox state
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "t" | "true" | "y" | "yes" | "on"
        ),
        _ => false,
    }
}

/// Read any JSON scalar as an integer, rounding floats
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Read any JSON value as display text
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Single-line text input with a char-indexed cursor
#[derive(Debug, Clone, PartialEq)]
pub struct TextControl {
    pub key: String,
    text: String,
    cursor: usize,
}

impl TextControl {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self {
            key: key.into(),
            text,
            cursor,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn change(&self) -> FieldChange {
        FieldChange::new(self.key.clone(), Value::String(self.text.clone()))
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> FieldChange {
        self.text = text.into();
        self.cursor = self.text.chars().count();
        self.change()
    }

    pub fn insert_char(&mut self, c: char) -> FieldChange {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
        self.change()
    }

    pub fn backspace(&mut self) -> Option<FieldChange> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        Some(self.change())
    }

    pub fn delete(&mut self) -> Option<FieldChange> {
        if self.cursor >= self.text.chars().count() {
            return None;
        }
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        Some(self.change())
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }
}

/// Dropdown over display names that emits the mapped values
#[derive(Debug, Clone, PartialEq)]
pub struct SelectControl {
    pub key: String,
    options: Vec<SelectOption>,
    selected: Option<usize>,
}

impl SelectControl {
    pub fn new(key: impl Into<String>, options: Vec<SelectOption>) -> Self {
        let selected = if options.is_empty() { None } else { Some(0) };
        Self {
            key: key.into(),
            options,
            selected,
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Display name of the current option, `""` when nothing is selected
    pub fn display(&self) -> &str {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(|o| o.name.as_str())
            .unwrap_or("")
    }

    pub fn value(&self) -> Value {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(|o| o.value.clone())
            .unwrap_or_else(|| Value::String(String::new()))
    }

    fn change(&self) -> FieldChange {
        FieldChange::new(self.key.clone(), self.value())
    }

    /// Step through the options, wrapping at both ends
    pub fn step(&mut self, forward: bool) -> Option<FieldChange> {
        let len = self.options.len();
        if len == 0 {
            return None;
        }
        let next = match (self.selected, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        self.selected = Some(next);
        Some(self.change())
    }

    /// Select by display name, appending unknown names as new options
    pub fn set_display(&mut self, name: &str) -> FieldChange {
        let index = match self.options.iter().position(|o| o.name == name) {
            Some(i) => i,
            None => {
                self.options.push(SelectOption::plain(name));
                self.options.len() - 1
            }
        };
        self.selected = Some(index);
        self.change()
    }

    /// Select by underlying value, then by display name, else append
    pub fn set_value(&mut self, value: &Value) -> FieldChange {
        if let Some(i) = self.options.iter().position(|o| &o.value == value) {
            self.selected = Some(i);
            return self.change();
        }
        let text = coerce_text(value);
        if let Some(i) = self.options.iter().position(|o| o.name == text) {
            self.selected = Some(i);
            return self.change();
        }
        self.options.push(SelectOption::new(text, value.clone()));
        self.selected = Some(self.options.len() - 1);
        self.change()
    }
}

/// Checkbox emitting integer 0/1
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanControl {
    pub key: String,
    checked: bool,
}

impl BooleanControl {
    pub fn new(key: impl Into<String>, checked: bool) -> Self {
        Self {
            key: key.into(),
            checked,
        }
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn value(&self) -> Value {
        Value::from(i64::from(self.checked))
    }

    pub fn set_checked(&mut self, checked: bool) -> FieldChange {
        self.checked = checked;
        FieldChange::new(self.key.clone(), self.value())
    }

    pub fn toggle(&mut self) -> FieldChange {
        self.set_checked(!self.checked)
    }
}

/// Integer spinner clamped to `[min, max]`
#[derive(Debug, Clone, PartialEq)]
pub struct NumberControl {
    pub key: String,
    value: i64,
    min: i64,
    max: i64,
}

impl NumberControl {
    pub fn new(key: impl Into<String>, value: i64, (min, max): (i64, i64)) -> Self {
        Self {
            key: key.into(),
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    pub fn get(&self) -> i64 {
        self.value
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    pub fn set(&mut self, value: i64) -> FieldChange {
        self.value = value.clamp(self.min, self.max);
        FieldChange::new(self.key.clone(), Value::from(self.value))
    }

    pub fn step(&mut self, delta: i64) -> FieldChange {
        self.set(self.value.saturating_add(delta))
    }
}

/// Ordered tag list with a pending input line
#[derive(Debug, Clone, PartialEq)]
pub struct TagsControl {
    pub key: String,
    tags: Vec<String>,
    pub input: String,
}

impl TagsControl {
    pub fn new(key: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            key: key.into(),
            tags,
            input: String::new(),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn value(&self) -> Value {
        Value::Array(self.tags.iter().cloned().map(Value::String).collect())
    }

    fn change(&self) -> FieldChange {
        FieldChange::new(self.key.clone(), self.value())
    }

    /// Commit the pending input as a tag; blank input is discarded
    pub fn commit(&mut self) -> Option<FieldChange> {
        let tag = self.input.trim().to_string();
        self.input.clear();
        if tag.is_empty() {
            return None;
        }
        self.tags.push(tag);
        Some(self.change())
    }

    pub fn remove(&mut self, index: usize) -> AppResult<FieldChange> {
        if index >= self.tags.len() {
            return Err(AppError::Wiring(format!(
                "tag {} out of range for '{}' ({} tags)",
                index,
                self.key,
                self.tags.len()
            )));
        }
        self.tags.remove(index);
        Ok(self.change())
    }

    pub fn set_tags(&mut self, tags: Vec<String>) -> FieldChange {
        self.tags = tags;
        self.change()
    }
}

/// Control state for one rendered field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldControl {
    Text(TextControl),
    Select(SelectControl),
    Boolean(BooleanControl),
    Number(NumberControl),
    Tags(TagsControl),
    Table(TableModel),
}

impl FieldControl {
    /// Build the control for a schema field; the key must be declared by the model
    pub fn create(def: &FieldDefinition, output: &OutputModel) -> AppResult<Self> {
        if !output.declares(&def.key) {
            return Err(AppError::Wiring(format!(
                "control for '{}' has no slot in the output model",
                def.key
            )));
        }
        Self::build(def)
    }

    /// Build a control without the output model check (table cells)
    pub fn build(def: &FieldDefinition) -> AppResult<Self> {
        let key = def.key.clone();
        let default = def.default.as_ref();
        let control = match def.field_type {
            FieldType::Text => FieldControl::Text(TextControl::new(
                key,
                default.map(coerce_text).unwrap_or_default(),
            )),
            FieldType::Select => {
                let mut select = SelectControl::new(key, def.options());
                if let Some(value) = default {
                    select.set_value(value);
                }
                FieldControl::Select(select)
            }
            FieldType::Boolean => {
                FieldControl::Boolean(BooleanControl::new(key, default.is_some_and(coerce_bool)))
            }
            FieldType::Number => FieldControl::Number(NumberControl::new(
                key,
                default.and_then(coerce_int).unwrap_or(0),
                def.bounds(),
            )),
            FieldType::Array => FieldControl::Tags(TagsControl::new(
                key,
                default.map(tags_from_value).unwrap_or_default(),
            )),
            FieldType::Table => FieldControl::Table(TableModel::new(def)?),
        };
        Ok(control)
    }

    pub fn key(&self) -> &str {
        match self {
            FieldControl::Text(c) => &c.key,
            FieldControl::Select(c) => &c.key,
            FieldControl::Boolean(c) => &c.key,
            FieldControl::Number(c) => &c.key,
            FieldControl::Tags(c) => &c.key,
            FieldControl::Table(t) => t.key(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            FieldControl::Text(c) => Value::String(c.text().to_string()),
            FieldControl::Select(c) => c.value(),
            FieldControl::Boolean(c) => c.value(),
            FieldControl::Number(c) => Value::from(c.get()),
            FieldControl::Tags(c) => c.value(),
            FieldControl::Table(t) => t.value(),
        }
    }

    /// The change a freshly built control emits once
    pub fn initial_change(&self) -> FieldChange {
        FieldChange::new(self.key().to_string(), self.value())
    }

    /// Sync the control to a stored value, coercing it to the control's type
    pub fn load_value(&mut self, value: &Value) -> AppResult<FieldChange> {
        let change = match self {
            FieldControl::Text(c) => c.set_text(coerce_text(value)),
            FieldControl::Select(c) => c.set_value(value),
            FieldControl::Boolean(c) => c.set_checked(coerce_bool(value)),
            FieldControl::Number(c) => c.set(coerce_int(value).unwrap_or(0)),
            FieldControl::Tags(c) => c.set_tags(tags_from_value(value)),
            FieldControl::Table(t) => t.load_value(value)?,
        };
        Ok(change)
    }

    /// Short display text used in lists and table cells
    pub fn display(&self) -> String {
        match self {
            FieldControl::Text(c) => c.text().to_string(),
            FieldControl::Select(c) => c.display().to_string(),
            FieldControl::Boolean(c) => if c.checked() { "[x]" } else { "[ ]" }.to_string(),
            FieldControl::Number(c) => c.get().to_string(),
            FieldControl::Tags(c) => c.tags().join(", "),
            FieldControl::Table(t) => format!("{} rows", t.row_count()),
        }
    }
}

/// Tags from a JSON array or a comma-separated string
fn tags_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(coerce_text)
            .filter(|t| !t.trim().is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::FieldSchema;
    use serde_json::json;

    fn number_def() -> FieldDefinition {
        FieldDefinition::new("batch", FieldType::Number, "Batch")
    }

    #[test]
    fn test_number_set_get_in_range() {
        let mut control = NumberControl::new("n", 0, number_def().bounds());
        for x in [-999_999, -1, 0, 42, 999_999] {
            control.set(x);
            assert_eq!(control.get(), x);
        }
    }

    #[test]
    fn test_number_clamps_out_of_range() {
        let mut control = NumberControl::new("n", 0, number_def().bounds());
        assert_eq!(control.set(5_000_000).value, json!(999_999));
        assert_eq!(control.set(-5_000_000).value, json!(-999_999));

        let mut def = number_def();
        def.min = Some(1);
        def.max = Some(10);
        let mut bounded = NumberControl::new("n", 0, def.bounds());
        assert_eq!(bounded.get(), 1);
        assert_eq!(bounded.step(100).value, json!(10));
    }

    #[test]
    fn test_select_emits_mapped_value() {
        let mut control = SelectControl::new(
            "load",
            vec![
                SelectOption::new("Full", json!("full")),
                SelectOption::new("Delta", json!("delta")),
            ],
        );
        assert_eq!(control.value(), json!("full"));
        let change = control.set_display("Delta");
        assert_eq!(change, FieldChange::new("load", json!("delta")));
        assert_eq!(control.display(), "Delta");
    }

    #[test]
    fn test_select_appends_unknown_display_name() {
        let mut control = SelectControl::new("kind", vec![SelectOption::plain("table")]);
        let change = control.set_display("materialized view");
        assert_eq!(control.display(), "materialized view");
        assert_eq!(change.value, json!("materialized view"));
        assert_eq!(control.options().len(), 2);
    }

    #[test]
    fn test_select_load_matches_value_then_name() {
        let mut control = SelectControl::new(
            "load",
            vec![
                SelectOption::new("Full", json!("full")),
                SelectOption::new("Delta", json!("delta")),
            ],
        );
        control.set_value(&json!("delta"));
        assert_eq!(control.display(), "Delta");
        control.set_value(&json!("Full"));
        assert_eq!(control.display(), "Full");
        control.set_value(&json!("append"));
        assert_eq!(control.display(), "append");
        assert_eq!(control.options().len(), 3);
    }

    #[test]
    fn test_select_step_wraps() {
        let mut control = SelectControl::new(
            "k",
            vec![SelectOption::plain("a"), SelectOption::plain("b")],
        );
        control.step(false);
        assert_eq!(control.display(), "b");
        control.step(true);
        assert_eq!(control.display(), "a");
        assert!(SelectControl::new("empty", vec![]).step(true).is_none());
    }

    #[test]
    fn test_boolean_emits_integers() {
        let mut control = BooleanControl::new("active", false);
        assert_eq!(control.toggle().value, json!(1));
        assert_eq!(control.toggle().value, json!(0));
    }

    #[test]
    fn test_tags_commit_trims_and_skips_blank() {
        let mut control = TagsControl::new("tags", vec![]);
        control.input = "  daily ".to_string();
        let change = control.commit().unwrap();
        assert_eq!(change.value, json!(["daily"]));

        control.input = "   ".to_string();
        assert!(control.commit().is_none());

        control.input = "daily".to_string();
        control.commit();
        assert_eq!(control.tags(), ["daily", "daily"]);
        assert_eq!(control.remove(0).unwrap().value, json!(["daily"]));
        assert!(control.remove(5).is_err());
    }

    #[test]
    fn test_text_edits_respect_multibyte_chars() {
        let mut control = TextControl::new("name", "тест");
        control.move_left();
        control.insert_char('X');
        assert_eq!(control.text(), "тесXт");
        control.backspace();
        control.end();
        assert_eq!(control.backspace().unwrap().value, json!("тес"));
        control.home();
        assert!(control.backspace().is_none());
    }

    #[test]
    fn test_create_requires_declared_key() {
        let mut schema = FieldSchema::new();
        schema.insert(FieldDefinition::new("declared", FieldType::Text, "D"));
        let output = OutputModel::from_schema(&schema);

        let stray = FieldDefinition::new("stray", FieldType::Text, "S");
        let err = FieldControl::create(&stray, &output).unwrap_err();
        assert!(matches!(err, AppError::Wiring(_)));
        assert!(FieldControl::create(schema.get("declared").unwrap(), &output).is_ok());
    }

    #[test]
    fn test_initial_values_by_type() {
        let select = FieldDefinition::new("s", FieldType::Select, "S")
            .with_values(vec![json!({"name": "One", "value": 1})]);
        let cases = vec![
            (FieldDefinition::new("t", FieldType::Text, "T"), json!("")),
            (select, json!(1)),
            (FieldDefinition::new("b", FieldType::Boolean, "B"), json!(0)),
            (FieldDefinition::new("a", FieldType::Array, "A"), json!([])),
            (
                FieldDefinition::new("n", FieldType::Number, "N").with_default(json!("12")),
                json!(12),
            ),
        ];
        for (def, expected) in cases {
            let control = FieldControl::build(&def).unwrap();
            assert_eq!(control.initial_change().value, expected, "field {}", def.key);
        }
    }

    #[test]
    fn test_load_value_coerces_text_results() {
        let def = FieldDefinition::new("b", FieldType::Boolean, "B");
        let mut control = FieldControl::build(&def).unwrap();
        assert_eq!(control.load_value(&json!("t")).unwrap().value, json!(1));
        assert_eq!(control.load_value(&json!("false")).unwrap().value, json!(0));

        let mut number = FieldControl::build(&number_def()).unwrap();
        assert_eq!(number.load_value(&json!("17")).unwrap().value, json!(17));
        assert_eq!(number.load_value(&json!(2.6)).unwrap().value, json!(3));
    }
}
