//! Declarative behaviour attached to particular field keys

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldHook {
    /// The field's text becomes the default save-file name
    SaveFileName,
    /// Pre-filled with the OS user name once the form is built
    OsUser,
}

/// Field key to hook lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookTable(IndexMap<String, FieldHook>);

impl Default for HookTable {
    fn default() -> Self {
        let mut hooks = IndexMap::new();
        hooks.insert("object_name".to_string(), FieldHook::SaveFileName);
        hooks.insert("dag_owner".to_string(), FieldHook::OsUser);
        Self(hooks)
    }
}

impl HookTable {
    pub fn hook_for(&self, key: &str) -> Option<FieldHook> {
        self.0.get(key).copied()
    }

    /// Keys carrying the given hook
    pub fn keys_with(&self, hook: FieldHook) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |(_, h)| **h == hook)
            .map(|(k, _)| k.as_str())
    }
}

/// Save-file name derived from a field's text, `None` when the text is blank
pub fn save_file_name_from(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stem: String = trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    if stem.to_ascii_lowercase().ends_with(".json") {
        Some(stem)
    } else {
        Some(format!("{}.json", stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let hooks = HookTable::default();
        assert_eq!(hooks.hook_for("object_name"), Some(FieldHook::SaveFileName));
        assert_eq!(hooks.hook_for("dag_owner"), Some(FieldHook::OsUser));
        assert_eq!(hooks.hook_for("endpoint"), None);
    }

    #[test]
    fn test_table_deserializes_from_settings_map() {
        let hooks: HookTable =
            serde_json::from_str(r#"{"owner": "os_user", "target": "save_file_name"}"#).unwrap();
        assert_eq!(hooks.hook_for("owner"), Some(FieldHook::OsUser));
        assert_eq!(hooks.hook_for("object_name"), None);
        let owners: Vec<&str> = hooks.keys_with(FieldHook::OsUser).collect();
        assert_eq!(owners, vec!["owner"]);
    }

    #[test]
    fn test_save_file_name_from_text() {
        assert_eq!(save_file_name_from("dim_client"), Some("dim_client.json".to_string()));
        assert_eq!(save_file_name_from("a/b.JSON"), Some("a_b.JSON".to_string()));
        assert_eq!(save_file_name_from("   "), None);
    }
}
