//! JSON documents under the working directory
//!
//! Creates the directory layout on first start and reads/writes the field,
//! page, script, connection and output documents.

use crate::config::Paths;
use crate::errors::{AppError, AppResult};
use crate::model::connection::ConnectionConfig;
use crate::model::output::OutputModel;
use crate::model::schema::{FieldSchema, PagesDocument};
use crate::services::obfuscation::Obfuscator;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Field key to SQL template
pub type SqlScriptMap = IndexMap<String, String>;

pub struct SchemaStore {
    paths: Paths,
}

impl SchemaStore {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Create missing directories and default documents
    pub fn init_layout(&self) -> AppResult<()> {
        for dir in [
            self.paths.config_dir(),
            self.paths.template_dir(),
            self.paths.save_dir(),
            self.paths.log_dir(),
        ] {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
                info!("created directory {}", dir.display());
            }
        }

        let connect = self.paths.connect_file();
        if !connect.exists() {
            let mut connections = IndexMap::new();
            connections.insert("pg".to_string(), ConnectionConfig::default());
            write_json(&connect, &connections)?;
            info!("created {}", connect.display());
        }

        let scripts = self.paths.scripts_file();
        if !scripts.exists() {
            write_json(&scripts, &json!({"object_name": "", "endpoint": ""}))?;
            info!("created {}", scripts.display());
        }

        let template = self.paths.template_file();
        if !template.exists() {
            write_json(&template, &sample_template())?;
            info!("created {}", template.display());
        }

        for path in [self.paths.fields_file(), self.paths.pages_file()] {
            if !path.exists() {
                fs::write(&path, "")?;
                info!("created empty {}", path.display());
            }
        }
        Ok(())
    }

    pub fn load_fields(&self) -> AppResult<FieldSchema> {
        let contents = read_or_empty(&self.paths.fields_file())?;
        FieldSchema::from_json_str(&contents)
    }

    pub fn load_pages(&self) -> AppResult<PagesDocument> {
        let contents = read_or_empty(&self.paths.pages_file())?;
        PagesDocument::from_json_str(&contents)
    }

    pub fn load_scripts(&self) -> AppResult<SqlScriptMap> {
        let path = self.paths.scripts_file();
        read_json_or_default(&path)
            .map_err(|e| AppError::SchemaLoad(format!("{}: {}", path.display(), e.message())))
    }

    pub fn save_scripts(&self, scripts: &SqlScriptMap) -> AppResult<()> {
        write_json(&self.paths.scripts_file(), scripts)
    }

    /// Read one named connection; an unreadable password comes back empty
    pub fn load_connection(&self, name: &str, obfuscator: &Obfuscator) -> AppResult<ConnectionConfig> {
        let path = self.paths.connect_file();
        let connections: IndexMap<String, ConnectionConfig> = read_json_or_default(&path)
            .map_err(|e| AppError::SchemaLoad(format!("{}: {}", path.display(), e.message())))?;

        let Some(mut config) = connections.get(name).cloned() else {
            warn!("no '{}' entry in {}, using defaults", name, path.display());
            return Ok(ConnectionConfig::default());
        };
        if !config.password.is_empty() {
            config.password = match obfuscator.reveal(&config.password) {
                Ok(plain) => plain,
                Err(e) => {
                    warn!("could not read stored password for '{}': {}", name, e);
                    String::new()
                }
            };
        }
        Ok(config)
    }

    /// Write one named connection, keeping the other entries
    pub fn save_connection(
        &self,
        name: &str,
        config: &ConnectionConfig,
        obfuscator: &Obfuscator,
    ) -> AppResult<()> {
        let path = self.paths.connect_file();
        // An unreadable file is left alone; rewriting it would drop the other entries
        let mut connections: IndexMap<String, Value> = read_json_or_default(&path)
            .map_err(|e| AppError::SchemaLoad(format!("{}: {}", path.display(), e.message())))?;

        let mut stored = config.clone();
        if !stored.password.is_empty() {
            stored.password = obfuscator.obfuscate(&stored.password);
        }
        connections.insert(name.to_string(), serde_json::to_value(&stored)?);
        write_json(&path, &connections)?;
        info!("saved connection '{}' ({})", name, config.describe());
        Ok(())
    }

    pub fn save_output(&self, path: &Path, output: &OutputModel) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, output.to_json_pretty()?)?;
        info!("saved output to {}", path.display());
        Ok(())
    }

    pub fn load_output(&self, path: &Path) -> AppResult<Map<String, Value>> {
        let contents = fs::read_to_string(path)?;
        OutputModel::parse_document(&contents)
    }

    /// Replace `config_fields.json` with the sample template
    pub fn copy_template_to_config(&self) -> AppResult<()> {
        let template = self.paths.template_file();
        if !template.exists() {
            return Err(AppError::Io(format!("{} not found", template.display())));
        }
        fs::copy(&template, self.paths.fields_file())?;
        info!("copied {} into config", template.display());
        Ok(())
    }
}

fn sample_template() -> Value {
    json!({
        "fields": {
            "type": "table",
            "name": "Fields",
            "values": [
                {"key": "name", "name": "Name", "type": "text"},
                {"key": "description", "name": "Description", "type": "text"},
                {"key": "type", "name": "Type", "type": "select", "values": ["table", "view"]},
                {"key": "schema", "name": "Schema", "type": "text"},
                {"key": "active", "name": "Active", "type": "boolean"}
            ]
        }
    })
}

fn read_or_empty(path: &Path) -> AppResult<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    Ok(fs::read_to_string(path)?)
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> AppResult<T> {
    let contents = read_or_empty(path)?;
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&contents)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<()> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::output::FieldChange;
    use crate::model::schema::FieldType;
    use pretty_assertions::assert_eq;

    fn store() -> (tempfile::TempDir, SchemaStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SchemaStore::new(Paths::new(dir.path()));
        store.init_layout().unwrap();
        (dir, store)
    }

    #[test]
    fn test_first_start_creates_layout() {
        let (_dir, store) = store();
        let paths = store.paths();
        assert!(paths.save_dir().is_dir());
        assert!(paths.log_dir().is_dir());
        assert!(paths.template_file().is_file());

        assert!(store.load_fields().unwrap().is_empty());
        assert!(store.load_pages().unwrap().pages.is_empty());

        let scripts = store.load_scripts().unwrap();
        assert_eq!(scripts.get("object_name"), Some(&String::new()));
        assert_eq!(scripts.get("endpoint"), Some(&String::new()));

        let obfuscator = Obfuscator::for_user("tester").unwrap();
        let pg = store.load_connection("pg", &obfuscator).unwrap();
        assert_eq!(pg, ConnectionConfig::default());
    }

    #[test]
    fn test_init_keeps_existing_documents() {
        let (_dir, store) = store();
        fs::write(store.paths().scripts_file(), r#"{"endpoint": "select 1"}"#).unwrap();
        store.init_layout().unwrap();
        let scripts = store.load_scripts().unwrap();
        assert_eq!(scripts.get("endpoint").map(String::as_str), Some("select 1"));
    }

    #[test]
    fn test_connection_password_is_obfuscated_at_rest() {
        let (_dir, store) = store();
        let obfuscator = Obfuscator::for_user("tester").unwrap();
        let config = ConnectionConfig {
            host: "db.internal".to_string(),
            password: "hunter2".to_string(),
            ..ConnectionConfig::default()
        };
        store.save_connection("pg", &config, &obfuscator).unwrap();

        let raw = fs::read_to_string(store.paths().connect_file()).unwrap();
        assert!(!raw.contains("hunter2"));
        assert_eq!(store.load_connection("pg", &obfuscator).unwrap(), config);

        let stranger = Obfuscator::for_user("someone_else").unwrap();
        assert_eq!(store.load_connection("pg", &stranger).unwrap().password, "");
    }

    #[test]
    fn test_save_connection_keeps_other_entries() {
        let (_dir, store) = store();
        let obfuscator = Obfuscator::for_user("tester").unwrap();
        fs::write(
            store.paths().connect_file(),
            r#"{"pg": {"host": "old"}, "clickhouse": {"host": "ch", "port": 9000}}"#,
        )
        .unwrap();
        store
            .save_connection("pg", &ConnectionConfig::default(), &obfuscator)
            .unwrap();

        let raw = fs::read_to_string(store.paths().connect_file()).unwrap();
        let saved: IndexMap<String, Value> = serde_json::from_str(&raw).unwrap();
        let keys: Vec<&String> = saved.keys().collect();
        assert_eq!(keys, vec!["pg", "clickhouse"]);
        assert_eq!(saved["clickhouse"]["host"], json!("ch"));
    }

    #[test]
    fn test_save_connection_refuses_to_overwrite_corrupt_file() {
        let (_dir, store) = store();
        let obfuscator = Obfuscator::for_user("tester").unwrap();
        let corrupt = r#"{"pg": {"host": "a"}, "clickhouse": {"host": "b"},}"#;
        fs::write(store.paths().connect_file(), corrupt).unwrap();

        let err = store
            .save_connection("pg", &ConnectionConfig::default(), &obfuscator)
            .unwrap_err();
        assert!(matches!(err, AppError::SchemaLoad(_)));
        assert_eq!(
            fs::read_to_string(store.paths().connect_file()).unwrap(),
            corrupt
        );
    }

    #[test]
    fn test_output_round_trip_through_disk() {
        let (dir, store) = store();
        fs::copy(store.paths().template_file(), store.paths().fields_file()).unwrap();
        let schema = store.load_fields().unwrap();
        assert_eq!(schema.get("fields").unwrap().field_type, FieldType::Table);

        let mut output = OutputModel::from_schema(&schema);
        output
            .apply(FieldChange::new(
                "fields",
                json!([{"name": "id", "description": "", "type": "table", "schema": "dwh", "active": 1}]),
            ))
            .unwrap();

        let path = dir.path().join("save_config").join("out.json");
        store.save_output(&path, &output).unwrap();
        let mut reloaded = OutputModel::from_schema(&schema);
        reloaded.replace(store.load_output(&path).unwrap());
        assert_eq!(reloaded, output);
    }

    #[test]
    fn test_corrupt_fields_is_schema_load_error() {
        let (_dir, store) = store();
        fs::write(store.paths().fields_file(), "{oops").unwrap();
        assert!(matches!(store.load_fields(), Err(AppError::SchemaLoad(_))));
    }

    #[test]
    fn test_copy_template_to_config() {
        let (_dir, store) = store();
        store.copy_template_to_config().unwrap();
        let schema = store.load_fields().unwrap();
        let columns = schema.get("fields").unwrap().columns().unwrap();
        assert_eq!(columns.len(), 5);
    }
}
