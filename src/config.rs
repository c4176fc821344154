use crate::errors::AppResult;
use crate::model::hooks::HookTable;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the working directory
pub const HOME_ENV: &str = "CONFIG_BUILDER_HOME";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    /// Entry of `sql_connect.json` the app connects with
    pub connection_name: String,
    pub save_file_name: String,
    pub tick_rate_ms: u64,
    pub log_level: String,
    pub hooks: HookTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Config Builder".to_string(),
            connection_name: "pg".to_string(),
            save_file_name: "config_save.json".to_string(),
            tick_rate_ms: 100,
            log_level: "info".to_string(),
            hooks: HookTable::default(),
        }
    }
}

impl Settings {
    /// Load `settings.json`, falling back to defaults when it is absent
    pub fn load(paths: &Paths) -> AppResult<Settings> {
        let path = paths.settings_file();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let contents = fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Directory layout under the working directory
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$CONFIG_BUILDER_HOME`, else the executable's directory, else the cwd
    pub fn resolve() -> Self {
        if let Ok(home) = env::var(HOME_ENV) {
            if !home.trim().is_empty() {
                return Self::new(home);
            }
        }
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        match exe_dir {
            Some(dir) => Self::new(dir),
            None => Self::new("."),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.root.join("template")
    }

    pub fn save_dir(&self) -> PathBuf {
        self.root.join("save_config")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn fields_file(&self) -> PathBuf {
        self.config_dir().join("config_fields.json")
    }

    pub fn pages_file(&self) -> PathBuf {
        self.config_dir().join("config_pages.json")
    }

    pub fn connect_file(&self) -> PathBuf {
        self.config_dir().join("sql_connect.json")
    }

    pub fn scripts_file(&self) -> PathBuf {
        self.config_dir().join("sql_scripts.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir().join("settings.json")
    }

    pub fn template_file(&self) -> PathBuf {
        self.template_dir().join("config_fields.json")
    }

    /// A save-file path; bare names land in `save_config/`, other relative
    /// paths are taken from the working directory root
    pub fn save_file(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else if path.components().count() > 1 {
            self.root.join(path)
        } else {
            self.save_dir().join(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hooks::FieldHook;

    #[test]
    fn test_settings_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&Paths::new(dir.path())).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.connection_name, "pg");
        assert_eq!(settings.tick_rate_ms, 100);
    }

    #[test]
    fn test_settings_partial_document() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        fs::create_dir_all(paths.config_dir()).unwrap();
        fs::write(
            paths.settings_file(),
            r#"{"app_name": "DWH", "hooks": {"owner": "os_user"}}"#,
        )
        .unwrap();

        let settings = Settings::load(&paths).unwrap();
        assert_eq!(settings.app_name, "DWH");
        assert_eq!(settings.save_file_name, "config_save.json");
        assert_eq!(settings.hooks.hook_for("owner"), Some(FieldHook::OsUser));
        assert_eq!(settings.hooks.hook_for("dag_owner"), None);
    }

    #[test]
    fn test_save_file_resolution() {
        let paths = Paths::new("/work");
        assert_eq!(
            paths.save_file("dim.json"),
            PathBuf::from("/work/save_config/dim.json")
        );
        assert_eq!(paths.save_file("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
        assert_eq!(
            paths.save_file("out/x.json"),
            PathBuf::from("/work/out/x.json")
        );
        assert_eq!(
            paths.save_file("./x.json"),
            PathBuf::from("/work/./x.json")
        );
    }
}
