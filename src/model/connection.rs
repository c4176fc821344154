//! Database connection settings

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const DEFAULT_PORT: u16 = 5432;

/// One entry of `sql_connect.json`; `password` is plain text in memory
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(
        default = "default_port",
        deserialize_with = "port_from_string_or_number",
        serialize_with = "port_as_string"
    )]
    pub port: u16,
    #[serde(default = "default_dbname")]
    pub dbname: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            dbname: default_dbname(),
            user: default_user(),
            password: String::new(),
        }
    }
}

// Keep passwords out of logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl ConnectionConfig {
    /// `user@host:port/dbname`, for status lines
    pub fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_dbname() -> String {
    "postgres".to_string()
}

fn default_user() -> String {
    "postgres".to_string()
}

fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) if s.trim().is_empty() => Ok(DEFAULT_PORT),
        Port::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", s))),
    }
}

fn port_as_string<S>(port: &u16, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&port.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_accepts_string_or_number() {
        let from_text: ConnectionConfig =
            serde_json::from_value(json!({"host": "db", "port": "6432"})).unwrap();
        assert_eq!(from_text.port, 6432);
        assert_eq!(from_text.dbname, "postgres");

        let from_number: ConnectionConfig =
            serde_json::from_value(json!({"port": 5433})).unwrap();
        assert_eq!(from_number.port, 5433);

        assert!(serde_json::from_value::<ConnectionConfig>(json!({"port": "abc"})).is_err());
    }

    #[test]
    fn test_port_written_as_string() {
        let value = serde_json::to_value(ConnectionConfig::default()).unwrap();
        assert_eq!(value["port"], json!("5432"));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = ConnectionConfig {
            password: "hunter2".to_string(),
            ..ConnectionConfig::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
        assert_eq!(config.describe(), "postgres@localhost:5432/postgres");
    }
}
