// ABOUTME: Parses optional TOML configuration with connection and run defaults
// ABOUTME: Values here are overridden by command-line flags

use crate::mysql::Dialect;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub connection: ConnectionConfig,
    pub dump: DumpConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub container: Option<String>,
    pub container_runtime: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client: Option<Dialect>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpConfig {
    pub no_lock: Vec<String>,
    pub no_lock_all: bool,
    pub include_databases: Option<Vec<String>>,
    pub exclude_databases: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub include_mysql: bool,
    pub no_drop: bool,
    pub include_databases: Option<Vec<String>>,
    pub exclude_databases: Option<Vec<String>>,
}

pub fn load_config(path: &Path) -> Result<ToolConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("Failed to parse TOML config at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_sample_config() {
        let mut tmp = NamedTempFile::new().unwrap();
        let contents = r#"
            [connection]
            container = "mysql"
            client = "mariadb"

            [dump]
            no_lock = ["analytics", "events"]
            exclude_tables = ["shop.sessions"]

            [import]
            no_drop = true
        "#;
        write!(tmp, "{}", contents).unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.connection.container.as_deref(), Some("mysql"));
        assert_eq!(config.connection.client, Some(Dialect::Mariadb));
        assert_eq!(config.dump.no_lock, vec!["analytics", "events"]);
        assert!(!config.dump.no_lock_all);
        assert_eq!(
            config.dump.exclude_tables,
            Some(vec!["shop.sessions".to_string()])
        );
        assert!(config.import.no_drop);
        assert!(!config.import.include_mysql);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let tmp = NamedTempFile::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert!(config.connection.container.is_none());
        assert!(config.dump.no_lock.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "[connection]\ncontainr = \"mysql\"\n").unwrap();

        let err = load_config(tmp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse TOML config"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/dumper.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dumper.toml"));
    }
}
