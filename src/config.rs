//! User settings.
//!
//! Layered with the `config` crate: built-in defaults, then
//! `<config_dir>/taskflow/config.toml` if present, then `TASKFLOW_*`
//! environment variables.

use crate::error::Result;
use crate::planner::query::{Filter, Query, SortKey};
use crate::planner::storage::default_data_path;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "TASKFLOW";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Task file; defaults to the platform data dir
    pub data_file: Option<PathBuf>,
    pub default_sort: String,
    pub default_filter: String,
    pub show_completed: bool,
    /// How long a notification stays on screen
    pub toast_seconds: u64,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskflow").join("config.toml"))
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path().as_deref())
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("default_sort", "date")?
            .set_default("default_filter", "all")?
            .set_default("show_completed", true)?
            .set_default("toast_seconds", 3_i64)?
            .set_default("log_level", "info")?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_file.clone().unwrap_or_else(default_data_path)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            let mut dir = default_data_path();
            dir.set_file_name("logs");
            dir
        })
    }

    pub fn toast_lifetime(&self) -> Duration {
        Duration::from_secs(self.toast_seconds.max(1))
    }

    /// The query the shell starts with.
    pub fn initial_query(&self) -> Result<Query> {
        let filter: Filter = self.default_filter.parse()?;
        let sort: SortKey = self.default_sort.parse()?;
        Ok(Query::new(filter, sort).show_completed(self.show_completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(Some(&dir.path().join("missing.toml"))).unwrap();

        assert_eq!(settings.default_sort, "date");
        assert_eq!(settings.toast_lifetime(), Duration::from_secs(3));
        assert_eq!(settings.initial_query().unwrap(), Query::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
default_sort = "priority"
default_filter = "pending"
show_completed = false
toast_seconds = 5
data_file = "/tmp/taskflow-test/tasks.json"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        let query = settings.initial_query().unwrap();

        assert_eq!(query.sort, SortKey::Priority);
        assert_eq!(query.filter, Filter::Pending);
        assert!(!query.show_completed);
        assert_eq!(settings.toast_lifetime(), Duration::from_secs(5));
        assert_eq!(settings.data_path(), PathBuf::from("/tmp/taskflow-test/tasks.json"));
    }

    #[test]
    fn test_bad_sort_name_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_sort = \"size\"\n").unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert!(settings.initial_query().is_err());
    }
}
