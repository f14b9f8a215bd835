//! Configuration for the clinic data-access layer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub store: StoreConfig,
    pub collections: CollectionNames,
    pub conflicts: ConflictConfig,
}

/// Which document store backs the repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite { path: PathBuf },
}

/// Collection names in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub appointments: String,
    pub pets: String,
    pub breeds: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            appointments: "Consultas".to_string(),
            pets: "Pets".to_string(),
            breeds: "Racas".to_string(),
        }
    }
}

/// How the (veterinarian, date) uniqueness check is carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Query first, then write. Two concurrent writers can both pass the check.
    Advisory,
    /// The store checks and writes under one lock or transaction.
    #[default]
    Atomic,
}

/// Whether an update's conflict check sees the record being updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScope {
    /// The record itself counts: re-saving an unchanged date reports a conflict.
    #[default]
    IncludeSelf,
    ExcludeSelf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    pub policy: ConflictPolicy,
    pub update_scope: UpdateScope,
}

impl ClinicConfig {
    /// Parse from a JSON document. Missing sections take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Configuration for an on-disk SQLite store with default settings.
    pub fn sqlite<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            store: StoreConfig::Sqlite { path: path.into() },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClinicConfig::default();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.collections.appointments, "Consultas");
        assert_eq!(config.conflicts.policy, ConflictPolicy::Atomic);
        assert_eq!(config.conflicts.update_scope, UpdateScope::IncludeSelf);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = ClinicConfig::from_json(
            r#"{
                "store": {"backend": "sqlite", "path": "/var/lib/clinic/clinic.db"},
                "conflicts": {"policy": "advisory"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("/var/lib/clinic/clinic.db")
            }
        );
        assert_eq!(config.conflicts.policy, ConflictPolicy::Advisory);
        assert_eq!(config.conflicts.update_scope, UpdateScope::IncludeSelf);
        assert_eq!(config.collections.breeds, "Racas");
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let result = ClinicConfig::from_json(r#"{"store": {"backend": "firestore"}}"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"collections": {{"appointments": "Agenda"}}, "conflicts": {{"update_scope": "exclude_self"}}}}"#
        )
        .unwrap();

        let config = ClinicConfig::load(file.path()).unwrap();
        assert_eq!(config.collections.appointments, "Agenda");
        assert_eq!(config.collections.pets, "Pets");
        assert_eq!(config.conflicts.update_scope, UpdateScope::ExcludeSelf);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ClinicConfig::load("/nonexistent/clinic.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
