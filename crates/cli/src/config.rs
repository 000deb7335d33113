#![forbid(unsafe_code)]

use rt_storage::VaultConfig;
use rt_workflow::WorkflowOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const VAULT_CONFIG_FILE: &str = ".retag.yaml";
pub const DEFAULT_METADATA_DB: &str = ".retag/metadata.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetagConfig {
    pub vault: VaultConfig,
    pub workflow: WorkflowOptions,
    /// Relative paths are resolved against the vault root.
    pub metadata_db: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl RetagConfig {
    /// An explicit file must exist. Without one, `<vault>/.retag.yaml` is
    /// used when present.
    pub fn load(explicit: Option<&Path>, vault_root: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = vault_root.join(VAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn metadata_db_path(&self, vault_root: &Path) -> PathBuf {
        match &self.metadata_db {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => vault_root.join(path),
            None => vault_root.join(DEFAULT_METADATA_DB),
        }
    }
}
