use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use kdb_core::{HostId, NameError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run configuration, read from a JSON file:
///
/// ```json
/// { "Hypervisor": ["kvm1", "kvm2"], "Account": { "User": "backup", "Key": "~/.ssh/id_rsa" } }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "Hypervisor")]
    pub hypervisors: Vec<String>,
    #[serde(rename = "Account")]
    pub account: AccountConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Key")]
    pub key: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: file not found", .0.display())]
    NotFound(PathBuf),
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid hypervisor entry: {0}")]
    InvalidHost(#[from] NameError),
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read { path: path.to_path_buf(), source },
        })?;
        let cfg: Config =
            serde_json::from_str(&s).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        cfg.hosts()?;
        Ok(cfg)
    }

    /// Hypervisors in file order, duplicates dropped.
    pub fn hosts(&self) -> Result<Vec<HostId>, NameError> {
        let mut out: Vec<HostId> = Vec::with_capacity(self.hypervisors.len());
        for h in &self.hypervisors {
            let host = HostId::parse(h.as_str())?;
            if !out.contains(&host) {
                out.push(host);
            }
        }
        Ok(out)
    }

    /// Key path with a leading `~` expanded.
    pub fn key_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.account.key).into_owned())
    }
}
