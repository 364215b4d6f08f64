//! Vault configuration loaded from `config.toml`.
//!
//! ```toml
//! default_vault = "notes"
//!
//! [vaults.notes]
//! path = "~/Notes"
//! exclude_paths = [".git", ".obsidian", "templates"]
//! insert_location = "after_title"
//! ```

use crate::error::{Result, VaultError};
use crate::types::InsertLocation;
use crate::vault::{default_exclude_paths, VaultContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings of one configured vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub path: PathBuf,
    #[serde(default = "default_exclude_paths")]
    pub exclude_paths: Vec<PathBuf>,
    #[serde(default)]
    pub insert_location: InsertLocation,
}

impl VaultConfig {
    fn into_context(self) -> Result<VaultContext> {
        Ok(VaultContext::new(expand_home(&self.path))?
            .with_exclude_paths(self.exclude_paths)
            .with_insert_location(self.insert_location))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Vault used when no name is given.
    #[serde(default)]
    pub default_vault: Option<String>,
    #[serde(default)]
    pub vaults: BTreeMap<String, VaultConfig>,
}

impl Config {
    /// `<config dir>/vaultmeta/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vaultmeta").join("config.toml"))
    }

    /// Load a config file. With no explicit path, a missing default file
    /// yields an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(VaultError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), "no config file");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), vaults = config.vaults.len(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the vault to operate on.
    ///
    /// A vault path given on the command line bypasses the config file and
    /// uses default settings. Otherwise the named vault, the default vault,
    /// or the only configured vault is used.
    pub fn resolve(&self, cli_vault: Option<&Path>, name: Option<&str>) -> Result<VaultContext> {
        if let Some(path) = cli_vault {
            return VaultContext::new(expand_home(path));
        }

        let name = match name.or(self.default_vault.as_deref()) {
            Some(name) => name.to_string(),
            None if self.vaults.len() == 1 => self.vaults.keys().next().cloned().unwrap_or_default(),
            None if self.vaults.is_empty() => {
                return Err(VaultError::ConfigError(
                    "no vault configured; pass --vault or add one to the config file".to_string(),
                ));
            }
            None => {
                return Err(VaultError::ConfigError(
                    "several vaults configured; pass --vault-name or set default_vault".to_string(),
                ));
            }
        };

        let vault = self.vaults.get(&name).cloned().ok_or_else(|| {
            VaultError::ConfigError(format!("no vault named '{}' in the config file", name))
        })?;
        vault.into_context()
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
