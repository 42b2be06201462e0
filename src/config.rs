use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::patch::download::{Channel, Source};
use crate::patch::error::PatchError;

/// Top‑level patcher configuration (mirrors the built-in defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatcherConfig {
    /// Where the game lives on a stock install
    pub default_dir: PathBuf,
    /// File whose presence marks a directory as the game folder
    pub marker: String,
    /// Key of the remembered installation folder
    pub env_key: String,
    pub archive_name: String,
    /// Extraction folder, also the top-level folder inside the archive
    pub staging_dir: String,
    pub readme_name: String,
    pub connect_timeout_secs: u64,
    /// Abort the download when no bytes arrive for this long
    pub inactivity_timeout_secs: u64,
    pub channels: Vec<Channel>,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from(r"C:\Program Files (x86)\Hearthstone"),
            marker: "Hearthstone.exe".to_string(),
            env_key: "HEARTHSTONE_HOME".to_string(),
            archive_name: "patch.zip".to_string(),
            staging_dir: "patch".to_string(),
            readme_name: "prepatch_readme.txt".to_string(),
            connect_timeout_secs: 30,
            inactivity_timeout_secs: 300,
            channels: Self::default_channels(),
        }
    }
}

impl PatcherConfig {
    fn default_channels() -> Vec<Channel> {
        vec![
            Channel {
                name: "Default".to_string(),
                source: Source::Direct {
                    url: "https://hearthstoneaccess.com/files/pre_patch.zip".to_string(),
                },
            },
            Channel {
                name: "Battlegrounds Duos (BETA)".to_string(),
                source: Source::Direct {
                    url: "https://hearthstoneaccess.com/files/duos_beta_patch.zip".to_string(),
                },
            },
        ]
    }

    /// `<config dir>/hsa-patcher/patcher.toml`
    pub fn default_path() -> Result<PathBuf, PatchError> {
        dirs::config_dir()
            .map(|dir| dir.join("hsa-patcher").join("patcher.toml"))
            .ok_or_else(|| PatchError::Config("could not determine config directory".to_string()))
    }

    /// Load the configuration, writing the defaults first if the file is absent.
    pub fn load_or_create(path: &Path) -> Result<Self, PatchError> {
        if !path.exists() {
            info!("Config not found at {}, creating default configuration", path.display());

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    PatchError::Config(format!("failed to create {}: {e}", parent.display()))
                })?;
            }

            let default_toml = toml::to_string_pretty(&Self::default())
                .map_err(|e| PatchError::Config(format!("failed to serialize defaults: {e}")))?;
            fs::write(path, default_toml).map_err(|e| {
                PatchError::Config(format!("failed to write {}: {e}", path.display()))
            })?;
        }

        let raw = fs::read_to_string(path)
            .map_err(|e| PatchError::Config(format!("failed to read {}: {e}", path.display())))?;
        let cfg: Self = toml::from_str(&raw)
            .map_err(|e| PatchError::Config(format!("failed to parse {}: {e}", path.display())))?;

        if cfg.channels.is_empty() {
            return Err(PatchError::Config(format!(
                "{} does not define any channels",
                path.display()
            )));
        }

        for channel in &cfg.channels {
            channel.source.validate().map_err(|reason| {
                PatchError::Config(format!("channel '{}' in {}: {reason}", channel.name, path.display()))
            })?;
        }

        info!("Using config from: {}", path.display());
        Ok(cfg)
    }

    /// Look a channel up by name (case-insensitive)
    pub fn channel(&self, name: &str) -> Result<&Channel, PatchError> {
        self.channels
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let known: Vec<&str> = self.channels.iter().map(|c| c.name.as_str()).collect();
                PatchError::Config(format!(
                    "unknown channel '{name}' (available: {})",
                    known.join(", ")
                ))
            })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}
