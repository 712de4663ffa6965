//! TOML configuration, self-healing on parse failure: an unreadable file
//! is replaced with defaults rather than aborting startup.

use crate::{CACHE_DIR, CONFIG_DIR};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub general: GeneralSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    /// Where backup profiles are written
    pub backup_folder: PathBuf,
    /// Refresh the safety catalog from the remote repository on `update`
    pub catalog_auto_refresh: bool,
    /// Serial to prefer when several devices are attached
    pub default_device: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            backup_folder: CACHE_DIR.join("profiles"),
            catalog_auto_refresh: true,
            default_device: None,
        }
    }
}

static CONFIG_FILE: LazyLock<PathBuf> = LazyLock::new(|| CONFIG_DIR.join("config.toml"));

impl Config {
    pub fn save_changes(&self) {
        match toml::to_string(self) {
            Ok(toml) => {
                if let Err(e) = fs::write(&*CONFIG_FILE, toml) {
                    error!("Could not write config file to disk: {e}");
                } else {
                    debug!("config: saved");
                }
            }
            Err(e) => error!("Could not serialize config: {e}"),
        }
    }

    #[must_use]
    pub fn load_configuration_file() -> Self {
        match fs::read_to_string(&*CONFIG_FILE) {
            Ok(s) => match toml::from_str(&s) {
                Ok(config) => return config,
                Err(e) => error!("Invalid config file: `{e}`"),
            },
            Err(e) => error!("Failed to read config file: `{e}`"),
        }
        error!("Restoring default config file");
        let default = Self::default();
        default.save_changes();
        default
    }
}
