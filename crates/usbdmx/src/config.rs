//! User configuration
//!
//! Stored as JSON next to the pairing file in the user config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use usbdmx_control::usb::{default_filters, DeviceFilter};
use usbdmx_core::LogConfig;

/// User configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Logging setup
    #[serde(default)]
    pub log_config: LogConfig,
    /// Replaces the built-in list of accepted boards when set. An empty list
    /// accepts no board at all.
    #[serde(default)]
    pub filters: Option<Vec<DeviceFilter>>,
    /// DMX address of the Flat PAR driven by the colour commands
    #[serde(default = "default_fixture_address")]
    pub fixture_address: u16,
    /// Reconnect to a paired device at startup
    #[serde(default = "default_true")]
    pub auto_connect: bool,
}

fn default_fixture_address() -> u16 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            log_config: LogConfig::default(),
            filters: None,
            fixture_address: default_fixture_address(),
            auto_connect: true,
        }
    }
}

impl UserConfig {
    /// `<config dir>/usbdmx/config.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("usbdmx");
            p.push("config.json");
            p
        })
    }

    /// Load configuration from disk, defaults when missing or unreadable
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), std::io::Error> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Filter list to present, the configured one or the built-in table
    pub fn effective_filters(&self) -> Vec<DeviceFilter> {
        self.filters.clone().unwrap_or_else(default_filters)
    }
}
