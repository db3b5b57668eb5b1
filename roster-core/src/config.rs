//! Global roster configuration.

use std::path::PathBuf;

use config::File;
use serde::{Deserialize, Serialize};

use crate::error::{RosterError, RosterResult};

static DEFAULT_DATA_DIR: &str = "~/roster";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

/// Global configuration at ~/.config/roster/config.toml
///
/// The storage target is carried here and handed to `open_store`
/// explicitly; nothing reads a global connection string.
#[derive(Serialize, Deserialize, Clone)]
pub struct Config {
    /// Where the JSON documents live when no database is configured.
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite database file. When set, it replaces the JSON store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            database: None,
        }
    }
}

impl Config {
    pub fn config_path() -> RosterResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RosterError::Config("Could not determine config directory".into()))?
            .join("roster");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> RosterResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        let config: Config = config::Config::builder()
            .add_source(File::from(config_path).required(false))
            .build()
            .map_err(|e| RosterError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| RosterError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// Database file with `~` expanded, if one is configured.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.as_ref().map(|db| {
            let full_path_str = shellexpand::tilde(&db.to_string_lossy()).into_owned();
            PathBuf::from(full_path_str)
        })
    }

    /// Save the current config to ~/.config/roster/config.toml
    pub fn save(&self) -> RosterResult<()> {
        let config_path = Self::config_path()?;

        let content =
            toml::to_string_pretty(self).map_err(|e| RosterError::Config(e.to_string()))?;

        std::fs::write(&config_path, content)
            .map_err(|e| RosterError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &std::path::Path) -> RosterResult<()> {
        let contents = format!(
            "\
# roster configuration

# Where the JSON documents live when no database is configured:
# data_dir = \"{}\"

# SQLite database file; when set, it replaces the JSON store:
# database = \"~/roster/roster.db\"
",
            DEFAULT_DATA_DIR
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RosterError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RosterError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
