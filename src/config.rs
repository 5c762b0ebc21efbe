use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MigrationError;
use crate::models::HostingSource;
use crate::ram::RamPolicy;

/// On-disk layout of the application data directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.data_dir.join("servers")
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.data_dir.join("configs")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.configs_dir().join("servers.json")
    }

    pub fn migration_config_path(&self) -> PathBuf {
        self.configs_dir().join("migration.toml")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.configs_dir().join("migration_prefs.json")
    }

    pub fn world_staging_root(&self) -> PathBuf {
        self.data_dir.join("temp").join("world-import")
    }

    pub fn mods_staging_root(&self) -> PathBuf {
        self.data_dir.join("temp").join("mod-import")
    }

    pub fn ensure_app_dirs(&self) -> Result<(), MigrationError> {
        fs::create_dir_all(self.servers_dir())?;
        fs::create_dir_all(self.configs_dir())?;
        fs::create_dir_all(self.logs_dir())?;
        fs::create_dir_all(self.world_staging_root())?;
        fs::create_dir_all(self.mods_staging_root())?;
        Ok(())
    }
}

/// Wizard defaults, read from `configs/migration.toml`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    pub ram: RamPolicy,
    pub default_port: u16,
    pub default_online_mode: bool,
    /// Allocation used when the machine's memory cannot be read.
    pub fallback_ram_gb: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            ram: RamPolicy::default(),
            default_port: 25565,
            default_online_mode: true,
            fallback_ram_gb: 4,
        }
    }
}

impl MigrationConfig {
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: MigrationConfig = toml::from_str(&content)?;
        if config.ram.min_gb == 0 {
            return Err(MigrationError::Config("ram.min_gb must be at least 1".to_string()));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), MigrationError> {
        let content =
            toml::to_string_pretty(self).map_err(|err| MigrationError::Config(err.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MigrationPreferences {
    pub last_hosting: Option<HostingSource>,
}

/// Where remembered wizard choices live between sessions.
pub trait PreferencesStore: Send + Sync {
    fn load(&self) -> MigrationPreferences;
    fn save(&self, preferences: &MigrationPreferences) -> Result<(), MigrationError>;
}

pub struct JsonPreferencesStore {
    path: PathBuf,
}

impl JsonPreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferencesStore for JsonPreferencesStore {
    fn load(&self) -> MigrationPreferences {
        if !self.path.exists() {
            return MigrationPreferences::default();
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(value) => value,
            Err(err) => {
                warn!("failed to read {}: {}", self.path.display(), err);
                return MigrationPreferences::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    fn save(&self, preferences: &MigrationPreferences) -> Result<(), MigrationError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(preferences)?;
        fs::write(&self.path, payload)?;
        Ok(())
    }
}
