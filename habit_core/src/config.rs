//! Configuration file support for the habit tracker.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/habit/config.toml`.

use crate::{AchievementDef, Error, Milestone, Result, XpPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub xp: XpConfig,

    #[serde(default)]
    pub achievements: AchievementsConfig,

    #[serde(default)]
    pub milestones: MilestonesConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Which user the local tracker acts as
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
        }
    }
}

/// XP reward and leveling parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct XpConfig {
    #[serde(default = "default_completion_reward")]
    pub completion_reward: i64,

    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: i64,

    /// Floor XP at zero when habits are un-marked
    #[serde(default = "default_clamp_at_zero")]
    pub clamp_at_zero: bool,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            completion_reward: default_completion_reward(),
            xp_per_level: default_xp_per_level(),
            clamp_at_zero: default_clamp_at_zero(),
        }
    }
}

impl XpConfig {
    pub fn policy(&self) -> XpPolicy {
        XpPolicy {
            completion_reward: self.completion_reward,
            xp_per_level: self.xp_per_level,
            clamp_at_zero: self.clamp_at_zero,
        }
    }
}

/// Extra achievements on top of the built-in catalog
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AchievementsConfig {
    #[serde(default)]
    pub custom: Vec<AchievementDef>,
}

/// Replacement milestone list (built-ins are used when empty)
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct MilestonesConfig {
    #[serde(default)]
    pub custom: Vec<Milestone>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("habit")
}

fn default_user_id() -> String {
    "local".into()
}

fn default_completion_reward() -> i64 {
    10
}

fn default_xp_per_level() -> i64 {
    100
}

fn default_clamp_at_zero() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the XP rules cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.xp.xp_per_level <= 0 {
            return Err(Error::Config(format!(
                "xp.xp_per_level must be positive, got {}",
                self.xp.xp_per_level
            )));
        }
        if self.xp.completion_reward < 0 {
            return Err(Error::Config(format!(
                "xp.completion_reward must not be negative, got {}",
                self.xp.completion_reward
            )));
        }
        if self.user.id.trim().is_empty() {
            return Err(Error::Config("user.id must not be empty".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("habit").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
