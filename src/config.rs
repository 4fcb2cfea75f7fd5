//! Startup configuration
//!
//! Loaded once from a TOML file and read-only afterwards:
//!
//! ```toml
//! [teleop]
//! timeout = 0.5
//! turbo_multiplier = 1.0
//! base_multiplier = 0.5
//! min_linear_speed = -0.5
//! max_linear_speed = 1.0
//! min_angular_speed = -1.5
//! max_angular_speed = 1.5
//! enabled_on_start = true
//!
//! [mqtt]            # optional, bridge disabled when missing
//! host = "localhost"
//!
//! [gamepad]         # optional, local gamepad disabled when missing
//! poll_interval_ms = 20
//! ```
//!
//! Every `[teleop]` key is required. Missing keys are a startup error, never
//! replaced by defaults.

use crate::controller::event_collector::CollectorSettings;
use crate::mqtt::config::MqttConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable overriding the config location
pub const CONFIG_ENV: &str = "GAMEPAD_TELEOP_CONFIG";

const CONFIG_DIR: &str = "gamepad-teleop";
const CONFIG_FILE: &str = "config.toml";

// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("No config path given and no config directory available")]
    NoConfigPath,
}

/// Translator settings
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TeleopConfig {
    /// Seconds without input before the watchdog stops the robot
    pub timeout: f64,
    pub turbo_multiplier: f64,
    pub base_multiplier: f64,
    pub min_linear_speed: f64,
    pub max_linear_speed: f64,
    pub min_angular_speed: f64,
    pub max_angular_speed: f64,
    /// Whether velocity commands are published right after startup
    pub enabled_on_start: bool,
}

impl TeleopConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("timeout", self.timeout),
            ("turbo_multiplier", self.turbo_multiplier),
            ("base_multiplier", self.base_multiplier),
            ("min_linear_speed", self.min_linear_speed),
            ("max_linear_speed", self.max_linear_speed),
            ("min_angular_speed", self.min_angular_speed),
            ("max_angular_speed", self.max_angular_speed),
        ];
        for (key, value) in finite {
            if !value.is_finite() {
                return Err(invalid(key, format!("{} is not a finite number", value)));
            }
        }

        if self.timeout <= 0.0 {
            return Err(invalid("timeout", format!("{} must be positive", self.timeout)));
        }
        if self.turbo_multiplier < 0.0 {
            return Err(invalid(
                "turbo_multiplier",
                format!("{} must not be negative", self.turbo_multiplier),
            ));
        }
        if self.base_multiplier < 0.0 {
            return Err(invalid(
                "base_multiplier",
                format!("{} must not be negative", self.base_multiplier),
            ));
        }
        if self.min_linear_speed > self.max_linear_speed {
            return Err(invalid(
                "min_linear_speed",
                format!(
                    "{} exceeds max_linear_speed {}",
                    self.min_linear_speed, self.max_linear_speed
                ),
            ));
        }
        if self.min_angular_speed > self.max_angular_speed {
            return Err(invalid(
                "min_angular_speed",
                format!(
                    "{} exceeds max_angular_speed {}",
                    self.min_angular_speed, self.max_angular_speed
                ),
            ));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { key, reason }
}

/// Local gamepad source
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GamepadConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Index into the connected gamepads, first one when missing
    #[serde(default)]
    pub index: Option<usize>,
}

fn default_poll_interval_ms() -> u64 {
    20
}

impl From<&GamepadConfig> for CollectorSettings {
    fn from(config: &GamepadConfig) -> Self {
        CollectorSettings {
            poll_interval_ms: config.poll_interval_ms,
            gamepad_index: config.index,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub teleop: TeleopConfig,
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,
    #[serde(default)]
    pub gamepad: Option<GamepadConfig>,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.teleop.validate()?;
        if let Some(gamepad) = &self.gamepad {
            if gamepad.poll_interval_ms == 0 {
                return Err(invalid(
                    "gamepad.poll_interval_ms",
                    "must be at least 1".to_string(),
                ));
            }
        }
        if let Some(mqtt) = &self.mqtt {
            mqtt.validate()?;
        }
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::from_toml(&content)?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

/// Picks the config file: explicit argument, then environment, then the
/// user config directory
pub fn resolve_config_path(arg: Option<String>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = arg {
        return Ok(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoConfigPath)
}
