//! Simulation configuration.
//!
//! Values are supplied externally as TOML; every field has a default so a
//! partial document is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::HISTORY_CAPACITY;
use crate::movement::MovementConfig;

/// Default fixed tick rate (50 Hz, a 20 ms step).
pub const DEFAULT_TICK_RATE_HZ: u32 = 50;

/// Configuration shared by client and server sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_rate_hz: u32,
    /// Slots per history buffer; a power of two no larger than 65536.
    pub history_capacity: usize,
    pub movement: MovementConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            history_capacity: HISTORY_CAPACITY,
            movement: MovementConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("tick_rate_hz must be positive")]
    InvalidTickRate,

    #[error("history_capacity must be a power of two no larger than 65536, got {0}")]
    InvalidCapacity(usize),

    #[error("movement.max_move_speed must be positive, got {0}")]
    InvalidMaxSpeed(f32),

    #[error("movement.ground_check_radius must not be negative, got {0}")]
    InvalidGroundRadius(f32),
}

impl SimConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::InvalidTickRate);
        }
        if !self.history_capacity.is_power_of_two()
            || self.history_capacity > usize::from(u16::MAX) + 1
        {
            return Err(ConfigError::InvalidCapacity(self.history_capacity));
        }
        let max_speed = self.movement.max_move_speed;
        if max_speed.is_nan() || max_speed <= 0.0 {
            return Err(ConfigError::InvalidMaxSpeed(max_speed));
        }
        let radius = self.movement.ground_check_radius;
        if radius.is_nan() || radius < 0.0 {
            return Err(ConfigError::InvalidGroundRadius(radius));
        }
        Ok(())
    }

    /// Fixed tick duration in seconds.
    pub fn fixed_delta(&self) -> f32 {
        1.0 / self.tick_rate_hz as f32
    }
}
