//! Configuration file support for the breathing engine.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/breathe/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest session that can be generated (one day)
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

/// Longest duration a single phase may be configured for (one hour)
pub const MAX_PHASE_SECONDS: u32 = 3600;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Countdown timing configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i64,

    /// Length of one tick; one second in normal use
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    /// How often a paused countdown re-checks the pause flag
    #[serde(default = "default_pause_poll_millis")]
    pub pause_poll_millis: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: default_duration_minutes(),
            tick_millis: default_tick_millis(),
            pause_poll_millis: default_pause_poll_millis(),
        }
    }
}

impl SessionConfig {
    pub fn timing(&self) -> Timing {
        Timing {
            tick: Duration::from_millis(self.tick_millis),
            pause_poll: Duration::from_millis(self.pause_poll_millis),
        }
    }
}

/// Wait intervals used by the countdown task
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub tick: Duration,
    pub pause_poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        SessionConfig::default().timing()
    }
}

/// Inclusive range of seconds a phase duration is drawn from
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseRange {
    pub min: u32,
    pub max: u32,
}

impl PhaseRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min == 0 {
            return Err(Error::Config(format!(
                "{} range must start at 1 second or more",
                name
            )));
        }
        if self.min > self.max {
            return Err(Error::Config(format!(
                "{} range is empty: min {} > max {}",
                name, self.min, self.max
            )));
        }
        if self.max > MAX_PHASE_SECONDS {
            return Err(Error::Config(format!(
                "{} range max {} exceeds {} seconds",
                name, self.max, MAX_PHASE_SECONDS
            )));
        }
        Ok(())
    }
}

/// Phase duration ranges used when generating exercises
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratorConfig {
    #[serde(default = "default_inhale")]
    pub inhale: PhaseRange,

    #[serde(default = "default_hold")]
    pub hold: PhaseRange,

    #[serde(default = "default_exhale")]
    pub exhale: PhaseRange,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            inhale: default_inhale(),
            hold: default_hold(),
            exhale: default_exhale(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        self.inhale.validate("inhale")?;
        self.hold.validate("hold")?;
        self.exhale.validate("exhale")
    }

    /// Shortest exercise these ranges can produce
    pub fn min_exercise_seconds(&self) -> u64 {
        u64::from(self.inhale.min) + u64::from(self.hold.min) + u64::from(self.exhale.min)
    }
}

// Default value functions
fn default_duration_minutes() -> i64 {
    5
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_pause_poll_millis() -> u64 {
    200
}

fn default_inhale() -> PhaseRange {
    PhaseRange::new(3, 5)
}

fn default_hold() -> PhaseRange {
    PhaseRange::new(2, 4)
}

fn default_exhale() -> PhaseRange {
    PhaseRange::new(4, 6)
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(config_path) if config_path.exists() => Self::load_from(&config_path),
            other => {
                tracing::info!("No config file found at {:?}, using defaults", other);
                Ok(Self::default())
            }
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

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("breathe").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.tick_millis == 0 {
            return Err(Error::Config("tick_millis must be greater than 0".into()));
        }
        if self.session.pause_poll_millis == 0 {
            return Err(Error::Config(
                "pause_poll_millis must be greater than 0".into(),
            ));
        }
        if self.session.default_duration_minutes > MAX_DURATION_MINUTES {
            return Err(Error::Config(format!(
                "default_duration_minutes {} exceeds {} minutes",
                self.session.default_duration_minutes, MAX_DURATION_MINUTES
            )));
        }
        self.generator.validate()
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
