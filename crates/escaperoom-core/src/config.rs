//! TOML-based puzzle configuration.
//!
//! Holds everything a session is built from:
//! - The access code and the four sector answers
//! - Countdown duration and tick/presentation timing
//! - Audio preferences
//! - Cosmetic sector metadata (label, placeholder, icon)
//!
//! Configuration is read from `~/.config/escaperoom/config.toml` unless a
//! path is given explicitly. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result, ValidationError};
use crate::gate::CODE_WIDTH;
use crate::sectors::{Sector, SectorMeta, SectorTracker, SECTOR_COUNT};
use crate::timer::DEFAULT_TICK_INTERVAL_MS;

/// Returns `~/.config/escaperoom[-dev]/` based on ESCAPEROOM_ENV.
///
/// Set ESCAPEROOM_ENV=dev to use a development directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ESCAPEROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("escaperoom-dev")
    } else {
        base_dir.join("escaperoom")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Tick and presentation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Delay between the last sector falling and the victory screen.
    #[serde(default = "default_victory_delay")]
    pub victory_delay_ms: u64,
}

/// Audio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ambient_volume")]
    pub ambient_volume: f64,
}

/// One sector: its answer plus cosmetic metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorConfig {
    pub answer: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default)]
    pub icon: String,
}

/// Puzzle configuration.
///
/// Serialized to/from TOML at `~/.config/escaperoom/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_access_code")]
    pub access_code: String,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u64,
    /// Shown on the victory screen.
    #[serde(default = "default_final_code")]
    pub final_code: String,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default = "default_sectors")]
    pub sectors: Vec<SectorConfig>,
}

// Default functions
fn default_access_code() -> String {
    "4345".into()
}
fn default_duration_minutes() -> u64 {
    40
}
fn default_final_code() -> String {
    "TINY TOOLBOX".into()
}
fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}
fn default_victory_delay() -> u64 {
    1_000
}
fn default_true() -> bool {
    true
}
fn default_ambient_volume() -> f64 {
    0.3
}
fn default_placeholder() -> String {
    "OVERRIDE".into()
}
fn default_sectors() -> Vec<SectorConfig> {
    [("TESLA", "bolt"), ("FUSION", "flask"), ("2397", "gear"), ("1225", "pillar")]
        .into_iter()
        .map(|(answer, icon)| SectorConfig {
            answer: answer.into(),
            label: String::new(),
            placeholder: default_placeholder(),
            icon: icon.into(),
        })
        .collect()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            victory_delay_ms: default_victory_delay(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ambient_volume: default_ambient_volume(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_code: default_access_code(),
            duration_minutes: default_duration_minutes(),
            final_code: default_final_code(),
            timing: TimingConfig::default(),
            audio: AudioConfig::default(),
            sectors: default_sectors(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = match current {
                serde_json::Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let slot = match current {
                serde_json::Value::Array(items) => part
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(unknown)?,
                serde_json::Value::Object(obj) => obj.get_mut(part).ok_or_else(unknown)?,
                _ => return Err(unknown()),
            };

            if parts.peek().is_none() {
                let new_value = match &*slot {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };
                *slot = new_value;
                return Ok(());
            }

            current = slot;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or return defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    /// Sector entries are addressed by index, e.g. `sectors.0.answer`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json)?;
        Ok(())
    }

    /// Check the puzzle invariants the session relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.access_code.len() != CODE_WIDTH
            || !self.access_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::InvalidAccessCode {
                code: self.access_code.clone(),
                width: CODE_WIDTH,
            });
        }
        if self.sectors.len() != SECTOR_COUNT {
            return Err(ValidationError::SectorCount {
                expected: SECTOR_COUNT,
                found: self.sectors.len(),
            });
        }
        if let Some(i) = self.sectors.iter().position(|s| s.answer.is_empty()) {
            return Err(ValidationError::Empty(format!("sectors.{i}.answer")));
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_minutes".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.timing.tick_interval_ms == 0 {
            return Err(ValidationError::InvalidValue {
                field: "timing.tick_interval_ms".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.ambient_volume) {
            return Err(ValidationError::InvalidValue {
                field: "audio.ambient_volume".into(),
                message: "must be between 0.0 and 1.0".into(),
            });
        }
        Ok(())
    }

    /// Build the sector tracker, normalizing answers.
    pub fn sector_tracker(&self) -> SectorTracker {
        SectorTracker::new(
            self.sectors
                .iter()
                .map(|s| {
                    Sector::new(
                        &s.answer,
                        SectorMeta {
                            label: s.label.clone(),
                            placeholder: s.placeholder.clone(),
                            icon: s.icon.clone(),
                        },
                    )
                })
                .collect(),
        )
    }
}
