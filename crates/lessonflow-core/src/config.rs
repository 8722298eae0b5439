//! TOML-based application configuration.
//!
//! Stores:
//! - Timer settings (pace check interval, tick period, default mode)
//! - An optional custom stage catalog replacing the built-in lesson
//!
//! Configuration is stored at `~/.config/lessonflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::timer::{DurationMode, LessonFlowTimer, StageCatalog, DEFAULT_PACE_CHECK_INTERVAL_SECS};

/// Returns `~/.config/lessonflow[-dev]/` based on LESSONFLOW_ENV.
///
/// Set LESSONFLOW_ENV=dev to use the development config directory.
pub fn data_dir() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LESSONFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    if env == "dev" {
        base_dir.join("lessonflow-dev")
    } else {
        base_dir.join("lessonflow")
    }
}

/// Timer-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Seconds of lesson time between pace notifications; 0 disables them.
    #[serde(default = "default_pace_check_interval")]
    pub pace_check_interval_secs: u64,
    /// Real milliseconds per lesson second.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    #[serde(default)]
    pub start_compressed: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/lessonflow/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    /// Custom catalog override. The built-in lesson is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<StageCatalog>,
}

fn default_pace_check_interval() -> u64 {
    DEFAULT_PACE_CHECK_INTERVAL_SECS
}
fn default_tick_period_ms() -> u64 {
    1000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pace_check_interval_secs: default_pace_check_interval(),
            tick_period_ms: default_tick_period_ms(),
            start_compressed: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            catalog: None,
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
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(e.to_string()))?,
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
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> PathBuf {
        data_dir().join("config.toml")
    }

    /// Load from `path`, or defaults if it does not exist.
    ///
    /// A file that exists but does not parse or validate is an error; it is
    /// never silently replaced by defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into())
            }
        };
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.timer.tick_period_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.tick_period_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if let Some(catalog) = &self.catalog {
            catalog.validate()?;
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The result must still validate.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn catalog(&self) -> StageCatalog {
        self.catalog.clone().unwrap_or_default()
    }

    pub fn mode(&self) -> DurationMode {
        if self.timer.start_compressed {
            DurationMode::Compressed
        } else {
            DurationMode::Standard
        }
    }

    /// Build a timer from this configuration.
    pub fn build_timer(&self) -> std::result::Result<LessonFlowTimer, ConfigError> {
        Ok(LessonFlowTimer::with_mode(self.catalog(), self.mode())?
            .with_pace_check_interval(self.timer.pace_check_interval_secs))
    }
}
