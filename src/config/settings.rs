//! TOML-based configuration for relmap.
//!
//! Supports a config file (relmap.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [discovery]
//! min_confidence = 0.6
//! timeout_secs = 20.0
//! max_relationships = 200
//! strict_join_inference = true
//! extra_exclusions = ["^LEGACY_", "${RELMAP_EXTRA_EXCLUSION}"]
//!
//! [discovery.thresholds]
//! min_sample_size = 80
//! uniqueness_ratio = 0.97
//!
//! [logging]
//! filter = "relmap=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::DiscoveryConfig;
use crate::error::SettingsError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RELMAP_CONFIG";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Discovery run settings.
    pub discovery: DiscoveryConfig,

    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RELMAP_LOG` is unset.
    pub filter: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text, expanding `${VAR}` references and
    /// validating the discovery section.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.expand()?;
        settings.discovery.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELMAP_CONFIG`
    /// 2. `./relmap.toml`
    /// 3. `~/.config/relmap/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("relmap.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("relmap").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// The validated discovery section.
    pub fn discovery_config(&self) -> Result<DiscoveryConfig, SettingsError> {
        self.discovery.validate()?;
        Ok(self.discovery.clone())
    }

    fn expand(&mut self) -> Result<(), SettingsError> {
        for pattern in &mut self.discovery.extra_exclusions {
            *pattern = expand_env_vars(pattern)?;
        }
        if let Some(filter) = &self.logging.filter {
            self.logging.filter = Some(expand_env_vars(filter)?);
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Only `${VAR}` is recognized; a bare `$` is kept so regex anchors survive.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }
            if !closed {
                result.push_str("${");
                result.push_str(&var_name);
                continue;
            }
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
