//! Configuration loading and validation.
//!
//! The config file is TOML: a list of `[[pools]]` tables keyed by the
//! filesystem label that triggers them, an optional `[email]` section, an
//! optional `[push]` section, and `[general]` for daemon-wide switches.
//! Loaded once at startup; a reload requires a process restart.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use figment::{
    Figment,
    providers::{Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] figment::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A string that hides its own value.
///
/// `Debug` and `Display` render a fixed mask; the real contents are only
/// reachable through [`Secret::expose`].
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*****")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*****")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Must equal the filesystem label that triggers this pool.
    pub name: String,
    #[serde(default)]
    pub autobackup_parameters: Vec<String>,
    #[serde(default)]
    pub passphrase: Option<Secret>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default = "default_from")]
    pub from: String,
    /// An empty list disables the email channel.
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_from() -> String {
    "admin".to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// An absent or empty URL disables the push channel.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneralConfig {
    #[serde(default = "default_beep")]
    beep: bool,
}

fn default_beep() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            beep: default_beep(),
        }
    }
}

/// Raw file shape before validation; pools arrive as a list of tables.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    pools: Vec<PoolConfig>,
    #[serde(default)]
    email: EmailConfig,
    #[serde(default)]
    push: PushConfig,
    #[serde(default)]
    general: GeneralConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Keyed by filesystem label; keys are unique.
    pub pools: HashMap<String, PoolConfig>,
    pub email: EmailConfig,
    pub push: PushConfig,
    pub beep: bool,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = Figment::new().merge(Toml::file(path)).extract()?;
        Self::from_raw(raw)
    }

    #[cfg(test)]
    fn load_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = Figment::new().merge(Toml::string(contents)).extract()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        if raw.pools.is_empty() {
            return Err(ConfigError::Invalid("no pools are configured".into()));
        }

        let mut pools: HashMap<String, PoolConfig> = HashMap::with_capacity(raw.pools.len());
        for pool in raw.pools {
            if pool.name.is_empty() {
                return Err(ConfigError::Invalid("pool name must not be empty".into()));
            }
            let name = pool.name.clone();
            if pools.insert(name.clone(), pool).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "pool {name} has multiple definitions"
                )));
            }
        }

        Ok(Self {
            pools,
            email: raw.email,
            push: raw.push,
            beep: raw.general.beep,
        })
    }
}
