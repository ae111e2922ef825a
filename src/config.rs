//! Runtime configuration read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::engine::StageTable;
use crate::fleet::FleetSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
    #[error("STAGE_DURATIONS_SECS expects 4 comma-separated values, got {0}")]
    StageCount(usize),
}

/// Everything the server needs to start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub host: String,
    pub port: u16,
    pub fleet: FleetSettings,
    pub creation_interval: Duration,
    pub advance_interval: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            fleet: FleetSettings::default(),
            creation_interval: Duration::from_secs(60),
            advance_interval: Duration::from_secs(10),
        }
    }
}

impl SimConfig {
    /// Load from process environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let stages = match lookup("STAGE_DURATIONS_SECS") {
            Some(raw) => parse_stage_durations(&raw)?,
            None => defaults.fleet.stages,
        };
        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            fleet: FleetSettings {
                fleet_size: positive(
                    "FLEET_SIZE",
                    parse_or(&lookup, "FLEET_SIZE", defaults.fleet.fleet_size)?,
                )?,
                batch_size: parse_or(&lookup, "BATCH_SIZE", defaults.fleet.batch_size)?,
                stages,
            },
            creation_interval: Duration::from_secs(positive(
                "CREATION_INTERVAL_SECS",
                parse_or(
                    &lookup,
                    "CREATION_INTERVAL_SECS",
                    defaults.creation_interval.as_secs(),
                )?,
            )?),
            advance_interval: Duration::from_secs(positive(
                "ADVANCE_INTERVAL_SECS",
                parse_or(
                    &lookup,
                    "ADVANCE_INTERVAL_SECS",
                    defaults.advance_interval.as_secs(),
                )?,
            )?),
        };
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
        None => Ok(default),
    }
}

fn positive<T: Default + PartialEq>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}

/// Parse `preparation,travel,delivery,completed` seconds.
fn parse_stage_durations(raw: &str) -> Result<StageTable, ConfigError> {
    let mut values = Vec::new();
    for part in raw.split(',') {
        let secs = part
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid {
                key: "STAGE_DURATIONS_SECS",
                value: raw.to_string(),
            })?;
        values.push(Duration::from_secs(secs));
    }
    match values.as_slice() {
        &[preparation, travel, delivery, completed] => Ok(StageTable {
            preparation,
            travel,
            delivery,
            completed,
        }),
        other => Err(ConfigError::StageCount(other.len())),
    }
}
