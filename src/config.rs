//! Engine configuration.
//!
//! Values come from environment variables; anything unset keeps its default.
//! Each setting is looked up under its `REACT_*` name first. The `REACT_`
//! prefix keeps the engine's variables apart from the rest of a bot's
//! environment. The unprefixed names (`STORE_SIZE`, `THROTTLE_*`) and the
//! `BROBBOT_REACT_*` names older deployments set are accepted as fallbacks,
//! in that order.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReactError, ReactResult};

pub const ENV_STORE_SIZE: &str = "REACT_STORE_SIZE";
pub const ENV_BASE_EXPIRATION: &str = "REACT_THROTTLE_BASE_EXPIRATION_SECONDS";
pub const ENV_FREQUENCY_MULTIPLIER: &str = "REACT_THROTTLE_FREQUENCY_MULTIPLIER";
pub const ENV_COUNT_BEFORE_THROTTLE: &str = "REACT_COUNT_BEFORE_THROTTLE";
pub const ENV_SNAPSHOT_PATH: &str = "REACT_SNAPSHOT_PATH";

const STORE_SIZE_NAMES: &[&str] = &[ENV_STORE_SIZE, "STORE_SIZE", "BROBBOT_REACT_STORE_SIZE"];
const BASE_EXPIRATION_NAMES: &[&str] = &[
    ENV_BASE_EXPIRATION,
    "THROTTLE_BASE_EXPIRATION_SECONDS",
    "BROBBOT_REACT_THROTTLE_EXPIRATION",
];
const FREQUENCY_MULTIPLIER_NAMES: &[&str] = &[
    ENV_FREQUENCY_MULTIPLIER,
    "THROTTLE_FREQUENCY_MULTIPLIER",
    "BROBBOT_REACT_THROTTLE_FREQUENCY_MULTIPLIER",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactConfig {
    /// Maximum number of stored term records across all buckets.
    #[serde(default = "default_store_size")]
    pub store_size: usize,
    /// Base cooldown applied to a term after it fired.
    #[serde(default = "default_base_expiration_secs")]
    pub throttle_base_expiration_secs: u64,
    /// Base of the frequency-decay exponent.
    #[serde(default = "default_frequency_multiplier")]
    pub throttle_frequency_multiplier: f64,
    /// Count candidate appearances before the throttle filter reads them.
    #[serde(default = "default_count_before_throttle")]
    pub count_before_throttle: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            store_size: default_store_size(),
            throttle_base_expiration_secs: default_base_expiration_secs(),
            throttle_frequency_multiplier: default_frequency_multiplier(),
            count_before_throttle: default_count_before_throttle(),
            snapshot_path: None,
        }
    }
}

fn default_store_size() -> usize {
    200
}

fn default_base_expiration_secs() -> u64 {
    300
}

fn default_frequency_multiplier() -> f64 {
    2.0
}

fn default_count_before_throttle() -> bool {
    true
}

impl ReactConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> ReactResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ReactResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some((_, size)) = parse_first::<usize>(&lookup, STORE_SIZE_NAMES)? {
            config.store_size = size;
        }
        if let Some((_, secs)) = parse_first::<u64>(&lookup, BASE_EXPIRATION_NAMES)? {
            config.throttle_base_expiration_secs = secs;
        }
        if let Some((key, multiplier)) = parse_first::<f64>(&lookup, FREQUENCY_MULTIPLIER_NAMES)? {
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(ReactError::Config {
                    key: key.into(),
                    message: format!("must be a non-negative number, got {multiplier}"),
                });
            }
            config.throttle_frequency_multiplier = multiplier;
        }
        if let Some(flag) = parse_var::<bool>(&lookup, ENV_COUNT_BEFORE_THROTTLE)? {
            config.count_before_throttle = flag;
        }
        if let Some(path) = lookup(ENV_SNAPSHOT_PATH).filter(|p| !p.trim().is_empty()) {
            config.snapshot_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn with_store_size(mut self, size: usize) -> Self {
        self.store_size = size;
        self
    }

    pub fn with_base_expiration(mut self, secs: u64) -> Self {
        self.throttle_base_expiration_secs = secs;
        self
    }

    pub fn with_frequency_multiplier(mut self, multiplier: f64) -> Self {
        self.throttle_frequency_multiplier = multiplier;
        self
    }

    pub fn with_count_before_throttle(mut self, flag: bool) -> Self {
        self.count_before_throttle = flag;
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

/// Parse the first of `keys` that is set to a non-blank value.
fn parse_first<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    keys: &[&'static str],
) -> ReactResult<Option<(&'static str, T)>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    for &key in keys {
        if let Some(value) = parse_var::<T>(lookup, key)? {
            return Ok(Some((key, value)));
        }
    }
    Ok(None)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> ReactResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<T>().map(Some).map_err(|e| ReactError::Config {
        key: key.to_string(),
        message: format!("{trimmed:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ReactConfig::default();
        assert_eq!(config.store_size, 200);
        assert_eq!(config.throttle_base_expiration_secs, 300);
        assert_eq!(config.throttle_frequency_multiplier, 2.0);
        assert!(config.count_before_throttle);
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ReactConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ReactConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = ReactConfig::from_lookup(lookup_from(&[
            (ENV_STORE_SIZE, "50"),
            (ENV_BASE_EXPIRATION, "60"),
            (ENV_FREQUENCY_MULTIPLIER, "3.5"),
            (ENV_COUNT_BEFORE_THROTTLE, "false"),
            (ENV_SNAPSHOT_PATH, "/var/lib/react/brain.json"),
        ]))
        .unwrap();

        assert_eq!(config.store_size, 50);
        assert_eq!(config.throttle_base_expiration_secs, 60);
        assert_eq!(config.throttle_frequency_multiplier, 3.5);
        assert!(!config.count_before_throttle);
        assert_eq!(
            config.snapshot_path,
            Some(PathBuf::from("/var/lib/react/brain.json"))
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            ReactConfig::from_lookup(lookup_from(&[(ENV_STORE_SIZE, "  "), (ENV_SNAPSHOT_PATH, "")]))
                .unwrap();
        assert_eq!(config.store_size, 200);
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let err = ReactConfig::from_lookup(lookup_from(&[(ENV_STORE_SIZE, "lots")])).unwrap_err();
        match err {
            ReactError::Config { key, .. } => assert_eq!(key, ENV_STORE_SIZE),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_multiplier_rejected() {
        let err = ReactConfig::from_lookup(lookup_from(&[(ENV_FREQUENCY_MULTIPLIER, "-1")]))
            .unwrap_err();
        assert!(matches!(err, ReactError::Config { .. }));
    }

    #[test]
    fn unprefixed_and_legacy_names_are_fallbacks() {
        let config = ReactConfig::from_lookup(lookup_from(&[
            ("STORE_SIZE", "40"),
            ("BROBBOT_REACT_THROTTLE_EXPIRATION", "90"),
            ("THROTTLE_FREQUENCY_MULTIPLIER", "3"),
        ]))
        .unwrap();
        assert_eq!(config.store_size, 40);
        assert_eq!(config.throttle_base_expiration_secs, 90);
        assert_eq!(config.throttle_frequency_multiplier, 3.0);
    }

    #[test]
    fn prefixed_name_wins_over_fallbacks() {
        let config = ReactConfig::from_lookup(lookup_from(&[
            (ENV_STORE_SIZE, "5"),
            ("STORE_SIZE", "40"),
            ("BROBBOT_REACT_STORE_SIZE", "80"),
        ]))
        .unwrap();
        assert_eq!(config.store_size, 5);
    }

    #[test]
    fn invalid_fallback_names_the_fallback() {
        let err = ReactConfig::from_lookup(lookup_from(&[("BROBBOT_REACT_STORE_SIZE", "many")]))
            .unwrap_err();
        match err {
            ReactError::Config { key, .. } => assert_eq!(key, "BROBBOT_REACT_STORE_SIZE"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn builder_methods() {
        let config = ReactConfig::default()
            .with_store_size(3)
            .with_base_expiration(10)
            .with_frequency_multiplier(4.0)
            .with_count_before_throttle(false)
            .with_snapshot_path("brain.json");
        assert_eq!(config.store_size, 3);
        assert_eq!(config.throttle_base_expiration_secs, 10);
        assert_eq!(config.throttle_frequency_multiplier, 4.0);
        assert!(!config.count_before_throttle);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("brain.json")));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ReactConfig = serde_json::from_str(r#"{"store_size": 10}"#).unwrap();
        assert_eq!(config.store_size, 10);
        assert_eq!(config.throttle_base_expiration_secs, 300);
    }
}
