use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Price;
use crate::error::{PickerError, PickerResult};
use crate::fpl_api::DEFAULT_API_BASE;
use crate::http_client::DEFAULT_TIMEOUT_SECS;
use crate::score::DifficultyPolicy;
use crate::squad::{DIFFERENTIAL_THRESHOLD, FULL_SQUAD_SIZE};

const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base: String,
    pub cache_max_age_secs: u64,
    pub http_timeout_secs: u64,
    pub db_path: Option<PathBuf>,
    pub differential_threshold: f64,
    pub min_owned_squad: usize,
    pub difficulty: DifficultyPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_base: DEFAULT_API_BASE.to_string(),
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            db_path: None,
            differential_threshold: DIFFERENTIAL_THRESHOLD,
            min_owned_squad: FULL_SQUAD_SIZE,
            difficulty: DifficultyPolicy::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> PickerResult<Self> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> PickerResult<Self> {
        let defaults = Settings::default();

        let api_base = env_value(&env_map, "FPL_API_BASE")
            .map(str::to_string)
            .unwrap_or(defaults.api_base);
        let cache_max_age_secs = match env_value(&env_map, "FPL_CACHE_MAX_AGE_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| invalid("FPL_CACHE_MAX_AGE_SECS", raw))?,
            None => defaults.cache_max_age_secs,
        };
        let http_timeout_secs = match env_value(&env_map, "FPL_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| invalid("FPL_HTTP_TIMEOUT_SECS", raw))?,
            None => defaults.http_timeout_secs,
        };
        let db_path = env_value(&env_map, "FPL_DB_PATH").map(PathBuf::from);
        let differential_threshold = match env_value(&env_map, "FPL_DIFFERENTIAL_THRESHOLD") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| (0.0..=100.0).contains(v))
                .ok_or_else(|| invalid("FPL_DIFFERENTIAL_THRESHOLD", raw))?,
            None => defaults.differential_threshold,
        };
        let min_owned_squad = match env_value(&env_map, "FPL_MIN_OWNED_SQUAD") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|v| *v >= 2)
                .ok_or_else(|| invalid("FPL_MIN_OWNED_SQUAD", raw))?,
            None => defaults.min_owned_squad,
        };
        let difficulty = match env_value(&env_map, "FPL_DIFFICULTY_POLICY") {
            Some(raw) => DifficultyPolicy::parse(raw)?,
            None => defaults.difficulty,
        };

        Ok(Settings {
            api_base,
            cache_max_age_secs,
            http_timeout_secs,
            db_path,
            differential_threshold,
            min_owned_squad,
            difficulty,
        })
    }
}

fn env_value<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn invalid(key: &str, raw: &str) -> PickerError {
    PickerError::Config(format!("invalid value for {key}: {raw:?}"))
}

/// The manager's owned players and money in the bank, in millions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub players: Vec<String>,
    #[serde(default)]
    pub bank_value: f64,
}

impl TeamConfig {
    pub fn load(path: &Path) -> PickerResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            PickerError::Config(format!("cannot read team config {}: {err}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> PickerResult<Self> {
        let config: TeamConfig = serde_json::from_str(raw)
            .map_err(|err| PickerError::Config(format!("invalid team config: {err}")))?;
        if !config.bank_value.is_finite() || config.bank_value < 0.0 {
            return Err(PickerError::Config(format!(
                "bank_value must be a non-negative amount, got {}",
                config.bank_value
            )));
        }
        Ok(config)
    }

    pub fn bank(&self) -> Price {
        Price::from_millions(self.bank_value)
    }
}
