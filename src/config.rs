use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::{self, API_KEY_ENV, DEFAULT_AUTH_FILE};
use crate::error::ConfigError;
use crate::executor::RetryPolicy;
use crate::graphql::DEFAULT_ENDPOINT;
use crate::ingest::IngestOptions;
use crate::store::DEFAULT_DB_FILE;

pub const DEFAULT_TOURNAMENT_SLUGS: &[&str] = &[
    "tournament/ceotaku-2023",
    "tournament/ceotaku-2023-community-events",
];

const DEFAULT_ROSTER_PACING_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub endpoint: String,
    pub tournament_slugs: Vec<String>,
    pub db_path: PathBuf,
    pub auth_file: PathBuf,
    pub api_key_override: Option<String>,
    pub roster_pacing: Duration,
    pub retry: RetryPolicy,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let tournament_slugs = match get("TOURNAMENT_SLUGS") {
            Some(raw) => parse_slugs(&raw),
            None => DEFAULT_TOURNAMENT_SLUGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        if tournament_slugs.is_empty() {
            return Err(ConfigError::NoTournaments);
        }

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            first_delay: Duration::from_millis(parse_u64(
                &get,
                "RETRY_FIRST_DELAY_MS",
                defaults.first_delay.as_millis() as u64,
            )?),
            steady_delay: Duration::from_millis(parse_u64(
                &get,
                "RETRY_DELAY_MS",
                defaults.steady_delay.as_millis() as u64,
            )?),
            max_attempts: parse_u64(&get, "RETRY_MAX_ATTEMPTS", defaults.max_attempts as u64)?
                .try_into()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "RETRY_MAX_ATTEMPTS",
                    value: get("RETRY_MAX_ATTEMPTS").unwrap_or_default(),
                })?,
        };

        Ok(Self {
            endpoint: get("STARTGG_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            tournament_slugs,
            db_path: get("PHASES_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE)),
            auth_file: get("STARTGG_AUTH_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUTH_FILE)),
            api_key_override: get(API_KEY_ENV),
            roster_pacing: Duration::from_millis(parse_u64(
                &get,
                "ROSTER_PACING_MS",
                DEFAULT_ROSTER_PACING_MS,
            )?),
            retry,
        })
    }

    pub fn api_key(&self) -> Result<String, ConfigError> {
        credentials::resolve_api_key(self.api_key_override.as_deref(), &self.auth_file)
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            tournament_slugs: self.tournament_slugs.clone(),
            roster_pacing: self.roster_pacing,
        }
    }
}

fn parse_u64(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match get(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

/// Splits on commas, semicolons and whitespace, keeping first occurrences.
pub fn parse_slugs(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split([',', ';', ' ', '\n', '\t'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}
