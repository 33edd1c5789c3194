use std::fs;
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_AUTH_FILE: &str = "auth.txt";
pub const API_KEY_ENV: &str = "STARTGG_API_KEY";

/// Reads the start.gg api key from `path`. The file holds the key on one line.
pub fn load_api_key(path: &Path) -> Result<String, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::CredentialsUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let key = raw.trim();
    if key.is_empty() {
        return Err(ConfigError::CredentialsEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(key.to_string())
}

/// Prefers a non-empty `override_key` (usually from the environment) and
/// falls back to the credential file.
pub fn resolve_api_key(override_key: Option<&str>, path: &Path) -> Result<String, ConfigError> {
    if let Some(key) = override_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    load_api_key(path)
}
