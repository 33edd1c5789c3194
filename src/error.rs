use std::path::PathBuf;

use thiserror::Error;

/// Problems detected before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read credential file {}: {source} (put a start.gg api key in it)", path.display())]
    CredentialsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential file {} is empty", path.display())]
    CredentialsEmpty { path: PathBuf },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("no tournament slugs configured (set TOURNAMENT_SLUGS)")]
    NoTournaments,
}

/// Failures of a single GraphQL call.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("graphql errors: {}", messages.join("; "))]
    Graphql { messages: Vec<String> },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        last_error: String,
    },
}
