use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::QueryError;

pub const DEFAULT_ENDPOINT: &str = "https://api.start.gg/gql/alpha";

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// A named GraphQL document.
#[derive(Debug, Clone, Copy)]
pub struct Query {
    pub operation: &'static str,
    pub document: &'static str,
}

/// Something that can submit a query and hand back its `data` payload.
pub trait GraphqlTransport {
    fn send(&self, query: &Query, variables: &Value) -> Result<Value, QueryError>;
}

/// Authenticated connection to the start.gg endpoint.
pub struct HttpSession {
    client: &'static Client,
    endpoint: String,
    token: String,
}

impl HttpSession {
    pub fn new(client: &'static Client, endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }
}

impl GraphqlTransport for HttpSession {
    fn send(&self, query: &Query, variables: &Value) -> Result<Value, QueryError> {
        let body = json!({
            "operationName": query.operation,
            "query": query.document,
            "variables": variables,
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            });
        }
        extract_data(&text)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: String,
}

/// Unwraps a GraphQL response body. Any `errors` entry fails the call, even
/// when partial data came back with it.
pub fn extract_data(raw: &str) -> Result<Value, QueryError> {
    let envelope: Envelope = serde_json::from_str(raw.trim())
        .map_err(|err| QueryError::Malformed(format!("invalid json: {err}")))?;
    if !envelope.errors.is_empty() {
        return Err(QueryError::Graphql {
            messages: envelope.errors.into_iter().map(|e| e.message).collect(),
        });
    }
    match envelope.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(QueryError::Malformed("response has no data".to_string())),
    }
}
