//! # HTTP boundary
//!
//! The one place where vendor HTTP calls happen. Every failure is funnelled through
//! [`translate`], which maps a status code and response body onto [`RemoteError`].
//! Nothing here retries: a timeout or a refused connection is reported as-is.

use crate::models::MissingField;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    /// The service rejected the payload and named the offending fields.
    #[error("{}", describe_fields(.fields))]
    Validation { status: u16, fields: Vec<MissingField> },
    /// Bad or missing credentials.
    #[error(
        "Authentication failed (HTTP {status}): {message}. Check `trello.api_key`/`trello.api_token` or `jira.username`/`jira.api_token` in the configuration."
    )]
    Authentication { status: u16, message: String },
    #[error(
        "Permission denied (HTTP {status}): {message}. This operation may require administrator privileges."
    )]
    Authorization { status: u16, message: String },
    #[error("Not found (HTTP {status}): {message}")]
    NotFound { status: u16, message: String },
    /// Any other non-success status. Propagated unchanged.
    #[error("Remote service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response from the remote service: {0}")]
    Decode(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Whether a fetch-by-id failure just means "this token is not an id here".
    /// Trello answers malformed ids with 400, the others with 404.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Status { status: 400, .. }
        )
    }
}

fn describe_fields(fields: &[MissingField]) -> String {
    let listed: Vec<String> = fields
        .iter()
        .map(|f| format!("{} ({})", f.name, f.reason))
        .collect();
    format!("The remote service rejected these fields: {}", listed.join(", "))
}

/// Maps a non-success HTTP response onto the error taxonomy.
///
/// Jira-style bodies (`{"errorMessages": [...], "errors": {"field": "reason"}}`) with a
/// non-empty `errors` object on a 400 become [`RemoteError::Validation`], preserving the
/// order the service listed the fields in.
pub fn translate(status: u16, body: &str) -> RemoteError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if status == 400 {
        let fields = parsed
            .as_ref()
            .map(extract_field_errors)
            .unwrap_or_default();
        if !fields.is_empty() {
            return RemoteError::Validation { status, fields };
        }
    }

    let message = parsed
        .as_ref()
        .and_then(extract_message)
        .unwrap_or_else(|| summarize_body(body));

    match status {
        401 => RemoteError::Authentication { status, message },
        403 => RemoteError::Authorization { status, message },
        404 => RemoteError::NotFound { status, message },
        _ => RemoteError::Status { status, message },
    }
}

fn extract_field_errors(body: &Value) -> Vec<MissingField> {
    body.get("errors")
        .and_then(Value::as_object)
        .map(|errors| {
            errors
                .iter()
                .map(|(name, reason)| MissingField {
                    name: name.clone(),
                    reason: reason
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| reason.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn extract_message(body: &Value) -> Option<String> {
    if let Some(messages) = body.get("errorMessages").and_then(Value::as_array) {
        let joined: Vec<&str> = messages.iter().filter_map(Value::as_str).collect();
        if !joined.is_empty() {
            return Some(joined.join(" "));
        }
    }
    ["message", "error", "reason"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn summarize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no details".to_string();
    }
    trimmed.chars().take(200).collect()
}

/// How a client authenticates.
#[derive(Clone)]
pub enum Auth {
    /// Credentials sent as query parameters (Trello `key`/`token`).
    Query(Vec<(String, String)>),
    /// HTTP basic auth (Atlassian user + API token).
    Basic { username: String, token: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(pairs) => {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                f.debug_tuple("Query").field(&keys).finish()
            }
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// A blocking JSON client bound to one API root.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpClient {
    pub fn new(base_url: &str, auth: Auth, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("atlasman/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Query(pairs) => request.query(pairs),
            Auth::Basic { username, token } => request.basic_auth(username, Some(token)),
        }
    }

    /// Sends a request and returns the decoded JSON body (`Null` for empty bodies).
    pub fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> RemoteResult<Value> {
        log::debug!("{} {}", method, self.url(path));

        let mut request = self
            .authorize(self.client.request(method, self.url(path)))
            .header(reqwest::header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(json) = body {
            request = request.json(json);
        }

        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            log::debug!("HTTP {} body: {}", status.as_u16(), summarize_body(&text));
            return Err(translate(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> RemoteResult<Value> {
        self.send(Method::GET, path, query, None)
    }

    pub fn post(&self, path: &str, query: &[(&str, &str)], body: Option<&Value>) -> RemoteResult<Value> {
        self.send(Method::POST, path, query, body)
    }

    pub fn put(&self, path: &str, query: &[(&str, &str)], body: Option<&Value>) -> RemoteResult<Value> {
        self.send(Method::PUT, path, query, body)
    }

    pub fn delete(&self, path: &str) -> RemoteResult<Value> {
        self.send(Method::DELETE, path, &[], None)
    }
}

/// Reads a string field, accepting numbers too (some ids come back numeric).
pub fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Like [`str_field`], but a missing field is a decode error.
pub fn require_str_field(value: &Value, key: &str) -> RemoteResult<String> {
    str_field(value, key)
        .ok_or_else(|| RemoteError::Decode(format!("response is missing the '{}' field", key)))
}

/// Interprets a response as an array, failing with a decode error otherwise.
pub fn expect_array(value: Value, what: &str) -> RemoteResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(RemoteError::Decode(format!(
            "expected a list of {}, got {}",
            what,
            summarize_body(&other.to_string())
        ))),
    }
}
