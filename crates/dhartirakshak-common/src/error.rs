//! Error types for API client operations

use bytes::Bytes;
use serde_json::Value;
use smol_str::SmolStr;

use crate::session::SessionStoreError;

/// Client error type wrapping all possible error conditions
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ClientError {
    /// HTTP transport error
    #[error("HTTP transport error: {0}")]
    Transport(
        #[from]
        #[diagnostic_source]
        TransportError,
    ),

    /// Request serialization failed
    #[error("{0}")]
    Encode(
        #[from]
        #[diagnostic_source]
        EncodeError,
    ),

    /// Response deserialization failed
    #[error("{0}")]
    Decode(
        #[from]
        #[diagnostic_source]
        DecodeError,
    ),

    /// Non-success response from the API
    #[error("{0}")]
    Api(
        #[from]
        #[diagnostic_source]
        ApiError,
    ),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(
        #[from]
        #[diagnostic_source]
        AuthError,
    ),

    /// Session persistence failed
    #[error("Session store error: {0}")]
    Session(
        #[from]
        #[diagnostic_source]
        SessionStoreError,
    ),

    /// Input rejected before any request was made
    #[error("{0}")]
    #[diagnostic(code(dhartirakshak::invalid_input))]
    InvalidInput(SmolStr),
}

impl ClientError {
    /// Shorthand for [`ClientError::InvalidInput`].
    pub fn invalid(message: impl Into<SmolStr>) -> Self {
        ClientError::InvalidInput(message.into())
    }

    /// The single line shown to a person when this error ends an action.
    ///
    /// Validation errors win, then the server's `message`, then `fallback`.
    /// Local input errors always carry their own text.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api(err) => err
                .first_validation_error()
                .or(err.message.as_deref())
                .unwrap_or(fallback)
                .to_owned(),
            ClientError::Auth(AuthError::Unauthorized(Some(message)))
            | ClientError::Auth(AuthError::Forbidden(Some(message))) => message.to_string(),
            ClientError::InvalidInput(message) => message.to_string(),
            _ => fallback.to_owned(),
        }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            ClientError::Api(err) => Some(err.status),
            ClientError::Auth(AuthError::Unauthorized(_)) => Some(http::StatusCode::UNAUTHORIZED),
            ClientError::Auth(AuthError::Forbidden(_)) => Some(http::StatusCode::FORBIDDEN),
            _ => None,
        }
    }
}

/// Transport-level errors that occur during HTTP communication
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TransportError {
    /// Failed to establish connection to server
    #[error("Connection error: {0}")]
    #[diagnostic(code(dhartirakshak::transport::connect))]
    Connect(String),

    /// Request timed out
    #[error("Request timeout")]
    #[diagnostic(code(dhartirakshak::transport::timeout))]
    Timeout,

    /// Request construction failed (malformed URI, headers, etc.)
    #[error("Invalid request: {0}")]
    #[diagnostic(code(dhartirakshak::transport::invalid_request))]
    InvalidRequest(String),

    /// Other transport error
    #[error("Transport error: {0}")]
    #[diagnostic(code(dhartirakshak::transport::other))]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "reqwest-client")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() || e.is_request() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Other(Box::new(e))
        }
    }
}

impl From<http::Error> for TransportError {
    fn from(e: http::Error) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

/// Error type for encoding request bodies
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum EncodeError {
    /// Failed to serialize JSON body
    #[error("Failed to serialize JSON: {0}")]
    #[diagnostic(code(dhartirakshak::encode::json))]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

/// Response deserialization errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DecodeError {
    /// JSON deserialization failed
    #[error("Failed to deserialize JSON: {0}")]
    #[diagnostic(code(dhartirakshak::decode::json))]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
    /// The body parsed, but not into the expected shape
    #[error("Unexpected response shape: expected {expected}")]
    #[diagnostic(code(dhartirakshak::decode::shape))]
    Shape {
        /// What the caller was looking for
        expected: &'static str,
    },
}

/// Non-success API response, with the optional `{message, errors}` body decoded.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[diagnostic(code(dhartirakshak::api))]
pub struct ApiError {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Server supplied `message`, if any
    pub message: Option<String>,
    /// Field validation errors (`422`-style `errors` map), in server order
    pub errors: Vec<(String, Vec<String>)>,
    /// Raw response body
    pub body: Option<Bytes>,
}

impl ApiError {
    /// Decode an error body. Bodies that are not JSON keep only the status.
    pub fn from_body(status: http::StatusCode, body: Bytes) -> Self {
        let parsed: Option<Value> = serde_json::from_slice(&body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let errors = parsed
            .as_ref()
            .and_then(|v| v.get("errors"))
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(field, msgs)| (field.clone(), validation_messages(msgs)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            status,
            message,
            errors,
            body: if body.is_empty() { None } else { Some(body) },
        }
    }

    /// First message of the first field in the `errors` map.
    pub fn first_validation_error(&self) -> Option<&str> {
        self.errors
            .first()
            .and_then(|(_, msgs)| msgs.first())
            .map(String::as_str)
    }
}

fn validation_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(message) = self.first_validation_error().or(self.message.as_deref()) {
            write!(f, ": {message}")?;
        } else if let Some(body) = &self.body {
            if let Ok(s) = std::str::from_utf8(body) {
                write!(f, ":\n{}", s)?;
            }
        }
        Ok(())
    }
}

/// Authentication and authorization errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum AuthError {
    /// Server rejected the token (401)
    #[error("Unauthorized{}", .0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    #[diagnostic(
        code(dhartirakshak::auth::unauthorized),
        help("log in again; the stored token may have expired")
    )]
    Unauthorized(Option<SmolStr>),

    /// Token valid, but not allowed to do this (403)
    #[error("Forbidden{}", .0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    #[diagnostic(code(dhartirakshak::auth::forbidden))]
    Forbidden(Option<SmolStr>),

    /// Request requires authentication but no session is active
    #[error("Not authenticated")]
    #[diagnostic(code(dhartirakshak::auth::not_authenticated))]
    NotAuthenticated,
}

/// Result type for client operations
pub type ApiResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_validation_error_follows_server_order() {
        let body = Bytes::from_static(
            br#"{"message":"The given data was invalid.","errors":{"title":["The title field is required."],"image":["The image must be a file."]}}"#,
        );
        let err = ApiError::from_body(http::StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            err.first_validation_error(),
            Some("The title field is required.")
        );
        assert_eq!(
            ClientError::from(err).user_message("Create failed"),
            "The title field is required."
        );
    }

    #[test]
    fn message_then_fallback() {
        let err = ApiError::from_body(
            http::StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(br#"{"message":"Server exploded"}"#),
        );
        assert_eq!(ClientError::from(err).user_message("Delete failed"), "Server exploded");

        let err = ApiError::from_body(
            http::StatusCode::BAD_GATEWAY,
            Bytes::from_static(b"<html>bad gateway</html>"),
        );
        assert!(err.message.is_none());
        assert_eq!(ClientError::from(err).user_message("Delete failed"), "Delete failed");
    }

    #[test]
    fn transport_errors_use_fallback() {
        let err = ClientError::from(TransportError::Timeout);
        assert_eq!(err.user_message("Update trending failed"), "Update trending failed");
        assert!(err.status().is_none());
    }
}
