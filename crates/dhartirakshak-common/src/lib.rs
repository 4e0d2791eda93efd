//! Common types for the DhartiRakshak API client
//!
//! This crate holds the pieces every other crate in the workspace leans on:
//! the [`HttpClient`](http_client::HttpClient) transport abstraction, the
//! stateless request builder in [`api`], multipart form encoding, session
//! storage, and the response normalization rules the publishing API needs.

#![warn(missing_docs)]
pub use smol_str;
pub use smol_str::SmolStr;
pub use url;

/// Stateless request builder and response wrapper.
pub mod api;
pub mod error;
/// Multipart form encoding for file-bearing requests.
pub mod form;
/// HTTP client abstraction used by the DhartiRakshak crates.
pub mod http_client;
/// Response shape normalization, applied once at the API boundary.
pub mod normalize;
/// Generic session storage traits and utilities.
pub mod session;
/// Identifier and record types.
pub mod types;

pub use api::{ApiCall, ApiExt, ApiResponse, CallOptions};
pub use error::{ApiResult, ClientError};
pub use form::{FilePart, MultipartForm};
pub use types::{ItemId, Record};

/// Authorization token types for API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationToken {
    /// Bearer token issued by the login endpoints
    Bearer(SmolStr),
}

impl AuthorizationToken {
    /// Render the token as an `Authorization` header value.
    pub fn header_value(&self) -> String {
        match self {
            AuthorizationToken::Bearer(t) => format!("Bearer {t}"),
        }
    }
}

impl From<SmolStr> for AuthorizationToken {
    fn from(token: SmolStr) -> Self {
        AuthorizationToken::Bearer(token)
    }
}

impl From<&str> for AuthorizationToken {
    fn from(token: &str) -> Self {
        AuthorizationToken::Bearer(SmolStr::new(token))
    }
}
