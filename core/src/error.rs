//! Error types for the ODB client.
//!
//! # Design
//! Each failure stage gets its own variant so callers can tell a transport
//! failure from a rejected request, a garbled body, or a body that decoded
//! but did not fit the record. A 404 is an ordinary `Http` error;
//! `is_not_found` is the shortcut for checking it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OdbError {
    /// The request never produced a response (connection, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status outside 200-299.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body is not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The response body is valid JSON of the wrong kind.
    #[error("expected a JSON {expected}, got {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    /// The response body decoded but does not satisfy the record's fields.
    #[error("invalid {record} record: {source}")]
    Validation {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A header value (usually the token) cannot be sent over HTTP.
    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },
}

impl OdbError {
    /// The HTTP status, if the server answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self {
            OdbError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, OdbError>;
