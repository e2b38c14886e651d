//! AT Protocol client library
//!
//! The narrow slice of the AT Protocol the labeler talks to: XRPC transport,
//! identifier parsing, feed lookups for moderation and the Ozone moderation
//! endpoints used to emit label events.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod feed;
pub mod ozone;
pub mod types;
pub mod xrpc;

pub use types::{Actor, AtUri, Did, PostUrl};
pub use xrpc::{XrpcClient, XrpcClientConfig, XrpcError, XrpcRequest};

/// Result type for AT Protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for AT Protocol operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// XRPC call failed
    #[error(transparent)]
    Xrpc(#[from] XrpcError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The server answered but the expected record was absent
    #[error("Not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = Error::InvalidInput("test".to_string());
        assert!(err.to_string().contains("Invalid input"));

        let err: Error = XrpcError::new(404, "NotFound", "gone").into();
        assert!(err.to_string().contains("404"));
    }
}
