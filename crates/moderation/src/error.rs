//! Error taxonomy for labeling
//!
//! Configuration problems are fatal at startup, resolution problems degrade a
//! single sub-check, and submission problems are reported back to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Startup or request configuration that cannot be used
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required input file or directory does not exist
    #[error("Missing configuration input: {}", .0.display())]
    MissingInput(PathBuf),

    /// A rule listing could not be parsed
    #[error("Malformed listing {}: {source}", .path.display())]
    Listing {
        /// Listing that failed
        path: PathBuf,
        /// Parser error
        source: csv::Error,
    },

    /// A two-column listing lacks a required column
    #[error("Listing {} has no {column} column", .path.display())]
    MissingColumn {
        /// Listing that failed
        path: PathBuf,
        /// Column that was expected
        column: &'static str,
    },

    /// Reference images could not be loaded
    #[error("Reference images: {0}")]
    ReferenceImages(#[from] media_processing::HashError),

    /// Unknown label action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Subject is not a usable account identifier
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    /// Required environment variable is unset
    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
}

/// A collaborator could not produce the content under review
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Reference does not name a post
    #[error("Invalid content reference: {0}")]
    InvalidReference(String),

    /// The upstream service failed or refused
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// The upstream service answered without the content
    #[error("Content not found: {0}")]
    NotFound(String),
}

/// The label store did not accept a mutation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// The store answered with an error
    #[error("Label store rejected mutation ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the store
        status: u16,
        /// Store-provided message
        message: String,
    },

    /// The store could not be reached
    #[error("Label store unreachable: {0}")]
    Transport(String),

    /// No valid session for the store
    #[error("Not authorized to write labels: {0}")]
    Unauthorized(String),
}

impl From<atproto_client::Error> for ResolveError {
    fn from(err: atproto_client::Error) -> Self {
        match err {
            atproto_client::Error::InvalidInput(msg) => ResolveError::InvalidReference(msg),
            atproto_client::Error::NotFound(msg) => ResolveError::NotFound(msg),
            other => ResolveError::Upstream(other.to_string()),
        }
    }
}

impl From<atproto_client::Error> for SubmissionError {
    fn from(err: atproto_client::Error) -> Self {
        match err {
            atproto_client::Error::Auth(msg) => SubmissionError::Unauthorized(msg),
            atproto_client::Error::InvalidInput(message) => SubmissionError::Rejected {
                status: 400,
                message,
            },
            atproto_client::Error::Xrpc(e) if e.is_auth_error() => {
                SubmissionError::Unauthorized(e.message().to_string())
            }
            atproto_client::Error::Xrpc(e) if e.status() == 0 => {
                SubmissionError::Transport(e.message().to_string())
            }
            atproto_client::Error::Xrpc(e) => SubmissionError::Rejected {
                status: e.status(),
                message: e.message().to_string(),
            },
            other => SubmissionError::Transport(other.to_string()),
        }
    }
}
