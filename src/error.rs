// src/error.rs

use crate::model::ChangesetId;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required configuration key is missing or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// The history walk cannot advance past `cursor`.
    #[error("history exhausted at {cursor}: {reason}")]
    HistoryExhausted { cursor: ChangesetId, reason: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a document we cannot interpret.
    #[error("unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("io error: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("render error: {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single coverage query that could not be answered. Never fatal: the
/// caller substitutes an empty record.
#[derive(Debug, thiserror::Error)]
#[error("coverage query for suite `{suite}` failed: {source}")]
pub struct QueryFailure {
    pub suite: String,
    /// The serialized query document, kept for diagnosing after the fact.
    pub payload: String,
    #[source]
    pub source: Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
    ConfigError = 2,
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) => ExitCode::ConfigError,
            _ => ExitCode::Failure,
        }
    }
}
