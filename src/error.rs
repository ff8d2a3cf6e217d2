// src/error.rs
//! Error taxonomy for the ingest pipeline and the source registry.
//!
//! Ingest errors never escape a single source: callers log them and move on
//! with an empty contribution. Registry errors abort one mutation and are
//! shown to the user.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Network failure, timeout or non-2xx status from an upstream.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Body could not be decoded as the expected XML/JSON document.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The news API answered, but with a status other than "ok".
    #[error("unexpected API status: {0}")]
    UnexpectedStatus(String),

    /// A credential or list needed to build the request is absent.
    #[error("configuration missing: {0}")]
    MissingConfig(String),
}

impl IngestError {
    /// Configuration gaps are expected in dev setups and are logged at warn.
    pub fn is_configuration(&self) -> bool {
        matches!(self, IngestError::MissingConfig(_))
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IngestError::Malformed(err.to_string())
        } else {
            IngestError::Unavailable(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("invalid index {index} (list has {len} entries)")]
    InvalidIndex { index: usize, len: usize },

    #[error("{0} cannot be empty")]
    EmptyValue(&'static str),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("not a valid RSS/Atom feed: {0}")]
    InvalidFeed(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_configuration() {
        assert!(IngestError::MissingConfig("NEWSAPI_KEY".into()).is_configuration());
        assert!(!IngestError::Unavailable("timeout".into()).is_configuration());
    }

    #[test]
    fn invalid_index_message_names_bounds() {
        let e = RegistryError::InvalidIndex { index: 99, len: 2 };
        assert_eq!(e.to_string(), "invalid index 99 (list has 2 entries)");
    }
}
