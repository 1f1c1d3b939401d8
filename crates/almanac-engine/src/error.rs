//! Error types for almanac-engine operations.
//!
//! These are hard failures. Outcomes a user can act on (an unparseable
//! phrase, a date outside the served ranges, a missing day) are not errors;
//! they are [`Answer`](crate::dispatch::Answer) variants.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlmanacError {
    #[error("Weather service request failed: {0}")]
    Fetch(String),

    #[error("Malformed weather service response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AlmanacError {
    fn from(err: reqwest::Error) -> Self {
        AlmanacError::Fetch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AlmanacError>;
