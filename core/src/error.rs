//! Error types for the merge engine.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which of the two merge inputs a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Existing,
    Generated,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Existing => f.write_str("existing"),
            Side::Generated => f.write_str("generated"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("failed to load TypeScript grammar")]
    Language,

    #[error("{side} source failed to parse: {message}")]
    Parse { side: Side, message: String },

    #[error("invalid conventions config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MergeError>;
