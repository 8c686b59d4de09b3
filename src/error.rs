use std::path::PathBuf;

use thiserror::Error;

use crate::quiz::Operation;

/// Failure to obtain a usable question set. Always recoverable through a retry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("question bank for {operation} could not be read from {path}: {source}")]
    Io {
        operation: Operation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("question bank for {operation} is not valid JSON: {source}")]
    Parse {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    #[error("question bank for {operation} is empty")]
    Empty { operation: Operation },

    #[error("question #{index} of the {operation} bank is malformed: {reason}")]
    Malformed {
        operation: Operation,
        index: usize,
        reason: String,
    },
}

/// Failure to read or write a persisted store slot. Logged and swallowed by the store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage slot {key} is not accessible: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state for slot {key} could not be (de)serialized: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("field {0} is already registered")]
    DuplicateField(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// An answer cue could not be played. Never surfaced to the player.
#[derive(Debug, Error)]
#[error("answer cue failed: {0}")]
pub struct CueError(pub String);
