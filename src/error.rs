//! Error types for Animflow.
//!
//! All errors in Animflow are represented by the `AnimflowError` enum,
//! which provides specific variants for different error categories.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Animflow operations.
///
/// Each variant represents a specific category of error that can occur
/// while editing the chain, resolving it, or driving a generation.
///
/// The three chain-resolution variants (`MissingInstruction`,
/// `MissingSource`, `MissingOutput`) are dedicated unit variants so the
/// missing role stays distinguishable for the UI collaborator.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum AnimflowError {
    /// Session-level errors (startup, shutdown, lifecycle).
    #[error("{0}")]
    Session(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, schema validation).
    #[error("{0}")]
    Convert(String),

    /// Graph structure errors.
    #[error("{0}")]
    Graph(String),

    /// Node definition or payload errors.
    #[error("{0}")]
    Node(String),

    /// Edge definition errors.
    #[error("{0}")]
    Edge(String),

    /// Request validation errors (empty required fields).
    #[error("{0}")]
    Validation(String),

    /// No instruction node exists in the chain.
    #[error("no instruction node in the chain")]
    MissingInstruction,

    /// No source asset is connected upstream of the instruction node.
    #[error("no source asset connected to the instruction node")]
    MissingSource,

    /// No generation output is connected downstream of the instruction node.
    #[error("no generation output connected to the instruction node")]
    MissingOutput,

    /// Terminal backend failure, tagged with the last-tried model.
    #[error("model {model}: {message}")]
    Backend {
        model: String,
        message: String,
        quota_exceeded: bool,
        retry_after_seconds: Option<u64>,
    },

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

impl AnimflowError {
    /// The raw backend failure message, when this is a backend error.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            AnimflowError::Backend {
                message, ..
            } => Some(message.as_str()),
            _ => None,
        }
    }
}

impl From<AnimflowError> for String {
    fn from(val: AnimflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for AnimflowError {
    fn from(error: std::io::Error) -> Self {
        AnimflowError::IoError(error.to_string())
    }
}

impl From<AnimflowError> for std::io::Error {
    fn from(val: AnimflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for AnimflowError {
    fn from(error: serde_json::Error) -> Self {
        AnimflowError::Convert(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for AnimflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        AnimflowError::Convert(error.to_string())
    }
}
