use serde::Serialize;
use std::fmt;

use tabdeck_registry::RegistryError;

/// Error types for session storage operations.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum StoreError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    RestoreError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ReadError(msg) => write!(f, "failed to read session: {}", msg),
            StoreError::WriteError(msg) => write!(f, "failed to write session: {}", msg),
            StoreError::ParseError(msg) => write!(f, "failed to parse session: {}", msg),
            StoreError::SerializeError(msg) => write!(f, "failed to serialize session: {}", msg),
            StoreError::RestoreError(msg) => write!(f, "failed to restore session: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::ReadError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::ParseError(e.to_string())
    }
}

impl From<RegistryError> for StoreError {
    fn from(e: RegistryError) -> Self {
        StoreError::RestoreError(e.to_string())
    }
}

impl From<StoreError> for String {
    fn from(e: StoreError) -> Self {
        e.to_string()
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
