//! Error types for Horizon Reconcile.

use std::path::PathBuf;

/// Errors returned by composite and segment operations.
///
/// Diff inconsistencies are never surfaced through this type: they are
/// logged and the offending edit is dropped. Only misuse of the structural
/// API (unknown or duplicate segments and items, bad indices) is reported
/// here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A segment with this ID is already part of the composite.
    #[error("segment {0} is already attached to this composite")]
    DuplicateSegment(u64),

    /// No segment with this ID is part of the composite.
    #[error("segment {0} is not attached to this composite")]
    UnknownSegment(u64),

    /// An item with this identity is already held by the segment.
    #[error("item {0} is already present in this segment")]
    DuplicateItem(String),

    /// An index passed to a structural operation is out of range.
    #[error("index {index} is out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not acceptable.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for Horizon Reconcile operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
