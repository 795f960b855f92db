//! Registry error types
//!
//! `RegistryError` is returned from operations that fail outright. Problems
//! with individual files or devices during a refresh are collected as
//! `ErrorRecord`s instead and never fail the refresh itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("at least one CDI specification directory must be specified")]
    NoSpecDirs,
    #[error("none of the CDI specification directories could be read: {0}")]
    NoReadableSpecDirs(String),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("invalid device name {0:?}: {1}")]
    InvalidDeviceName(String, String),
}

impl RegistryError {
    /// Whether this error prevented a refresh from publishing anything
    pub fn is_setup_error(&self) -> bool {
        matches!(self, Self::NoSpecDirs | Self::NoReadableSpecDirs(_))
    }
}

/// Category of a non-fatal problem found during a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Unreadable directory or file, or undecodable contents
    Load,
    /// Unsupported version, missing field, bad name or duplicate device
    Validation,
    /// Same qualified device name defined by more than one specification
    Conflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Load => "load error",
            ErrorKind::Validation => "validation error",
            ErrorKind::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// A single problem recorded during a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// File path, directory path or qualified device name
    pub source: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(source: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn load(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, ErrorKind::Load, message)
    }

    pub fn validation(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, ErrorKind::Validation, message)
    }

    pub fn conflict(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source, ErrorKind::Conflict, message)
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ErrorRecord {}

/// Error records grouped by source, in source order
pub type ErrorMap = BTreeMap<String, Vec<ErrorRecord>>;

/// Group a flat list of records by source, keeping their relative order
pub fn group_by_source(records: impl IntoIterator<Item = ErrorRecord>) -> ErrorMap {
    let mut map = ErrorMap::new();
    for record in records {
        map.entry(record.source.clone()).or_default().push(record);
    }
    map
}
