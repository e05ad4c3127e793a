//! Error handling for mocap-rs
//!
//! This module defines the crate error type and a Result alias used by the
//! metadata store, the acquisition model, the codecs and the pipeline.
//!
//! # Taxonomy
//!
//! - **Configuration**: a request that is incomplete (missing filename). Raised
//!   before any file is touched.
//! - **Format**: the byte stream is not a supported file (bad byte-order marker,
//!   bad header key). Fatal.
//! - **ParameterCorruption**: a single malformed parameter record. The codec
//!   recovers from it locally; it never crosses the reader boundary.
//! - **Consistency**: frame counts disagree between points and analogs. Fatal.
//! - **Io**: operating system failure, including truncated files. Fatal.

use thiserror::Error;

/// Main error type for mocap-rs operations
#[derive(Error, Debug)]
pub enum MocapError {
    /// Incomplete or invalid request, detected before any I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unsupported or corrupt file layout
    #[error("Format error: {0}")]
    Format(String),

    /// Malformed parameter record (recoverable)
    #[error("Parameter corruption: {0}")]
    ParameterCorruption(String),

    /// Point/analog frame counts disagree
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Stored value cannot be represented as requested
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Index outside of a container
    #[error("Index {index} out of range (size {len})")]
    OutOfRange { index: usize, len: usize },

    /// Label lookup failure
    #[error("Domain error: {0}")]
    Domain(String),

    /// Pipeline wiring or update failure
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MocapError>,
    },
}

impl MocapError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MocapError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping context wrappers
    pub fn root(&self) -> &MocapError {
        match self {
            MocapError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the error aborts the current read/write.
    ///
    /// Only parameter corruption is recovered locally by the codec.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.root(), MocapError::ParameterCorruption(_))
    }

    pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
        MocapError::OutOfRange { index, len }
    }
}

/// Result type alias for mocap-rs operations
pub type Result<T> = std::result::Result<T, MocapError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MocapError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| MocapError::Io(e).with_context(f()))
    }
}
