use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single pipeline stage
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown {kind} method: {value}")]
    UnknownMethod { kind: &'static str, value: String },

    #[error("No foreground region found")]
    NoForeground,

    #[error("Tracer executable not found: {0}")]
    ToolNotFound(PathBuf),

    #[error("Tracer failed: {0}")]
    ToolError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StageError {
    /// Short machine-readable code, used in JSON reports
    pub fn code(&self) -> &'static str {
        match self {
            StageError::Read { .. } | StageError::Write { .. } | StageError::Io { .. } => {
                "IO_ERROR"
            }
            StageError::UnknownMethod { .. } => "UNKNOWN_METHOD",
            StageError::NoForeground => "NO_FOREGROUND",
            StageError::ToolNotFound(_) => "TOOL_NOT_FOUND",
            StageError::ToolError(_) => "TOOL_ERROR",
            StageError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Errors while loading or validating a pipeline configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported config format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}
