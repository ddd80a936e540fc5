use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the sweep tooling
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while reading or preparing the on-disk experiment layout
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Failed to list directory {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path has no usable file stem: {path}")]
    NoStem { path: PathBuf },
}

/// Errors raised when handing a command to the outside world
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("Failed to wait for {program}: {message}")]
    WaitFailed { program: String, message: String },
}

/// Result type alias for sweep operations
pub type SweepResult<T> = Result<T, SweepError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::errors::SweepError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::errors::SweepError::Config(format!($($arg)*))
    };
}
