use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for the application.
///
/// Covers the failure modes of the probe/download pipeline:
/// - Launching the external tool
/// - Reading its output streams
/// - Configuration loading and validation
/// - Job list parsing
///
/// User cancellation is not an error. Discovery and batch calls report it
/// through their outcome enums.

/// Represents all possible errors that can occur in the application.
///
/// # Error Categories
///
/// - IO: File system operations
/// - Process: External tool launch and pipe handling
/// - Parsing: URL, JSON and CSV parsing
/// - Config: Invalid or incomplete settings
/// - Custom: Application-specific errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to start {}: {source}", program.display())]
    ProbeLaunch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Process error: {0}")]
    ProcessIo(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Custom(String),
}

impl From<&str> for AppError {
    fn from(error: &str) -> Self {
        AppError::Custom(error.to_string())
    }
}

impl From<String> for AppError {
    fn from(error: String) -> Self {
        AppError::Custom(error)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
