//! Error handling for the application

use thiserror::Error;

/// Errors raised by the pure analysis core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid weights: sum is {sum:.4}, expected 1.0")]
    InvalidWeights { sum: f64 },
}

/// Errors raised by the market data collaborators
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Snapshot unavailable: {0}")]
    Unavailable(String),

    #[error("Protocol not found: {0}")]
    ProtocolNotFound(String),

    #[error("Malformed snapshot data: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report composition and export errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Nothing to report: {0}")]
    Empty(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
