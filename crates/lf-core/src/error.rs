//! Error types for LoopForge

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum LfError {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type LfResult<T> = Result<T, LfError>;
