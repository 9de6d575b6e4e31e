//! Audio host error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio device available")]
    NoDevice,

    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("Audio backend error: {0}")]
    BackendError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Unsupported stream configuration: {0}")]
    UnsupportedConfig(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
