// src/error.rs
use std::io;
use thiserror::Error;

/// Result type used throughout the sensorlink library
pub type Result<T> = std::result::Result<T, ClientError>;

/// Custom Error type for the sensorlink library
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Invalid time-series name: {0}")]
    InvalidSeries(String),

    #[error("Datapoint is not a finite number: {0}")]
    InvalidValue(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Dataset is already uploaded")]
    AlreadyCompleted,

    #[error("{0}")]
    Transport(String),

    #[error("Other error: {0}")]
    Other(String),
}
