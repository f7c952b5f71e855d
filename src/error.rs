// Error handling framework for flightcheck
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlightcheckError>;

/// Main error type for flightcheck with per-domain error hierarchy
#[derive(Debug, Error)]
pub enum FlightcheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<ConfigError>),

    #[error("Hook discovery failed: {0}")]
    Discovery(#[from] Box<DiscoveryError>),

    #[error("Hook execution failed: {0}")]
    HookExecution(#[from] Box<HookExecutionError>),

    #[error("Bus connection failed: {0}")]
    Connection(#[from] Box<ConnectionError>),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    NotFound {
        path: PathBuf,
        suggestion: Option<String>,
    },

    #[error("Invalid YAML syntax: {message}")]
    InvalidYaml {
        message: String,
        file_path: Option<PathBuf>,
    },

    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("IO operation failed: {message}")]
    IOError {
        message: String,
        path: Option<PathBuf>,
    },
}

/// Hook discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Hook root not found: {path}")]
    RootNotFound {
        path: PathBuf,
        suggestion: Option<String>,
    },

    #[error("Hook root is not a directory: {path}")]
    RootNotADirectory { path: PathBuf },

    #[error("Failed to walk hook tree at {path}: {message}")]
    WalkFailed { path: PathBuf, message: String },
}

/// Hook execution errors with job context
#[derive(Debug, Error)]
pub enum HookExecutionError {
    #[error("Hook {hook_id} failed: {message}")]
    ExecutionFailed { hook_id: String, message: String },

    #[error("Hook {hook_id} timed out after {timeout_secs}s")]
    ExecutionTimeout { hook_id: String, timeout_secs: u64 },

    #[error("Hook {hook_id} panicked: {message}")]
    Panicked { hook_id: String, message: String },
}

/// Bus connection and transport errors
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Bus handshake failed for {endpoint}: {message}")]
    HandshakeFailed { endpoint: String, message: String },

    #[error("Failed to send {event} to {destination}: {message}")]
    SendFailed {
        destination: String,
        event: String,
        message: String,
    },

    #[error("Invalid bus frame: {message}")]
    InvalidFrame { message: String },
}

/// Standard process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const CONNECTION_ERROR: i32 = 3;
}

impl FlightcheckError {
    /// Map an error to its process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            FlightcheckError::Config(_) => exit_codes::CONFIG_ERROR,
            FlightcheckError::Connection(_) => exit_codes::CONNECTION_ERROR,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

impl From<ConfigError> for FlightcheckError {
    fn from(err: ConfigError) -> Self {
        FlightcheckError::Config(Box::new(err))
    }
}

impl From<DiscoveryError> for FlightcheckError {
    fn from(err: DiscoveryError) -> Self {
        FlightcheckError::Discovery(Box::new(err))
    }
}

impl From<HookExecutionError> for FlightcheckError {
    fn from(err: HookExecutionError) -> Self {
        FlightcheckError::HookExecution(Box::new(err))
    }
}

impl From<ConnectionError> for FlightcheckError {
    fn from(err: ConnectionError) -> Self {
        FlightcheckError::Connection(Box::new(err))
    }
}
