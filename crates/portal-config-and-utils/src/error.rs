//! Errors from loading configuration and resolving paths.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Settings present but unusable
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Supabase URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Malformed config file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
