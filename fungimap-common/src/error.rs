//! Common error types for FungiMap

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for FungiMap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a validation run before any sample is processed.
///
/// Per-sample problems never surface here; they are recorded as warnings
/// on that sample's result instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage root could not be created or is not a directory
    #[error("Storage root {path} is unavailable: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
