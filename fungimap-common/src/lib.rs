//! # FungiMap Common Library
//!
//! Shared code for the FungiMap validation services:
//! - Error types
//! - Validator configuration loading and storage root resolution
//! - Validation progress events (ValidationEvent enum) and the event bus

pub mod config;
pub mod error;
pub mod events;

pub use config::{ValidationCriteria, ValidatorConfig};
pub use error::{Error, Result};
pub use events::{ValidationEvent, ValidationEventBus};
