//! Core traits and types for the chanweld library.
//!
//! This module contains the error type and the traits that plug user code
//! into pipeline stages.

pub mod error;
pub mod traits;

// Re-export core items
pub use error::{Error, Result};
pub use traits::{Processor, Sink, Source};
