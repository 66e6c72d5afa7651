//! # Channel-based concurrent pipelines for Rust
//!
//! This crate provides typed channels with configurable buffering and a
//! small set of stage combinators for building producer/consumer pipelines
//! on top of tokio.
//!
//! ## Core Concepts
//!
//! - **Channel**: A multi-producer, multi-consumer queue whose [`Capacity`]
//!   decides when senders suspend: rendezvous, buffered, unbounded or conflated
//! - **Stage**: A task that owns one output channel and closes it when done
//! - **Scope**: Owns a group of stages, cancels them together and reports
//!   their failures
//! - **Pipeline**: Chains a source, transforms and a terminal operation
//!
//! ## Example
//!
//! ```rust
//! use chanweld::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let sum = Pipeline::sequence(20)
//!         .filter(|n| n % 2 != 0)
//!         .map(|n| n * n)
//!         .reduce(0, |acc, n| acc + n)
//!         .await?;
//!
//!     assert_eq!(sum, 1330);
//!     Ok(())
//! }
//! ```
//!
//! [`Capacity`]: channel::Capacity

pub mod channel;
pub mod core;
pub mod pipeline;
pub mod processors;
pub mod scope;
pub mod sinks;
pub mod sources;
pub mod telemetry;
pub mod util;

// Re-export commonly used items
pub mod prelude {
    pub use crate::channel::{Capacity, Channel, TrySendError};
    pub use crate::core::{Error, Processor, Result, Sink, Source};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineConfig};
    pub use crate::processors::*;
    pub use crate::scope::Scope;
    pub use crate::sinks::*;
    pub use crate::sources::*;
}

// Re-export main error type
pub use crate::core::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
