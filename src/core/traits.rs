//! Traits for the pluggable ends and middles of a pipeline.
//!
//! Closures cover the common cases (`filter`, `map`, `reduce`). These traits
//! are for stages that keep state or can fail: a [`Source`] feeds a source
//! stage, a [`Processor`] runs inside a transform stage and a [`Sink`]
//! terminates a pipeline.

use crate::core::error::Result;
use async_trait::async_trait;

/// A source generates items one at a time until it is exhausted.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use chanweld::core::{Result, Source};
///
/// struct Countdown(u32);
///
/// #[async_trait]
/// impl Source for Countdown {
///     type Item = u32;
///
///     async fn next(&mut self) -> Result<Option<Self::Item>> {
///         if self.0 == 0 {
///             return Ok(None);
///         }
///         self.0 -= 1;
///         Ok(Some(self.0))
///     }
/// }
/// ```
#[async_trait]
pub trait Source {
    /// The type of items this source generates
    type Item: Send + 'static;

    /// Produce the next item, or `None` once the source is exhausted.
    ///
    /// A source is single-pass: after `None` it is not restarted.
    async fn next(&mut self) -> Result<Option<Self::Item>>;
}

/// A processor transforms each input into zero or more outputs.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use chanweld::core::{Processor, Result};
///
/// struct Duplicate;
///
/// #[async_trait]
/// impl Processor for Duplicate {
///     type Input = i32;
///     type Output = i32;
///
///     async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
///         Ok(vec![item, item])
///     }
/// }
/// ```
#[async_trait]
pub trait Processor {
    /// The type of items this processor accepts
    type Input: Send + 'static;
    /// The type of items this processor produces
    type Output: Send + 'static;

    /// Process one input item. Outputs are sent downstream in order.
    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>>;

    /// Called when the input channel is closed and drained, allowing final
    /// output generation.
    async fn finish(&mut self) -> Result<Vec<Self::Output>> {
        Ok(vec![])
    }
}

/// A sink consumes the items at the end of a pipeline.
#[async_trait]
pub trait Sink {
    /// The type of items this sink accepts
    type Item: Send + 'static;

    /// Write a single item.
    async fn write(&mut self, item: Self::Item) -> Result<()>;

    /// Called when the upstream channel is closed and drained.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
