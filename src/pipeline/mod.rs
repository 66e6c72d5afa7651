//! Pipeline composition.
//!
//! A [`Pipeline`] chains a source, any number of transform stages and one
//! terminal operation. Every stage starts running the moment it is added,
//! each in its own task, connected to its neighbours only by channels.
//!
//! ```rust
//! use chanweld::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let sum = Pipeline::sequence(20)
//!     .filter(|n| n % 2 != 0)
//!     .map(|n| n * n)
//!     .reduce(0, |acc, n| acc + n)
//!     .await?;
//! assert_eq!(sum, 1330);
//! # Ok(())
//! # }
//! ```

pub mod stages;

use std::convert::identity;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::channel::{Capacity, Channel};
use crate::core::{Error, Processor, Result, Sink, Source};
use crate::scope::Scope;
use crate::util::CancellableExt;

/// Configuration for pipeline execution
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Capacity policy of the channel each new stage writes into
    pub capacity: Capacity,
    /// Upper bound on the terminal operation, covering every stage
    #[cfg_attr(feature = "serde", serde(with = "timeout_millis"))]
    pub operation_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::Rendezvous,
            operation_timeout: None,
        }
    }
}

#[cfg(feature = "serde")]
mod timeout_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(super::millis).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builds the source stage of a pipeline under a given configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Set the capacity policy for the channels between stages
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Use buffered channels of the given size between stages
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.capacity = Capacity::buffered(size);
        self
    }

    /// Set the operation timeout
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = Some(timeout);
        self
    }

    /// The configuration built so far
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn start<T>(self, source: impl FnOnce(&Scope, Capacity) -> Channel<T>) -> Pipeline<T> {
        let scope = Scope::new();
        let tail = source(&scope, self.config.capacity);
        Pipeline {
            scope,
            tail,
            config: self.config,
        }
    }

    /// Source stage sending `1..=count`
    pub fn sequence(self, count: i64) -> Pipeline<i64> {
        self.start(|scope, capacity| stages::produce_sequence(scope, capacity, count))
    }

    /// Source stage sending every item of `iter`
    pub fn from_iter<I>(self, iter: I) -> Pipeline<I::Item>
    where
        I: IntoIterator + Send + 'static,
        I::IntoIter: Send,
        I::Item: Send + 'static,
    {
        self.start(|scope, capacity| stages::produce_iter(scope, capacity, iter))
    }

    /// Source stage pulling from a [`Source`]
    pub fn from_source<S>(self, source: S) -> Pipeline<S::Item>
    where
        S: Source + Send + 'static,
    {
        self.start(|scope, capacity| stages::produce_from_source(scope, capacity, source))
    }

    /// Source stage running arbitrary work against its output channel
    pub fn produce<T, F, Fut>(self, work: F) -> Pipeline<T>
    where
        T: Send + 'static,
        F: FnOnce(Channel<T>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.start(|scope, capacity| scope.produce("source", capacity, work))
    }

    /// Start from a channel fed by code outside the pipeline.
    ///
    /// That producer must close the channel when done, or the terminal
    /// operation waits forever (or until cancelled).
    pub fn from_channel<T>(self, channel: Channel<T>) -> Pipeline<T> {
        self.start(|_, _| channel)
    }
}

/// A running chain of stages ending in `Channel<T>`.
///
/// Dropping a pipeline without running a terminal operation cancels it.
pub struct Pipeline<T> {
    scope: Scope,
    tail: Channel<T>,
    config: PipelineConfig,
}

impl Pipeline<i64> {
    /// Shorthand for `Pipeline::builder().sequence(count)`
    pub fn sequence(count: i64) -> Self {
        PipelineBuilder::new().sequence(count)
    }
}

impl Pipeline<()> {
    /// Configure the source stage before creating it
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Shorthand for `Pipeline::builder().from_iter(iter)`
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Send + 'static,
        I::IntoIter: Send,
    {
        PipelineBuilder::new().from_iter(iter)
    }

    /// Shorthand for `Pipeline::builder().from_source(source)`
    pub fn from_source<S>(source: S) -> Self
    where
        S: Source<Item = T> + Send + 'static,
    {
        PipelineBuilder::new().from_source(source)
    }

    /// Shorthand for `Pipeline::builder().from_channel(channel)`
    pub fn from_channel(channel: Channel<T>) -> Self {
        PipelineBuilder::new().from_channel(channel)
    }

    /// Set the capacity policy for stages added from here on
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Use buffered channels of the given size for stages added from here on
    pub fn buffer_size(self, size: usize) -> Self {
        self.capacity(Capacity::buffered(size))
    }

    /// Set the operation timeout for the terminal operation
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = Some(timeout);
        self
    }

    /// The current configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The channel the last stage writes into
    pub fn channel(&self) -> &Channel<T> {
        &self.tail
    }

    /// A token that cancels every stage of this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.scope.cancellation_token()
    }

    /// Cancel every stage; their outputs close and the terminal operation
    /// fails with [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.scope.cancel();
    }

    fn then<U>(self, stage: impl FnOnce(&Scope, Channel<T>, Capacity) -> Channel<U>) -> Pipeline<U> {
        let Pipeline {
            scope,
            tail,
            config,
        } = self;
        let tail = stage(&scope, tail, config.capacity);
        Pipeline {
            scope,
            tail,
            config,
        }
    }

    /// Keep only the values for which `predicate` holds
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        self.then(|scope, input, capacity| stages::filter(scope, input, capacity, predicate))
    }

    /// Transform every value
    pub fn map<U, F>(self, mapper: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.then(|scope, input, capacity| stages::map(scope, input, capacity, mapper))
    }

    /// Transform every value; the first error fails the pipeline
    pub fn try_map<U, F>(self, mapper: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Result<U> + Send + 'static,
    {
        self.then(|scope, input, capacity| stages::try_map(scope, input, capacity, mapper))
    }

    /// Run every value through a [`Processor`]
    pub fn process<P>(self, processor: P) -> Pipeline<P::Output>
    where
        P: Processor<Input = T> + Send + 'static,
    {
        self.then(|scope, input, capacity| {
            stages::process(scope, input, capacity, "process", processor)
        })
    }

    /// Fan other channels into this pipeline
    pub fn merge(self, others: Vec<Channel<T>>) -> Self {
        self.then(|scope, input, capacity| {
            let mut inputs = Vec::with_capacity(others.len() + 1);
            inputs.push(input);
            inputs.extend(others);
            stages::merge(scope, inputs, capacity)
        })
    }

    /// Fold every value left to right once all stages have finished.
    pub async fn reduce<A, F>(self, seed: A, accumulator: F) -> Result<A>
    where
        A: Send,
        F: FnMut(A, T) -> A + Send,
    {
        self.finish_with(|tail| async move { Ok(stages::reduce(tail, seed, accumulator).await) })
            .await
    }

    /// Collect every value in arrival order
    pub async fn collect(self) -> Result<Vec<T>> {
        self.finish_with(|tail| async move { Ok(tail.collect().await) })
            .await
    }

    /// Call `f` on every value in arrival order
    pub async fn consume_each<F>(self, f: F) -> Result<()>
    where
        F: FnMut(T) + Send,
    {
        self.finish_with(|tail| async move {
            tail.consume_each(f).await;
            Ok(())
        })
        .await
    }

    /// Write every value into `sink`
    pub async fn sink<S>(self, sink: S) -> Result<()>
    where
        S: Sink<Item = T> + Send,
    {
        self.finish_with(|tail| stages::drain_into(tail, sink)).await
    }

    /// Take the scope and the last channel apart, to drain it by hand.
    ///
    /// Call [`Scope::join`] afterwards to learn whether every stage succeeded.
    pub fn into_parts(self) -> (Scope, Channel<T>) {
        (self.scope, self.tail)
    }

    async fn finish_with<R, F, Fut>(self, terminal: F) -> Result<R>
    where
        F: FnOnce(Channel<T>) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let Pipeline {
            scope,
            tail,
            config,
        } = self;

        let drained = terminal(tail).cancellable(scope.cancellation_token());
        let result = match config.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, drained)
                .await
                .map_err(|_| Error::timeout(millis(limit)))
                .and_then(identity),
            None => drained.await,
        }
        .and_then(identity);

        // Upstream stages may be parked on a send nobody will take.
        if result.is_err() {
            scope.cancel();
        }

        match (result, scope.join().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(joined)) if e.is_cancelled() => Err(joined),
            (Err(e), Err(_)) => Err(e),
        }
    }
}
