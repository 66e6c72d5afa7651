//! Stage functions that wire channels together.
//!
//! Each function starts one stage in the given [`Scope`] and returns its
//! output channel right away. Stages preserve the arrival order of their
//! input and close their output once the input is closed and drained.

use tokio_stream::{StreamExt, StreamMap};

use crate::channel::{Capacity, Channel};
use crate::core::{Processor, Result, Sink, Source};
use crate::processors::{FilterProcessor, MapProcessor, TryMapProcessor};
use crate::scope::Scope;
use crate::sources::RangeSource;

/// Send the integers `1..=count` in order, then close.
pub fn produce_sequence(scope: &Scope, capacity: Capacity, count: i64) -> Channel<i64> {
    produce_from_source(scope, capacity, RangeSource::sequence(count))
}

/// Send every item of `iter` in order, then close.
pub fn produce_iter<I>(scope: &Scope, capacity: Capacity, iter: I) -> Channel<I::Item>
where
    I: IntoIterator + Send + 'static,
    I::IntoIter: Send,
    I::Item: Send + 'static,
{
    scope.produce("source", capacity, move |out| async move {
        for item in iter {
            out.send(item).await?;
        }
        Ok(())
    })
}

/// Pull from `source` until it is exhausted, sending every item.
pub fn produce_from_source<S>(
    scope: &Scope,
    capacity: Capacity,
    mut source: S,
) -> Channel<S::Item>
where
    S: Source + Send + 'static,
{
    scope.produce("source", capacity, move |out| async move {
        while let Some(item) = source.next().await? {
            out.send(item).await?;
        }
        Ok(())
    })
}

/// Run every input value through `processor`, then flush its final outputs.
pub fn process<P>(
    scope: &Scope,
    input: Channel<P::Input>,
    capacity: Capacity,
    name: &str,
    mut processor: P,
) -> Channel<P::Output>
where
    P: Processor + Send + 'static,
{
    scope.produce(name, capacity, move |out| async move {
        while let Some(item) = input.receive_catching().await {
            for output in processor.process(item).await? {
                out.send(output).await?;
            }
        }
        for output in processor.finish().await? {
            out.send(output).await?;
        }
        Ok(())
    })
}

/// Pass on only the values for which `predicate` holds.
pub fn filter<T, F>(
    scope: &Scope,
    input: Channel<T>,
    capacity: Capacity,
    predicate: F,
) -> Channel<T>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    process(scope, input, capacity, "filter", FilterProcessor::new(predicate))
}

/// Pass on `mapper(value)` for every value.
pub fn map<T, U, F>(
    scope: &Scope,
    input: Channel<T>,
    capacity: Capacity,
    mapper: F,
) -> Channel<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    process(scope, input, capacity, "map", MapProcessor::new(mapper))
}

/// Like [`map`], but the first `Err` fails the stage.
pub fn try_map<T, U, F>(
    scope: &Scope,
    input: Channel<T>,
    capacity: Capacity,
    mapper: F,
) -> Channel<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Result<U> + Send + 'static,
{
    process(scope, input, capacity, "try_map", TryMapProcessor::new(mapper))
}

/// Fan several channels into one.
///
/// Each input's order is preserved; how inputs interleave is unspecified.
/// The output closes once every input is closed and drained.
pub fn merge<T>(scope: &Scope, inputs: Vec<Channel<T>>, capacity: Capacity) -> Channel<T>
where
    T: Send + 'static,
{
    let mut streams = StreamMap::new();
    for (index, input) in inputs.into_iter().enumerate() {
        streams.insert(index, Box::pin(input.into_stream()));
    }

    scope.produce("merge", capacity, move |out| async move {
        while let Some((_, item)) = streams.next().await {
            out.send(item).await?;
        }
        Ok(())
    })
}

/// Fold the channel left to right into a single value.
///
/// Suspends until `input` is closed and drained; this is where a concurrent
/// pipeline turns back into one value.
pub async fn reduce<T, A, F>(input: Channel<T>, seed: A, accumulator: F) -> A
where
    F: FnMut(A, T) -> A,
{
    input.fold(seed, accumulator).await
}

/// Write every value into `sink`, finishing it once `input` is drained.
pub async fn drain_into<S>(input: Channel<S::Item>, mut sink: S) -> Result<()>
where
    S: Sink + Send,
{
    while let Some(item) = input.receive_catching().await {
        sink.write(item).await?;
    }
    sink.finish().await
}
