//! Processor implementations for the chanweld library.
//!
//! These run inside transform stages. `filter` and `map` on a pipeline are
//! thin wrappers over [`FilterProcessor`] and [`MapProcessor`].

use async_trait::async_trait;

use crate::core::{Processor, Result};

/// A processor that maps items using a function.
pub struct MapProcessor<F, T, U> {
    f: F,
    _phantom: std::marker::PhantomData<fn(T) -> U>,
}

impl<F, T, U> MapProcessor<F, T, U> {
    /// Create a new map processor
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, U> Processor for MapProcessor<F, T, U>
where
    F: FnMut(T) -> U + Send,
    T: Send + 'static,
    U: Send + 'static,
{
    type Input = T;
    type Output = U;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        Ok(vec![(self.f)(item)])
    }
}

/// A processor that maps items with a function that may fail.
///
/// The first error fails the stage.
pub struct TryMapProcessor<F, T, U> {
    f: F,
    _phantom: std::marker::PhantomData<fn(T) -> U>,
}

impl<F, T, U> TryMapProcessor<F, T, U> {
    /// Create a new fallible map processor
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, U> Processor for TryMapProcessor<F, T, U>
where
    F: FnMut(T) -> Result<U> + Send,
    T: Send + 'static,
    U: Send + 'static,
{
    type Input = T;
    type Output = U;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        Ok(vec![(self.f)(item)?])
    }
}

/// A processor that filters items using a predicate.
///
/// This processor only passes items that satisfy the predicate, in their
/// original order.
pub struct FilterProcessor<F, T> {
    predicate: F,
    _phantom: std::marker::PhantomData<fn(T)>,
}

impl<F, T> FilterProcessor<F, T> {
    /// Create a new filter processor
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Processor for FilterProcessor<F, T>
where
    F: FnMut(&T) -> bool + Send,
    T: Send + 'static,
{
    type Input = T;
    type Output = T;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        if (self.predicate)(&item) {
            Ok(vec![item])
        } else {
            Ok(vec![])
        }
    }
}

/// A processor that batches items.
///
/// A short final batch is flushed when the input closes.
pub struct BatchProcessor<T> {
    batch_size: usize,
    batch: Vec<T>,
}

impl<T> BatchProcessor<T> {
    /// Create a new batch processor
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Processor for BatchProcessor<T> {
    type Input = T;
    type Output = Vec<T>;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        self.batch.push(item);

        if self.batch.len() >= self.batch_size {
            let batch = std::mem::take(&mut self.batch);
            Ok(vec![batch])
        } else {
            Ok(vec![])
        }
    }

    async fn finish(&mut self) -> Result<Vec<Self::Output>> {
        if self.batch.is_empty() {
            Ok(vec![])
        } else {
            let batch = std::mem::take(&mut self.batch);
            Ok(vec![batch])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    #[tokio::test]
    async fn test_filter_processor() {
        let mut odd = FilterProcessor::new(|x: &i64| x % 2 != 0);
        assert_eq!(odd.process(3).await.unwrap(), vec![3]);
        assert!(odd.process(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_try_map_processor() {
        let mut decrement = TryMapProcessor::new(|x: u32| {
            x.checked_sub(1).ok_or_else(|| Error::custom("underflow"))
        });
        assert_eq!(decrement.process(5).await.unwrap(), vec![4]);
        assert!(decrement.process(0).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_processor() {
        let mut batcher = BatchProcessor::new(3);
        let mut batches = Vec::new();
        for i in 1..=7 {
            batches.extend(batcher.process(i).await.unwrap());
        }
        batches.extend(batcher.finish().await.unwrap());

        assert_eq!(batches, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }
}
