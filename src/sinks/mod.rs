//! Sink implementations for the chanweld library.
//!
//! This module provides sinks that terminate a pipeline.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use crate::core::{Result, Sink};

/// A sink that collects items into a vector.
///
/// Clones share the same storage, so keep one to read the items back after
/// the pipeline has finished.
pub struct CollectSink<T> {
    items: Arc<TokioMutex<Vec<T>>>,
}

impl<T: Send + 'static + Clone> CollectSink<T> {
    /// Create a new collect sink
    pub fn new() -> Self {
        Self {
            items: Arc::new(TokioMutex::new(Vec::new())),
        }
    }

    /// Get the collected items
    pub async fn into_items(self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    /// Get a clone of the items Arc for external access
    pub fn items(&self) -> Arc<TokioMutex<Vec<T>>> {
        self.items.clone()
    }
}

#[async_trait]
impl<T: Send + 'static + Clone> Sink for CollectSink<T> {
    type Item = T;

    async fn write(&mut self, item: Self::Item) -> Result<()> {
        self.items.lock().await.push(item);
        Ok(())
    }
}

impl<T: Send + 'static + Clone> Default for CollectSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CollectSink<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

/// A sink that counts items
pub struct CountSink<T> {
    count: Arc<TokioMutex<usize>>,
    finished: Arc<TokioMutex<bool>>,
    _phantom: std::marker::PhantomData<fn(T)>,
}

impl<T> CountSink<T> {
    /// Create a new count sink
    pub fn new() -> Self {
        Self {
            count: Arc::new(TokioMutex::new(0)),
            finished: Arc::new(TokioMutex::new(false)),
            _phantom: std::marker::PhantomData,
        }
    }

    /// Get the current count
    pub async fn count(&self) -> usize {
        *self.count.lock().await
    }

    /// Whether the upstream channel has been closed and drained
    pub async fn is_finished(&self) -> bool {
        *self.finished.lock().await
    }
}

#[async_trait]
impl<T: Send + 'static> Sink for CountSink<T> {
    type Item = T;

    async fn write(&mut self, _item: Self::Item) -> Result<()> {
        *self.count.lock().await += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        *self.finished.lock().await = true;
        Ok(())
    }
}

impl<T> Default for CountSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CountSink<T> {
    fn clone(&self) -> Self {
        Self {
            count: self.count.clone(),
            finished: self.finished.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}
