//! Source implementations for the chanweld library.
//!
//! This module provides concrete implementations of sources that feed the
//! first stage of a pipeline.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;
use std::ops::{Range, RangeInclusive};

use crate::core::{Result, Source};

/// A source that generates numbers from a range
pub struct RangeSource {
    range: RangeInclusive<i64>,
}

impl RangeSource {
    /// Create a new range source over a half-open range
    pub fn new(range: Range<i64>) -> Self {
        if range.is_empty() {
            return Self::inclusive(1..=0);
        }
        Self::inclusive(range.start..=range.end - 1)
    }

    /// Create a range source that includes its upper bound
    pub fn inclusive(range: RangeInclusive<i64>) -> Self {
        Self { range }
    }

    /// The integers `1..=count`, or nothing when `count` is not positive
    pub fn sequence(count: i64) -> Self {
        Self::inclusive(1..=count)
    }
}

#[async_trait]
impl Source for RangeSource {
    type Item = i64;

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.range.next())
    }
}

/// A source that yields items from a vector
pub struct VecSource<T> {
    items: VecDeque<T>,
}

impl<T> VecSource<T> {
    /// Create a new vector source
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Check if the source has more items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of remaining items
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl<T: Send + 'static> Source for VecSource<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.items.pop_front())
    }
}

/// Helper function to create a source from an async function.
///
/// The function is called until it returns `Ok(None)`.
pub fn from_fn<F, Fut, T>(f: F) -> FnSource<F, Fut, T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Option<T>>> + Send,
    T: Send + 'static,
{
    FnSource {
        f,
        _phantom: std::marker::PhantomData,
    }
}

/// A source created from a function
pub struct FnSource<F, Fut, T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Option<T>>> + Send,
    T: Send + 'static,
{
    f: F,
    _phantom: std::marker::PhantomData<fn() -> (Fut, T)>,
}

#[async_trait]
impl<F, Fut, T> Source for FnSource<F, Fut, T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Option<T>>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        (self.f)().await
    }
}
