//! Utility functions and helper types.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::core::{Error, Result};

/// A future that is interrupted at its next suspension point once its token
/// is cancelled.
///
/// Cancellation drops nothing by itself: the inner future is dropped with
/// the `Cancellable`, which is what withdraws its pending sends and receives.
pub struct Cancellable<F> {
    future: Pin<Box<F>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<F> Cancellable<F> {
    /// Create a new cancellable future
    pub fn new(future: F, token: CancellationToken) -> Self {
        Self {
            future: Box::pin(future),
            cancelled: Box::pin(token.cancelled_owned()),
        }
    }
}

impl<F> Future for Cancellable<F>
where
    F: Future,
{
    type Output = Result<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // Work that can finish without suspending keeps its own outcome.
        if let Poll::Ready(output) = this.future.as_mut().poll(cx) {
            return Poll::Ready(Ok(output));
        }

        // Polling the token also registers us, so a cancel while the inner
        // future is parked still wakes us.
        match this.cancelled.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(Error::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Extension trait for making futures cancellable
pub trait CancellableExt: Future + Sized {
    /// Make this future cancellable
    fn cancellable(self, token: CancellationToken) -> Cancellable<Self> {
        Cancellable::new(self, token)
    }
}

impl<F: Future> CancellableExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let value = async { 5 }.cancellable(token).await;
        assert!(matches!(value, Ok(5)));
    }

    #[tokio::test]
    async fn cancel_wakes_a_parked_future() {
        let token = CancellationToken::new();
        let mut parked = task::spawn(std::future::pending::<()>().cancellable(token.clone()));
        assert_pending!(parked.poll());

        token.cancel();
        assert!(parked.is_woken());
        assert!(matches!(assert_ready!(parked.poll()), Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn ready_work_keeps_its_result_after_cancel() {
        let token = CancellationToken::new();
        token.cancel();

        let value = async { 5 }.cancellable(token.clone()).await;
        assert!(matches!(value, Ok(5)));

        let parked = std::future::pending::<()>().cancellable(token).await;
        assert!(matches!(parked, Err(Error::Cancelled)));
    }
}
