//! Stage runner.
//!
//! A [`Scope`] owns a set of concurrently running stages. Each stage is a
//! tokio task with an optional output channel, and the scope guarantees that
//! output is closed exactly once on every exit path: normal return, error,
//! panic, cancellation, or the scope being dropped.
//!
//! Failures are fail-fast. The first stage that returns an error cancels the
//! scope, so no sibling stays suspended on a channel that will never move
//! again, and [`Scope::join`] reports the failing stage rather than the
//! cancellations it caused.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::channel::{Capacity, Channel};
use crate::core::{Error, Result};
use crate::telemetry::{self, log_debug, log_warn, names};
use crate::util::CancellableExt;

/// Closes the wrapped channel when dropped.
struct CloseOnDrop<T>(Channel<T>);

impl<T> Drop for CloseOnDrop<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Owner of a group of running stages and of their cancellation.
///
/// Dropping a scope cancels it and aborts whatever is still running.
pub struct Scope {
    token: CancellationToken,
    stages: Mutex<JoinSet<Result<()>>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("active_stages", &self.active_stages())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Scope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            stages: Mutex::new(JoinSet::new()),
        }
    }

    fn stages(&self) -> MutexGuard<'_, JoinSet<Result<()>>> {
        self.stages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `work` as a stage writing into a fresh channel.
    ///
    /// The channel is returned immediately, before the stage has produced
    /// anything; it is valid but possibly empty until drained, and the
    /// stage closes it when `work` completes.
    pub fn produce<T, F, Fut>(
        &self,
        name: impl Into<String>,
        capacity: Capacity,
        work: F,
    ) -> Channel<T>
    where
        T: Send + 'static,
        F: FnOnce(Channel<T>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let output = Channel::new(capacity);
        self.spawn_stage(name, Some(output.clone()), work(output.clone()));
        output
    }

    /// Run `work` as a stage with no output channel.
    pub fn launch<Fut>(&self, name: impl Into<String>, work: Fut)
    where
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn_stage::<(), _>(name, None, work);
    }

    /// Start a stage on the runtime and return at once.
    ///
    /// `output`, if given, is closed after `work` finishes, fails, panics or
    /// is cancelled. A failure is attributed to `name` and cancels the rest
    /// of the scope.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn spawn_stage<T, Fut>(
        &self,
        name: impl Into<String>,
        output: Option<Channel<T>>,
        work: Fut,
    ) where
        T: Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let token = self.token.clone();

        let stage = async move {
            let close = output.map(CloseOnDrop);
            log_debug!(stage = %name, "stage started");

            let outcome = AssertUnwindSafe(work.cancellable(token.clone()))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(Error::stage(name.as_str(), e)),
                Ok(Err(cancelled)) => Err(cancelled),
                Err(_) => Err(Error::StagePanicked {
                    stage: name.clone(),
                }),
            };

            // Downstream must see the close before anyone sees the failure.
            drop(close);

            match &result {
                Ok(()) => log_debug!(stage = %name, "stage finished"),
                Err(Error::Cancelled) => log_debug!(stage = %name, "stage cancelled"),
                Err(e) => {
                    log_warn!(stage = %name, error = %e, "stage failed");
                    telemetry::count(names::STAGE_FAILURES);
                    token.cancel();
                }
            }
            result
        };

        self.stages().spawn(stage);
    }

    /// Number of stages not yet collected by [`join`](Self::join)
    pub fn active_stages(&self) -> usize {
        self.stages().len()
    }

    /// Cancel every stage in this scope.
    ///
    /// Suspended sends and receives are interrupted and every stage output
    /// is closed, so nothing downstream waits forever.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            log_debug!("scope cancelled");
        }
        self.token.cancel();
    }

    /// Whether the scope was cancelled, explicitly or by a failing stage
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token that cancels this scope; hand it to code outside the pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for every stage to terminate.
    ///
    /// Returns the failing stage's error. Several independent failures are
    /// reported together as [`Error::Multiple`]; if stages only stopped
    /// because of cancellation, the result is [`Error::Cancelled`].
    pub async fn join(&self) -> Result<()> {
        let mut failures = Vec::new();
        let mut cancelled = false;

        loop {
            // Stages may launch further stages while we wait.
            let mut stages = std::mem::take(&mut *self.stages());
            if stages.is_empty() {
                break;
            }
            while let Some(joined) = stages.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(Error::Cancelled)) => cancelled = true,
                    Ok(Err(e)) => failures.push(e),
                    // Panics are caught inside the stage; only aborts land here.
                    Err(_) => cancelled = true,
                }
            }
        }

        match failures.len() {
            0 if cancelled => Err(Error::Cancelled),
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Error::Multiple(failures)),
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        // The JoinSet aborts its tasks when dropped right after this.
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn produce_returns_before_the_stage_runs_and_closes_after() {
        let scope = Scope::new();
        let letters = scope.produce("letters", Capacity::Rendezvous, |out| async move {
            for letter in ["A", "B", "C", "D"] {
                out.send(letter).await?;
            }
            Ok(())
        });

        assert!(!letters.is_closed_for_receive());
        assert_eq!(letters.receive().await.unwrap(), "A");

        let mut rest = Vec::new();
        letters.consume_each(|letter| rest.push(letter)).await;
        assert_eq!(rest, vec!["B", "C", "D"]);
        assert!(letters.is_closed_for_receive());
        scope.join().await.unwrap();
    }

    #[tokio::test]
    async fn failing_stage_closes_its_output_and_reports() {
        let scope = Scope::new();
        let numbers = scope.produce("flaky", Capacity::Unbounded, |out| async move {
            out.send(1).await?;
            Err(Error::custom("sensor unplugged"))
        });

        assert_eq!(numbers.collect().await, vec![1]);
        let err = scope.join().await.unwrap_err();
        assert!(matches!(&err, Error::StageFailure { stage, .. } if stage == "flaky"));
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn panicking_stage_still_closes_its_output() {
        let scope = Scope::new();
        let numbers: Channel<u8> = scope.produce("panics", Capacity::Rendezvous, |out| async move {
            if out.capacity() == Capacity::Rendezvous {
                panic!("stage blew up");
            }
            Ok(())
        });

        assert!(numbers.collect().await.is_empty());
        assert!(matches!(
            scope.join().await,
            Err(Error::StagePanicked { stage }) if stage == "panics"
        ));
    }

    #[tokio::test]
    async fn failure_cancels_stages_stuck_on_a_send() {
        let scope = Scope::new();
        // Nobody ever receives from this one.
        let stuck = scope.produce("stuck", Capacity::Rendezvous, |out| async move {
            out.send(0u32).await?;
            Ok(())
        });
        scope.launch("doomed", async { Err(Error::custom("boom")) });

        let joined = tokio::time::timeout(Duration::from_secs(5), scope.join())
            .await
            .expect("join must not hang");
        assert!(matches!(&joined, Err(Error::StageFailure { stage, .. }) if stage == "doomed"));
        assert!(stuck.is_closed_for_receive());
    }

    #[tokio::test]
    async fn independent_failures_are_reported_together() {
        let scope = Scope::new();
        scope.launch("parser", async { Err(Error::custom("bad header")) });
        scope.launch("writer", async { Err(Error::custom("disk full")) });

        let errors = match scope.join().await {
            Err(Error::Multiple(errors)) => errors,
            other => panic!("expected several failures, got {other:?}"),
        };
        let mut stages: Vec<_> = errors
            .iter()
            .map(|e| match e {
                Error::StageFailure { stage, .. } => stage.as_str(),
                other => panic!("unexpected error {other:?}"),
            })
            .collect();
        stages.sort_unstable();
        assert_eq!(stages, vec!["parser", "writer"]);
    }

    #[tokio::test]
    async fn cancel_closes_outputs_and_reports_cancellation() {
        let scope = Scope::new();
        let ticks = scope.produce("ticks", Capacity::buffered(2), |out| async move {
            let mut n = 0u64;
            loop {
                out.send(n).await?;
                n += 1;
            }
        });

        assert_eq!(ticks.receive().await.unwrap(), 0);
        scope.cancel();

        assert!(matches!(scope.join().await, Err(Error::Cancelled)));
        assert!(ticks.is_closed_for_send());
        assert_eq!(scope.active_stages(), 0);
    }

    #[tokio::test]
    async fn dropping_the_scope_closes_outputs() {
        let scope = Scope::new();
        let forever: Channel<()> = scope.produce("forever", Capacity::Rendezvous, |_out| async {
            std::future::pending::<()>().await;
            Ok(())
        });
        drop(scope);

        let drained = tokio::time::timeout(Duration::from_secs(5), forever.receive_catching())
            .await
            .expect("output must close");
        assert!(drained.is_none());
    }
}
