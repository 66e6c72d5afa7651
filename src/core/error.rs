//! Error types for channels, stages and pipelines.

use std::sync::Arc;

/// The main error type for channels and the pipelines built on them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A value was sent on a closed channel, or a single receive found the
    /// channel closed and drained.
    #[error("Channel was closed")]
    ChannelClosed,

    /// A stage's work function failed before closing its output
    #[error("Stage `{stage}` failed: {source}")]
    StageFailure {
        stage: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// A stage panicked; its output channel was still closed
    #[error("Stage `{stage}` panicked")]
    StagePanicked { stage: String },

    /// The owning scope was cancelled
    #[error("Pipeline was cancelled")]
    Cancelled,

    /// An operation timed out
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),

    /// Several stages failed independently
    #[error("Multiple errors occurred: {}", format_multiple(.0))]
    Multiple(Vec<Error>),
}

fn format_multiple(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}]", e))
        .collect::<Vec<_>>()
        .join(", ")
}

// Convenience constructors
impl Error {
    /// Attribute an error to the named stage.
    ///
    /// Errors that already carry stage context, and cancellation, pass
    /// through untouched so the root cause is not buried.
    pub fn stage<S: Into<String>>(stage: S, error: Error) -> Self {
        match error {
            Error::StageFailure { .. }
            | Error::StagePanicked { .. }
            | Error::Cancelled
            | Error::Multiple(_) => error,
            other => Error::StageFailure {
                stage: stage.into(),
                source: Arc::new(other),
            },
        }
    }

    /// Create a stage failure from any error type
    pub fn stage_failure<S, E>(stage: S, error: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::StageFailure {
            stage: stage.into(),
            source: Arc::new(error),
        }
    }

    /// Create a timeout error
    pub fn timeout(duration_ms: u64) -> Self {
        Error::Timeout { duration_ms }
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }

    /// True for the error produced by cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// True when this error, or the error it wraps, is a closed channel.
    pub fn is_channel_closed(&self) -> bool {
        match self {
            Error::ChannelClosed => true,
            Error::StageFailure { source, .. } => source
                .downcast_ref::<Error>()
                .is_some_and(Error::is_channel_closed),
            _ => false,
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Error::Custom(format!("Timeout: {}", e))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wraps_plain_errors_once() {
        let wrapped = Error::stage("map", Error::custom("boom"));
        assert!(matches!(&wrapped, Error::StageFailure { stage, .. } if stage == "map"));
        assert_eq!(wrapped.to_string(), "Stage `map` failed: boom");

        let rewrapped = Error::stage("reduce", wrapped);
        assert!(matches!(&rewrapped, Error::StageFailure { stage, .. } if stage == "map"));
    }

    #[test]
    fn cancellation_is_never_wrapped() {
        assert!(Error::stage("filter", Error::Cancelled).is_cancelled());
    }

    #[test]
    fn channel_closed_is_seen_through_stage_context() {
        let err = Error::stage("source", Error::ChannelClosed);
        assert!(err.is_channel_closed());
        assert!(!Error::custom("nope").is_channel_closed());
    }

    #[test]
    fn multiple_lists_every_error() {
        let err = Error::Multiple(vec![Error::ChannelClosed, Error::timeout(5)]);
        assert_eq!(
            err.to_string(),
            "Multiple errors occurred: [Channel was closed], [Operation timed out after 5ms]"
        );
    }
}
