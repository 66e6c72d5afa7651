//! Logging and metrics hooks.
//!
//! Both are behind cargo features (`tracing`, `metrics`). Without them the
//! macros expand to nothing, so call sites never need their own `cfg`.

#[cfg(feature = "tracing")]
macro_rules! log_debug {
    ($($arg:tt)*) => { ::tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_debug {
    ($($arg:tt)*) => { () };
}

#[cfg(feature = "tracing")]
macro_rules! log_trace {
    ($($arg:tt)*) => { ::tracing::trace!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_trace {
    ($($arg:tt)*) => { () };
}

#[cfg(feature = "tracing")]
macro_rules! log_warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_warn {
    ($($arg:tt)*) => { () };
}

pub(crate) use {log_debug, log_trace, log_warn};

/// Counter names published with the `metrics` feature.
pub mod names {
    pub const VALUES_SENT: &str = "chanweld_channel_values_sent_total";
    pub const VALUES_RECEIVED: &str = "chanweld_channel_values_received_total";
    pub const VALUES_OVERWRITTEN: &str = "chanweld_channel_values_overwritten_total";
    pub const STAGE_FAILURES: &str = "chanweld_stage_failures_total";
}

#[inline]
pub(crate) fn count(name: &'static str) {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(name).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = name;
}
