//! Capacity policies for channels.

use std::fmt;

/// How many values a channel may hold before `send` suspends.
///
/// The policy is the only backpressure knob a channel has:
///
/// | Policy       | Buffer | `send` suspends when                 |
/// |--------------|--------|--------------------------------------|
/// | `Rendezvous` | 0      | until a receiver takes the value     |
/// | `Buffered`   | N      | N values are already buffered        |
/// | `Unbounded`  | ∞      | never                                |
/// | `Conflated`  | 1      | never; the pending value is replaced |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Capacity {
    /// Strict hand-off between one sender and one receiver
    #[default]
    Rendezvous,
    /// A fixed-size buffer
    Buffered(usize),
    /// No limit; memory grows with the backlog
    Unbounded,
    /// Latest value only
    Conflated,
}

impl Capacity {
    /// Conventional buffer size when a caller just wants "some" buffering.
    pub const BUFFERED: usize = 64;

    /// A buffered policy; zero means rendezvous.
    pub fn buffered(size: usize) -> Self {
        if size == 0 {
            Capacity::Rendezvous
        } else {
            Capacity::Buffered(size)
        }
    }

    /// Maximum number of values held at once, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match *self {
            Capacity::Rendezvous => Some(0),
            Capacity::Buffered(size) => Some(size),
            Capacity::Unbounded => None,
            Capacity::Conflated => Some(1),
        }
    }

    /// Whether a sender can ever be suspended under this policy.
    pub fn suspends_sender(&self) -> bool {
        matches!(self, Capacity::Rendezvous | Capacity::Buffered(_))
    }

    pub(crate) fn normalized(self) -> Self {
        match self {
            Capacity::Buffered(size) => Capacity::buffered(size),
            other => other,
        }
    }
}

impl From<usize> for Capacity {
    fn from(size: usize) -> Self {
        Capacity::buffered(size)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Rendezvous => write!(f, "rendezvous"),
            Capacity::Buffered(size) => write!(f, "buffered({})", size),
            Capacity::Unbounded => write!(f, "unbounded"),
            Capacity::Conflated => write!(f, "conflated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_buffer_is_rendezvous() {
        assert_eq!(Capacity::buffered(0), Capacity::Rendezvous);
        assert_eq!(Capacity::from(0), Capacity::Rendezvous);
        assert_eq!(Capacity::Buffered(0).normalized(), Capacity::Rendezvous);
        assert_eq!(Capacity::from(10), Capacity::Buffered(10));
    }

    #[test]
    fn limits() {
        assert_eq!(Capacity::Rendezvous.limit(), Some(0));
        assert_eq!(Capacity::Buffered(3).limit(), Some(3));
        assert_eq!(Capacity::Unbounded.limit(), None);
        assert_eq!(Capacity::Conflated.limit(), Some(1));
        assert!(!Capacity::Conflated.suspends_sender());
        assert!(Capacity::default().suspends_sender());
    }
}
