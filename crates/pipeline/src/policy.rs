use std::num::NonZeroUsize;

/// How many submissions may be in flight at once.
///
/// Sequential is the default: the upstream engine rate-limits, and
/// sequential runs start and finish tasks in target order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    #[default]
    Sequential,
    /// At most K concurrent submissions; completions may arrive out of order.
    Bounded(NonZeroUsize),
}

impl ConcurrencyPolicy {
    /// Map a `max_concurrent_submissions` setting; `0` and `1` are sequential.
    pub fn from_max_concurrent(max: usize) -> Self {
        match NonZeroUsize::new(max) {
            Some(k) if k.get() > 1 => Self::Bounded(k),
            _ => Self::Sequential,
        }
    }

    pub fn limit(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Bounded(k) => k.get(),
        }
    }
}
