/// How many iterations a loop performs before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Loop until the process exits.
    #[default]
    Continuous,
    /// Run exactly this many iterations, then return.
    Bounded(u64),
}

impl RunMode {
    /// A single iteration, used by `--once` and by tests.
    pub const fn once() -> Self {
        Self::Bounded(1)
    }

    pub const fn is_bounded(&self) -> bool {
        matches!(self, Self::Bounded(_))
    }

    /// Whether another iteration may start after `completed` ones.
    pub const fn allows(&self, completed: u64) -> bool {
        match self {
            Self::Continuous => true,
            Self::Bounded(limit) => completed < *limit,
        }
    }

    /// Whether the iteration that just brought the count to `completed`
    /// was the final one. Periodic loops skip their interval sleep then.
    pub const fn is_last(&self, completed: u64) -> bool {
        !self.allows(completed)
    }
}

/// Iteration counters returned by a bounded loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    pub iterations: u64,
    pub failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_mode_stops_at_the_limit() {
        let mode = RunMode::Bounded(2);
        assert!(mode.allows(0));
        assert!(mode.allows(1));
        assert!(!mode.allows(2));
        assert!(mode.is_last(2));
    }

    #[test]
    fn continuous_mode_never_stops() {
        assert!(RunMode::Continuous.allows(u64::MAX));
        assert!(!RunMode::Continuous.is_bounded());
        assert_eq!(RunMode::once(), RunMode::Bounded(1));
    }
}
