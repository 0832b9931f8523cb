use std::fmt;

use crate::domain::CheckEntry;

/// Turns one check outcome into a signed score delta.
///
/// The ledger clamps the resulting score to its bounds, so a policy only
/// decides direction and magnitude.
pub trait ScorePolicy: Send + Sync + fmt::Debug {
    fn delta(&self, entry: &CheckEntry) -> i64;
}

/// Moves the score one band up when the endpoint answered on either scheme
/// and one band down otherwise. Rule outcomes do not contribute.
#[derive(Debug, Clone, Copy)]
pub struct StepScorePolicy {
    step: i64,
}

impl StepScorePolicy {
    pub fn new(step: i64) -> Self {
        Self { step: step.abs() }
    }
}

impl ScorePolicy for StepScorePolicy {
    fn delta(&self, entry: &CheckEntry) -> i64 {
        if entry.is_reachable() {
            self.step
        } else {
            -self.step
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Endpoint;

    fn entry(http_ok: bool, https_ok: bool) -> CheckEntry {
        let mut entry =
            CheckEntry::new(Endpoint::parse("1.1.1.1:80").expect("valid"));
        entry.http_ok = http_ok;
        entry.https_ok = https_ok;
        entry
    }

    #[test]
    fn reachable_on_either_scheme_moves_up() {
        let policy = StepScorePolicy::new(10);
        assert_eq!(policy.delta(&entry(true, false)), 10);
        assert_eq!(policy.delta(&entry(false, true)), 10);
        assert_eq!(policy.delta(&entry(false, false)), -10);
    }

    #[test]
    fn rule_results_do_not_change_the_delta() {
        let policy = StepScorePolicy::new(3);
        let mut failing = entry(true, true);
        failing.rule_results.insert("greeting".into(), false);
        assert_eq!(policy.delta(&failing), 3);
    }
}
