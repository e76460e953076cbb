//! Convergence policy
//!
//! Decides, after each automatic-mode round, whether the run keeps going.
//! Only the reviewer-selected draft's score counts.

use tracing::debug;

use crate::domain::{PauseReason, RunConfiguration};

/// What the loop should do after a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    PauseConverged,
    PauseExhausted,
}

impl Decision {
    /// The pause reason, if this decision pauses the run
    pub fn pause_reason(&self) -> Option<PauseReason> {
        match self {
            Decision::Continue => None,
            Decision::PauseConverged => Some(PauseReason::Converged),
            Decision::PauseExhausted => Some(PauseReason::Exhausted),
        }
    }
}

/// Decide whether to continue after round `round` scored `score`
///
/// Manual batches never pause early: they always run their full count.
pub fn decide(score: u8, round: u32, config: &RunConfiguration, manual: bool) -> Decision {
    if manual {
        debug!(score, round, "decide: manual batch, continuing");
        return Decision::Continue;
    }

    let decision = if score >= config.target_score && round >= config.min_iterations {
        Decision::PauseConverged
    } else if round >= config.max_iterations {
        Decision::PauseExhausted
    } else {
        Decision::Continue
    };

    debug!(
        score,
        round,
        target = config.target_score,
        min = config.min_iterations,
        max = config.max_iterations,
        ?decision,
        "decide: called"
    );
    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfiguration {
        RunConfiguration::new("m", "brief", "criteria")
            .with_iterations(2, 5)
            .with_target_score(80)
    }

    #[test]
    fn test_min_iterations_gate_convergence() {
        assert_eq!(decide(85, 1, &config(), false), Decision::Continue);
        assert_eq!(decide(85, 2, &config(), false), Decision::PauseConverged);
    }

    #[test]
    fn test_exhausted_at_max() {
        assert_eq!(decide(50, 5, &config(), false), Decision::PauseExhausted);
        assert_eq!(decide(50, 3, &config(), false), Decision::Continue);
    }

    #[test]
    fn test_converged_wins_over_exhausted() {
        assert_eq!(decide(80, 5, &config(), false), Decision::PauseConverged);
    }

    #[test]
    fn test_manual_always_continues() {
        assert_eq!(decide(100, 7, &config(), true), Decision::Continue);
        assert_eq!(decide(0, 99, &config(), true), Decision::Continue);
    }

    #[test]
    fn test_pause_reason() {
        assert_eq!(Decision::Continue.pause_reason(), None);
        assert_eq!(Decision::PauseConverged.pause_reason(), Some(PauseReason::Converged));
        assert_eq!(Decision::PauseExhausted.pause_reason(), Some(PauseReason::Exhausted));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn manual_never_pauses(score in 0u8..=100, round in 1u32..50, min in 1u32..10, extra in 0u32..10, target in 0u8..=100) {
                let cfg = config().with_iterations(min, min + extra).with_target_score(target);
                prop_assert_eq!(decide(score, round, &cfg, true), Decision::Continue);
            }

            #[test]
            fn auto_matches_rules(score in 0u8..=100, round in 1u32..50, min in 1u32..10, extra in 0u32..10, target in 0u8..=100) {
                let cfg = config().with_iterations(min, min + extra).with_target_score(target);
                let decision = decide(score, round, &cfg, false);
                match decision {
                    Decision::PauseConverged => prop_assert!(score >= target && round >= min),
                    Decision::PauseExhausted => prop_assert!(round >= min + extra && !(score >= target && round >= min)),
                    Decision::Continue => prop_assert!(round < min + extra && !(score >= target && round >= min)),
                }
            }

            #[test]
            fn auto_always_pauses_at_max(score in 0u8..=100, min in 1u32..10, extra in 0u32..10, target in 0u8..=100) {
                let cfg = config().with_iterations(min, min + extra).with_target_score(target);
                prop_assert_ne!(decide(score, min + extra, &cfg, false), Decision::Continue);
            }
        }
    }
}
