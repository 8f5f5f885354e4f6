//! Escalation Score — bounded severity counter and its transition function
//!
//! The score is the only stored escalation state; the level is always derived
//! from it through the policy's threshold table so the two can never diverge.

use serde::{Deserialize, Serialize};

use super::policy::EscalationPolicy;

/// A single cycle's compliance judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the observed activity violated the session rule.
    pub is_violation: bool,
    /// Optional explanatory text from the judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Verdict {
    /// A violation verdict with an optional reason.
    pub fn violation(detail: impl Into<Option<String>>) -> Self {
        Self {
            is_violation: true,
            detail: detail.into(),
        }
    }

    /// A compliant verdict.
    pub fn compliant() -> Self {
        Self {
            is_violation: false,
            detail: None,
        }
    }
}

/// Pure score transition: violation adds `violation_delta` clamped to
/// `score_max`, compliance subtracts `recovery_delta` clamped to 0.
///
/// Total function: any input score is re-clamped into `[0, score_max]`,
/// so the bounds invariant is re-established on every call.
pub fn advance_score(score: u32, verdict: &Verdict, policy: &EscalationPolicy) -> u32 {
    if verdict.is_violation {
        score
            .saturating_add(policy.violation_delta)
            .min(policy.score_max)
    } else {
        score.saturating_sub(policy.recovery_delta).min(policy.score_max)
    }
}

/// Per-session escalation score. Created at 0 when a monitoring session
/// starts, mutated exactly once per completed cycle, discarded at session
/// end. Never persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationScore {
    score: u32,
}

impl EscalationScore {
    /// New session state: score 0, level 0.
    pub fn new() -> Self {
        Self { score: 0 }
    }

    /// Current raw score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Level derived from the current score under `policy`.
    pub fn level(&self, policy: &EscalationPolicy) -> u8 {
        policy.level_for(self.score)
    }

    /// Apply one verdict, returning the new score.
    pub fn advance(&mut self, verdict: &Verdict, policy: &EscalationPolicy) -> u32 {
        self.score = advance_score(self.score, verdict, policy);
        self.score
    }

    /// Force the score back to 0 (session end).
    pub fn reset(&mut self) {
        self.score = 0;
    }
}

impl Default for EscalationScore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_violation_adds_delta() {
        let policy = EscalationPolicy::default();
        let next = advance_score(0, &Verdict::violation(None), &policy);
        assert_eq!(next, 20);
    }

    #[test]
    fn test_compliance_subtracts_delta() {
        let policy = EscalationPolicy::default();
        let next = advance_score(25, &Verdict::compliant(), &policy);
        assert_eq!(next, 15);
    }

    #[test]
    fn test_clamp_at_zero() {
        let policy = EscalationPolicy::default();
        assert_eq!(advance_score(5, &Verdict::compliant(), &policy), 0);
        assert_eq!(advance_score(0, &Verdict::compliant(), &policy), 0);
    }

    #[test]
    fn test_clamp_at_score_max() {
        let policy = EscalationPolicy::default();
        assert_eq!(advance_score(300, &Verdict::violation(None), &policy), 300);
        assert_eq!(advance_score(295, &Verdict::violation(None), &policy), 300);
    }

    #[test]
    fn test_out_of_range_input_is_reclamped() {
        // Unreachable through EscalationScore, but the pure function must
        // still re-establish the invariant for any input.
        let policy = EscalationPolicy::default();
        let next = advance_score(1000, &Verdict::compliant(), &policy);
        assert!(next <= policy.score_max);
    }

    #[test]
    fn test_worked_example_three_violations() {
        // Spec example: three violations from 0 with delta 20 give scores
        // 20, 40, 60 and levels 0→1→1→2 under the default table.
        let policy = EscalationPolicy::default();
        let mut state = EscalationScore::new();
        assert_eq!(state.level(&policy), 0);

        assert_eq!(state.advance(&Verdict::violation(None), &policy), 20);
        assert_eq!(state.level(&policy), 1);

        assert_eq!(state.advance(&Verdict::violation(None), &policy), 40);
        assert_eq!(state.level(&policy), 1);

        assert_eq!(state.advance(&Verdict::violation(None), &policy), 60);
        assert_eq!(state.level(&policy), 2);
    }

    #[test]
    fn test_score_bounds_hold_for_random_sequences() {
        // Property: 0 <= score <= score_max after any verdict sequence.
        let policy = EscalationPolicy::default();
        let mut rng = rand::rng();

        for _ in 0..100 {
            let mut state = EscalationScore::new();
            for _ in 0..500 {
                let verdict = if rng.random_bool(0.5) {
                    Verdict::violation(None)
                } else {
                    Verdict::compliant()
                };
                let score = state.advance(&verdict, &policy);
                assert!(score <= policy.score_max, "score {} out of range", score);
            }
        }
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let policy = EscalationPolicy::default();
        let mut state = EscalationScore::new();
        state.advance(&Verdict::violation(None), &policy);
        state.advance(&Verdict::violation(None), &policy);
        assert_eq!(state.score(), 40);

        state.reset();
        assert_eq!(state.score(), 0);
        assert_eq!(state.level(&policy), 0);
    }

    #[test]
    fn test_verdict_serde() {
        let verdict = Verdict::violation(Some("social media during work".to_string()));
        let json = serde_json::to_string(&verdict).unwrap();
        let restored: Verdict = serde_json::from_str(&json).unwrap();
        assert!(restored.is_violation);
        assert_eq!(restored.detail.as_deref(), Some("social media during work"));

        let compliant = Verdict::compliant();
        let json = serde_json::to_string(&compliant).unwrap();
        assert!(!json.contains("detail"));
    }
}
