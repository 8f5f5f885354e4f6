//! Escalation Controller — turns verdicts into level transitions
//!
//! The controller is the sole mutator of a session's escalation score. It
//! applies the pure transition function once per completed cycle and, when
//! the derived level changes, publishes exactly one `LevelChanged` event.
//! Side effects (gateway apply/stand-down) live in a separate dispatcher
//! that consumes those events; the controller never calls the gateway.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::{MonitorEvent, SharedEventBus};

use super::policy::EscalationPolicy;
use super::state::{EscalationScore, Verdict};

/// Result of advancing (or resetting) the escalation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTransition {
    /// Level before the verdict was applied.
    pub previous: u8,
    /// Level after the verdict was applied.
    pub current: u8,
    /// Score after the verdict was applied.
    pub score: u32,
}

impl LevelTransition {
    /// Whether the derived level moved.
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Per-session escalation controller.
///
/// Owns the score exclusively; no other component may mutate it. Calls are
/// logically single-threaded — the scheduler's overlap guard ensures at most
/// one `advance` is in flight per session.
pub struct EscalationController {
    policy: EscalationPolicy,
    state: EscalationScore,
    bus: SharedEventBus,
}

impl EscalationController {
    /// Create a controller at score 0 / level 0.
    pub fn new(policy: EscalationPolicy, bus: SharedEventBus) -> Self {
        Self {
            policy,
            state: EscalationScore::new(),
            bus,
        }
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.state.score()
    }

    /// Current derived level.
    pub fn level(&self) -> u8 {
        self.state.level(&self.policy)
    }

    /// The policy in effect for this session.
    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Apply one verdict. Publishes `LevelChanged` only when the derived
    /// level actually moved — score ticks within a level are silent, so a
    /// dispatcher never re-applies the active intervention.
    pub fn advance(&mut self, verdict: &Verdict) -> LevelTransition {
        let previous = self.state.level(&self.policy);
        let score = self.state.advance(verdict, &self.policy);
        let current = self.state.level(&self.policy);

        let transition = LevelTransition {
            previous,
            current,
            score,
        };

        tracing::debug!(
            is_violation = verdict.is_violation,
            score,
            previous_level = previous,
            level = current,
            "Verdict applied"
        );

        if transition.changed() {
            self.bus.publish(MonitorEvent::LevelChanged {
                previous,
                current,
                score,
                detail: verdict.detail.clone(),
                timestamp: Utc::now(),
            });
        }

        transition
    }

    /// Force score and level back to 0 (session end). Publishes a final
    /// `LevelChanged` to level 0 when the previous level was nonzero so the
    /// dispatcher can stand the intervention down.
    pub fn reset(&mut self) -> LevelTransition {
        let previous = self.state.level(&self.policy);
        self.state.reset();

        let transition = LevelTransition {
            previous,
            current: 0,
            score: 0,
        };

        if transition.changed() {
            tracing::info!(previous_level = previous, "Escalation state reset");
            self.bus.publish(MonitorEvent::LevelChanged {
                previous,
                current: 0,
                score: 0,
                detail: None,
                timestamp: Utc::now(),
            });
        }

        transition
    }
}
