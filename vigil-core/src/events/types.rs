//! Event types for monitoring sessions
//!
//! These events are published on the session event bus so the surrounding
//! application (UI, logger) can observe the control loop without being wired
//! into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::Verdict;

/// Why a scheduler tick did not start a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleSkipReason {
    /// A previous cycle is still in flight; the tick is dropped, not queued.
    Overlap,
    /// The session is stopping; no new cycles start.
    Stopped,
}

impl std::fmt::Display for CycleSkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overlap => write!(f, "previous cycle still in flight"),
            Self::Stopped => write!(f, "session stopping"),
        }
    }
}

/// Why a started cycle produced no verdict.
///
/// A failed cycle never mutates the score: infrastructure failures must not
/// penalize (or reward) the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleFailureReason {
    /// The capture provider returned no usable snapshot.
    Capture { error: String },
    /// The judge call failed (network, malformed response).
    Judge { error: String },
    /// The capture+judge phase exceeded the cycle timeout.
    Timeout,
    /// The session was stopped while the cycle was in flight.
    Cancelled,
}

impl std::fmt::Display for CycleFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capture { error } => write!(f, "capture failed: {}", error),
            Self::Judge { error } => write!(f, "judge failed: {}", error),
            Self::Timeout => write!(f, "cycle timed out"),
            Self::Cancelled => write!(f, "cycle cancelled"),
        }
    }
}

/// All observable session events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A monitoring session started.
    SessionStarted {
        rule_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The derived escalation level changed.
    LevelChanged {
        previous: u8,
        current: u8,
        score: u32,
        /// The judge's explanation from the verdict that caused the change.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// The dispatcher asked the gateway to apply an intervention.
    InterventionRequested {
        level: u8,
        timestamp: DateTime<Utc>,
    },

    /// The dispatcher asked the gateway to clear the active intervention.
    StandDownIssued { timestamp: DateTime<Utc> },

    /// The gateway could not deliver an apply/stand-down request.
    /// Score/level bookkeeping is authoritative and advances regardless.
    GatewayFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A cycle completed with a verdict and the state was advanced.
    CycleCompleted {
        verdict: Verdict,
        score: u32,
        level: u8,
        timestamp: DateTime<Utc>,
    },

    /// A tick fired but no cycle started.
    CycleSkipped {
        reason: CycleSkipReason,
        timestamp: DateTime<Utc>,
    },

    /// A cycle started but produced no verdict.
    CycleFailed {
        reason: CycleFailureReason,
        timestamp: DateTime<Utc>,
    },

    /// The session ended; state was reset and the gateway released.
    SessionEnded { timestamp: DateTime<Utc> },
}

impl MonitorEvent {
    /// Get the timestamp of this event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MonitorEvent::SessionStarted { timestamp, .. } => *timestamp,
            MonitorEvent::LevelChanged { timestamp, .. } => *timestamp,
            MonitorEvent::InterventionRequested { timestamp, .. } => *timestamp,
            MonitorEvent::StandDownIssued { timestamp } => *timestamp,
            MonitorEvent::GatewayFailed { timestamp, .. } => *timestamp,
            MonitorEvent::CycleCompleted { timestamp, .. } => *timestamp,
            MonitorEvent::CycleSkipped { timestamp, .. } => *timestamp,
            MonitorEvent::CycleFailed { timestamp, .. } => *timestamp,
            MonitorEvent::SessionEnded { timestamp } => *timestamp,
        }
    }

    /// Get the event type as a string for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::SessionStarted { .. } => "session_started",
            MonitorEvent::LevelChanged { .. } => "level_changed",
            MonitorEvent::InterventionRequested { .. } => "intervention_requested",
            MonitorEvent::StandDownIssued { .. } => "stand_down_issued",
            MonitorEvent::GatewayFailed { .. } => "gateway_failed",
            MonitorEvent::CycleCompleted { .. } => "cycle_completed",
            MonitorEvent::CycleSkipped { .. } => "cycle_skipped",
            MonitorEvent::CycleFailed { .. } => "cycle_failed",
            MonitorEvent::SessionEnded { .. } => "session_ended",
        }
    }
}
