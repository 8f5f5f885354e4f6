//! Escalation — bounded score, threshold-derived levels, and the controller
//!
//! Turns a stream of noisy compliance verdicts into a stable, bounded
//! severity state. This is a pure state machine with no I/O — the side
//! effects (interventions) are driven off the events it publishes.
//!
//! # Escalation ladder (default policy)
//!
//! ```text
//! score 0                        level 0 — no intervention
//!     │  violation: +20 (clamped at 300)
//!     │  compliant: -10 (clamped at 0)
//!     ▼
//! score ≥ 20                     level 1 — notice
//! score ≥ 50                     level 2 — warning
//! score ≥ 100                    level 3 — soft lock
//! score ≥ 200                    level 4 — hard lock
//! ```
//!
//! The level is never stored: it is always recomputed from the score through
//! the threshold table, so the two cannot diverge. Clamping (not wrap-around
//! or unbounded growth) keeps recovery time bounded after long violation
//! streaks.

pub mod controller;
pub mod policy;
pub mod state;

pub use controller::{EscalationController, LevelTransition};
pub use policy::{EscalationPolicy, PolicyError, ThresholdTable};
pub use state::{advance_score, EscalationScore, Verdict};
