//! Provider traits — the seams between the control loop and the outside
//!
//! The core never captures pixels, never talks to an AI backend, and never
//! touches the desktop itself. It drives these three contracts; the agent
//! binary supplies the concrete implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CaptureError, GatewayError, JudgeError};
use crate::escalation::Verdict;
use crate::session::SessionSpec;

/// One display snapshot, produced on demand. Ephemeral: consumed by the
/// judge call of the cycle that captured it, then dropped.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Encoded image bytes (PNG).
    pub png: Vec<u8>,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(png: Vec<u8>) -> Self {
        Self {
            png,
            captured_at: Utc::now(),
        }
    }
}

/// Context handed to the gateway with an apply request.
#[derive(Debug, Clone)]
pub struct InterventionContext {
    /// The user-declared rule the session enforces.
    pub rule: String,
    /// The judge's explanation for the most recent violation, if any.
    pub detail: Option<String>,
}

/// Produces an image snapshot of the current display on demand.
/// Must not retain state between calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn snapshot(&self) -> Result<Snapshot, CaptureError>;
}

/// Given snapshots and the session rule, returns a compliance verdict.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Judge: Send + Sync {
    async fn evaluate(
        &self,
        snapshots: &[Snapshot],
        spec: &SessionSpec,
    ) -> Result<Verdict, JudgeError>;
}

/// Applies and revokes the externally visible disciplinary effect.
///
/// The gateway exclusively owns the underlying resource; `release` is the
/// idempotent teardown path invoked when the owning session ends, so no
/// intervention effect outlives the session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterventionGateway: Send + Sync {
    /// Apply the effect for `level`. Called once per level entry.
    async fn apply(&self, level: u8, ctx: &InterventionContext) -> Result<(), GatewayError>;

    /// Revoke the active effect (level returned to 0).
    async fn stand_down(&self) -> Result<(), GatewayError>;

    /// Idempotent resource teardown at session end.
    async fn release(&self);
}
