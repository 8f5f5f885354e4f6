//! Failure taxonomy for the monitoring loop
//!
//! All of these are recovered locally at the cycle boundary: a failed
//! capture or judge call aborts the cycle as a no-verdict cycle, a failed
//! gateway call is surfaced as an event. Nothing here escapes the scheduler
//! task as an unhandled fault.

use thiserror::Error;

/// Capture provider failures. A failed capture aborts the cycle before the
/// judge is called.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture command failed: {0}")]
    CommandFailed(String),

    #[error("No display available")]
    NoDisplay,

    #[error("Capture produced an empty snapshot")]
    EmptySnapshot,

    #[error("Capture I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Judge failures. The cycle is treated as a no-verdict cycle; the score is
/// neither advanced nor decayed during an outage.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Judge request failed: {0}")]
    Network(String),

    #[error("Judge request timed out")]
    Timeout,

    #[error("Judge rejected the request (status {status})")]
    Rejected { status: u16 },

    #[error("Judge returned an unusable response: {0}")]
    MalformedResponse(String),
}

/// Intervention gateway failures. The judgment, not the intervention
/// delivery, is authoritative for state: bookkeeping advances regardless.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Intervention command failed: {0}")]
    CommandFailed(String),

    #[error("Intervention backend unavailable: {0}")]
    Unavailable(String),

    #[error("Gateway I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session lifecycle failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session already stopped")]
    AlreadyStopped,

    #[error("Invalid escalation policy: {0}")]
    Policy(#[from] crate::escalation::PolicyError),
}
