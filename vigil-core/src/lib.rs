//! Vigil core — adaptive escalation control loop
//!
//! Turns a stream of noisy, asynchronous compliance judgments into a stable,
//! bounded severity state and drives a graduated intervention policy.
//!
//! # Architecture
//!
//! ```text
//! timer tick ──▶ CycleGate ──▶ Capture ──▶ Judge ──▶ Controller.advance
//!                (overlap         │           │            │
//!                 guard)      failure ────────┴──▶ no-verdict cycle
//!                                                         │
//!                                              LevelChanged event
//!                                                         │
//!                                          Dispatcher ──▶ InterventionGateway
//! ```
//!
//! The core interprets no image content, makes no AI calls, and renders no
//! UI: capture, judging, and interventions are supplied through the
//! [`providers`] traits. State lives in memory only and resets per session.
//!
//! # Usage
//!
//! ```ignore
//! use vigil_core::{MonitorConfig, SessionManager, SessionSpec};
//!
//! let handle = SessionManager::start(
//!     SessionSpec::new("no social media during work", "gemini-2.0-flash", api_key),
//!     MonitorConfig::default(),
//!     capture,
//!     judge,
//!     gateway,
//! );
//!
//! let mut events = handle.events();
//! // ... observe LevelChanged / CycleFailed / ...
//! handle.stop().await?;
//! ```

pub mod config;
pub mod error;
pub mod escalation;
pub mod events;
pub mod providers;
pub mod scheduler;
pub mod session;

pub use config::MonitorConfig;
pub use error::{CaptureError, GatewayError, JudgeError, SessionError};
pub use escalation::{
    EscalationController, EscalationPolicy, EscalationScore, LevelTransition, PolicyError,
    ThresholdTable, Verdict,
};
pub use events::{CycleFailureReason, CycleSkipReason, EventHistory, MonitorEvent, MonitorEventBus};
pub use providers::{CaptureProvider, InterventionContext, InterventionGateway, Judge, Snapshot};
pub use scheduler::{CycleGate, GateState};
pub use session::{SessionHandle, SessionManager, SessionSpec, SessionStatus};
