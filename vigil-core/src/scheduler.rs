//! Cycle Scheduler — fixed-cadence sampling with an overlap guard
//!
//! A single periodic timer drives cycles. The timer itself is never blocked
//! by a cycle: ticks always fire, and the [`CycleGate`] alone decides whether
//! a tick starts a cycle. A tick that lands while a cycle is in flight is
//! dropped, not queued — overlapping cycles must never run for the same
//! session, because the escalation state is updated exactly once per observed
//! verdict and never concurrently.
//!
//! ```text
//! Idle ──tick──▶ Running ──cycle done──▶ Idle
//!   │               │ tick: dropped (CycleSkipped)
//!   └───stop────▶ Stopped ◀──stop── (in-flight cycle may finish)
//! ```

use std::sync::Arc;
use std::sync::Mutex;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::escalation::{EscalationController, Verdict};
use crate::events::{CycleFailureReason, CycleSkipReason, MonitorEvent, SharedEventBus};
use crate::providers::{CaptureProvider, Judge};
use crate::session::SessionSpec;

/// Scheduler states. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No cycle in flight; the next tick starts one.
    Idle,
    /// A cycle is in flight; ticks are dropped.
    Running,
    /// The session is stopping; no new cycle ever starts.
    Stopped,
}

/// The overlap guard: a three-state machine deciding whether a tick may
/// start a cycle. Pure bookkeeping, testable without a timer.
pub struct CycleGate {
    state: Mutex<GateState>,
}

impl CycleGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Idle),
        }
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        *self.state.lock().expect("cycle gate lock poisoned")
    }

    /// Attempt `Idle → Running`. Returns the skip reason when the tick must
    /// be dropped instead.
    pub fn try_begin(&self) -> Result<(), CycleSkipReason> {
        let mut state = self.state.lock().expect("cycle gate lock poisoned");
        match *state {
            GateState::Idle => {
                *state = GateState::Running;
                Ok(())
            }
            GateState::Running => Err(CycleSkipReason::Overlap),
            GateState::Stopped => Err(CycleSkipReason::Stopped),
        }
    }

    /// `Running → Idle` when the cycle completes (success or handled
    /// failure). A stop that raced the completion wins: `Stopped` is sticky.
    pub fn finish(&self) {
        let mut state = self.state.lock().expect("cycle gate lock poisoned");
        if *state == GateState::Running {
            *state = GateState::Idle;
        }
    }

    /// `Any → Stopped`. The in-flight cycle, if any, is allowed to finish;
    /// no new cycle starts.
    pub fn stop(&self) {
        *self.state.lock().expect("cycle gate lock poisoned") = GateState::Stopped;
    }
}

impl Default for CycleGate {
    fn default() -> Self {
        Self::new()
    }
}

/// The scheduler task: owns the timer, spawns guarded cycles.
pub(crate) struct CycleScheduler {
    pub(crate) config: MonitorConfig,
    pub(crate) spec: Arc<SessionSpec>,
    pub(crate) controller: Arc<tokio::sync::Mutex<EscalationController>>,
    pub(crate) capture: Arc<dyn CaptureProvider>,
    pub(crate) judge: Arc<dyn Judge>,
    pub(crate) bus: SharedEventBus,
    pub(crate) gate: Arc<CycleGate>,
    pub(crate) tracker: TaskTracker,
    pub(crate) shutdown: CancellationToken,
}

impl CycleScheduler {
    /// Run the timer loop until shutdown. The first tick fires immediately,
    /// matching the session's "sample right away on start" behavior.
    pub(crate) async fn run(self) {
        let mut interval = tokio::time::interval(self.config.sample_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = interval.tick() => self.on_tick(),
            }
        }
        debug!("Scheduler timer loop exited");
    }

    fn on_tick(&self) {
        match self.gate.try_begin() {
            Ok(()) => {
                let cycle = Cycle {
                    spec: Arc::clone(&self.spec),
                    controller: Arc::clone(&self.controller),
                    capture: Arc::clone(&self.capture),
                    judge: Arc::clone(&self.judge),
                    bus: Arc::clone(&self.bus),
                    gate: Arc::clone(&self.gate),
                    shutdown: self.shutdown.clone(),
                    timeout: self.config.cycle_timeout,
                };
                self.tracker.spawn(cycle.run());
            }
            Err(reason) => {
                debug!(%reason, "Tick dropped");
                self.bus.publish(MonitorEvent::CycleSkipped {
                    reason,
                    timestamp: Utc::now(),
                });
            }
        }
    }
}

/// One sample→judge→update unit of work. Has no identity beyond its start;
/// at most one exists at a time per session (enforced by the gate).
struct Cycle {
    spec: Arc<SessionSpec>,
    controller: Arc<tokio::sync::Mutex<EscalationController>>,
    capture: Arc<dyn CaptureProvider>,
    judge: Arc<dyn Judge>,
    bus: SharedEventBus,
    gate: Arc<CycleGate>,
    shutdown: CancellationToken,
    timeout: std::time::Duration,
}

impl Cycle {
    async fn run(self) {
        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => Err(CycleFailureReason::Cancelled),
            res = tokio::time::timeout(self.timeout, self.observe()) => match res {
                Ok(result) => result,
                Err(_) => Err(CycleFailureReason::Timeout),
            },
        };

        match outcome {
            Ok(verdict) => {
                let transition = self.controller.lock().await.advance(&verdict);
                self.bus.publish(MonitorEvent::CycleCompleted {
                    verdict,
                    score: transition.score,
                    level: transition.current,
                    timestamp: Utc::now(),
                });
            }
            Err(reason) => {
                // No-verdict cycle: the score is neither advanced nor
                // decayed during infrastructure failures.
                warn!(%reason, "Cycle produced no verdict");
                self.bus.publish(MonitorEvent::CycleFailed {
                    reason,
                    timestamp: Utc::now(),
                });
            }
        }

        self.gate.finish();
    }

    /// Capture, then judge. A failed capture aborts before the judge call.
    async fn observe(&self) -> Result<Verdict, CycleFailureReason> {
        let snapshot = self
            .capture
            .snapshot()
            .await
            .map_err(|e| CycleFailureReason::Capture {
                error: e.to_string(),
            })?;

        self.judge
            .evaluate(&[snapshot], &self.spec)
            .await
            .map_err(|e| CycleFailureReason::Judge {
                error: e.to_string(),
            })
    }
}
