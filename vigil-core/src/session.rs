//! Session lifecycle — explicit start/stop ownership of the control loop
//!
//! One controller and one escalation score per session, constructed and
//! owned here rather than living in ambient globals. Stopping a session
//! resets the state, stands the intervention down, and releases the
//! gateway's underlying resource so no visible effect outlives the session.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::error::SessionError;
use crate::escalation::EscalationController;
use crate::events::{EventHistory, MonitorEvent, MonitorEventBus, SharedEventBus};
use crate::providers::{CaptureProvider, InterventionContext, InterventionGateway, Judge};
use crate::scheduler::{CycleGate, CycleScheduler};

/// Read-only context for one monitoring session. Owned by configuration,
/// passed into every judge call, never mutated by the core.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    /// The user-declared rule the judge enforces.
    pub rule: String,
    /// Backend model identifier for the judge.
    pub model: String,
    /// Credential for the judge backend.
    pub api_key: String,
}

impl SessionSpec {
    pub fn new(
        rule: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Short rule excerpt for logging and events.
    pub fn rule_preview(&self) -> String {
        const MAX: usize = 80;
        if self.rule.chars().count() <= MAX {
            self.rule.clone()
        } else {
            let cut: String = self.rule.chars().take(MAX).collect();
            format!("{cut}…")
        }
    }
}

/// Point-in-time view of a session's escalation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub score: u32,
    pub level: u8,
}

/// Constructs and starts monitoring sessions. Sessions are independent:
/// each gets its own controller, gate, bus, and dispatcher.
pub struct SessionManager;

impl SessionManager {
    /// Start a monitoring session.
    ///
    /// Wires the bus, controller, intervention dispatcher, history recorder,
    /// and scheduler, then fires the first cycle immediately.
    pub fn start(
        spec: SessionSpec,
        config: MonitorConfig,
        capture: Arc<dyn CaptureProvider>,
        judge: Arc<dyn Judge>,
        gateway: Arc<dyn InterventionGateway>,
    ) -> SessionHandle {
        let bus = MonitorEventBus::new().shared();
        let spec = Arc::new(spec);
        let controller = Arc::new(tokio::sync::Mutex::new(EscalationController::new(
            config.policy.clone(),
            Arc::clone(&bus),
        )));
        let gate = Arc::new(CycleGate::new());
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let history = Arc::new(EventHistory::new());

        // Intervention dispatcher: consumes LevelChanged, drives the gateway.
        tracker.spawn(dispatch_interventions(
            bus.subscribe(),
            Arc::clone(&bus),
            Arc::clone(&gateway),
            Arc::clone(&spec),
            token.clone(),
        ));

        // History recorder for UI log panels.
        tracker.spawn(record_history(
            bus.subscribe(),
            Arc::clone(&history),
            token.clone(),
        ));

        let scheduler = CycleScheduler {
            config,
            spec: Arc::clone(&spec),
            controller: Arc::clone(&controller),
            capture,
            judge,
            bus: Arc::clone(&bus),
            gate: Arc::clone(&gate),
            tracker: tracker.clone(),
            shutdown: token.clone(),
        };
        tracker.spawn(scheduler.run());

        info!(rule = %spec.rule_preview(), model = %spec.model, "Monitoring session started");
        bus.publish(MonitorEvent::SessionStarted {
            rule_preview: spec.rule_preview(),
            timestamp: Utc::now(),
        });

        SessionHandle {
            spec,
            bus,
            controller,
            gateway,
            gate,
            token,
            tracker,
            history,
            stopped: tokio::sync::Mutex::new(false),
        }
    }
}

/// Handle to a running session. Dropping it cancels the background tasks;
/// calling [`SessionHandle::stop`] additionally performs the orderly
/// stand-down and gateway release.
pub struct SessionHandle {
    spec: Arc<SessionSpec>,
    bus: SharedEventBus,
    controller: Arc<tokio::sync::Mutex<EscalationController>>,
    gateway: Arc<dyn InterventionGateway>,
    gate: Arc<CycleGate>,
    token: CancellationToken,
    tracker: TaskTracker,
    history: Arc<EventHistory>,
    stopped: tokio::sync::Mutex<bool>,
}

impl SessionHandle {
    /// Subscribe to session events.
    pub fn events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.bus.subscribe()
    }

    /// The most recent events, oldest first.
    pub fn recent_events(&self, count: usize) -> Vec<MonitorEvent> {
        self.history.recent(count)
    }

    /// Current score and level.
    pub async fn status(&self) -> SessionStatus {
        let controller = self.controller.lock().await;
        SessionStatus {
            score: controller.score(),
            level: controller.level(),
        }
    }

    /// The session's read-only context.
    pub fn spec(&self) -> &SessionSpec {
        &self.spec
    }

    /// Stop the session.
    ///
    /// Order matters: cancel the timer and in-flight work, wait for the
    /// tasks to settle (an in-flight cycle either finishes or aborts as a
    /// no-verdict cycle), reset the escalation state, stand down any active
    /// intervention, and release the gateway resource.
    pub async fn stop(&self) -> Result<(), SessionError> {
        {
            let mut stopped = self.stopped.lock().await;
            if *stopped {
                return Err(SessionError::AlreadyStopped);
            }
            *stopped = true;
        }

        self.gate.stop();
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let transition = self.controller.lock().await.reset();
        if transition.previous != 0 {
            if let Err(e) = self.gateway.stand_down().await {
                warn!(error = %e, "Final stand-down failed");
                self.bus.publish(MonitorEvent::GatewayFailed {
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
            } else {
                self.bus.publish(MonitorEvent::StandDownIssued {
                    timestamp: Utc::now(),
                });
            }
        }
        self.gateway.release().await;

        info!("Monitoring session ended");
        let ended = MonitorEvent::SessionEnded {
            timestamp: Utc::now(),
        };
        self.history.record(ended.clone());
        self.bus.publish(ended);
        Ok(())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        // Best-effort: a dropped handle must not leave timers running.
        self.gate.stop();
        self.token.cancel();
    }
}

/// Dispatcher task: reframes the controller's level-change events into
/// gateway calls, decoupling state mutation from side effects. Events are
/// processed in publish order, so apply/stand-down calls are serialized.
async fn dispatch_interventions(
    mut rx: broadcast::Receiver<MonitorEvent>,
    bus: SharedEventBus,
    gateway: Arc<dyn InterventionGateway>,
    spec: Arc<SessionSpec>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = rx.recv() => match event {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Intervention dispatcher lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let (previous, current, detail) = match event {
            MonitorEvent::LevelChanged {
                previous,
                current,
                detail,
                ..
            } => (previous, current, detail),
            _ => continue,
        };

        if current == 0 {
            // previous != 0 by construction: LevelChanged is only published
            // on actual transitions.
            debug_assert_ne!(previous, 0);
            match gateway.stand_down().await {
                Ok(()) => {
                    info!(previous_level = previous, "Intervention stood down");
                    bus.publish(MonitorEvent::StandDownIssued {
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Stand-down failed");
                    bus.publish(MonitorEvent::GatewayFailed {
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        } else {
            let ctx = InterventionContext {
                rule: spec.rule.clone(),
                detail,
            };
            match gateway.apply(current, &ctx).await {
                Ok(()) => {
                    info!(level = current, previous_level = previous, "Intervention applied");
                    bus.publish(MonitorEvent::InterventionRequested {
                        level: current,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(level = current, error = %e, "Intervention apply failed");
                    bus.publish(MonitorEvent::GatewayFailed {
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }
}

/// History recorder task: mirrors every event into the bounded buffer.
async fn record_history(
    mut rx: broadcast::Receiver<MonitorEvent>,
    history: Arc<EventHistory>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = rx.recv() => match event {
                Ok(event) => history.record(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
