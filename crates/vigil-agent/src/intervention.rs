//! Desktop intervention gateway.
//!
//! Maps escalation levels onto externally visible effects through external
//! commands: notifications for the low levels, a screen lock on top of the
//! notification for the high ones. The gateway owns the visible effect —
//! `release` guarantees nothing lingers after the session ends.
//!
//! Level mapping:
//!
//! ```text
//! 1 — notice notification
//! 2 — warning notification
//! 3 — warning notification + screen lock
//! 4 — final-warning notification + screen lock
//! ```

use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use vigil_core::{GatewayError, InterventionContext, InterventionGateway};

/// Default notification command; summary and body are appended.
const DEFAULT_NOTIFY: &[&str] = &["notify-send", "-a", "vigil"];
/// Default screen-lock command.
#[cfg(target_os = "macos")]
const DEFAULT_LOCK: &[&str] = &["pmset", "displaysleepnow"];
#[cfg(not(target_os = "macos"))]
const DEFAULT_LOCK: &[&str] = &["loginctl", "lock-session"];

/// First level at which the screen is locked in addition to notifying.
const LOCK_LEVEL: u8 = 3;

/// Command-backed intervention gateway.
pub struct DesktopGateway {
    notify: Vec<String>,
    lock: Vec<String>,
    /// Level currently in effect, if any. Used for logging and to make
    /// `release` able to tell whether anything was left standing.
    active: Mutex<Option<u8>>,
}

impl DesktopGateway {
    pub fn new() -> Self {
        Self {
            notify: DEFAULT_NOTIFY.iter().map(|s| s.to_string()).collect(),
            lock: DEFAULT_LOCK.iter().map(|s| s.to_string()).collect(),
            active: Mutex::new(None),
        }
    }

    /// Override the notification and lock commands (settings file).
    pub fn with_commands(notify: Option<Vec<String>>, lock: Option<Vec<String>>) -> Self {
        let mut gateway = Self::new();
        if let Some(notify) = notify.filter(|c| !c.is_empty()) {
            gateway.notify = notify;
        }
        if let Some(lock) = lock.filter(|c| !c.is_empty()) {
            gateway.lock = lock;
        }
        gateway
    }

    /// Level currently in effect.
    pub fn active_level(&self) -> Option<u8> {
        *self.active.lock().expect("gateway lock poisoned")
    }

    fn summary_for(level: u8) -> &'static str {
        match level {
            0 | 1 => "Vigil: notice",
            2 => "Vigil: warning",
            3 => "Vigil: locking screen",
            _ => "Vigil: final warning",
        }
    }

    async fn run(command: &[String], extra: &[&str]) -> Result<(), GatewayError> {
        let status = Command::new(&command[0])
            .args(&command[1..])
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("{}: {e}", command[0])))?;

        if status.success() {
            Ok(())
        } else {
            Err(GatewayError::CommandFailed(format!(
                "{} exited with {status}",
                command[0]
            )))
        }
    }
}

impl Default for DesktopGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InterventionGateway for DesktopGateway {
    async fn apply(&self, level: u8, ctx: &InterventionContext) -> Result<(), GatewayError> {
        let body = match &ctx.detail {
            Some(detail) => format!("Rule: {}\n{detail}", ctx.rule),
            None => format!("Rule: {}", ctx.rule),
        };
        Self::run(&self.notify, &[Self::summary_for(level), &body]).await?;

        if level >= LOCK_LEVEL {
            Self::run(&self.lock, &[]).await?;
        }

        *self.active.lock().expect("gateway lock poisoned") = Some(level);
        info!(level, "Intervention effect applied");
        Ok(())
    }

    async fn stand_down(&self) -> Result<(), GatewayError> {
        let previous = self
            .active
            .lock()
            .expect("gateway lock poisoned")
            .take();
        if previous.is_some() {
            Self::run(&self.notify, &["Vigil: all clear", "Back on track."]).await?;
        }
        info!(?previous, "Intervention stood down");
        Ok(())
    }

    async fn release(&self) {
        // Idempotent teardown: clear bookkeeping; nothing external to undo
        // beyond what stand_down already handles.
        let previous = self
            .active
            .lock()
            .expect("gateway lock poisoned")
            .take();
        if previous.is_some() {
            debug!(?previous, "Gateway released with an active level");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InterventionContext {
        InterventionContext {
            rule: "stay on task".to_string(),
            detail: Some("a game is visible".to_string()),
        }
    }

    fn quiet_gateway() -> DesktopGateway {
        DesktopGateway::with_commands(Some(vec!["true".to_string()]), Some(vec!["true".to_string()]))
    }

    #[tokio::test]
    async fn test_apply_records_active_level() {
        let gateway = quiet_gateway();
        gateway.apply(2, &ctx()).await.unwrap();
        assert_eq!(gateway.active_level(), Some(2));
    }

    #[tokio::test]
    async fn test_stand_down_clears_active_level() {
        let gateway = quiet_gateway();
        gateway.apply(1, &ctx()).await.unwrap();
        gateway.stand_down().await.unwrap();
        assert_eq!(gateway.active_level(), None);
    }

    #[tokio::test]
    async fn test_stand_down_without_active_level_is_ok() {
        let gateway = quiet_gateway();
        gateway.stand_down().await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_notify_is_gateway_error() {
        let gateway = DesktopGateway::with_commands(Some(vec!["false".to_string()]), None);
        let err = gateway.apply(1, &ctx()).await.unwrap_err();
        assert!(matches!(err, GatewayError::CommandFailed(_)), "{err}");
        // Effect was not recorded as active
        assert_eq!(gateway.active_level(), None);
    }

    #[tokio::test]
    async fn test_failing_lock_surfaces_at_lock_level() {
        let gateway = DesktopGateway::with_commands(
            Some(vec!["true".to_string()]),
            Some(vec!["false".to_string()]),
        );
        // Below the lock level the lock command is never run.
        gateway.apply(2, &ctx()).await.unwrap();
        // At the lock level its failure surfaces.
        assert!(gateway.apply(3, &ctx()).await.is_err());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let gateway = quiet_gateway();
        gateway.apply(4, &ctx()).await.unwrap();
        gateway.release().await;
        assert_eq!(gateway.active_level(), None);
        gateway.release().await;
        gateway.release().await;
    }

    #[test]
    fn test_summaries_escalate() {
        assert!(DesktopGateway::summary_for(1).contains("notice"));
        assert!(DesktopGateway::summary_for(2).contains("warning"));
        assert!(DesktopGateway::summary_for(3).contains("lock"));
        assert!(DesktopGateway::summary_for(4).contains("final"));
    }
}
