//! Screenshot capture through an external command.
//!
//! The capture tool varies per platform and desktop environment, so the
//! command is configuration: the agent runs it with a temp-file path
//! appended as the final argument, then reads the PNG back. No capture
//! state is retained between calls.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use vigil_core::{CaptureError, CaptureProvider, Snapshot};

/// Platform-default screenshot command. The output path is appended.
#[cfg(target_os = "macos")]
const DEFAULT_COMMAND: &[&str] = &["screencapture", "-x"];
#[cfg(not(target_os = "macos"))]
const DEFAULT_COMMAND: &[&str] = &["grim"];

/// Capture provider that shells out to a screenshot tool.
pub struct CommandCapture {
    command: Vec<String>,
}

impl CommandCapture {
    /// Use the platform-default screenshot tool.
    pub fn new() -> Self {
        Self {
            command: DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Use a custom command; the output path is appended as the final
    /// argument.
    pub fn with_command(command: Vec<String>) -> Result<Self, CaptureError> {
        if command.is_empty() {
            return Err(CaptureError::CommandFailed(
                "capture command must not be empty".to_string(),
            ));
        }
        Ok(Self { command })
    }

    fn scratch_path() -> PathBuf {
        static SEQ: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let stamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
        std::env::temp_dir().join(format!("vigil-{}-{stamp}-{seq}.png", std::process::id()))
    }
}

/// Removes the scratch file when dropped, so no snapshot lingers in the
/// temp dir on any exit path — read failures and a cancelled cycle included.
struct ScratchFile {
    path: PathBuf,
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Default for CommandCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureProvider for CommandCapture {
    async fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        let scratch = ScratchFile {
            path: Self::scratch_path(),
        };

        let status = Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg(&scratch.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| CaptureError::CommandFailed(format!("{}: {e}", self.command[0])))?;

        if !status.success() {
            return Err(CaptureError::CommandFailed(format!(
                "{} exited with {status}",
                self.command[0]
            )));
        }

        let png = tokio::fs::read(&scratch.path).await?;

        if png.is_empty() {
            return Err(CaptureError::EmptySnapshot);
        }

        debug!(bytes = png.len(), "Snapshot captured");
        Ok(Snapshot::new(png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_capture(script: &str) -> CommandCapture {
        // "$1" is the appended output path ($0 is the dummy argv0).
        CommandCapture::with_command(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "capture".to_string(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_reads_command_output() {
        let capture = sh_capture("printf 'fake-png-bytes' > \"$1\"");
        let snapshot = capture.snapshot().await.unwrap();
        assert_eq!(snapshot.png, b"fake-png-bytes");
    }

    #[tokio::test]
    async fn test_failing_command_is_capture_error() {
        let capture = sh_capture("exit 3");
        let err = capture.snapshot().await.unwrap_err();
        assert!(matches!(err, CaptureError::CommandFailed(_)), "{err}");
    }

    #[tokio::test]
    async fn test_empty_output_is_rejected() {
        let capture = sh_capture(": > \"$1\"");
        let err = capture.snapshot().await.unwrap_err();
        assert!(matches!(err, CaptureError::EmptySnapshot));
    }

    #[tokio::test]
    async fn test_missing_binary_is_capture_error() {
        let capture =
            CommandCapture::with_command(vec!["vigil-no-such-binary".to_string()]).unwrap();
        let err = capture.snapshot().await.unwrap_err();
        assert!(matches!(err, CaptureError::CommandFailed(_)));
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandCapture::with_command(vec![]).is_err());
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let a = CommandCapture::scratch_path();
        let b = CommandCapture::scratch_path();
        assert_ne!(a, b);
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let scratch = ScratchFile {
            path: CommandCapture::scratch_path(),
        };
        std::fs::write(&scratch.path, b"png").unwrap();
        let path = scratch.path.clone();
        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unreadable_output_leaves_no_scratch_file() {
        // The command writes, then deletes its own output; the read fails
        // and the cleanup path must not leave (or need) the file behind.
        let capture = sh_capture("printf 'x' > \"$1\"; rm \"$1\"");
        assert!(capture.snapshot().await.is_err());
    }
}
