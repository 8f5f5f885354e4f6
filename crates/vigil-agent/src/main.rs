mod capture;
mod config;
mod intervention;
mod judge;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use vigil_core::{
    CaptureProvider, InterventionGateway, Judge, MonitorConfig, MonitorEvent, SessionManager,
    SessionSpec,
};

use capture::CommandCapture;
use config::AgentConfig;
use intervention::DesktopGateway;
use judge::GeminiJudge;

/// Screen-activity monitor: samples the display, asks an AI judge whether
/// the activity complies with the configured rule, and escalates or relaxes
/// desktop interventions accordingly.
#[derive(Parser)]
#[command(name = "vigil-agent", version)]
struct Cli {
    /// Path to the JSON settings file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Override the rule from the settings file.
    #[arg(long)]
    rules: Option<String>,

    /// Override the sampling interval in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single capture+judge probe and print the verdict, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AgentConfig::load(&cli.config)?;
    if let Some(rules) = cli.rules {
        config.rules = rules;
    }
    if let Some(interval) = cli.interval {
        config.interval_secs = interval;
    }

    let spec = SessionSpec::new(
        config.rules.clone(),
        config.model.clone(),
        config.api_key.clone(),
    );

    let capture: Arc<dyn CaptureProvider> = match config.capture_command.clone() {
        Some(command) => Arc::new(CommandCapture::with_command(command)?),
        None => Arc::new(CommandCapture::new()),
    };
    let judge: Arc<dyn Judge> = match config.endpoint.clone() {
        Some(endpoint) => Arc::new(GeminiJudge::with_endpoint(endpoint)),
        None => Arc::new(GeminiJudge::new()),
    };
    let gateway: Arc<dyn InterventionGateway> = Arc::new(DesktopGateway::with_commands(
        config.notify_command.clone(),
        config.lock_command.clone(),
    ));

    if cli.once {
        return probe(&*capture, &*judge, &spec).await;
    }

    let monitor_config = MonitorConfig::new()
        .with_sample_interval(Duration::from_secs(config.interval_secs))
        .with_cycle_timeout(Duration::from_secs(config.cycle_timeout_secs));

    info!(
        rule = %spec.rule_preview(),
        model = %spec.model,
        interval_secs = config.interval_secs,
        "Vigil agent starting"
    );

    let handle = SessionManager::start(spec, monitor_config, capture, judge, gateway);

    let mut events = handle.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.stop().await?;
    Ok(())
}

/// One manual capture+judge cycle, bypassing the scheduler. Useful for
/// validating the settings file and API key.
async fn probe(
    capture: &dyn CaptureProvider,
    judge: &dyn Judge,
    spec: &SessionSpec,
) -> Result<()> {
    let snapshot = capture.snapshot().await?;
    info!(bytes = snapshot.png.len(), "Captured probe snapshot");
    let verdict = judge.evaluate(&[snapshot], spec).await?;
    if verdict.is_violation {
        println!(
            "VIOLATION{}",
            verdict
                .detail
                .map(|d| format!(": {d}"))
                .unwrap_or_default()
        );
    } else {
        println!("COMPLIANT");
    }
    Ok(())
}

fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::LevelChanged {
            previous,
            current,
            score,
            ..
        } => info!(previous, current, score, "Escalation level changed"),
        MonitorEvent::InterventionRequested { level, .. } => {
            info!(level, "Intervention requested")
        }
        MonitorEvent::StandDownIssued { .. } => info!("Intervention stood down"),
        MonitorEvent::GatewayFailed { error, .. } => warn!(%error, "Gateway call failed"),
        MonitorEvent::CycleCompleted {
            verdict,
            score,
            level,
            ..
        } => info!(
            is_violation = verdict.is_violation,
            score, level, "Cycle completed"
        ),
        MonitorEvent::CycleSkipped { reason, .. } => info!(%reason, "Cycle skipped"),
        MonitorEvent::CycleFailed { reason, .. } => warn!(%reason, "Cycle failed"),
        MonitorEvent::SessionStarted { rule_preview, .. } => {
            info!(rule = %rule_preview, "Session started")
        }
        MonitorEvent::SessionEnded { .. } => info!("Session ended"),
    }
}
