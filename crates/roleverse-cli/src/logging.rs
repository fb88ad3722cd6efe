use anyhow::{Context, Result, anyhow};
use roleverse_infrastructure::RoleversePaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "roleverse.log";

/// Routes tracing output to a daily rolling file so the REPL stays clean.
///
/// The returned guard flushes buffered lines on drop; keep it alive for the
/// whole program.
pub fn init() -> Result<WorkerGuard> {
    let log_dir = RoleversePaths::log_dir().map_err(|e| anyhow!("Failed to get log directory: {}", e))?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}
