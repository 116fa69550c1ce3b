use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Keeps the JSON writer flushing until dropped.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
    pub json_path: Option<PathBuf>,
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Human-readable events on stderr, or JSON lines at `json_path` when structured logging is on.
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(logging: &LoggingConfig, json_path: &Path) -> Result<LoggingGuard> {
    let level = logging.level().unwrap_or(Level::INFO);

    if !logging.enable_structured {
        init_console(level);
        return Ok(LoggingGuard {
            _guard: None,
            json_path: None,
        });
    }

    if let Some(parent) = json_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory at {}", parent.display()))?;
    }
    let file = File::create(json_path)
        .with_context(|| format!("creating log file at {}", json_path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter(level))
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // A subscriber may already be installed (tests, embedding).
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(LoggingGuard {
        _guard: Some(guard),
        json_path: Some(json_path.to_path_buf()),
    })
}

/// Agents log to stderr, which the evaluator redirects into the episode directory.
pub fn init_agent_logging(level: Level) {
    init_console(level);
}

fn init_console(level: Level) {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
