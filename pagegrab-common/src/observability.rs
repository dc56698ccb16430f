//! `tracing` setup for the `pagegrab` binary and the integration tests.
//!
//! Events always go to a daily rolling file (`<dir>/<app>.log.<YYYY-MM-DD>`);
//! a second sink on stderr is optional. Both sinks use the same [`LogFormat`].
//! Only the first [`init_logging`] call installs a subscriber; later calls
//! return the file path chosen by the first one.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::paths::{default_data_dir, expand_home};

/// Keeps the non-blocking file writer flushing until process exit.
static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static ACTIVE_LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Overrides the default log directory when `LogConfig::log_dir` is unset.
pub const LOG_DIR_ENV: &str = "PAGEGRAB_LOG_DIR";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used as the log file stem and for the default data directory.
    pub app_name: &'static str,
    /// `None` means `$PAGEGRAB_LOG_DIR`, then `<data dir>/<app_name>/logs`.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: crate::APP_NAME,
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = ACTIVE_LOG_FILE.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let stem = format!("{}.log", config.app_name);
    let log_file = dir.join(format!("{stem}.{}", Local::now().format("%Y-%m-%d")));

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &stem));
    let _ = FILE_WRITER_GUARD.set(guard);

    let mut sinks = vec![sink_layer(config.format, file_writer, false)];
    if config.emit_stderr {
        sinks.push(sink_layer(config.format, std::io::stderr, true));
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(sinks)
        .with(filter)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    let _ = ACTIVE_LOG_FILE.set(log_file.clone());
    Ok(log_file)
}

fn sink_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => expand_home(dir),
        None => std::env::var(LOG_DIR_ENV)
            .map(|raw| expand_home(Path::new(&raw)))
            .unwrap_or_else(|_| default_data_dir(app_name).join("logs")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = resolve_log_dir("pagegrab", Some(Path::new("/tmp/pagegrab-logs")));
        assert_eq!(dir, PathBuf::from("/tmp/pagegrab-logs"));
    }

    #[test]
    fn default_config_logs_to_file_only() {
        let cfg = LogConfig::default();
        assert_eq!(cfg.app_name, "pagegrab");
        assert!(!cfg.emit_stderr);
        assert_eq!(cfg.format, LogFormat::Text);
        assert_eq!(cfg.default_filter, "info");
    }

    #[test]
    fn both_formats_build_a_sink() {
        // Building the layer must not require an installed subscriber.
        let _ = sink_layer(LogFormat::Text, std::io::sink, false);
        let _ = sink_layer(LogFormat::Json, std::io::sink, false);
    }
}
