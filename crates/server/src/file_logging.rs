//! Console logging, plus an optional JSON log file that rotates daily.
//!
//! Environment:
//! - `KAN_FILE_LOGGING=true|1` turns the file sink on
//! - `KAN_LOG_DIR` overrides `{asset_dir}/logs`
//! - `KAN_LOG_MAX_FILES` caps how many daily files are kept (7)

use std::path::PathBuf;

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};
use utils::assets::log_dir;

const LOG_FILE_PREFIX: &str = "kan";
const LOG_FILE_SUFFIX: &str = "log";
const DEFAULT_MAX_FILES: usize = 7;

const KAN_CRATES: [&str; 6] = [
    "server",
    "services",
    "db",
    "deployment",
    "local_deployment",
    "utils",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub file_enabled: bool,
    pub dir: PathBuf,
    pub max_files: usize,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let file_enabled = lookup("KAN_FILE_LOGGING")
            .is_some_and(|v| matches!(v.trim(), "true" | "1"));
        let max_files = lookup("KAN_LOG_MAX_FILES")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_FILES);
        Self {
            file_enabled,
            dir: log_dir(),
            max_files,
        }
    }
}

/// `warn` for dependencies, `level` for our own crates and request spans.
fn directives(level: &str) -> String {
    let mut out = String::from("warn");
    for krate in KAN_CRATES.iter().chain(std::iter::once(&"tower_http")) {
        out.push_str(&format!(",{krate}={level}"));
    }
    out
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(directives(level)).unwrap_or_else(|e| {
        eprintln!("bad log level {level:?} ({e}), using info");
        EnvFilter::new(directives("info"))
    })
}

fn file_appender(settings: &LogSettings) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(&settings.dir)
        .map_err(|e| format!("cannot create {}: {e}", settings.dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(settings.max_files)
        .build(&settings.dir)
        .map_err(|e| e.to_string())
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered file output is lost.
pub fn init_logging(level: &str) -> Option<WorkerGuard> {
    let settings = LogSettings::from_env();
    let console = tracing_subscriber::fmt::layer().with_filter(build_filter(level));

    if !settings.file_enabled {
        tracing_subscriber::registry().with(console).init();
        return None;
    }

    let appender = match file_appender(&settings) {
        Ok(appender) => appender,
        Err(e) => {
            tracing_subscriber::registry().with(console).init();
            tracing::warn!(error = %e, "file logging disabled");
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_filter(build_filter(level));

    tracing_subscriber::registry().with(console).with(file).init();
    tracing::info!(
        dir = %settings.dir.display(),
        max_files = settings.max_files,
        "writing JSON logs"
    );
    Some(guard)
}
