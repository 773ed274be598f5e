//! Tracing bootstrap for embedding applications.
//!
//! Everything in this crate emits under `chorus::*` targets: parse
//! diagnostics at debug level, turn lifecycle at info, rejected submissions
//! at warn, stream failures at error. This module is a convenience for apps
//! that do not already install their own subscriber; libraries embedding
//! `chorus` into a larger program should skip it and configure tracing
//! themselves.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where the formatted log lines go.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Standard output.
    #[default]
    Console,
    /// A file, created (truncated) at init time.
    File(PathBuf),
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Maximum level captured for `chorus` targets. The `RUST_LOG`
    /// environment variable still takes precedence for everything else.
    pub level: Level,
    /// Output destination.
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

impl ObservabilityConfig {
    /// Captures this level for `chorus` targets.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Writes log lines to the given file instead of stdout.
    pub fn to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = LogTarget::File(path.into());
        self
    }
}

/// Installs the global tracing subscriber.
///
/// Call once, early in `main`. Fails if the crate-level filter directive
/// cannot be built or the log file cannot be created; panics (by
/// `tracing-subscriber` contract) if a global subscriber is already set.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::from_default_env().add_directive(format!("chorus={}", config.level).parse()?);
    let registry = tracing_subscriber::registry().with(filter);

    match config.target {
        LogTarget::Console => registry.with(fmt::layer().with_writer(std::io::stdout)).init(),
        LogTarget::File(path) => {
            let file = Arc::new(std::fs::File::create(path)?);
            registry.with(fmt::layer().with_writer(file).with_ansi(false)).init();
        }
    }

    Ok(())
}
