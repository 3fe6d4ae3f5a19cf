//! Logger module for Brian2WASM
//!
//! Simple logging to stderr: `[LEVEL] message`. Standard output stays free
//! for the toolchain and the preview server.
//!
//! The CLI level can be overridden with `BRIAN2WASM_LOG=debug|info|warn|error`.
//!
//! # Usage
//!
//! ```rust
//! use brian2wasm::util::logger;
//!
//! logger::init();
//! tracing::info!("Hello, {}", "world");
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

/// Environment variable overriding the CLI log level
pub const LOG_ENV: &str = "BRIAN2WASM_LOG";

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Initialize logger with default configuration (INFO level)
pub fn init() {
    init_with_level(LogLevel::Info);
}

/// Initialize logger with custom level
///
/// Calling this more than once is harmless; only the first subscriber is installed.
pub fn init_with_level(level: LogLevel) {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

    // no timestamps, no module path, no colors
    let layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    let _ = Registry::default().with(layer).try_init();
}

/// Level for CLI use: `verbose` selects DEBUG, `BRIAN2WASM_LOG` wins when set
pub fn cli_level(
    verbose: bool,
    env: Option<&str>,
) -> LogLevel {
    match env.and_then(LogLevel::parse) {
        Some(level) => level,
        None if verbose => LogLevel::Debug,
        None => LogLevel::Info,
    }
}

/// Initialize logger for CLI use
pub fn init_cli(verbose: bool) {
    let env = std::env::var(LOG_ENV).ok();
    init_with_level(cli_level(verbose, env.as_deref()));
}
