//! Keystone Logging
//!
//! Installs the process-wide `tracing` subscriber used by every Keystone
//! crate. Library code never configures logging itself; it only emits
//! events through the `tracing` macros, and the binary or test harness
//! calls [`init`] once.
//!
//! # Usage
//!
//! ```rust
//! keystone_log::init();
//!
//! tracing::info!(authz_id = "abc", "authorization created");
//! ```
//!
//! # Environment Variables
//!
//! - `KEYSTONE_DEBUG=1` - Enable debug logging
//! - `KEYSTONE_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `KEYSTONE_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `KEYSTONE_LOG_COLOR=1|0` - Enable/disable ANSI colors
//! - `KEYSTONE_LOG_MODULE=1|0` - Include the event target
//!
//! `RUST_LOG`, when set, takes precedence over `KEYSTONE_LOG_LEVEL` so
//! per-module directives keep working.

use std::env;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of events that are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }

    /// Convert into a `tracing` level filter.
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Level::Trace => LevelFilter::TRACE,
            Level::Debug => LevelFilter::DEBUG,
            Level::Info => LevelFilter::INFO,
            Level::Warn => LevelFilter::WARN,
            Level::Error => LevelFilter::ERROR,
            Level::Off => LevelFilter::OFF,
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled
    pub color: bool,
    /// Whether to include the event target (module path)
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false, // JSON output doesn't use colors
            module_path: true,
        }
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl LogConfig {
    /// Create config from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("KEYSTONE_DEBUG").map(|v| flag(&v)).unwrap_or(false);

        let level = lookup("KEYSTONE_LOG_LEVEL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("KEYSTONE_LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Json);

        let color = lookup("KEYSTONE_LOG_COLOR")
            .map(|v| flag(&v))
            .unwrap_or_else(|| format != Format::Json && lookup("NO_COLOR").is_none());

        let module_path = lookup("KEYSTONE_LOG_MODULE")
            .map(|v| flag(&v))
            .unwrap_or(true);

        Self {
            debug,
            level,
            format,
            color,
            module_path,
        }
    }

    /// Build the event filter. `RUST_LOG` wins when present.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level.to_filter().into())
            .from_env_lossy()
    }
}

// ============================================================================
// Public API
// ============================================================================

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Initialize logging from the environment.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    init_with(LogConfig::from_env());
}

/// Initialize logging with an explicit configuration.
///
/// Returns `false` when a global subscriber was already installed, either
/// by an earlier call or by the host application.
pub fn init_with(config: LogConfig) -> bool {
    let mut installed = false;
    INSTALLED.get_or_init(|| {
        installed = install(&config);
        config
    });
    installed
}

/// The configuration the subscriber was installed with, if any.
pub fn config() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

fn install(config: &LogConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(config.module_path)
        .with_ansi(config.color);

    let result = match config.format {
        Format::Json => builder.json().try_init(),
        Format::Compact => builder.compact().try_init(),
        Format::Pretty => builder.pretty().try_init(),
    };

    result.is_ok()
}

// ============================================================================
// Tests
// ============================================================================
