//! Logging configuration
//!
//! Logging is configured explicitly: the binary builds a [`LogConfig`] from
//! its flags, installs the subscriber once, and hands the same config to the
//! engine so delegated subprocesses log at the same level.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive. When set it takes
/// precedence over the configured level.
pub const LOG_ENV: &str = "MK_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
        }
    }
}

impl LogConfig {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Level from `-v` occurrences; `debug` forces at least DEBUG.
    pub fn from_flags(verbose: u8, debug: bool) -> Self {
        let level = match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        if debug && level < LevelFilter::DEBUG {
            return Self::new(LevelFilter::DEBUG);
        }
        Self::new(level)
    }

    /// Filter directive for the configured level, e.g. `info`.
    pub fn directive(&self) -> String {
        self.level
            .into_level()
            .map(|l| l.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| "off".to_string())
    }

    /// `KEY=VALUE` entry passing this configuration to a child process.
    /// An inherited `MK_LOG` directive is forwarded as is.
    pub fn env_entry(&self) -> String {
        let directive = std::env::var(LOG_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.directive());
        format!("{}={}", LOG_ENV, directive)
    }

    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }

    /// Install the global subscriber, writing to stderr. Later calls are no-ops.
    pub fn init(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}
