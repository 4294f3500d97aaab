//! Log configuration and subscriber setup.
//!
//! Options come from `GRAFT_LOG_FORMAT` / `GRAFT_LOG_LEVEL`, overridden by
//! command-line flags. `RUST_LOG` still wins when set, through
//! [`EnvFilter`](tracing_subscriber::EnvFilter).

use std::env;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    /// Text output at `warn`.
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LogLevel::Warn,
    };

    #[must_use]
    pub fn from_env() -> Self {
        let format = env::var("GRAFT_LOG_FORMAT").ok();
        let level = env::var("GRAFT_LOG_LEVEL").ok();
        apply_overrides(Self::DEFAULT, format.as_deref(), level.as_deref())
    }

    /// Apply command-line overrides on top of `self`.
    #[must_use]
    pub fn with_overrides(self, format: Option<LogFormat>, level: Option<LogLevel>) -> Self {
        Self {
            format: format.unwrap_or(self.format),
            level: level.unwrap_or(self.level),
        }
    }

    #[must_use]
    pub fn resolved(self) -> Self {
        let format = match self.format {
            LogFormat::Auto => LogFormat::Text,
            other => other,
        };
        Self { format, ..self }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn apply_overrides(mut options: LogOptions, format: Option<&str>, level: Option<&str>) -> LogOptions {
    if let Some(format) = format.and_then(LogFormat::parse) {
        options.format = format;
    }
    if let Some(level) = level.and_then(LogLevel::parse) {
        options.level = level;
    }
    options
}

/// Install the global subscriber once; later calls are no-ops.
///
/// Events go to stderr, and additionally to `log_file` when given.
pub fn init_logging(options: LogOptions, log_file: Option<&Path>) -> std::io::Result<()> {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
    use tracing_subscriber::{EnvFilter, fmt};

    static INITIALISED: OnceLock<()> = OnceLock::new();
    if INITIALISED.get().is_some() {
        return Ok(());
    }

    let options = options.resolved();
    let (writer, use_ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(std::io::stderr.and(Arc::new(file))), false)
        }
        None => (
            BoxMakeWriter::new(std::io::stderr),
            env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal(),
        ),
    };

    let _ = INITIALISED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));
        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(writer)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false);
        match options.format {
            LogFormat::Json => {
                let _ = tracing::subscriber::set_global_default(builder.json().finish());
            }
            _ => {
                let _ = tracing::subscriber::set_global_default(builder.compact().finish());
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_level_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("plain"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("xml"), None);
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn env_values_override_defaults() {
        let opts = apply_overrides(LogOptions::DEFAULT, Some("json"), Some("debug"));
        assert_eq!(opts.format, LogFormat::Json);
        assert_eq!(opts.level, LogLevel::Debug);

        let ignored = apply_overrides(LogOptions::DEFAULT, Some("yaml"), None);
        assert_eq!(ignored, LogOptions::DEFAULT);
    }

    #[test]
    fn cli_overrides_win_over_env() {
        let env_opts = apply_overrides(LogOptions::DEFAULT, Some("text"), Some("info"));
        let merged = env_opts.with_overrides(Some(LogFormat::Json), None);
        assert_eq!(merged.format, LogFormat::Json);
        assert_eq!(merged.level, LogLevel::Info);
    }

    #[test]
    fn auto_resolves_to_text() {
        assert_eq!(LogOptions::DEFAULT.resolved().format, LogFormat::Text);
    }
}
