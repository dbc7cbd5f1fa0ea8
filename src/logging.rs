//! Structured logging for the diagnostics engine
//!
//! Loggers write console lines by default and JSON lines in debug mode.
//! Warnings and errors go to stderr, everything else to stdout, so the
//! pass reports on stdout stay readable when logging is quiet.

use crate::error::{AppError, ProbeError};
use crate::models::Config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Detailed information for debugging
    Debug = 1,
    /// General application information
    Info = 2,
    /// Potentially harmful situations
    Warn = 3,
    /// Error events the run can continue past
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON lines for log aggregators
    Json,
}

/// Logger with a minimum level and a per-session tag
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    session_id: Option<String>,
}

/// Batch timing logger for the run scheduler
pub struct PerformanceLogger {
    logger: Logger,
}

/// Specialized logger for individual measurement calls
#[derive(Clone)]
pub struct ProbeLogger {
    logger: Logger,
}

/// Logger for sub-tests that produced no data
#[derive(Clone)]
pub struct ErrorEventLogger {
    logger: Logger,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            session_id: None,
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            session_id: None,
        }
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Render an entry, or `None` when it is below the minimum level
    fn render(&self, mut entry: LogEntry) -> Option<String> {
        if entry.level < self.min_level {
            return None;
        }

        if let Some(session_id) = &self.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }

        Some(match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => format_json(&entry),
        })
    }

    fn write_entry(&self, entry: LogEntry) {
        let level = entry.level;
        let Some(output) = self.render(entry) else {
            return;
        };

        if level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}\x1b[0m", entry.level.color_code(), level_str)
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }
}

fn format_json(entry: &LogEntry) -> String {
    match serde_json::to_string(entry) {
        Ok(json) => json,
        Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}", entry.message),
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                fields: HashMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add measurement error information
    pub fn probe_error(self, error: &ProbeError) -> Self {
        self.field("probe_error_kind", error.kind())
            .field("probe_error", error.to_string())
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry);
    }
}

impl PerformanceLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("PERF".to_string(), config),
        }
    }

    /// Log batch operation summary with aggregate timing information
    pub async fn log_batch_summary(
        &self,
        batch_size: usize,
        total_duration: std::time::Duration,
        additional_info: Option<&str>,
    ) {
        let avg_per_item = if batch_size > 0 {
            total_duration.as_secs_f64() / batch_size as f64
        } else {
            0.0
        };

        let message = format!(
            "Batch summary: {} runs finished in {:.3}s (avg {:.3}s per run)",
            batch_size,
            total_duration.as_secs_f64(),
            avg_per_item
        );

        let mut builder = self
            .logger
            .info(&message)
            .field("batch_size", batch_size)
            .field("total_duration_seconds", total_duration.as_secs_f64())
            .field("avg_per_item_seconds", avg_per_item);

        if let Some(info) = additional_info {
            builder = builder.field("additional_info", info);
        }

        builder.log().await;
    }
}

impl ProbeLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("PROBE".to_string(), config),
        }
    }

    /// Log the outcome of one measurement call
    pub async fn log_probe<T>(&self, probe: &str, target: &str, outcome: &std::result::Result<T, ProbeError>, duration_ms: f64) {
        let (level, message) = match outcome {
            Ok(_) => (LogLevel::Debug, format!("{} {} succeeded in {:.1}ms", probe, target, duration_ms)),
            Err(e) => (LogLevel::Warn, format!("{} {} failed: {}", probe, target, e)),
        };

        let mut builder = self
            .logger
            .log(level, &message)
            .field("probe", probe)
            .field("target", target)
            .field("success", outcome.is_ok())
            .field("duration_ms", duration_ms);

        if let Err(e) = outcome {
            builder = builder.probe_error(e);
        }

        builder.log().await;
    }

    /// Log one DNS resolution attempt
    pub async fn log_dns_resolution(&self, domain: &str, resolver: &str, success: bool, duration_ms: f64) {
        let level = if success { LogLevel::Debug } else { LogLevel::Warn };
        let message = format!(
            "DNS resolution for {} using {}: {}",
            domain,
            resolver,
            if success { "success" } else { "failed" }
        );

        self.logger
            .log(level, &message)
            .field("domain", domain)
            .field("resolver", resolver)
            .field("success", success)
            .field("duration_ms", duration_ms)
            .log()
            .await;
    }
}

impl ErrorEventLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("ERR".to_string(), config),
        }
    }

    /// Log a sub-test that produced no data
    pub async fn log_subtest_failure(&self, pass_id: u32, subtest: &str, reason: &str) {
        self.logger
            .warn(&format!("Run {}: {} produced no result: {}", pass_id, subtest, reason))
            .field("pass_id", pass_id)
            .field("subtest", subtest)
            .field("reason", reason)
            .log()
            .await;
    }
}

/// Hands out loggers that share one session id
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let mut logger = Logger::with_config(name.to_string(), &self.config);
        logger.session_id = Some(self.session_id.clone());
        logger
    }
}
