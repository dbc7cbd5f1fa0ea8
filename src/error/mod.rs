//! Error handling for the link diagnostics engine
//!
//! Two layers of errors exist here. [`ProbeError`] is the tagged outcome of a
//! single external probe (ping, iperf3, mtr, resolver, HTTP lookup) and is
//! never fatal: it degrades to a missing metric. [`AppError`] covers the
//! application level: configuration, report I/O, isolated pass failures and
//! the one fatal condition, a missing startup dependency.

use thiserror::Error;

/// Failure of a single external probe call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// The probe exceeded its time bound
    #[error("timed out after {0:.1}s")]
    Timeout(f64),

    /// The tool, device or service needed by the probe is absent
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The probe answered but its output could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The probe ran and reported failure
    #[error("failed: {0}")]
    Failed(String),
}

impl ProbeError {
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout(after.as_secs_f64())
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::Malformed(message.into())
    }

    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self::Failed(message.into())
    }

    /// Short tag used in reports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Unavailable(_) => "unavailable",
            Self::Malformed(_) => "malformed",
            Self::Failed(_) => "failed",
        }
    }
}

/// Result of one probe call
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Custom error types for the diagnostics application
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (report file, .env file)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Uncaught fault inside one diagnostic pass
    #[error("Run {pass_id} failed: {reason}")]
    PassFailure { pass_id: u32, reason: String },

    /// A required external tool is not installed
    #[error("Missing dependency: {0}")]
    StartupDependencyMissing(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new pass failure tagged with the pass identity
    pub fn pass_failure<S: Into<String>>(pass_id: u32, reason: S) -> Self {
        Self::PassFailure { pass_id, reason: reason.into() }
    }

    /// Create a new missing-dependency error
    pub fn missing_dependency<S: Into<String>>(message: S) -> Self {
        Self::StartupDependencyMissing(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::PassFailure { .. } => "PASS",
            Self::StartupDependencyMissing(_) => "DEPENDENCY",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the application must stop before measuring anything
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PassFailure { .. })
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) | Self::Validation(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space for the report file.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}", msg)
            }
            Self::PassFailure { pass_id, reason } => {
                format!("Run {} did not complete: {}\n\nOther runs are unaffected.", pass_id, reason)
            }
            Self::StartupDependencyMissing(msg) => {
                format!("{}\n\nSuggestion: install it (e.g. `apt install iperf3 iputils-ping mtr` or `brew install iperf3 mtr`).", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StartupDependencyMissing(_) => 1,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Io(_) => 5,
            Self::PassFailure { .. } => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::StartupDependencyMissing(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Io(_) | Self::PassFailure { .. } => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(0.0)
        } else if error.is_connect() {
            Self::unavailable(error.to_string())
        } else if error.is_decode() {
            Self::malformed(error.to_string())
        } else {
            Self::failed(error.to_string())
        }
    }
}

impl From<trust_dns_resolver::error::ResolveError> for ProbeError {
    fn from(error: trust_dns_resolver::error::ResolveError) -> Self {
        use trust_dns_resolver::error::ResolveErrorKind;
        match error.kind() {
            ResolveErrorKind::Timeout => Self::Timeout(0.0),
            _ => Self::failed(error.to_string()),
        }
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::unavailable(error.to_string()),
            std::io::ErrorKind::TimedOut => Self::Timeout(0.0),
            _ => Self::failed(error.to_string()),
        }
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;
