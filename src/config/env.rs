//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                println!("Loaded configuration from .env file");
            }
        } else if debug {
            println!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Link Diagnostics Configuration
#
# Values here act as defaults and are overridden by command-line arguments.

# Number of diagnostic runs (1-100)
# NETDIAG_RUNS=5

# Runs allowed to overlap per batch (1-16)
# NETDIAG_PARALLEL=1

# Host pinged for the bufferbloat test
# NETDIAG_PING_HOST=8.8.8.8

# Report file (empty disables the report)
# NETDIAG_OUTPUT=network_diagnostics.txt

# Packets per hop sent by mtr (1-1000)
# NETDIAG_MTR_COUNT=200

# DNS resolvers to time (comma-separated IP addresses)
# NETDIAG_RESOLVERS=1.1.1.1,8.8.8.8

# Plain-text public IP endpoint
# NETDIAG_PUBLIC_IP_URL=https://api.ipify.org

# Enable colored output (true/false)
# NETDIAG_ENABLE_COLOR=true
"#.to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "NETDIAG_RUNS" => {
                let runs: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid NETDIAG_RUNS value '{}': {}", value, e)))?;
                if runs == 0 || runs > 100 {
                    return Err(AppError::config(format!("NETDIAG_RUNS must be between 1 and 100, got: {}", runs)));
                }
            }
            "NETDIAG_PARALLEL" => {
                let parallel: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid NETDIAG_PARALLEL value '{}': {}", value, e)))?;
                if parallel == 0 || parallel > 16 {
                    return Err(AppError::config(format!("NETDIAG_PARALLEL must be between 1 and 16, got: {}", parallel)));
                }
            }
            "NETDIAG_MTR_COUNT" => {
                let count: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid NETDIAG_MTR_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > 1000 {
                    return Err(AppError::config(format!("NETDIAG_MTR_COUNT must be between 1 and 1000, got: {}", count)));
                }
            }
            "NETDIAG_RESOLVERS" => {
                for resolver in value.split(',') {
                    let resolver = resolver.trim();
                    if !resolver.is_empty() {
                        resolver.parse::<std::net::IpAddr>()
                            .map_err(|e| AppError::config(format!("Invalid NETDIAG_RESOLVERS entry '{}': {}", resolver, e)))?;
                    }
                }
            }
            "NETDIAG_PUBLIC_IP_URL" => {
                url::Url::parse(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid NETDIAG_PUBLIC_IP_URL '{}': {}", value, e)))?;
            }
            "NETDIAG_ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid NETDIAG_ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Free-form values (hosts, paths) or unknown variables
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("NETDIAG_RUNS", "Number of diagnostic runs (1-100)", "5"),
            ("NETDIAG_PARALLEL", "Runs allowed to overlap per batch (1-16)", "1"),
            ("NETDIAG_PING_HOST", "Host pinged for bufferbloat", "8.8.8.8"),
            ("NETDIAG_OUTPUT", "Report file path (empty disables)", "network_diagnostics.txt"),
            ("NETDIAG_MTR_COUNT", "Packets per hop sent by mtr (1-1000)", "200"),
            ("NETDIAG_RESOLVERS", "Comma-separated resolver IPs", "1.1.1.1,8.8.8.8"),
            ("NETDIAG_PUBLIC_IP_URL", "Plain-text public IP endpoint", "https://api.ipify.org"),
            ("NETDIAG_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }
}
