//! Configuration data model and validation

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of diagnostic passes
    #[serde(default = "default_runs")]
    pub runs: u32,

    /// Passes allowed to overlap within one batch
    #[serde(default = "default_parallel")]
    pub parallel: u32,

    /// Host pinged for the bufferbloat baseline and loaded windows
    #[serde(default = "default_ping_host")]
    pub ping_host: String,

    /// Route trace target
    #[serde(default = "default_trace_host")]
    pub trace_host: String,

    /// Path MTU target
    #[serde(default = "default_mtu_host")]
    pub mtu_host: String,

    /// Report file; `None` disables the report
    #[serde(default = "default_output_path")]
    pub output_path: Option<String>,

    /// Packets per hop sent by the route tracer
    #[serde(default = "default_mtr_count")]
    pub mtr_count: u32,

    /// User-named iperf3 server; `None` means auto-select from the catalog
    #[serde(default)]
    pub iperf3_server: Option<String>,

    /// Domain looked up by the DNS timing test
    #[serde(default = "default_dns_domain")]
    pub dns_domain: String,

    /// Resolvers timed by the DNS test
    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<String>,

    /// Endpoint returning the caller's public IP as plain text
    #[serde(default = "default_public_ip_url")]
    pub public_ip_url: String,

    /// Length of each latency window in seconds
    #[serde(default = "default_load_duration_secs")]
    pub load_duration_secs: u64,

    /// Single fast run without report file
    #[serde(default)]
    pub quick: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            parallel: default_parallel(),
            ping_host: default_ping_host(),
            trace_host: default_trace_host(),
            mtu_host: default_mtu_host(),
            output_path: default_output_path(),
            mtr_count: default_mtr_count(),
            iperf3_server: None,
            dns_domain: default_dns_domain(),
            resolvers: default_resolvers(),
            public_ip_url: default_public_ip_url(),
            load_duration_secs: default_load_duration_secs(),
            quick: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of each bufferbloat window
    pub fn load_duration(&self) -> Duration {
        Duration::from_secs(self.load_duration_secs)
    }

    /// Collapse to a single run without report file
    pub fn apply_quick_mode(&mut self) {
        self.quick = true;
        self.runs = 1;
        self.parallel = 1;
        self.output_path = None;
        self.mtr_count = crate::defaults::QUICK_MTR_COUNT;
    }

    /// Concurrency actually used, and whether it was raised automatically.
    ///
    /// Long single-lane schedules are widened to two lanes as a light stress test.
    pub fn effective_parallel(&self) -> (u32, bool) {
        if self.runs >= crate::defaults::AUTO_PARALLEL_RUN_THRESHOLD && self.parallel == 1 {
            (crate::defaults::AUTO_PARALLEL_LANES, true)
        } else {
            (self.parallel, false)
        }
    }

    /// Parsed resolver addresses
    pub fn resolver_ips(&self) -> Result<Vec<IpAddr>> {
        self.resolvers
            .iter()
            .map(|r| {
                IpAddr::from_str(r).map_err(|e| AppError::config(format!("Invalid resolver address '{}': {}", r, e)))
            })
            .collect()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(AppError::config("Run count must be greater than 0"));
        }

        if self.runs > 100 {
            return Err(AppError::config("Run count cannot exceed 100"));
        }

        if self.parallel == 0 {
            return Err(AppError::config("Parallel level must be greater than 0"));
        }

        if self.parallel > 16 {
            return Err(AppError::config("Parallel level cannot exceed 16"));
        }

        if self.mtr_count == 0 || self.mtr_count > 1000 {
            return Err(AppError::config("MTR packet count must be between 1 and 1000"));
        }

        if self.load_duration_secs == 0 || self.load_duration_secs > 60 {
            return Err(AppError::config("Load window duration must be between 1 and 60 seconds"));
        }

        for (name, host) in [
            ("Ping host", &self.ping_host),
            ("Trace host", &self.trace_host),
            ("MTU host", &self.mtu_host),
            ("DNS domain", &self.dns_domain),
        ] {
            if host.trim().is_empty() {
                return Err(AppError::config(format!("{} cannot be empty", name)));
            }
        }

        if let Some(server) = &self.iperf3_server {
            if server.trim().is_empty() {
                return Err(AppError::config("iperf3 server cannot be empty"));
            }
        }

        if let Some(path) = &self.output_path {
            if path.trim().is_empty() {
                return Err(AppError::config("Output path cannot be empty"));
            }
        }

        if self.resolvers.is_empty() {
            return Err(AppError::config("At least one DNS resolver is required"));
        }
        self.resolver_ips()?;

        match url::Url::parse(&self.public_ip_url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            Ok(_) => {
                return Err(AppError::config(format!("Public IP URL must use HTTP(S): {}", self.public_ip_url)));
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid public IP URL '{}': {}", self.public_ip_url, e)));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(runs) = std::env::var("NETDIAG_RUNS") {
            self.runs = runs.parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_RUNS value '{}': {}", runs, e)))?;
        }

        if let Ok(parallel) = std::env::var("NETDIAG_PARALLEL") {
            self.parallel = parallel.parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_PARALLEL value '{}': {}", parallel, e)))?;
        }

        if let Ok(ping_host) = std::env::var("NETDIAG_PING_HOST") {
            self.ping_host = ping_host.trim().to_string();
        }

        if let Ok(output) = std::env::var("NETDIAG_OUTPUT") {
            let output = output.trim();
            self.output_path = if output.is_empty() { None } else { Some(output.to_string()) };
        }

        if let Ok(mtr_count) = std::env::var("NETDIAG_MTR_COUNT") {
            self.mtr_count = mtr_count.parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_MTR_COUNT value '{}': {}", mtr_count, e)))?;
        }

        if let Ok(resolvers) = std::env::var("NETDIAG_RESOLVERS") {
            self.resolvers = resolvers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(url) = std::env::var("NETDIAG_PUBLIC_IP_URL") {
            self.public_ip_url = url.trim().to_string();
        }

        if let Ok(enable_color) = std::env::var("NETDIAG_ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid NETDIAG_ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_runs() -> u32 {
    crate::defaults::DEFAULT_RUNS
}

fn default_parallel() -> u32 {
    crate::defaults::DEFAULT_PARALLEL
}

fn default_ping_host() -> String {
    crate::defaults::DEFAULT_PING_HOST.to_string()
}

fn default_trace_host() -> String {
    crate::defaults::DEFAULT_TRACE_HOST.to_string()
}

fn default_mtu_host() -> String {
    crate::defaults::DEFAULT_MTU_HOST.to_string()
}

fn default_output_path() -> Option<String> {
    Some(crate::defaults::DEFAULT_OUTPUT_PATH.to_string())
}

fn default_mtr_count() -> u32 {
    crate::defaults::DEFAULT_MTR_COUNT
}

fn default_dns_domain() -> String {
    crate::defaults::DEFAULT_DNS_DOMAIN.to_string()
}

fn default_resolvers() -> Vec<String> {
    crate::defaults::DEFAULT_RESOLVERS
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_public_ip_url() -> String {
    crate::defaults::DEFAULT_PUBLIC_IP_URL.to_string()
}

fn default_load_duration_secs() -> u64 {
    crate::defaults::DEFAULT_LOAD_DURATION.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
