//! Command-line interface

use clap::Parser;

/// Comprehensive Internet link diagnostics
#[derive(Parser, Debug, Clone)]
#[command(name = "linkdiag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// IP or hostname of an iperf3 server for TCP/UDP tests (default: auto-select)
    #[arg(long = "iperf3-server", value_name = "HOST")]
    pub iperf3_server: Option<String>,

    /// List available iperf3 servers and exit
    #[arg(long)]
    pub list_servers: bool,

    /// Host to ping for bufferbloat
    #[arg(long, default_value = crate::defaults::DEFAULT_PING_HOST)]
    pub ping_host: String,

    /// Route trace target
    #[arg(long, default_value = crate::defaults::DEFAULT_TRACE_HOST)]
    pub trace_host: String,

    /// Path MTU discovery target
    #[arg(long, default_value = crate::defaults::DEFAULT_MTU_HOST)]
    pub mtu_host: String,

    /// Number of test runs to perform
    #[arg(long, default_value_t = crate::defaults::DEFAULT_RUNS, value_parser = parse_positive)]
    pub runs: u32,

    /// Number of runs allowed to overlap per batch
    #[arg(long, default_value_t = crate::defaults::DEFAULT_PARALLEL, value_parser = parse_positive)]
    pub parallel: u32,

    /// Save detailed results to this file
    #[arg(long, value_name = "PATH")]
    pub output: Option<String>,

    /// Do not write a report file
    #[arg(long, conflicts_with = "output")]
    pub no_output: bool,

    /// Number of MTR packets to send per hop
    #[arg(long, default_value_t = crate::defaults::DEFAULT_MTR_COUNT, value_parser = parse_positive)]
    pub mtr_count: u32,

    /// Length of each bufferbloat latency window in seconds
    #[arg(long, value_parser = parse_positive)]
    pub duration: Option<u32>,

    /// Domain looked up by the DNS timing test
    #[arg(long, default_value = crate::defaults::DEFAULT_DNS_DOMAIN)]
    pub dns_domain: String,

    /// DNS resolvers to time (comma-separated IP addresses)
    #[arg(long)]
    pub resolvers: Option<String>,

    /// Quick single run mode (disables multiple runs and the report file)
    #[arg(long)]
    pub quick: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Configuration Summary:\n");
        summary.push_str(&format!("  Runs: {}\n", self.runs));
        summary.push_str(&format!("  Parallel: {}\n", self.parallel));
        summary.push_str(&format!("  Ping host: {}\n", self.ping_host));
        summary.push_str(&format!("  MTR count: {}\n", self.mtr_count));
        summary.push_str(&format!("  Quick mode: {}\n", self.quick));

        if let Some(ref server) = self.iperf3_server {
            summary.push_str(&format!("  iperf3 server: {}\n", server));
        }

        if let Some(ref output) = self.output {
            summary.push_str(&format!("  Output: {}\n", output));
        }

        summary
    }
}

/// Parse a strictly positive count
fn parse_positive(s: &str) -> Result<u32, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid number: {}", s));
    }

    s.parse::<u32>()
        .map_err(|_| format!("Invalid number: {}", s))
        .and_then(|n| {
            if n == 0 {
                Err("Value must be greater than 0".to_string())
            } else {
                Ok(n)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
