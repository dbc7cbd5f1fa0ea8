//! Link Diagnostics
//!
//! Automated Internet link diagnostics without control over the remote end:
//! bufferbloat under TCP saturation, UDP jitter and loss, hop-by-hop route
//! health, path MTU, DNS lookup timing and carrier-grade NAT detection.
//! Runs are repeated (optionally overlapping in batches) and aggregated into
//! a statistically stable report suitable as evidence for an ISP.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod grading;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod selector;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ProbeError, ProbeResult, Result};
pub use models::{Config, CandidateEndpoint, ServerCatalog, PassResult, HopRecord};
pub use probe::{ProbeAdapter, SystemProbes};
pub use selector::{EndpointSelector, Selection};
pub use executor::{RunScheduler, PassRunner, PassOutcome};
pub use stats::{Aggregator, AggregateReport, MetricSummary};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_RUNS: u32 = 5;
    pub const DEFAULT_PARALLEL: u32 = 1;
    /// Run count from which a single-lane schedule is widened to two lanes
    pub const AUTO_PARALLEL_RUN_THRESHOLD: u32 = 6;
    pub const AUTO_PARALLEL_LANES: u32 = 2;

    pub const DEFAULT_PING_HOST: &str = "8.8.8.8";
    pub const DEFAULT_TRACE_HOST: &str = "8.8.8.8";
    pub const DEFAULT_MTU_HOST: &str = "8.8.8.8";
    pub const DEFAULT_OUTPUT_PATH: &str = "network_diagnostics.txt";
    pub const DEFAULT_MTR_COUNT: u32 = 200;
    pub const QUICK_MTR_COUNT: u32 = 100;

    pub const DEFAULT_DNS_DOMAIN: &str = "google.com";
    pub const DEFAULT_RESOLVERS: &[&str] = &["1.1.1.1", "8.8.8.8"];
    pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

    /// Length of each latency window (baseline, upload, download)
    pub const DEFAULT_LOAD_DURATION: Duration = Duration::from_secs(10);
    pub const PING_INTERVAL: Duration = Duration::from_millis(100);
    pub const UDP_BANDWIDTH: &str = "100M";
    pub const DEFAULT_IPERF3_PORT: u16 = 5201;

    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
    pub const CAPABILITY_TIMEOUT: Duration = Duration::from_secs(5);
    pub const PING_TIMEOUT: Duration = Duration::from_secs(1);
    pub const MTU_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DNS_TIMEOUT: Duration = Duration::from_secs(1);
    pub const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(3);
    pub const UPNP_DISCOVERY_TIMEOUT: Duration = Duration::from_millis(2000);
    /// Slack granted to saturating transfers beyond their configured duration
    pub const TRANSFER_GRACE: Duration = Duration::from_secs(15);

    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Public iperf3 servers: host, description, first port, last port
    pub const DEFAULT_SERVERS: &[(&str, &str, u16, u16)] = &[
        ("ping.online.net", "Scaleway France", 5200, 5209),
        ("speedtest.milkywan.fr", "CBO France", 9200, 9240),
        ("str.cubic.iperf.bytel.fr", "Bouygues France", 9200, 9240),
        ("ch.iperf.014.fr", "HostHatch Switzerland", 15315, 15320),
    ];
}
