//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    models::Config,
    error::Result,
    config::env::EnvManager,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);

        // Quick mode wins over everything else
        if self.cli.quick {
            config.apply_quick_mode();
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration.
    ///
    /// Options left at their clap default do not clobber environment values.
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if cli.runs != crate::defaults::DEFAULT_RUNS {
            config.runs = cli.runs;
        }

        if cli.parallel != crate::defaults::DEFAULT_PARALLEL {
            config.parallel = cli.parallel;
        }

        if cli.ping_host != crate::defaults::DEFAULT_PING_HOST {
            config.ping_host = cli.ping_host.clone();
        }

        config.trace_host = cli.trace_host.clone();
        config.mtu_host = cli.mtu_host.clone();
        config.dns_domain = cli.dns_domain.clone();

        if cli.mtr_count != crate::defaults::DEFAULT_MTR_COUNT {
            config.mtr_count = cli.mtr_count;
        }

        if let Some(duration) = cli.duration {
            config.load_duration_secs = u64::from(duration);
        }

        if let Some(ref resolvers) = cli.resolvers {
            config.resolvers = resolvers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(ref output) = cli.output {
            config.output_path = Some(output.clone());
        }

        if cli.no_output {
            config.output_path = None;
        }

        if let Some(ref server) = cli.iperf3_server {
            config.iperf3_server = Some(server.trim().to_string());
        }

        if cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Runs: {}", config.runs));
    summary.push(format!("Parallel: {}", config.parallel));
    summary.push(format!("Ping host: {}", config.ping_host));
    summary.push(format!("Trace host: {}", config.trace_host));
    summary.push(format!("MTU host: {}", config.mtu_host));
    summary.push(format!("MTR count: {}", config.mtr_count));
    summary.push(format!("Load window: {}s", config.load_duration_secs));
    summary.push(format!("DNS: {} via {}", config.dns_domain, config.resolvers.join(", ")));
    summary.push(format!(
        "iperf3 server: {}",
        config.iperf3_server.as_deref().unwrap_or("auto-select")
    ));
    summary.push(format!(
        "Output: {}",
        config.output_path.as_deref().unwrap_or("disabled")
    ));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
