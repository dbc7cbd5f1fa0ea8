//! Configuration validation utilities and rules

use crate::{
    models::{Config, ServerCatalog},
    error::Result,
};
use std::net::IpAddr;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        // Hard limits first
        config.validate()?;

        warnings.extend(Self::validate_schedule(config));
        warnings.extend(Self::validate_hosts(config));
        warnings.extend(Self::validate_resolvers(&config.resolvers));
        warnings.extend(Self::validate_server(config));

        Ok(warnings)
    }

    /// Check run count, overlap and load window settings
    fn validate_schedule(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.parallel > config.runs {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Parallel level {} exceeds run count {}, only {} lanes will be used",
                    config.parallel, config.runs, config.runs)
            ));
        }

        let (lanes, raised) = config.effective_parallel();
        if raised {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} runs requested, overlapping {} at a time as a light stress test", config.runs, lanes)
            ));
        }

        let cpus = num_cpus::get() as u32;
        if lanes > cpus {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Parallel level {} exceeds available CPU cores ({}), measurements may be skewed", lanes, cpus)
            ));
        }

        if lanes > 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Overlapping runs share the same link, so bufferbloat and jitter results will interfere".to_string()
            ));
        }

        if config.load_duration_secs < 5 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Load window of {}s may be too short for a stable bufferbloat grade", config.load_duration_secs)
            ));
        }

        if config.mtr_count < 10 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("MTR count of {} gives coarse per-hop loss figures", config.mtr_count)
            ));
        }

        warnings
    }

    /// Flag targets that do not leave the local network
    fn validate_hosts(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, host) in [
            ("Ping host", &config.ping_host),
            ("Trace host", &config.trace_host),
            ("MTU host", &config.mtu_host),
        ] {
            if let Ok(ip) = host.parse::<IpAddr>() {
                if Self::is_local(&ip) {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!("{} {} is on the local network, results will not reflect the Internet path", name, ip)
                    ));
                }
            }
        }

        warnings
    }

    /// Validate resolver addresses
    fn validate_resolvers(resolvers: &[String]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for resolver in resolvers {
            if let Ok(ip) = resolver.parse::<IpAddr>() {
                if Self::is_local(&ip) {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Resolver {} is a local address, timings reflect the local cache", ip)
                    ));
                } else if !Self::is_known_public_dns(&ip) {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Resolver {} is not a well-known public resolver", ip)
                    ));
                }
            }
        }

        warnings
    }

    /// Note when a named server is outside the built-in catalog
    fn validate_server(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Some(server) = &config.iperf3_server {
            if ServerCatalog::builtin().find(server).is_none() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Server '{}' is not in the built-in catalog, probing port {}",
                        server, crate::defaults::DEFAULT_IPERF3_PORT)
                ));
            }
        }

        warnings
    }

    fn is_local(ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(ipv4) => ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local(),
            IpAddr::V6(ipv6) => ipv6.is_loopback(),
        }
    }

    /// Check if IP is a known public DNS server
    fn is_known_public_dns(ip: &IpAddr) -> bool {
        const KNOWN_DNS: [&str; 10] = [
            "8.8.8.8",
            "8.8.4.4",
            "1.1.1.1",
            "1.0.0.1",
            "9.9.9.9",
            "149.112.112.112",
            "208.67.222.222",
            "208.67.220.220",
            "2001:4860:4860::8888",
            "2606:4700:4700::1111",
        ];

        KNOWN_DNS
            .iter()
            .filter_map(|known| known.parse::<IpAddr>().ok())
            .any(|known| known == *ip)
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> &'static str {
        match self {
            Self::Info => "blue",
            Self::Warning => "yellow",
            Self::Error => "red",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            use colored::Colorize;
            let tag = format!("[{}]", self.level.as_str());
            format!("{} {}", tag.color(self.level.color()), self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
