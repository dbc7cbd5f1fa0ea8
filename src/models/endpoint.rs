//! Candidate measurement endpoints

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A remote iperf3 server with the ports it may be listening on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEndpoint {
    pub host: String,
    /// Ports in the order they are tried
    pub ports: Vec<u16>,
    pub label: String,
}

impl CandidateEndpoint {
    pub fn new<H: Into<String>, L: Into<String>>(host: H, ports: Vec<u16>, label: L) -> Self {
        Self {
            host: host.into(),
            ports,
            label: label.into(),
        }
    }

    /// Endpoint listening on a contiguous inclusive port range
    pub fn with_port_range<H: Into<String>, L: Into<String>>(host: H, first: u16, last: u16, label: L) -> Self {
        Self::new(host, (first..=last).collect(), label)
    }

    /// Human-readable port list, e.g. `ports 5200-5209` or `port 5201`
    pub fn port_display(&self) -> String {
        match self.ports.as_slice() {
            [] => "no ports".to_string(),
            [single] => format!("port {}", single),
            [first, .., last] => format!("ports {}-{}", first, last),
        }
    }
}

/// Immutable, ordered set of candidate endpoints built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCatalog {
    endpoints: Arc<[CandidateEndpoint]>,
}

impl ServerCatalog {
    pub fn new(endpoints: Vec<CandidateEndpoint>) -> Self {
        Self { endpoints: endpoints.into() }
    }

    /// The built-in list of public iperf3 servers
    pub fn builtin() -> Self {
        Self::new(
            crate::defaults::DEFAULT_SERVERS
                .iter()
                .map(|&(host, label, first, last)| CandidateEndpoint::with_port_range(host, first, last, label))
                .collect(),
        )
    }

    pub fn endpoints(&self) -> &[CandidateEndpoint] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.iter().all(|e| e.ports.is_empty())
    }

    pub fn find(&self, host: &str) -> Option<&CandidateEndpoint> {
        self.endpoints.iter().find(|e| e.host.eq_ignore_ascii_case(host))
    }

    /// First configured (host, port) pair, used as the unconditional fallback
    pub fn first_pair(&self) -> Option<(&str, u16)> {
        self.endpoints
            .iter()
            .find_map(|e| e.ports.first().map(|&port| (e.host.as_str(), port)))
    }

    /// Catalog narrowed to a single user-named server.
    ///
    /// Known hosts keep their port list; unknown hosts get the default iperf3 port.
    pub fn for_server(&self, host: &str) -> Self {
        let endpoint = match self.find(host) {
            Some(known) => known.clone(),
            None => CandidateEndpoint::new(host, vec![crate::defaults::DEFAULT_IPERF3_PORT], "Custom server"),
        };
        Self::new(vec![endpoint])
    }

    /// Listing lines for `--list-servers`
    pub fn listing(&self) -> Vec<String> {
        self.endpoints
            .iter()
            .map(|e| format!("{:<30} - {} ({})", e.host, e.label, e.port_display()))
            .collect()
    }
}

impl Default for ServerCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
