//! Endpoint selection under uncertain server availability
//!
//! Public iperf3 servers come and go, and a port that accepts TCP does not
//! necessarily accept a UDP test. The selector walks the catalog in order and
//! reports how far it got:
//!
//! * **Full**: the first port passing both the connectivity and the UDP
//!   capability probe.
//! * **Partial**: no port passed both, but at least one accepted a connection;
//!   the first such port is used.
//! * **Fallback**: nothing answered; the first configured pair is used anyway
//!   so later stages fail with informative errors.

use crate::{
    defaults,
    error::{AppError, Result},
    logging::{LogLevel, Logger},
    models::ServerCatalog,
    probe::ProbeAdapter,
    types::SelectionTier,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Chosen measurement endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub host: String,
    pub port: u16,
    pub tier: SelectionTier,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.host, self.port, self.tier.description())
    }
}

/// Picks an iperf3 endpoint from an immutable catalog
pub struct EndpointSelector {
    catalog: ServerCatalog,
    probes: Arc<dyn ProbeAdapter>,
    logger: Logger,
}

impl EndpointSelector {
    pub fn new(catalog: ServerCatalog, probes: Arc<dyn ProbeAdapter>) -> Self {
        let mut logger = Logger::new("SELECT".to_string());
        logger.set_level(LogLevel::Warn);
        Self { catalog, probes, logger }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn catalog(&self) -> &ServerCatalog {
        &self.catalog
    }

    /// Walk the catalog and tier the first usable endpoint
    pub async fn select(&self) -> Result<Selection> {
        let (fallback_host, fallback_port) = self
            .catalog
            .first_pair()
            .ok_or_else(|| AppError::config("No candidate endpoints configured"))?;

        let mut first_reachable: Option<(String, u16)> = None;

        for endpoint in self.catalog.endpoints() {
            self.logger
                .info(&format!("Testing {} ({}) on {}", endpoint.host, endpoint.label, endpoint.port_display()))
                .field("host", &endpoint.host)
                .log()
                .await;

            for &port in &endpoint.ports {
                let target = format!("{}:{}", endpoint.host, port);

                if let Err(e) = self
                    .probes
                    .connectivity_probe(&endpoint.host, port, defaults::CONNECT_TIMEOUT)
                    .await
                {
                    self.logger
                        .debug(&format!("{} TCP unreachable", target))
                        .probe_error(&e)
                        .log()
                        .await;
                    continue;
                }

                match self
                    .probes
                    .capability_probe(&endpoint.host, port, defaults::CAPABILITY_TIMEOUT)
                    .await
                {
                    Ok(()) => {
                        return Ok(self.chosen(&endpoint.host, port, SelectionTier::Full).await);
                    }
                    Err(e) => {
                        self.logger
                            .info(&format!("{} accepts TCP but failed the UDP test", target))
                            .probe_error(&e)
                            .log()
                            .await;
                        if first_reachable.is_none() {
                            first_reachable = Some((endpoint.host.clone(), port));
                        }
                    }
                }
            }
        }

        if let Some((host, port)) = first_reachable {
            return Ok(self.chosen(&host, port, SelectionTier::Partial).await);
        }

        let (host, port) = (fallback_host.to_string(), fallback_port);
        Ok(self.chosen(&host, port, SelectionTier::Fallback).await)
    }

    /// Select within a single user-named server.
    ///
    /// A catalogued host keeps its own ports; any other host is tried on the
    /// default iperf3 port.
    pub async fn select_named(&self, host: &str) -> Result<Selection> {
        let narrowed = EndpointSelector {
            catalog: self.catalog.for_server(host),
            probes: Arc::clone(&self.probes),
            logger: self.logger.clone(),
        };
        narrowed.select().await
    }

    async fn chosen(&self, host: &str, port: u16, tier: SelectionTier) -> Selection {
        let level = match tier {
            SelectionTier::Fallback => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        self.logger
            .log(level, &format!("Selected {}:{} ({})", host, port, tier.description()))
            .field("host", host)
            .field("port", port)
            .field("tier", tier)
            .log()
            .await;

        Selection {
            host: host.to_string(),
            port,
            tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProbeError, ProbeResult};
    use crate::models::{CandidateEndpoint, HopRecord, UdpStats};
    use crate::types::Direction;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::net::IpAddr;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Probe answering connectivity and capability from fixed sets
    #[derive(Default)]
    struct ScriptedProbes {
        tcp_open: HashSet<(String, u16)>,
        udp_capable: HashSet<(String, u16)>,
        calls: Mutex<Vec<(String, u16)>>,
    }

    impl ScriptedProbes {
        fn open(mut self, host: &str, port: u16) -> Self {
            self.tcp_open.insert((host.to_string(), port));
            self
        }

        fn capable(mut self, host: &str, port: u16) -> Self {
            self.udp_capable.insert((host.to_string(), port));
            self.open(host, port)
        }
    }

    #[async_trait]
    impl ProbeAdapter for ScriptedProbes {
        async fn connectivity_probe(&self, host: &str, port: u16, _timeout: Duration) -> ProbeResult<()> {
            self.calls.lock().unwrap().push((host.to_string(), port));
            if self.tcp_open.contains(&(host.to_string(), port)) {
                Ok(())
            } else {
                Err(ProbeError::timeout(Duration::from_secs(3)))
            }
        }

        async fn capability_probe(&self, host: &str, port: u16, _timeout: Duration) -> ProbeResult<()> {
            if self.udp_capable.contains(&(host.to_string(), port)) {
                Ok(())
            } else {
                Err(ProbeError::malformed("incomplete UDP summary"))
            }
        }

        async fn latency_probe(&self, _host: &str, _timeout: Duration) -> ProbeResult<f64> {
            unreachable!()
        }

        async fn saturating_transfer(&self, _: &str, _: u16, _: Direction, _: Duration) -> ProbeResult<()> {
            unreachable!()
        }

        async fn udp_throughput_probe(&self, _: &str, _: u16, _: &str, _: Duration) -> ProbeResult<UdpStats> {
            unreachable!()
        }

        async fn route_trace(&self, _host: &str, _count: u32) -> ProbeResult<Vec<HopRecord>> {
            unreachable!()
        }

        async fn mtu_probe(&self, _host: &str, _payload: u32) -> ProbeResult<bool> {
            unreachable!()
        }

        async fn resolve_timed(&self, _: &str, _: IpAddr, _: Duration) -> ProbeResult<f64> {
            unreachable!()
        }

        async fn public_ip(&self) -> ProbeResult<IpAddr> {
            unreachable!()
        }

        async fn router_external_ip(&self) -> ProbeResult<IpAddr> {
            unreachable!()
        }
    }

    fn catalog() -> ServerCatalog {
        ServerCatalog::new(vec![
            CandidateEndpoint::new("alpha.example", vec![5200, 5201], "Alpha"),
            CandidateEndpoint::new("beta.example", vec![9200, 9201, 9202], "Beta"),
        ])
    }

    fn selector(probes: ScriptedProbes) -> EndpointSelector {
        EndpointSelector::new(catalog(), Arc::new(probes))
    }

    #[tokio::test]
    async fn test_full_tier_when_both_probes_pass() {
        let probes = ScriptedProbes::default()
            .open("alpha.example", 5201)
            .capable("beta.example", 9202);

        let selection = selector(probes).select().await.unwrap();
        assert_eq!(selection, Selection { host: "beta.example".into(), port: 9202, tier: SelectionTier::Full });
    }

    #[tokio::test]
    async fn test_first_full_pair_wins() {
        let probes = ScriptedProbes::default()
            .capable("alpha.example", 5201)
            .capable("beta.example", 9200);

        let selection = selector(probes).select().await.unwrap();
        assert_eq!((selection.host.as_str(), selection.port), ("alpha.example", 5201));
        assert_eq!(selection.tier, SelectionTier::Full);
    }

    #[tokio::test]
    async fn test_partial_tier_when_only_connectivity_passes() {
        let probes = ScriptedProbes::default()
            .open("beta.example", 9201)
            .open("beta.example", 9202);

        let selection = selector(probes).select().await.unwrap();
        assert_eq!(selection, Selection { host: "beta.example".into(), port: 9201, tier: SelectionTier::Partial });
    }

    #[tokio::test]
    async fn test_fallback_when_nothing_responds() {
        let selection = selector(ScriptedProbes::default()).select().await.unwrap();
        assert_eq!(selection, Selection { host: "alpha.example".into(), port: 5200, tier: SelectionTier::Fallback });
    }

    #[tokio::test]
    async fn test_every_port_tried_in_order() {
        let probes = Arc::new(ScriptedProbes::default());
        let selector = EndpointSelector::new(catalog(), probes.clone());
        selector.select().await.unwrap();

        let calls = probes.calls.lock().unwrap().clone();
        let ports: Vec<u16> = calls.iter().map(|(_, port)| *port).collect();
        assert_eq!(ports, vec![5200, 5201, 9200, 9201, 9202]);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_error() {
        let selector = EndpointSelector::new(ServerCatalog::new(vec![]), Arc::new(ScriptedProbes::default()));
        assert!(selector.select().await.is_err());
    }

    #[tokio::test]
    async fn test_select_named_custom_server_uses_default_port() {
        let probes = ScriptedProbes::default().capable("iperf.example.net", 5201);
        let selector = EndpointSelector::new(ServerCatalog::builtin(), Arc::new(probes));

        let selection = selector.select_named("iperf.example.net").await.unwrap();
        assert_eq!(selection.port, 5201);
        assert_eq!(selection.tier, SelectionTier::Full);
    }

    #[tokio::test]
    async fn test_select_named_known_server_probes_its_ports() {
        let probes = ScriptedProbes::default().open("ch.iperf.014.fr", 15317);
        let selector = EndpointSelector::new(ServerCatalog::builtin(), Arc::new(probes));

        let selection = selector.select_named("ch.iperf.014.fr").await.unwrap();
        assert_eq!(selection.port, 15317);
        assert_eq!(selection.tier, SelectionTier::Partial);

        let unreachable = EndpointSelector::new(ServerCatalog::builtin(), Arc::new(ScriptedProbes::default()))
            .select_named("ch.iperf.014.fr")
            .await
            .unwrap();
        assert_eq!((unreachable.port, unreachable.tier), (15315, SelectionTier::Fallback));
    }

    #[test]
    fn test_selection_display() {
        let selection = Selection { host: "ping.online.net".into(), port: 5203, tier: SelectionTier::Partial };
        assert_eq!(selection.to_string(), "ping.online.net:5203 (TCP only - UDP tests may fail)");
    }
}
