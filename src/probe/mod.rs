//! External measurement probes
//!
//! Every measurement the engine takes goes through [`ProbeAdapter`]: one
//! bounded call that returns a typed value or a [`ProbeError`]. The
//! production implementation, [`SystemProbes`], drives `ping`, `iperf3` and
//! `mtr` subprocesses, a DNS resolver, an HTTP client and a UPnP gateway.

pub mod parsers;
pub mod system;
pub mod upnp;

pub use system::{check_dependencies, SystemProbes, REQUIRED_TOOLS};

use crate::{
    error::ProbeResult,
    models::{HopRecord, UdpStats},
    types::Direction,
};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Bounded external probes used by the selector and the diagnostic passes
#[async_trait]
pub trait ProbeAdapter: Send + Sync {
    /// Open a TCP connection to `host:port`
    async fn connectivity_probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeResult<()>;

    /// Run a short UDP throughput test and require a complete summary
    async fn capability_probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeResult<()>;

    /// One echo round trip in milliseconds
    async fn latency_probe(&self, host: &str, timeout: Duration) -> ProbeResult<f64>;

    /// Saturate the link in one direction for `duration`
    async fn saturating_transfer(
        &self,
        host: &str,
        port: u16,
        direction: Direction,
        duration: Duration,
    ) -> ProbeResult<()>;

    /// UDP throughput test at `bandwidth` (iperf3 notation, e.g. `100M`)
    async fn udp_throughput_probe(
        &self,
        host: &str,
        port: u16,
        bandwidth: &str,
        duration: Duration,
    ) -> ProbeResult<UdpStats>;

    /// Trace the route to `host`, sending `count` packets per hop
    async fn route_trace(&self, host: &str, count: u32) -> ProbeResult<Vec<HopRecord>>;

    /// Whether an echo with `payload` bytes and don't-fragment set gets through
    async fn mtu_probe(&self, host: &str, payload: u32) -> ProbeResult<bool>;

    /// Time an A-record lookup of `domain` against `resolver`, in milliseconds
    async fn resolve_timed(&self, domain: &str, resolver: IpAddr, timeout: Duration) -> ProbeResult<f64>;

    /// Public address as seen from the Internet
    async fn public_ip(&self) -> ProbeResult<IpAddr>;

    /// External address reported by the local Internet gateway
    async fn router_external_ip(&self) -> ProbeResult<IpAddr>;
}

/// Apply a time bound to a probe future
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> ProbeResult<T>
where
    F: std::future::Future<Output = ProbeResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(crate::error::ProbeError::timeout(limit)),
    }
}
