//! Shared scripted probe adapter for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use link_diagnostics::{
    error::{ProbeError, ProbeResult},
    executor::PassSettings,
    models::{Config, HopRecord, UdpStats},
    probe::ProbeAdapter,
    types::Direction,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const IDLE_RTT_MS: f64 = 20.0;
pub const LOADED_RTT_MS: f64 = 200.0;

/// Probe adapter answering from a fixed script
pub struct ScriptedProbes {
    /// `host:port` pairs that accept TCP
    pub reachable: HashSet<String>,
    /// `host:port` pairs that also pass the UDP capability probe
    pub udp_capable: HashSet<String>,
    pub ping_replies: bool,
    pub udp: ProbeResult<UdpStats>,
    pub hops: ProbeResult<Vec<HopRecord>>,
    /// Largest payload that gets through unfragmented; `None` means the probe is unsupported
    pub mtu_payload_limit: Option<u32>,
    pub failing_resolvers: HashSet<IpAddr>,
    pub public_ip: ProbeResult<IpAddr>,
    pub router_ip: ProbeResult<IpAddr>,
    pub loaded: AtomicBool,
    pub probed: Mutex<Vec<String>>,
    pub transfers: AtomicUsize,
}

impl Default for ScriptedProbes {
    fn default() -> Self {
        Self {
            reachable: HashSet::new(),
            udp_capable: HashSet::new(),
            ping_replies: true,
            udp: Ok(UdpStats::complete(2.5, 0, 8000)),
            hops: Ok(healthy_route()),
            mtu_payload_limit: Some(1472),
            failing_resolvers: HashSet::new(),
            public_ip: Ok("203.0.113.7".parse().unwrap()),
            router_ip: Ok("203.0.113.7".parse().unwrap()),
            loaded: AtomicBool::new(false),
            probed: Mutex::new(Vec::new()),
            transfers: AtomicUsize::new(0),
        }
    }
}

impl ScriptedProbes {
    pub fn reachable(mut self, target: &str) -> Self {
        self.reachable.insert(target.to_string());
        self
    }

    pub fn udp_capable(mut self, target: &str) -> Self {
        self.reachable.insert(target.to_string());
        self.udp_capable.insert(target.to_string());
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProbeAdapter for ScriptedProbes {
    async fn connectivity_probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeResult<()> {
        let target = format!("{}:{}", host, port);
        self.probed.lock().unwrap().push(target.clone());
        if self.reachable.contains(&target) {
            Ok(())
        } else {
            Err(ProbeError::timeout(timeout))
        }
    }

    async fn capability_probe(&self, host: &str, port: u16, _timeout: Duration) -> ProbeResult<()> {
        if self.udp_capable.contains(&format!("{}:{}", host, port)) {
            Ok(())
        } else {
            Err(ProbeError::malformed("iperf3 output has no end.sum section"))
        }
    }

    async fn latency_probe(&self, _host: &str, timeout: Duration) -> ProbeResult<f64> {
        if !self.ping_replies {
            return Err(ProbeError::timeout(timeout));
        }
        if self.loaded.load(Ordering::SeqCst) {
            Ok(LOADED_RTT_MS)
        } else {
            Ok(IDLE_RTT_MS)
        }
    }

    async fn saturating_transfer(&self, _host: &str, _port: u16, _direction: Direction, duration: Duration) -> ProbeResult<()> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        self.loaded.store(true, Ordering::SeqCst);
        tokio::time::sleep(duration).await;
        self.loaded.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn udp_throughput_probe(&self, _: &str, _: u16, _: &str, _: Duration) -> ProbeResult<UdpStats> {
        self.udp.clone()
    }

    async fn route_trace(&self, _host: &str, _count: u32) -> ProbeResult<Vec<HopRecord>> {
        self.hops.clone()
    }

    async fn mtu_probe(&self, _host: &str, payload: u32) -> ProbeResult<bool> {
        match self.mtu_payload_limit {
            Some(limit) => Ok(payload <= limit),
            None => Err(ProbeError::unavailable("ping does not support don't-fragment here")),
        }
    }

    async fn resolve_timed(&self, _domain: &str, resolver: IpAddr, timeout: Duration) -> ProbeResult<f64> {
        if self.failing_resolvers.contains(&resolver) {
            Err(ProbeError::timeout(timeout))
        } else {
            Ok(11.0)
        }
    }

    async fn public_ip(&self) -> ProbeResult<IpAddr> {
        self.public_ip.clone()
    }

    async fn router_external_ip(&self) -> ProbeResult<IpAddr> {
        self.router_ip.clone()
    }
}

pub fn hop(index: u32, loss_pct: f64, stdev_ms: f64) -> HopRecord {
    HopRecord {
        hop: index,
        host: format!("10.0.{}.1", index),
        loss_pct,
        sent: 200,
        last_ms: 5.0 * index as f64,
        avg_ms: 5.0 * index as f64,
        best_ms: 5.0 * index as f64 - 1.0,
        worst_ms: 5.0 * index as f64 + 2.0,
        stdev_ms,
    }
}

pub fn healthy_route() -> Vec<HopRecord> {
    (1..=4).map(|i| hop(i, 0.0, 0.5)).collect()
}

/// Quiet configuration without report file
pub fn test_config() -> Config {
    Config {
        runs: 1,
        output_path: None,
        enable_color: false,
        ..Config::default()
    }
}

/// Settings with short windows so a pass finishes in well under a second
pub fn fast_settings(resolvers: &[&str]) -> PassSettings {
    PassSettings {
        ping_host: "8.8.8.8".to_string(),
        trace_host: "8.8.8.8".to_string(),
        mtu_host: "8.8.8.8".to_string(),
        mtr_count: 10,
        load_duration: Duration::from_millis(200),
        ping_interval: Duration::from_millis(10),
        udp_bandwidth: "100M".to_string(),
        dns_domain: "google.com".to_string(),
        resolvers: resolvers.iter().map(|r| r.parse().unwrap()).collect(),
    }
}
