//! One diagnostic pass against a selected endpoint

use crate::{
    defaults,
    error::{ProbeError, Result},
    grading,
    logging::{ErrorEventLogger, ProbeLogger},
    models::{
        BufferbloatResult, Config, DnsTimings, HopRecord, JitterResult, NatStatus, PassResult, ResolverTiming,
        SubTestFailure, SubTestOutcome,
    },
    probe::ProbeAdapter,
    selector::Selection,
    types::{Direction, PassId},
};
use async_trait::async_trait;
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Anything able to produce a pass result for a given identity
#[async_trait]
pub trait PassExecutor: Send + Sync {
    async fn run_pass(&self, pass_id: PassId) -> PassResult;
}

/// Per-pass measurement settings derived from the configuration
#[derive(Debug, Clone)]
pub struct PassSettings {
    pub ping_host: String,
    pub trace_host: String,
    pub mtu_host: String,
    pub mtr_count: u32,
    pub load_duration: Duration,
    pub ping_interval: Duration,
    pub udp_bandwidth: String,
    pub dns_domain: String,
    pub resolvers: Vec<IpAddr>,
}

impl PassSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            ping_host: config.ping_host.clone(),
            trace_host: config.trace_host.clone(),
            mtu_host: config.mtu_host.clone(),
            mtr_count: config.mtr_count,
            load_duration: config.load_duration(),
            ping_interval: defaults::PING_INTERVAL,
            udp_bandwidth: defaults::UDP_BANDWIDTH.to_string(),
            dns_domain: config.dns_domain.clone(),
            resolvers: config.resolver_ips()?,
        })
    }
}

/// Runs the sub-tests of a pass in order:
/// bufferbloat, jitter, route, MTU, DNS, NAT.
pub struct PassRunner {
    probes: Arc<dyn ProbeAdapter>,
    target: Selection,
    settings: PassSettings,
    probe_log: ProbeLogger,
    error_log: ErrorEventLogger,
}

impl PassRunner {
    pub fn new(probes: Arc<dyn ProbeAdapter>, target: Selection, settings: PassSettings, config: &Config) -> Self {
        Self {
            probes,
            target,
            settings,
            probe_log: ProbeLogger::new(config),
            error_log: ErrorEventLogger::new(config),
        }
    }

    pub fn target(&self) -> &Selection {
        &self.target
    }

    pub fn settings(&self) -> &PassSettings {
        &self.settings
    }

    /// Latency while idle, then while saturating the uplink, then the downlink
    pub async fn bufferbloat(&self) -> SubTestOutcome<BufferbloatResult> {
        let baseline = sample_latency(
            Arc::clone(&self.probes),
            self.settings.ping_host.clone(),
            self.settings.load_duration,
            self.settings.ping_interval,
        )
        .await;

        if baseline.is_empty() {
            return Err(SubTestFailure::new("no replies during baseline ping"));
        }

        let mut transfer_errors = Vec::new();
        let upload = self.loaded_window(Direction::Upload, &mut transfer_errors).await;
        let download = self.loaded_window(Direction::Download, &mut transfer_errors).await;

        let mut result = grading::grade_bufferbloat(&baseline, &upload, &download)?;
        result.transfer_errors = transfer_errors;
        Ok(result)
    }

    /// Sample latency in a spawned task while a transfer saturates one direction
    async fn loaded_window(&self, direction: Direction, transfer_errors: &mut Vec<String>) -> Vec<f64> {
        let sampler = tokio::spawn(sample_latency(
            Arc::clone(&self.probes),
            self.settings.ping_host.clone(),
            self.settings.load_duration,
            self.settings.ping_interval,
        ));

        let started = Instant::now();
        let transfer = self
            .probes
            .saturating_transfer(&self.target.host, self.target.port, direction, self.settings.load_duration)
            .await;
        self.probe_log
            .log_probe(&format!("{} transfer", direction), &self.target_label(), &transfer, elapsed_ms(started))
            .await;
        if let Err(e) = transfer {
            transfer_errors.push(format!("{}: {}", direction, e));
        }

        match sampler.await {
            Ok(samples) => samples,
            Err(e) => {
                transfer_errors.push(format!("{} sampler: {}", direction, e));
                Vec::new()
            }
        }
    }

    pub async fn jitter(&self) -> SubTestOutcome<JitterResult> {
        let started = Instant::now();
        let stats = self
            .probes
            .udp_throughput_probe(
                &self.target.host,
                self.target.port,
                &self.settings.udp_bandwidth,
                self.settings.load_duration,
            )
            .await;
        self.probe_log.log_probe("udp", &self.target_label(), &stats, elapsed_ms(started)).await;

        grading::grade_jitter(&stats?)
    }

    pub async fn route(&self) -> SubTestOutcome<Vec<HopRecord>> {
        let started = Instant::now();
        let hops = self.probes.route_trace(&self.settings.trace_host, self.settings.mtr_count).await;
        self.probe_log.log_probe("route", &self.settings.trace_host, &hops, elapsed_ms(started)).await;
        Ok(hops?)
    }

    pub async fn mtu(&self) -> SubTestOutcome<u32> {
        let host = self.settings.mtu_host.as_str();
        let started = Instant::now();
        let mtu = grading::discover_mtu(|payload| self.probes.mtu_probe(host, payload)).await;
        self.probe_log.log_probe("mtu", host, &mtu, elapsed_ms(started)).await;

        mtu?.ok_or_else(|| SubTestFailure::new("could not determine path MTU"))
    }

    /// Resolver timings in configured order
    pub async fn dns(&self) -> DnsTimings {
        let domain = &self.settings.dns_domain;
        let mut entries = Vec::with_capacity(self.settings.resolvers.len());

        for &resolver in &self.settings.resolvers {
            let outcome = self.probes.resolve_timed(domain, resolver, defaults::DNS_TIMEOUT).await;
            let elapsed = outcome.as_ref().copied().unwrap_or(0.0);
            self.probe_log
                .log_dns_resolution(domain, &resolver.to_string(), outcome.is_ok(), elapsed)
                .await;

            entries.push(ResolverTiming {
                resolver: resolver.to_string(),
                latency_ms: outcome.map_err(SubTestFailure::from),
            });
        }

        DnsTimings { domain: domain.clone(), entries }
    }

    pub async fn nat(&self) -> SubTestOutcome<NatStatus> {
        let started = Instant::now();
        let public = self.probes.public_ip().await;
        self.probe_log.log_probe("public-ip", "lookup service", &public, elapsed_ms(started)).await;
        let public_ip = public?;

        let started = Instant::now();
        let router = self.probes.router_external_ip().await;
        self.probe_log.log_probe("upnp", "gateway", &router, elapsed_ms(started)).await;

        Ok(NatStatus::new(public_ip, router.map_err(|e: ProbeError| e.to_string())))
    }

    fn target_label(&self) -> String {
        format!("{}:{}", self.target.host, self.target.port)
    }

    async fn note_failure<T>(&self, pass_id: PassId, subtest: &str, outcome: &SubTestOutcome<T>) {
        if let Err(failure) = outcome {
            self.error_log.log_subtest_failure(pass_id, subtest, &failure.reason).await;
        }
    }
}

#[async_trait]
impl PassExecutor for PassRunner {
    async fn run_pass(&self, pass_id: PassId) -> PassResult {
        let started_at = Utc::now();

        let bufferbloat = self.bufferbloat().await;
        self.note_failure(pass_id, "bufferbloat", &bufferbloat).await;

        let jitter = self.jitter().await;
        self.note_failure(pass_id, "jitter", &jitter).await;

        let route = self.route().await;
        self.note_failure(pass_id, "route", &route).await;

        let mtu = self.mtu().await;
        self.note_failure(pass_id, "mtu", &mtu).await;

        let dns = self.dns().await;

        let nat = self.nat().await;
        self.note_failure(pass_id, "cgnat", &nat).await;

        PassResult {
            pass_id,
            started_at,
            finished_at: Utc::now(),
            bufferbloat,
            jitter,
            route,
            mtu,
            dns,
            nat,
        }
    }
}

/// Ping `host` every `interval` until `window` has elapsed; failed echoes are dropped
pub async fn sample_latency(
    probes: Arc<dyn ProbeAdapter>,
    host: String,
    window: Duration,
    interval: Duration,
) -> Vec<f64> {
    let deadline = tokio::time::Instant::now() + window;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut samples = Vec::new();

    loop {
        ticker.tick().await;
        let now = tokio::time::Instant::now();
        if now >= deadline {
            break;
        }

        let limit = defaults::PING_TIMEOUT.min(deadline - now);
        if let Ok(rtt) = probes.latency_probe(&host, limit).await {
            samples.push(rtt);
        }
    }

    samples
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeResult;
    use crate::models::UdpStats;
    use crate::types::{BufferbloatGrade, JitterStatus, SelectionTier};
    use std::sync::Mutex;

    /// Latency rises while a transfer is running
    struct LabProbes {
        loaded: Mutex<bool>,
        fail_transfers: bool,
        udp: ProbeResult<UdpStats>,
        mtu_payload_limit: Option<u32>,
    }

    impl Default for LabProbes {
        fn default() -> Self {
            Self {
                loaded: Mutex::new(false),
                fail_transfers: false,
                udp: Ok(UdpStats::complete(3.0, 0, 1000)),
                mtu_payload_limit: Some(1472),
            }
        }
    }

    #[async_trait]
    impl ProbeAdapter for LabProbes {
        async fn connectivity_probe(&self, _: &str, _: u16, _: Duration) -> ProbeResult<()> {
            Ok(())
        }

        async fn capability_probe(&self, _: &str, _: u16, _: Duration) -> ProbeResult<()> {
            Ok(())
        }

        async fn latency_probe(&self, _host: &str, _timeout: Duration) -> ProbeResult<f64> {
            if *self.loaded.lock().unwrap() {
                Ok(60.0)
            } else {
                Ok(20.0)
            }
        }

        async fn saturating_transfer(&self, _: &str, _: u16, direction: Direction, duration: Duration) -> ProbeResult<()> {
            if self.fail_transfers {
                return Err(ProbeError::failed(format!("{} refused", direction)));
            }
            *self.loaded.lock().unwrap() = true;
            tokio::time::sleep(duration).await;
            *self.loaded.lock().unwrap() = false;
            Ok(())
        }

        async fn udp_throughput_probe(&self, _: &str, _: u16, _: &str, _: Duration) -> ProbeResult<UdpStats> {
            self.udp.clone()
        }

        async fn route_trace(&self, host: &str, _count: u32) -> ProbeResult<Vec<HopRecord>> {
            Ok(vec![HopRecord {
                hop: 1,
                host: host.to_string(),
                loss_pct: 0.0,
                sent: 10,
                last_ms: 1.0,
                avg_ms: 1.0,
                best_ms: 1.0,
                worst_ms: 1.0,
                stdev_ms: 0.0,
            }])
        }

        async fn mtu_probe(&self, _host: &str, payload: u32) -> ProbeResult<bool> {
            match self.mtu_payload_limit {
                Some(limit) => Ok(payload <= limit),
                None => Err(ProbeError::unavailable("unsupported OS")),
            }
        }

        async fn resolve_timed(&self, _: &str, resolver: IpAddr, _: Duration) -> ProbeResult<f64> {
            if resolver.to_string() == "8.8.8.8" {
                Err(ProbeError::timeout(Duration::from_secs(1)))
            } else {
                Ok(12.0)
            }
        }

        async fn public_ip(&self) -> ProbeResult<IpAddr> {
            Ok("203.0.113.7".parse().unwrap())
        }

        async fn router_external_ip(&self) -> ProbeResult<IpAddr> {
            Err(ProbeError::unavailable("no UPnP devices found"))
        }
    }

    fn settings() -> PassSettings {
        PassSettings {
            ping_host: "8.8.8.8".to_string(),
            trace_host: "8.8.8.8".to_string(),
            mtu_host: "8.8.8.8".to_string(),
            mtr_count: 10,
            load_duration: Duration::from_millis(200),
            ping_interval: Duration::from_millis(10),
            udp_bandwidth: "1M".to_string(),
            dns_domain: "example.com".to_string(),
            resolvers: vec!["1.1.1.1".parse().unwrap(), "8.8.8.8".parse().unwrap()],
        }
    }

    fn runner(probes: LabProbes) -> PassRunner {
        let target = Selection { host: "iperf.example".into(), port: 5201, tier: SelectionTier::Full };
        PassRunner::new(Arc::new(probes), target, settings(), &Config::default())
    }

    #[tokio::test]
    async fn test_sampler_overlaps_transfer() {
        let result = runner(LabProbes::default()).bufferbloat().await.unwrap();

        assert_eq!(result.baseline_avg_ms, 20.0);
        assert!(result.upload_samples > 0 && result.download_samples > 0);
        // Most loaded samples must land while the transfer is running
        assert!(result.upload_avg_ms.unwrap() > 40.0, "{:?}", result);
        assert!(result.worst_increase_ms > 20.0);
        assert!(result.transfer_errors.is_empty());
    }

    #[tokio::test]
    async fn test_failed_transfers_are_recorded() {
        let probes = LabProbes { fail_transfers: true, ..Default::default() };
        let result = runner(probes).bufferbloat().await.unwrap();

        assert_eq!(result.grade, BufferbloatGrade::A);
        assert_eq!(result.transfer_errors.len(), 2);
        assert!(result.transfer_errors[0].starts_with("upload"));
    }

    #[tokio::test]
    async fn test_full_pass_keeps_going_after_failures() {
        let probes = LabProbes {
            udp: Ok(UdpStats { jitter_ms: Some(1.0), lost: None, total: None }),
            mtu_payload_limit: None,
            ..Default::default()
        };
        let pass = runner(probes).run_pass(4).await;

        assert_eq!(pass.pass_id, 4);
        assert!(pass.bufferbloat.is_ok());
        assert!(pass.jitter.unwrap_err().reason.starts_with("no result"));
        assert_eq!(pass.route.unwrap().len(), 1);
        assert_eq!(pass.mtu.unwrap_err().reason, "unavailable: unsupported OS");
        assert!(pass.finished_at >= pass.started_at);
    }

    #[tokio::test]
    async fn test_dns_keeps_resolver_order_and_failures() {
        let dns = runner(LabProbes::default()).dns().await;
        assert_eq!(dns.domain, "example.com");
        assert_eq!(dns.entries[0].resolver, "1.1.1.1");
        assert_eq!(dns.entries[0].latency_ms, Ok(12.0));
        assert_eq!(dns.entries[1].resolver, "8.8.8.8");
        assert!(dns.entries[1].latency_ms.is_err());
    }

    #[tokio::test]
    async fn test_nat_without_gateway() {
        let nat = runner(LabProbes::default()).nat().await.unwrap();
        assert_eq!(nat.cgnat, None);
        assert_eq!(nat.router_note.as_deref(), Some("unavailable: no UPnP devices found"));
    }

    #[tokio::test]
    async fn test_jitter_and_mtu() {
        let runner = runner(LabProbes::default());
        assert_eq!(runner.jitter().await.unwrap().status, JitterStatus::Ok);
        assert_eq!(runner.mtu().await, Ok(1500));
    }

    #[tokio::test]
    async fn test_mtu_minimum_payload() {
        let probes = LabProbes { mtu_payload_limit: Some(0), ..Default::default() };
        assert_eq!(runner(probes).mtu().await, Ok(28));
    }
}
