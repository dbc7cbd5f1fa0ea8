//! Measurement results produced by one diagnostic pass

use crate::error::ProbeError;
use crate::types::{BufferbloatGrade, JitterStatus, PassId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Why a sub-test produced no data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason}")]
pub struct SubTestFailure {
    pub reason: String,
}

impl SubTestFailure {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<ProbeError> for SubTestFailure {
    fn from(error: ProbeError) -> Self {
        Self::new(error.to_string())
    }
}

/// Outcome of one sub-test within a pass
pub type SubTestOutcome<T> = std::result::Result<T, SubTestFailure>;

/// Latency under load compared with an unloaded baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferbloatResult {
    pub baseline_avg_ms: f64,
    pub baseline_sd_ms: f64,
    pub baseline_samples: usize,
    /// Mean RTT while the uplink was saturated; `None` when no replies arrived
    pub upload_avg_ms: Option<f64>,
    pub upload_samples: usize,
    /// Mean RTT while the downlink was saturated; `None` when no replies arrived
    pub download_avg_ms: Option<f64>,
    pub download_samples: usize,
    pub worst_increase_ms: f64,
    pub grade: BufferbloatGrade,
    /// Saturating transfers that reported failure; their windows may show no load
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfer_errors: Vec<String>,
}

impl BufferbloatResult {
    pub fn upload_increase_ms(&self) -> Option<f64> {
        self.upload_avg_ms.map(|up| up - self.baseline_avg_ms)
    }

    pub fn download_increase_ms(&self) -> Option<f64> {
        self.download_avg_ms.map(|down| down - self.baseline_avg_ms)
    }
}

/// Raw UDP throughput summary as reported by the generator.
///
/// Any field may be missing from the generator's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UdpStats {
    pub jitter_ms: Option<f64>,
    pub lost: Option<u64>,
    pub total: Option<u64>,
}

impl UdpStats {
    pub fn complete(jitter_ms: f64, lost: u64, total: u64) -> Self {
        Self {
            jitter_ms: Some(jitter_ms),
            lost: Some(lost),
            total: Some(total),
        }
    }
}

/// Graded jitter and packet loss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitterResult {
    pub jitter_ms: f64,
    pub lost: u64,
    pub total: u64,
    pub status: JitterStatus,
}

impl JitterResult {
    /// Loss percentage; `None` when no packets were sent
    pub fn loss_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.lost as f64 / self.total as f64 * 100.0)
        }
    }
}

/// One hop of a traced route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopRecord {
    /// 1-based hop index
    pub hop: u32,
    pub host: String,
    /// Packet loss percentage in [0, 100]
    pub loss_pct: f64,
    pub sent: u32,
    pub last_ms: f64,
    pub avg_ms: f64,
    pub best_ms: f64,
    pub worst_ms: f64,
    pub stdev_ms: f64,
}

/// Lookup latency for one resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverTiming {
    pub resolver: String,
    pub latency_ms: SubTestOutcome<f64>,
}

/// DNS lookup timings in configured resolver order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsTimings {
    pub domain: String,
    pub entries: Vec<ResolverTiming>,
}

impl DnsTimings {
    /// Successful (resolver, latency) pairs
    pub fn measured(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.latency_ms.as_ref().ok().map(|ms| (entry.resolver.as_str(), *ms)))
    }
}

/// Public address compared with the address the home router believes it has
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatStatus {
    pub public_ip: IpAddr,
    pub router_ip: Option<IpAddr>,
    /// Why the router address is unknown, when it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_note: Option<String>,
    /// `Some` only when both addresses are known
    pub cgnat: Option<bool>,
}

impl NatStatus {
    pub fn new(public_ip: IpAddr, router: Result<IpAddr, String>) -> Self {
        match router {
            Ok(router_ip) => Self {
                public_ip,
                router_ip: Some(router_ip),
                router_note: None,
                cgnat: Some(router_ip != public_ip),
            },
            Err(note) => Self {
                public_ip,
                router_ip: None,
                router_note: Some(note),
                cgnat: None,
            },
        }
    }
}

/// Everything one diagnostic pass measured. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassResult {
    pub pass_id: PassId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub bufferbloat: SubTestOutcome<BufferbloatResult>,
    pub jitter: SubTestOutcome<JitterResult>,
    pub route: SubTestOutcome<Vec<HopRecord>>,
    pub mtu: SubTestOutcome<u32>,
    pub dns: DnsTimings,
    pub nat: SubTestOutcome<NatStatus>,
}

/// A pass that produced no result at all
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("run {pass_id} failed: {reason}")]
pub struct PassFailure {
    pub pass_id: PassId,
    pub reason: String,
}

impl PassFailure {
    pub fn new<S: Into<String>>(pass_id: PassId, reason: S) -> Self {
        Self { pass_id, reason: reason.into() }
    }
}

impl From<PassFailure> for crate::error::AppError {
    fn from(failure: PassFailure) -> Self {
        crate::error::AppError::pass_failure(failure.pass_id, failure.reason)
    }
}

/// Outcome of one scheduled pass
pub type PassOutcome = std::result::Result<PassResult, PassFailure>;

/// Identity of a pass outcome, whether it succeeded or not
pub fn outcome_id(outcome: &PassOutcome) -> PassId {
    match outcome {
        Ok(pass) => pass.pass_id,
        Err(failure) => failure.pass_id,
    }
}
