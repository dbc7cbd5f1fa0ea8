//! Grading of raw measurements into verdicts
//!
//! Pure functions only; nothing here touches the network except through the
//! probe closure handed to [`discover_mtu`].

use crate::{
    error::{ProbeError, ProbeResult},
    models::{BufferbloatResult, HopRecord, JitterResult, PassResult, SubTestFailure, SubTestOutcome, UdpStats},
    types::{BufferbloatGrade, HopFlags, JitterStatus},
};
use std::future::Future;

/// Worst latency increase below which bufferbloat is graded A
pub const GRADE_A_BELOW_MS: f64 = 30.0;
/// Worst latency increase below which bufferbloat is graded B
pub const GRADE_B_BELOW_MS: f64 = 100.0;
/// Jitter below which (with zero loss) the UDP test is OK
pub const JITTER_OK_BELOW_MS: f64 = 20.0;
/// Per-hop stdev flagged as HIGH-JITTER within a single run
pub const HOP_JITTER_LIVE_MS: f64 = 20.0;
/// Per-hop max stdev flagged as JITTER across aggregated runs
pub const HOP_JITTER_AGGREGATE_MS: f64 = 10.0;
/// Worst minus best RTT flagged as LATENCY-VAR
pub const HOP_LATENCY_VARIANCE_MS: f64 = 100.0;
/// Largest ICMP payload tried by the MTU search
pub const MTU_MAX_PAYLOAD: u32 = 1472;
/// IPv4 + ICMP header bytes added to the payload
pub const IP_ICMP_OVERHEAD: u32 = 28;
/// Path MTU below which the link is reported as a problem
pub const LOW_MTU_BELOW: u32 = 1400;
/// DNS lookup latency above which a resolver is reported as slow
pub const SLOW_DNS_ABOVE_MS: f64 = 200.0;

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Sample standard deviation; zero for fewer than two samples
pub fn sample_stdev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let avg = samples.iter().sum::<f64>() / samples.len() as f64;
    let variance = samples.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    variance.sqrt()
}

/// Letter grade for the worst latency increase under load
pub fn grade_increase(worst_increase_ms: f64) -> BufferbloatGrade {
    if worst_increase_ms < GRADE_A_BELOW_MS {
        BufferbloatGrade::A
    } else if worst_increase_ms < GRADE_B_BELOW_MS {
        BufferbloatGrade::B
    } else {
        BufferbloatGrade::C
    }
}

/// Grade latency samples taken idle, during upload and during download.
///
/// A loaded window without replies counts as no increase. Without baseline
/// replies there is nothing to compare against and no grade is given.
pub fn grade_bufferbloat(baseline: &[f64], upload: &[f64], download: &[f64]) -> SubTestOutcome<BufferbloatResult> {
    let baseline_avg = mean(baseline)
        .ok_or_else(|| SubTestFailure::new("no replies during baseline ping"))?;

    let upload_avg = mean(upload);
    let download_avg = mean(download);

    let increase_up = upload_avg.unwrap_or(baseline_avg) - baseline_avg;
    let increase_down = download_avg.unwrap_or(baseline_avg) - baseline_avg;
    let worst = increase_up.max(increase_down);

    Ok(BufferbloatResult {
        baseline_avg_ms: baseline_avg,
        baseline_sd_ms: sample_stdev(baseline),
        baseline_samples: baseline.len(),
        upload_avg_ms: upload_avg,
        upload_samples: upload.len(),
        download_avg_ms: download_avg,
        download_samples: download.len(),
        worst_increase_ms: worst,
        grade: grade_increase(worst),
        transfer_errors: Vec::new(),
    })
}

/// OK only when jitter is low and nothing was lost; incomplete summaries get no verdict
pub fn grade_jitter(stats: &UdpStats) -> SubTestOutcome<JitterResult> {
    let (Some(jitter_ms), Some(lost), Some(total)) = (stats.jitter_ms, stats.lost, stats.total) else {
        return Err(SubTestFailure::new("no result: incomplete UDP summary from server"));
    };

    let status = if jitter_ms < JITTER_OK_BELOW_MS && lost == 0 {
        JitterStatus::Ok
    } else {
        JitterStatus::Warn
    };

    Ok(JitterResult { jitter_ms, lost, total, status })
}

/// Flags for one hop of a single run
pub fn flag_hop(hop: &HopRecord) -> HopFlags {
    HopFlags {
        loss: hop.loss_pct > 0.0,
        high_jitter: hop.stdev_ms > HOP_JITTER_LIVE_MS,
        latency_variance: hop.worst_ms - hop.best_ms > HOP_LATENCY_VARIANCE_MS,
    }
}

/// Flags for one hop index aggregated across runs
pub fn flag_aggregate_hop(max_loss_pct: f64, max_stdev_ms: f64) -> HopFlags {
    HopFlags {
        loss: max_loss_pct > 0.0,
        high_jitter: max_stdev_ms > HOP_JITTER_AGGREGATE_MS,
        latency_variance: false,
    }
}

/// One line per flag raised on the route
pub fn hop_problems(hops: &[HopRecord]) -> Vec<String> {
    let mut problems = Vec::new();
    for hop in hops {
        let flags = flag_hop(hop);
        if flags.loss {
            problems.push(format!("Hop {}: {:.1}% packet loss", hop.hop, hop.loss_pct));
        }
        if flags.high_jitter {
            problems.push(format!("Hop {}: {:.1}ms jitter", hop.hop, hop.stdev_ms));
        }
        if flags.latency_variance {
            problems.push(format!("Hop {}: {:.1}ms latency variation", hop.hop, hop.worst_ms - hop.best_ms));
        }
    }
    problems
}

/// Binary search for the largest payload that crosses the path unfragmented.
///
/// Returns the path MTU (payload plus IP/ICMP overhead), or `None` when not
/// even an empty payload got through. A probe reporting the tool as
/// unavailable aborts the search; any other probe error counts as "too big".
/// Assumes success is monotonic in payload size.
pub async fn discover_mtu<F, Fut>(mut probe: F) -> ProbeResult<Option<u32>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ProbeResult<bool>>,
{
    let mut low: i64 = 0;
    let mut high: i64 = i64::from(MTU_MAX_PAYLOAD);
    let mut found = None;

    while low <= high {
        let mid = (low + high) / 2;
        let payload = mid as u32;

        let fits = match probe(payload).await {
            Ok(fits) => fits,
            Err(ProbeError::Unavailable(reason)) => return Err(ProbeError::Unavailable(reason)),
            Err(_) => false,
        };

        if fits {
            found = Some(payload + IP_ICMP_OVERHEAD);
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    Ok(found)
}

/// Verdict for a single run, as shown in the final summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassVerdict {
    /// Thresholds exceeded
    pub problems: Vec<String>,
    /// Noteworthy but not a failure (CG-NAT)
    pub notes: Vec<String>,
    /// Sub-tests that produced no data, with their reason
    pub unmeasured: Vec<String>,
}

impl PassVerdict {
    /// Every sub-test was measured and none exceeded a threshold
    pub fn all_clear(&self) -> bool {
        self.problems.is_empty() && self.unmeasured.is_empty()
    }
}

/// Collect problems, notes and unmeasured sub-tests for one run
pub fn judge_pass(pass: &PassResult) -> PassVerdict {
    let mut verdict = PassVerdict::default();

    match &pass.bufferbloat {
        Ok(bb) if bb.grade.is_problem() => {
            verdict.problems.push(format!("Bufferbloat grade {} (worst +{:.1} ms)", bb.grade, bb.worst_increase_ms));
        }
        Ok(_) => {}
        Err(e) => verdict.unmeasured.push(format!("bufferbloat: {}", e)),
    }

    match &pass.jitter {
        Ok(j) if j.status == JitterStatus::Warn => {
            verdict.problems.push(format!("Jitter test WARN ({:.1} ms, {}/{} lost)", j.jitter_ms, j.lost, j.total));
        }
        Ok(_) => {}
        Err(e) => verdict.unmeasured.push(format!("jitter: {}", e)),
    }

    match &pass.route {
        Ok(hops) => {
            if let Some(hop) = hops.iter().find(|h| h.loss_pct > 0.0) {
                verdict.problems.push(format!("Route hop {} has {:.1}% loss", hop.hop, hop.loss_pct));
            }
        }
        Err(e) => verdict.unmeasured.push(format!("route: {}", e)),
    }

    match &pass.mtu {
        Ok(mtu) if *mtu < LOW_MTU_BELOW => {
            verdict.problems.push(format!("Path MTU very low ({} bytes)", mtu));
        }
        Ok(_) => {}
        Err(e) => verdict.unmeasured.push(format!("mtu: {}", e)),
    }

    for entry in &pass.dns.entries {
        match &entry.latency_ms {
            Ok(ms) if *ms > SLOW_DNS_ABOVE_MS => {
                verdict.problems.push(format!("DNS {} lookup slow ({:.1} ms)", entry.resolver, ms));
            }
            Ok(_) => {}
            Err(e) => verdict.problems.push(format!("DNS {} lookup failing ({})", entry.resolver, e)),
        }
    }

    match &pass.nat {
        Ok(nat) if nat.cgnat == Some(true) => {
            verdict.notes.push("Carrier-Grade NAT detected, inbound connections may break".to_string());
        }
        Ok(_) => {}
        Err(e) => verdict.unmeasured.push(format!("cgnat: {}", e)),
    }

    verdict
}
