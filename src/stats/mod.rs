//! Aggregation of repeated passes into a statistical report

pub mod accumulator;

#[cfg(test)]
mod comprehensive_tests;

pub use accumulator::RollingStats;

use crate::{
    grading,
    models::{PassFailure, PassOutcome, PassResult},
    types::{BufferbloatGrade, HopFlags},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Min / max / mean over the passes that produced a metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Lookup latency across passes for one resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverSummary {
    pub resolver: String,
    /// `None` when every lookup failed
    pub latency: Option<MetricSummary>,
    pub failures: usize,
}

/// One hop index across passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopSummary {
    pub max_loss_pct: f64,
    /// `None` when no pass reported a usable RTT for this hop
    pub mean_avg_ms: Option<f64>,
    pub max_stdev_ms: f64,
    /// Number of passes whose route reached this hop
    pub appearances: usize,
    pub flags: HopFlags,
}

/// Read-only view over a set of pass outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_runs: usize,
    pub successful_runs: usize,
    /// Failed passes in pass order
    pub failed: Vec<PassFailure>,
    pub baseline: Option<MetricSummary>,
    pub upload_impact: Option<MetricSummary>,
    pub download_impact: Option<MetricSummary>,
    pub jitter: Option<MetricSummary>,
    /// Lost / total packets as a percentage
    pub loss_rate: Option<MetricSummary>,
    pub mtu: Option<MetricSummary>,
    /// Resolvers in first-seen order
    pub dns: Vec<ResolverSummary>,
    pub hops: BTreeMap<u32, HopSummary>,
    pub grades: BTreeMap<BufferbloatGrade, usize>,
    pub generated_at: DateTime<Utc>,
}

impl AggregateReport {
    /// No pass produced a result
    pub fn is_empty(&self) -> bool {
        self.successful_runs == 0
    }

    /// Hops carrying at least one flag
    pub fn flagged_hops(&self) -> impl Iterator<Item = (&u32, &HopSummary)> {
        self.hops.iter().filter(|(_, hop)| hop.flags.any())
    }
}

#[derive(Default)]
struct HopAccumulator {
    max_loss: f64,
    avg: RollingStats,
    max_stdev: f64,
    appearances: usize,
}

/// Folds pass outcomes into an [`AggregateReport`]
#[derive(Default)]
pub struct Aggregator {
    total_runs: usize,
    successful_runs: usize,
    failed: Vec<PassFailure>,
    baseline: RollingStats,
    upload_impact: RollingStats,
    download_impact: RollingStats,
    jitter: RollingStats,
    loss_rate: RollingStats,
    mtu: RollingStats,
    dns: Vec<(String, RollingStats, usize)>,
    hops: BTreeMap<u32, HopAccumulator>,
    grades: BTreeMap<BufferbloatGrade, usize>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate a slice of outcomes in one go
    pub fn aggregate(outcomes: &[PassOutcome]) -> AggregateReport {
        let mut aggregator = Self::new();
        aggregator.add_outcomes(outcomes);
        aggregator.report()
    }

    pub fn add_outcomes(&mut self, outcomes: &[PassOutcome]) {
        for outcome in outcomes {
            self.add_outcome(outcome);
        }
    }

    pub fn add_outcome(&mut self, outcome: &PassOutcome) {
        self.total_runs += 1;
        match outcome {
            Ok(pass) => {
                self.successful_runs += 1;
                self.add_pass(pass);
            }
            Err(failure) => self.failed.push(failure.clone()),
        }
    }

    fn add_pass(&mut self, pass: &PassResult) {
        if let Ok(bb) = &pass.bufferbloat {
            self.baseline.add_value(bb.baseline_avg_ms);
            if let Some(increase) = bb.upload_increase_ms() {
                self.upload_impact.add_value(increase);
            }
            if let Some(increase) = bb.download_increase_ms() {
                self.download_impact.add_value(increase);
            }
            *self.grades.entry(bb.grade).or_insert(0) += 1;
        }

        if let Ok(jitter) = &pass.jitter {
            self.jitter.add_value(jitter.jitter_ms);
            if let Some(rate) = jitter.loss_rate() {
                self.loss_rate.add_value(rate);
            }
        }

        if let Ok(mtu) = &pass.mtu {
            self.mtu.add_value(f64::from(*mtu));
        }

        for entry in &pass.dns.entries {
            let index = match self.dns.iter().position(|(resolver, _, _)| *resolver == entry.resolver) {
                Some(index) => index,
                None => {
                    self.dns.push((entry.resolver.clone(), RollingStats::new(), 0));
                    self.dns.len() - 1
                }
            };
            let (_, stats, failures) = &mut self.dns[index];
            match &entry.latency_ms {
                Ok(ms) => stats.add_value(*ms),
                Err(_) => *failures += 1,
            }
        }

        if let Ok(hops) = &pass.route {
            for hop in hops {
                let acc = self.hops.entry(hop.hop).or_default();
                acc.max_loss = acc.max_loss.max(hop.loss_pct);
                acc.avg.add_value(hop.avg_ms);
                acc.max_stdev = acc.max_stdev.max(hop.stdev_ms);
                acc.appearances += 1;
            }
        }
    }

    pub fn report(&self) -> AggregateReport {
        let hops = self
            .hops
            .iter()
            .map(|(&index, acc)| {
                let summary = HopSummary {
                    max_loss_pct: acc.max_loss,
                    mean_avg_ms: acc.avg.average(),
                    max_stdev_ms: acc.max_stdev,
                    appearances: acc.appearances,
                    flags: grading::flag_aggregate_hop(acc.max_loss, acc.max_stdev),
                };
                (index, summary)
            })
            .collect();

        let mut failed = self.failed.clone();
        failed.sort_by_key(|failure| failure.pass_id);

        AggregateReport {
            total_runs: self.total_runs,
            successful_runs: self.successful_runs,
            failed,
            baseline: self.baseline.summary(),
            upload_impact: self.upload_impact.summary(),
            download_impact: self.download_impact.summary(),
            jitter: self.jitter.summary(),
            loss_rate: self.loss_rate.summary(),
            mtu: self.mtu.summary(),
            dns: self
                .dns
                .iter()
                .map(|(resolver, stats, failures)| ResolverSummary {
                    resolver: resolver.clone(),
                    latency: stats.summary(),
                    failures: *failures,
                })
                .collect(),
            hops,
            grades: self.grades.clone(),
            generated_at: Utc::now(),
        }
    }
}
