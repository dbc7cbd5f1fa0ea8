//! Property-based tests for the aggregator

use super::{AggregateReport, Aggregator, MetricSummary};
use crate::{
    grading::{grade_bufferbloat, grade_jitter},
    models::{DnsTimings, HopRecord, PassFailure, PassOutcome, PassResult, ResolverTiming, SubTestFailure, UdpStats},
};
use proptest::collection::vec;
use proptest::prelude::*;

/// Property-based test generators
mod generators {
    use super::*;

    pub fn hop_list() -> impl Strategy<Value = Vec<HopRecord>> {
        vec((0.0f64..=100.0, 0.1f64..300.0, 0.0f64..50.0), 0..12).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (loss, avg, stdev))| HopRecord {
                    hop: i as u32 + 1,
                    host: format!("10.0.{}.1", i),
                    loss_pct: loss,
                    sent: 100,
                    last_ms: avg,
                    avg_ms: avg,
                    best_ms: avg,
                    worst_ms: avg + stdev,
                    stdev_ms: stdev,
                })
                .collect()
        })
    }

    pub fn pass_outcome() -> impl Strategy<Value = PassOutcome> {
        (
            1u32..1000,
            vec(1.0f64..200.0, 0..5),
            vec(1.0f64..500.0, 0..5),
            vec(1.0f64..500.0, 0..5),
            (0.0f64..50.0, 0u64..100, 0u64..5000),
            hop_list(),
            prop::option::of(1.0f64..400.0),
            any::<bool>(),
        )
            .prop_map(|(pass_id, base, up, down, (jitter, lost, total), hops, dns, failed)| {
                if failed {
                    return Err(PassFailure::new(pass_id, "pass panicked: generated"));
                }
                let lost = lost.min(total);
                let now = chrono::Utc::now();
                Ok(PassResult {
                    pass_id,
                    started_at: now,
                    finished_at: now,
                    bufferbloat: grade_bufferbloat(&base, &up, &down),
                    jitter: grade_jitter(&UdpStats::complete(jitter, lost, total)),
                    route: Ok(hops),
                    mtu: Ok(1500),
                    dns: DnsTimings {
                        domain: "google.com".to_string(),
                        entries: vec![ResolverTiming {
                            resolver: "1.1.1.1".to_string(),
                            latency_ms: dns.ok_or_else(|| SubTestFailure::new("timed out after 1.0s")),
                        }],
                    },
                    nat: Err(SubTestFailure::new("unavailable: generated")),
                })
            })
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Same min / max / mean, count scaled by `factor`
fn same_statistics(single: Option<MetricSummary>, repeated: Option<MetricSummary>, factor: usize) -> bool {
    match (single, repeated) {
        (None, None) => true,
        (Some(a), Some(b)) => a.min == b.min && a.max == b.max && close(a.mean, b.mean) && a.count * factor == b.count,
        _ => false,
    }
}

fn scalars(report: &AggregateReport) -> [Option<MetricSummary>; 6] {
    [
        report.baseline,
        report.upload_impact,
        report.download_impact,
        report.jitter,
        report.loss_rate,
        report.mtu,
    ]
}

mod property_tests {
    use super::*;

    proptest! {
        /// Aggregating a list concatenated with itself changes counts only
        #[test]
        fn idempotent_under_self_concatenation(outcomes in vec(generators::pass_outcome(), 0..20)) {
            let single = Aggregator::aggregate(&outcomes);
            let doubled: Vec<PassOutcome> = outcomes.iter().chain(outcomes.iter()).cloned().collect();
            let twice = Aggregator::aggregate(&doubled);

            for (a, b) in scalars(&single).into_iter().zip(scalars(&twice)) {
                prop_assert!(same_statistics(a, b, 2), "{:?} vs {:?}", a, b);
            }

            prop_assert_eq!(single.hops.len(), twice.hops.len());
            for (index, hop) in &single.hops {
                let other = &twice.hops[index];
                prop_assert_eq!(hop.max_loss_pct, other.max_loss_pct);
                prop_assert_eq!(hop.max_stdev_ms, other.max_stdev_ms);
                match (hop.mean_avg_ms, other.mean_avg_ms) {
                    (Some(a), Some(b)) => prop_assert!(close(a, b)),
                    (a, b) => prop_assert_eq!(a, b),
                }
                prop_assert_eq!(hop.appearances * 2, other.appearances);
                prop_assert_eq!(hop.flags, other.flags);
            }

            for (grade, count) in &single.grades {
                prop_assert_eq!(count * 2, twice.grades[grade]);
            }

            for (a, b) in single.dns.iter().zip(&twice.dns) {
                prop_assert!(same_statistics(a.latency, b.latency, 2));
                prop_assert_eq!(a.failures * 2, b.failures);
            }

            prop_assert_eq!(single.failed.len() * 2, twice.failed.len());
        }

        /// Mean always lies between min and max
        #[test]
        fn mean_between_min_max(outcomes in vec(generators::pass_outcome(), 1..20)) {
            let report = Aggregator::aggregate(&outcomes);
            for summary in scalars(&report).into_iter().flatten() {
                prop_assert!(summary.min <= summary.mean + 1e-9);
                prop_assert!(summary.mean <= summary.max + 1e-9);
            }
        }

        /// Input order does not matter
        #[test]
        fn order_independent(outcomes in vec(generators::pass_outcome(), 0..20)) {
            let forward = Aggregator::aggregate(&outcomes);
            let reversed: Vec<PassOutcome> = outcomes.iter().rev().cloned().collect();
            let backward = Aggregator::aggregate(&reversed);

            for (a, b) in scalars(&forward).into_iter().zip(scalars(&backward)) {
                prop_assert!(same_statistics(a, b, 1));
            }
            prop_assert_eq!(forward.grades, backward.grades);
            prop_assert_eq!(forward.successful_runs, backward.successful_runs);
            let forward_ids: Vec<u32> = forward.failed.iter().map(|f| f.pass_id).collect();
            let backward_ids: Vec<u32> = backward.failed.iter().map(|f| f.pass_id).collect();
            prop_assert_eq!(forward_ids, backward_ids);
        }

        /// Hop counts never exceed the number of successful passes
        #[test]
        fn hop_appearances_bounded(outcomes in vec(generators::pass_outcome(), 0..20)) {
            let report = Aggregator::aggregate(&outcomes);
            for hop in report.hops.values() {
                prop_assert!(hop.appearances >= 1);
                prop_assert!(hop.appearances <= report.successful_runs);
                prop_assert!((0.0..=100.0).contains(&hop.max_loss_pct));
            }
        }
    }
}
