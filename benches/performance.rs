//! Performance benchmarks for the diagnostics engine
//!
//! Covers the CPU-bound parts of a run: parsing tool output, grading,
//! aggregating many passes and rendering the summaries.

use clap::Parser;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use link_diagnostics::{
    cli::Cli,
    config::parser::ConfigParser,
    grading::{grade_bufferbloat, grade_jitter, judge_pass},
    models::{DnsTimings, HopRecord, PassFailure, PassOutcome, PassResult, ResolverTiming, SubTestFailure, UdpStats},
    output::{OutputFormatter, PlainFormatter},
    probe::parsers::{parse_iperf3_udp, parse_mtr_report, parse_ping_rtt},
    stats::Aggregator,
};
use std::hint::black_box;

const PING_LINE: &str = "64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.4 ms";

const IPERF3_UDP: &str = r#"{"end":{"sum":{"jitter_ms":1.84,"lost_packets":12,"packets":8000,"lost_percent":0.15}}}"#;

/// Synthetic mtr report with `hops` rows
fn mtr_report(hops: u32) -> String {
    let mut report = String::from("HOST: bench            Loss%   Snt   Last   Avg  Best  Wrst StDev\n");
    for hop in 1..=hops {
        report.push_str(&format!(
            "{:3}.|-- 10.0.{}.1   {:.1}%   100   {:.1}   {:.1}   {:.1}   {:.1}   {:.1}\n",
            hop,
            hop,
            (hop % 7) as f64,
            hop as f64 * 2.0,
            hop as f64 * 2.1,
            hop as f64 * 1.9,
            hop as f64 * 3.0,
            (hop % 5) as f64 * 1.5,
        ));
    }
    report
}

fn sample_hops(count: u32) -> Vec<HopRecord> {
    (1..=count)
        .map(|hop| HopRecord {
            hop,
            host: format!("10.0.{}.1", hop),
            loss_pct: (hop % 7) as f64,
            sent: 200,
            last_ms: hop as f64 * 2.0,
            avg_ms: hop as f64 * 2.1,
            best_ms: hop as f64 * 1.9,
            worst_ms: hop as f64 * 3.0,
            stdev_ms: (hop % 5) as f64 * 4.5,
        })
        .collect()
}

/// Passes with a 10% failure rate
fn sample_outcomes(count: u32) -> Vec<PassOutcome> {
    let now = chrono::Utc::now();
    (1..=count)
        .map(|pass_id| {
            if pass_id % 10 == 0 {
                return Err(PassFailure::new(pass_id, "pass panicked: bench"));
            }
            let offset = (pass_id % 13) as f64;
            let baseline: Vec<f64> = (0..100).map(|i| 15.0 + (i % 5) as f64 + offset).collect();
            let upload: Vec<f64> = baseline.iter().map(|v| v + 40.0).collect();
            let download: Vec<f64> = baseline.iter().map(|v| v + 15.0).collect();
            Ok(PassResult {
                pass_id,
                started_at: now,
                finished_at: now,
                bufferbloat: grade_bufferbloat(&baseline, &upload, &download),
                jitter: grade_jitter(&UdpStats::complete(2.0 + offset, pass_id as u64 % 20, 8000)),
                route: Ok(sample_hops(12)),
                mtu: Ok(1500),
                dns: DnsTimings {
                    domain: "google.com".to_string(),
                    entries: vec![
                        ResolverTiming { resolver: "1.1.1.1".to_string(), latency_ms: Ok(9.0 + offset) },
                        ResolverTiming {
                            resolver: "8.8.8.8".to_string(),
                            latency_ms: Err(SubTestFailure::new("timed out after 1.0s")),
                        },
                    ],
                },
                nat: Err(SubTestFailure::new("unavailable: bench")),
            })
        })
        .collect()
}

/// Benchmark parsing of external tool output
fn benchmark_parsers(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsers");

    group.bench_function("ping_rtt", |b| {
        b.iter(|| black_box(parse_ping_rtt(black_box(PING_LINE))));
    });

    group.bench_function("iperf3_udp", |b| {
        b.iter(|| black_box(parse_iperf3_udp(black_box(IPERF3_UDP))));
    });

    for hops in [5u32, 15, 30] {
        let report = mtr_report(hops);
        group.bench_with_input(BenchmarkId::new("mtr_report", hops), &report, |b, report| {
            b.iter(|| black_box(parse_mtr_report(black_box(report))));
        });
    }

    group.finish();
}

/// Benchmark grading of a single pass
fn benchmark_grading(c: &mut Criterion) {
    let mut group = c.benchmark_group("grading");

    let baseline: Vec<f64> = (0..100).map(|i| 20.0 + (i % 9) as f64).collect();
    let loaded: Vec<f64> = baseline.iter().map(|v| v * 3.0).collect();
    group.bench_function("bufferbloat", |b| {
        b.iter(|| black_box(grade_bufferbloat(black_box(&baseline), &loaded, &baseline)));
    });

    let outcomes = sample_outcomes(1);
    if let Some(Ok(pass)) = outcomes.first() {
        group.bench_function("judge_pass", |b| {
            b.iter(|| black_box(judge_pass(black_box(pass))));
        });
    }

    group.finish();
}

/// Benchmark aggregation with different run counts
fn benchmark_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");

    for size in [5u32, 50, 500] {
        let outcomes = sample_outcomes(size);
        group.bench_with_input(BenchmarkId::new("aggregate", size), &outcomes, |b, outcomes| {
            b.iter(|| black_box(Aggregator::aggregate(black_box(outcomes))));
        });
    }

    group.finish();
}

/// Benchmark rendering of per-run and summary output
fn benchmark_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering");
    let formatter = PlainFormatter;

    let outcomes = sample_outcomes(50);
    let report = Aggregator::aggregate(&outcomes);
    group.bench_function("statistical_summary", |b| {
        b.iter(|| black_box(formatter.format_statistical_summary(black_box(&report))));
    });

    if let Some(Ok(pass)) = outcomes.first() {
        group.bench_function("pass", |b| {
            b.iter(|| black_box(formatter.format_pass(black_box(pass))));
        });
    }

    group.finish();
}

/// Benchmark configuration loading pipeline
fn benchmark_config_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("config");

    let args = ["linkdiag", "--runs", "10", "--parallel", "2", "--no-output", "--no-color"];
    group.bench_function("cli_to_config", |b| {
        b.iter(|| {
            let cli = Cli::try_parse_from(black_box(args)).unwrap();
            let config = ConfigParser::new(cli).parse().unwrap();
            black_box(config);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parsers,
    benchmark_grading,
    benchmark_aggregation,
    benchmark_rendering,
    benchmark_config_parsing
);

criterion_main!(benches);
