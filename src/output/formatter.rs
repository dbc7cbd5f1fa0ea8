//! Core formatting traits and implementations
//!
//! Every section is rendered once, in the provided methods of
//! [`OutputFormatter`]; implementations only decide how a [`Tone`] is
//! painted and may override individual sections.

use crate::{
    error::{AppError, Result},
    grading::{self, PassVerdict},
    models::{HopRecord, NatStatus, PassFailure, PassResult, SubTestOutcome},
    selector::Selection,
    stats::{AggregateReport, MetricSummary},
    types::{JitterStatus, SelectionTier},
};
use std::fmt::Write as _;

/// Semantic weight of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Header,
    Success,
    Warning,
    Error,
    Info,
    Muted,
}

pub(crate) fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Render `text` with the given tone
    fn paint(&self, text: &str, tone: Tone) -> String;

    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.chars().count() + 4);

        writeln!(output, "{}", self.paint(&border, Tone::Muted)).map_err(fmt_err)?;
        writeln!(output, "  {}  ", self.paint(title, Tone::Header)).map_err(fmt_err)?;
        write!(output, "{}", self.paint(&border, Tone::Muted)).map_err(fmt_err)?;

        Ok(output)
    }

    /// Format the chosen measurement endpoint
    fn format_selection(&self, selection: &Selection) -> Result<String> {
        let (icon, tone) = match selection.tier {
            SelectionTier::Full => ("✅", Tone::Success),
            SelectionTier::Partial => ("⚠️", Tone::Warning),
            SelectionTier::Fallback => ("❌", Tone::Error),
        };
        Ok(format!(
            "{} Using iperf3 server {}:{} ({})",
            icon,
            selection.host,
            selection.port,
            self.paint(selection.tier.description(), tone)
        ))
    }

    /// Format one completed pass as it would be shown live
    fn format_pass(&self, pass: &PassResult) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.paint(&format!("=== Test Run {} ===", pass.pass_id), Tone::Header))
            .map_err(fmt_err)?;
        writeln!(output, "Started: {}", pass.started_at.format("%Y-%m-%d %H:%M:%S UTC")).map_err(fmt_err)?;
        writeln!(output).map_err(fmt_err)?;

        output.push_str(&self.format_bufferbloat_section(pass)?);
        output.push_str(&self.format_jitter_section(pass)?);
        output.push_str(&self.format_route_section(&pass.route)?);
        output.push_str(&self.format_mtu_section(&pass.mtu)?);
        output.push_str(&self.format_dns_section(pass)?);
        output.push_str(&self.format_nat_section(&pass.nat)?);

        Ok(output)
    }

    fn format_bufferbloat_section(&self, pass: &PassResult) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "{}", self.paint("🌐 Bufferbloat", Tone::Header)).map_err(fmt_err)?;

        match &pass.bufferbloat {
            Ok(bb) => {
                writeln!(
                    output,
                    "  Baseline RTT: {:.1} ms (sd {:.1} ms, {} replies)",
                    bb.baseline_avg_ms, bb.baseline_sd_ms, bb.baseline_samples
                )
                .map_err(fmt_err)?;
                for (label, avg, increase) in [
                    ("Upload RTT:  ", bb.upload_avg_ms, bb.upload_increase_ms()),
                    ("Download RTT:", bb.download_avg_ms, bb.download_increase_ms()),
                ] {
                    match (avg, increase) {
                        (Some(avg), Some(increase)) => {
                            writeln!(output, "  {} {:.1} ms ({:+.1} ms)", label, avg, increase).map_err(fmt_err)?
                        }
                        _ => writeln!(output, "  {} {}", label, self.paint("no replies under load", Tone::Muted))
                            .map_err(fmt_err)?,
                    }
                }
                let tone = if bb.grade.is_problem() { Tone::Error } else { Tone::Success };
                writeln!(
                    output,
                    "  Grade: {} (worst increase {:.1} ms)",
                    self.paint(&bb.grade.to_string(), tone),
                    bb.worst_increase_ms
                )
                .map_err(fmt_err)?;
                for error in &bb.transfer_errors {
                    writeln!(output, "  {}", self.paint(&format!("⚠️ transfer {}", error), Tone::Warning))
                        .map_err(fmt_err)?;
                }
            }
            Err(failure) => writeln!(output, "  {}", self.format_no_result(&failure.reason)).map_err(fmt_err)?,
        }

        writeln!(output).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_jitter_section(&self, pass: &PassResult) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "{}", self.paint("📡 Jitter & packet loss", Tone::Header)).map_err(fmt_err)?;

        match &pass.jitter {
            Ok(jitter) => {
                let loss = jitter
                    .loss_rate()
                    .map(|rate| format!("{:.3}%", rate))
                    .unwrap_or_else(|| "n/a".to_string());
                let tone = match jitter.status {
                    JitterStatus::Ok => Tone::Success,
                    JitterStatus::Warn => Tone::Warning,
                };
                writeln!(
                    output,
                    "  Jitter: {:.2} ms, lost {}/{} ({}) → {}",
                    jitter.jitter_ms,
                    jitter.lost,
                    jitter.total,
                    loss,
                    self.paint(&jitter.status.to_string(), tone)
                )
                .map_err(fmt_err)?;
            }
            Err(failure) => writeln!(output, "  {}", self.format_no_result(&failure.reason)).map_err(fmt_err)?,
        }

        writeln!(output).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_route_section(&self, route: &SubTestOutcome<Vec<HopRecord>>) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "{}", self.paint("🛣️ Route", Tone::Header)).map_err(fmt_err)?;

        match route {
            Ok(hops) => {
                let rows: Vec<RowData> = hops
                    .iter()
                    .map(|hop| {
                        vec![
                            hop.hop.to_string(),
                            hop.host.clone(),
                            format!("{:.1}", hop.loss_pct),
                            format!("{:.1}", hop.avg_ms),
                            format!("{:.1}", hop.best_ms),
                            format!("{:.1}", hop.worst_ms),
                            format!("{:.1}", hop.stdev_ms),
                            grading::flag_hop(hop).labels().join(","),
                        ]
                    })
                    .collect();
                output.push_str(&render_table(&TableFormat::hops(), &rows));
                writeln!(output).map_err(fmt_err)?;

                let problems = grading::hop_problems(hops);
                if problems.is_empty() {
                    writeln!(
                        output,
                        "  {}",
                        self.paint(&format!("✅ All {} hops look healthy", hops.len()), Tone::Success)
                    )
                    .map_err(fmt_err)?;
                } else {
                    for problem in problems {
                        writeln!(output, "  {}", self.paint(&format!("⚠️ {}", problem), Tone::Warning))
                            .map_err(fmt_err)?;
                    }
                }
            }
            Err(failure) => writeln!(output, "  {}", self.format_no_result(&failure.reason)).map_err(fmt_err)?,
        }

        writeln!(output).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_mtu_section(&self, mtu: &SubTestOutcome<u32>) -> Result<String> {
        let line = match mtu {
            Ok(mtu) if *mtu < grading::LOW_MTU_BELOW => {
                format!("📏 Path MTU: {}", self.paint(&format!("{} bytes (very low)", mtu), Tone::Warning))
            }
            Ok(mtu) => format!("📏 Path MTU: {} bytes", mtu),
            Err(failure) => format!("📏 Path MTU: {}", self.format_no_result(&failure.reason)),
        };
        Ok(format!("{}\n\n", line))
    }

    fn format_dns_section(&self, pass: &PassResult) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "{}", self.paint(&format!("🔍 DNS lookup ({})", pass.dns.domain), Tone::Header))
            .map_err(fmt_err)?;

        if pass.dns.entries.is_empty() {
            writeln!(output, "  {}", self.paint("no resolvers configured", Tone::Muted)).map_err(fmt_err)?;
        }
        for entry in &pass.dns.entries {
            let value = match &entry.latency_ms {
                Ok(ms) if *ms > grading::SLOW_DNS_ABOVE_MS => self.paint(&format!("{:.1} ms (slow)", ms), Tone::Warning),
                Ok(ms) => format!("{:.1} ms", ms),
                Err(failure) => self.paint(&format!("failed ({})", failure.reason), Tone::Error),
            };
            writeln!(output, "  {}: {}", entry.resolver, value).map_err(fmt_err)?;
        }

        writeln!(output).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_nat_section(&self, nat: &SubTestOutcome<NatStatus>) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "{}", self.paint("🏠 CG-NAT", Tone::Header)).map_err(fmt_err)?;

        match nat {
            Ok(status) => {
                writeln!(output, "  Public IP: {}", status.public_ip).map_err(fmt_err)?;
                match (status.router_ip, status.cgnat) {
                    (Some(router), Some(true)) => {
                        writeln!(output, "  Router WAN IP: {}", router).map_err(fmt_err)?;
                        writeln!(output, "  {}", self.paint("⚠️ Carrier-Grade NAT detected", Tone::Warning))
                            .map_err(fmt_err)?;
                    }
                    (Some(router), _) => {
                        writeln!(output, "  Router WAN IP: {}", router).map_err(fmt_err)?;
                        writeln!(output, "  {}", self.paint("✅ No CG-NAT", Tone::Success)).map_err(fmt_err)?;
                    }
                    (None, _) => {
                        let note = status.router_note.as_deref().unwrap_or("unknown");
                        writeln!(
                            output,
                            "  Router WAN IP: {}",
                            self.paint(&format!("unknown ({}), CG-NAT not determined", note), Tone::Muted)
                        )
                        .map_err(fmt_err)?;
                    }
                }
            }
            Err(failure) => writeln!(output, "  {}", self.format_no_result(&failure.reason)).map_err(fmt_err)?,
        }

        Ok(output)
    }

    /// Format a pass that produced nothing
    fn format_pass_failure(&self, failure: &PassFailure) -> Result<String> {
        Ok(format!(
            "{}\n  {}\n",
            self.paint(&format!("=== Test Run {} ===", failure.pass_id), Tone::Header),
            self.paint(&format!("❌ FAILED: {}", failure.reason), Tone::Error)
        ))
    }

    /// Verdict for a single run
    fn format_final_summary(&self, pass: &PassResult) -> Result<String> {
        let verdict = grading::judge_pass(pass);
        let mut output = self.format_header("FINAL SUMMARY")?;
        output.push('\n');

        for problem in &verdict.problems {
            writeln!(output, " - {} → {}", problem, self.paint("PROBLEM", Tone::Error)).map_err(fmt_err)?;
        }
        for note in &verdict.notes {
            writeln!(output, " - {}", self.paint(&format!("ℹ️ {}", note), Tone::Info)).map_err(fmt_err)?;
        }
        for missing in &verdict.unmeasured {
            writeln!(output, " - {} → {}", missing, self.paint("NOT MEASURED", Tone::Warning)).map_err(fmt_err)?;
        }

        writeln!(output).map_err(fmt_err)?;
        writeln!(output, "{}", self.verdict_line(&verdict)).map_err(fmt_err)?;
        Ok(output)
    }

    fn verdict_line(&self, verdict: &PassVerdict) -> String {
        if verdict.all_clear() {
            self.paint("All tests passed within expected thresholds.", Tone::Success)
        } else if !verdict.problems.is_empty() {
            self.paint(
                "One or more tests indicated potential issues. Please review above details.",
                Tone::Error,
            )
        } else {
            self.paint("No thresholds exceeded, but some tests produced no result.", Tone::Warning)
        }
    }

    /// Multi-run statistics
    fn format_statistical_summary(&self, report: &AggregateReport) -> Result<String> {
        let mut output = self.format_header("STATISTICAL SUMMARY")?;
        output.push('\n');

        if !report.failed.is_empty() {
            writeln!(
                output,
                "{}",
                self.paint(&format!("⚠️ {} of {} runs failed", report.failed.len(), report.total_runs), Tone::Warning)
            )
            .map_err(fmt_err)?;
            for failure in &report.failed {
                writeln!(output, "  Run {}: {}", failure.pass_id, failure.reason).map_err(fmt_err)?;
            }
        }

        if report.is_empty() {
            writeln!(output, "{}", self.paint("No successful runs to analyze.", Tone::Error)).map_err(fmt_err)?;
            return Ok(output);
        }

        writeln!(output, "📊 Analyzing {} successful runs", report.successful_runs).map_err(fmt_err)?;
        writeln!(output).map_err(fmt_err)?;

        writeln!(output, "{}", self.paint("🌐 BUFFERBLOAT ANALYSIS", Tone::Header)).map_err(fmt_err)?;
        writeln!(output, "  Baseline RTT: {}", self.metric_range(report.baseline, "ms", false)).map_err(fmt_err)?;
        writeln!(output, "  Upload impact: {}", self.metric_range(report.upload_impact, "ms", true)).map_err(fmt_err)?;
        writeln!(output, "  Download impact: {}", self.metric_range(report.download_impact, "ms", true))
            .map_err(fmt_err)?;
        let grades = if report.grades.is_empty() {
            self.paint("no data", Tone::Muted)
        } else {
            report
                .grades
                .iter()
                .map(|(grade, count)| format!("{}: {}", grade, count))
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(output, "  Grades: {}", grades).map_err(fmt_err)?;
        writeln!(output).map_err(fmt_err)?;

        writeln!(output, "{}", self.paint("📡 JITTER & PACKET LOSS ANALYSIS", Tone::Header)).map_err(fmt_err)?;
        writeln!(output, "  Jitter: {}", self.metric_range(report.jitter, "ms", false)).map_err(fmt_err)?;
        let loss = match report.loss_rate {
            Some(s) => format!("{:.3}% - {:.3}% (avg: {:.3}%)", s.min, s.max, s.mean),
            None => self.paint("no data", Tone::Muted),
        };
        writeln!(output, "  Packet loss: {}", loss).map_err(fmt_err)?;
        writeln!(output).map_err(fmt_err)?;

        writeln!(output, "{}", self.paint("🔍 DNS LOOKUP ANALYSIS", Tone::Header)).map_err(fmt_err)?;
        if report.dns.is_empty() {
            writeln!(output, "  {}", self.paint("no data", Tone::Muted)).map_err(fmt_err)?;
        }
        for resolver in &report.dns {
            let mut line = format!("  {}: {}", resolver.resolver, self.metric_range(resolver.latency, "ms", false));
            if resolver.failures > 0 {
                line.push_str(&self.paint(&format!(" ({} failed)", resolver.failures), Tone::Warning));
            }
            writeln!(output, "{}", line).map_err(fmt_err)?;
        }
        writeln!(output).map_err(fmt_err)?;

        writeln!(output, "{}", self.paint("📏 PATH MTU", Tone::Header)).map_err(fmt_err)?;
        let mtu = match report.mtu {
            Some(s) => format!("{:.0} - {:.0} bytes", s.min, s.max),
            None => self.paint("no data", Tone::Muted),
        };
        writeln!(output, "  MTU: {}", mtu).map_err(fmt_err)?;
        writeln!(output).map_err(fmt_err)?;

        writeln!(output, "{}", self.paint("🛣️ MTR ROUTE ANALYSIS", Tone::Header)).map_err(fmt_err)?;
        if report.hops.is_empty() {
            writeln!(output, "  {}", self.paint("No MTR data available", Tone::Muted)).map_err(fmt_err)?;
        }
        for (index, hop) in &report.hops {
            let status = if hop.flags.loss {
                self.paint(" 🔴 LOSS", Tone::Error)
            } else if hop.flags.high_jitter {
                self.paint(" 🟡 JITTER", Tone::Warning)
            } else {
                " ✅".to_string()
            };
            let avg = match hop.mean_avg_ms {
                Some(ms) => format!("{:6.1}ms", ms),
                None => format!("{:>8}", "n/a"),
            };
            writeln!(
                output,
                "  Hop {:2}: {} avg, {:4.1}% max loss, {:5.1}ms max jitter{}",
                index, avg, hop.max_loss_pct, hop.max_stdev_ms, status
            )
            .map_err(fmt_err)?;
        }

        Ok(output)
    }

    /// `min - max unit (avg: mean)`, signed for impacts
    fn metric_range(&self, summary: Option<MetricSummary>, unit: &str, signed: bool) -> String {
        match summary {
            Some(s) if signed => format!("{:+.1} - {:+.1} {} (avg: {:+.1})", s.min, s.max, unit, s.mean),
            Some(s) => format!("{:.1} - {:.1} {} (avg: {:.1})", s.min, s.max, unit, s.mean),
            None => self.paint("no data", Tone::Muted),
        }
    }

    fn format_no_result(&self, reason: &str) -> String {
        self.paint(&format!("no result ({})", reason), Tone::Warning)
    }

    /// Format error messages
    fn format_error(&self, error: &str) -> String {
        self.paint(&format!("❌ {}", error), Tone::Error)
    }

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> String {
        self.paint(&format!("⚠️ {}", warning), Tone::Warning)
    }

    /// Format success messages
    fn format_success(&self, message: &str) -> String {
        self.paint(&format!("✅ {}", message), Tone::Success)
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width: header.chars().count(),
            max_width,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
}

impl TableFormat {
    /// Columns of the per-run hop table
    pub fn hops() -> Self {
        Self {
            columns: vec![
                Column::new("Hop", Alignment::Right, 4),
                Column::new("Host", Alignment::Left, 40),
                Column::new("Loss%", Alignment::Right, 6),
                Column::new("Avg", Alignment::Right, 8),
                Column::new("Best", Alignment::Right, 8),
                Column::new("Worst", Alignment::Right, 8),
                Column::new("StDev", Alignment::Right, 8),
                Column::new("Flags", Alignment::Left, 32),
            ],
            show_borders: true,
        }
    }
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Render rows as a bordered table; empty input renders nothing
pub fn render_table(format: &TableFormat, rows: &[RowData]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let widths: Vec<usize> = format
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .fold(column.min_width, usize::max)
                .min(column.max_width)
        })
        .collect();

    let border = || {
        let mut line = String::from("+");
        for &width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let row_line = |cells: &[String]| {
        let mut line = String::new();
        if format.show_borders {
            line.push('|');
        }
        for (column, (cell, &width)) in format.columns.iter().zip(cells.iter().zip(&widths)) {
            line.push(' ');
            line.push_str(&align_text(cell, width, column.alignment));
            line.push(' ');
            if format.show_borders {
                line.push('|');
            }
        }
        line.trim_end().to_string()
    };

    let mut output = String::new();
    let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();

    if format.show_borders {
        output.push_str(&border());
        output.push('\n');
    }
    output.push_str(&row_line(&headers[..]));
    output.push('\n');
    if format.show_borders {
        output.push_str(&border());
        output.push('\n');
    }
    for row in rows {
        output.push_str(&row_line(&row[..]));
        output.push('\n');
    }
    if format.show_borders {
        output.push_str(&border());
    }

    output
}

fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }

    let padding = " ".repeat(width - len);
    match alignment {
        Alignment::Left => format!("{}{}", text, padding),
        Alignment::Right => format!("{}{}", padding, text),
    }
}

/// Plain text formatter implementation
#[derive(Debug, Clone, Default)]
pub struct PlainFormatter;

impl PlainFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for PlainFormatter {
    fn paint(&self, text: &str, _tone: Tone) -> String {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::{grade_bufferbloat, grade_jitter};
    use crate::models::{DnsTimings, PassFailure, ResolverTiming, SubTestFailure, UdpStats};
    use crate::stats::Aggregator;

    fn hop(index: u32, loss: f64, stdev: f64) -> HopRecord {
        HopRecord {
            hop: index,
            host: format!("10.0.0.{}", index),
            loss_pct: loss,
            sent: 10,
            last_ms: 5.0,
            avg_ms: 5.0,
            best_ms: 4.0,
            worst_ms: 6.0,
            stdev_ms: stdev,
        }
    }

    fn sample_pass() -> PassResult {
        let now = chrono::Utc::now();
        PassResult {
            pass_id: 2,
            started_at: now,
            finished_at: now,
            bufferbloat: grade_bufferbloat(&[20.0], &[45.0], &[]),
            jitter: grade_jitter(&UdpStats::complete(1.5, 0, 1000)),
            route: Ok(vec![hop(1, 0.0, 0.5), hop(2, 0.0, 1.0)]),
            mtu: Ok(1500),
            dns: DnsTimings {
                domain: "google.com".to_string(),
                entries: vec![ResolverTiming { resolver: "1.1.1.1".to_string(), latency_ms: Ok(11.0) }],
            },
            nat: Ok(NatStatus::new("203.0.113.7".parse().unwrap(), Ok("203.0.113.7".parse().unwrap()))),
        }
    }

    #[test]
    fn test_render_table() {
        let format = TableFormat {
            columns: vec![Column::new("Hop", Alignment::Right, 4), Column::new("Host", Alignment::Left, 10)],
            show_borders: true,
        };
        let table = render_table(&format, &[vec!["1".into(), "gateway".into()]]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+-----+---------+");
        assert_eq!(lines[1], "| Hop | Host    |");
        assert_eq!(lines[3], "|   1 | gateway |");
        assert!(render_table(&format, &[]).is_empty());
    }

    #[test]
    fn test_pass_section() {
        let text = PlainFormatter.format_pass(&sample_pass()).unwrap();
        assert!(text.contains("=== Test Run 2 ==="));
        assert!(text.contains("Baseline RTT: 20.0 ms"));
        assert!(text.contains("Upload RTT:   45.0 ms (+25.0 ms)"));
        assert!(text.contains("Download RTT: no replies under load"));
        assert!(text.contains("Grade: A"));
        assert!(text.contains("→ OK"));
        assert!(text.contains("✅ All 2 hops look healthy"));
        assert!(text.contains("Path MTU: 1500 bytes"));
        assert!(text.contains("1.1.1.1: 11.0 ms"));
        assert!(text.contains("No CG-NAT"));
    }

    #[test]
    fn test_pass_section_shows_failure_reasons() {
        let mut pass = sample_pass();
        pass.route = Err(SubTestFailure::new("unavailable: mtr not installed"));
        pass.jitter = Err(SubTestFailure::new("no result: incomplete UDP summary from server"));

        let text = PlainFormatter.format_pass(&pass).unwrap();
        assert!(text.contains("no result (unavailable: mtr not installed)"));
        assert!(text.contains("incomplete UDP summary"));
    }

    #[test]
    fn test_hop_problems_listed() {
        let text = PlainFormatter.format_route_section(&Ok(vec![hop(1, 0.0, 0.5), hop(2, 20.0, 25.0)])).unwrap();
        assert!(text.contains("Hop 2: 20.0% packet loss"));
        assert!(text.contains("Hop 2: 25.0ms jitter"));
        assert!(text.contains("LOSS,HIGH-JITTER"));
    }

    #[test]
    fn test_final_summary_all_clear() {
        let text = PlainFormatter.format_final_summary(&sample_pass()).unwrap();
        assert!(text.contains("All tests passed within expected thresholds."));
    }

    #[test]
    fn test_final_summary_never_claims_success_when_unmeasured() {
        let mut pass = sample_pass();
        pass.mtu = Err(SubTestFailure::new("could not determine path MTU"));
        let text = PlainFormatter.format_final_summary(&pass).unwrap();
        assert!(!text.contains("All tests passed"));
        assert!(text.contains("mtu: could not determine path MTU → NOT MEASURED"));
    }

    #[test]
    fn test_final_summary_problems() {
        let mut pass = sample_pass();
        pass.mtu = Ok(1380);
        let text = PlainFormatter.format_final_summary(&pass).unwrap();
        assert!(text.contains("Path MTU very low (1380 bytes) → PROBLEM"));
        assert!(text.contains("One or more tests indicated potential issues."));
    }

    #[test]
    fn test_statistical_summary() {
        let outcomes = vec![Ok(sample_pass()), Err(PassFailure::new(3, "pass panicked: boom"))];
        let report = Aggregator::aggregate(&outcomes);
        let text = PlainFormatter.format_statistical_summary(&report).unwrap();

        assert!(text.contains("STATISTICAL SUMMARY"));
        assert!(text.contains("⚠️ 1 of 2 runs failed"));
        assert!(text.contains("Run 3: pass panicked: boom"));
        assert!(text.contains("📊 Analyzing 1 successful runs"));
        assert!(text.contains("Baseline RTT: 20.0 - 20.0 ms (avg: 20.0)"));
        assert!(text.contains("Upload impact: +25.0 - +25.0 ms (avg: +25.0)"));
        assert!(text.contains("Download impact: no data"));
        assert!(text.contains("Grades: A: 1"));
        assert!(text.contains("Packet loss: 0.000% - 0.000% (avg: 0.000%)"));
        assert!(text.contains("Hop  1:    5.0ms avg,  0.0% max loss,   0.5ms max jitter ✅"));
    }

    #[test]
    fn test_statistical_summary_without_hops() {
        let mut pass = sample_pass();
        pass.route = Err(SubTestFailure::new("unavailable: mtr not installed"));
        let report = Aggregator::aggregate(&[Ok(pass)]);
        let text = PlainFormatter.format_statistical_summary(&report).unwrap();
        assert!(text.contains("No MTR data available"));
    }

    #[test]
    fn test_statistical_summary_hop_without_rtt() {
        let mut pass = sample_pass();
        let mut silent = hop(3, 100.0, 0.0);
        silent.avg_ms = f64::NAN;
        pass.route = Ok(vec![hop(1, 0.0, 0.5), silent]);
        let report = Aggregator::aggregate(&[Ok(pass)]);
        let text = PlainFormatter.format_statistical_summary(&report).unwrap();
        assert!(text.contains("Hop  3:      n/a avg, 100.0% max loss"));
        assert!(!text.contains("0.0ms avg, 100.0%"));
    }

    #[test]
    fn test_all_runs_failed() {
        let report = Aggregator::aggregate(&[Err(PassFailure::new(1, "pass was cancelled"))]);
        let text = PlainFormatter.format_statistical_summary(&report).unwrap();
        assert!(text.contains("No successful runs to analyze."));
    }
}
