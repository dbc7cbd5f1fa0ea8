//! Append-only text report
//!
//! Each pass block is rendered in memory and written under the file lock,
//! so concurrent passes never interleave.

use crate::{
    error::{AppError, Result},
    models::{PassOutcome, PassResult},
    stats::AggregateReport,
};
use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::formatter::fmt_err;

/// Report file shared by all passes
pub struct ReportSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl ReportSink {
    /// Open `path` for appending and write the report header
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::io(format!("Cannot open report file {}: {}", path.display(), e)))?;

        let sink = Self { path, file: Mutex::new(file) };
        sink.write_block(&render_header()).await?;
        Ok(sink)
    }

    #[cfg(test)]
    pub(crate) fn from_file(path: PathBuf, file: File) -> Self {
        Self { path, file: Mutex::new(file) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append_pass(&self, outcome: &PassOutcome) -> Result<()> {
        let block = render_pass_block(outcome)?;
        self.write_block(&block).await
    }

    /// Write the closing statistics footer
    pub async fn finish(&self, report: &AggregateReport) -> Result<()> {
        self.write_block(&render_footer(report)?).await
    }

    async fn write_block(&self, block: &str) -> Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(block.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn render_header() -> String {
    format!(
        "Network Diagnostics Report - {}\n{}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    )
}

fn json_section<T: Serialize>(output: &mut String, name: &str, value: &T) -> Result<()> {
    writeln!(output, "{} Results:", name).map_err(fmt_err)?;
    writeln!(output, "{}", serde_json::to_string_pretty(value)?).map_err(fmt_err)?;
    Ok(())
}

/// Block for one pass: measured sub-tests as JSON, then failures with reasons
pub fn render_pass_block(outcome: &PassOutcome) -> Result<String> {
    let mut output = String::new();

    match outcome {
        Ok(pass) => render_pass(&mut output, pass)?,
        Err(failure) => {
            writeln!(output, "=== Test Run {} ===", failure.pass_id).map_err(fmt_err)?;
            writeln!(output, "FAILED: {}", failure.reason).map_err(fmt_err)?;
        }
    }

    writeln!(output, "{}\n", "-".repeat(40)).map_err(fmt_err)?;
    Ok(output)
}

fn render_pass(output: &mut String, pass: &PassResult) -> Result<()> {
    writeln!(output, "=== Test Run {} ===", pass.pass_id).map_err(fmt_err)?;
    writeln!(output, "Timestamp: {}", pass.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"))
        .map_err(fmt_err)?;

    let mut failures = Vec::new();

    match &pass.bufferbloat {
        Ok(bb) => json_section(output, "BUFFERBLOAT", bb)?,
        Err(f) => failures.push(("BUFFERBLOAT", f.reason.as_str())),
    }
    match &pass.jitter {
        Ok(jitter) => json_section(output, "JITTER", jitter)?,
        Err(f) => failures.push(("JITTER", f.reason.as_str())),
    }
    match &pass.route {
        Ok(hops) => json_section(output, "MTR", hops)?,
        Err(f) => failures.push(("MTR", f.reason.as_str())),
    }
    match &pass.mtu {
        Ok(mtu) => json_section(output, "MTU", mtu)?,
        Err(f) => failures.push(("MTU", f.reason.as_str())),
    }
    if !pass.dns.entries.is_empty() {
        json_section(output, "DNS", &pass.dns)?;
    }
    match &pass.nat {
        Ok(nat) => json_section(output, "CGNAT", nat)?,
        Err(f) => failures.push(("CGNAT", f.reason.as_str())),
    }

    if !failures.is_empty() {
        writeln!(output, "Failures:").map_err(fmt_err)?;
        for (name, reason) in failures {
            writeln!(output, "  {}: {}", name, reason).map_err(fmt_err)?;
        }
    }

    Ok(())
}

fn render_footer(report: &AggregateReport) -> Result<String> {
    let mut output = String::new();
    writeln!(output, "STATISTICAL SUMMARY").map_err(fmt_err)?;
    writeln!(output, "{}", "=".repeat(40)).map_err(fmt_err)?;
    writeln!(output, "Successful runs: {}", report.successful_runs).map_err(fmt_err)?;
    writeln!(output, "Failed runs: {}", report.failed.len()).map_err(fmt_err)?;
    for failure in &report.failed {
        writeln!(output, "  Run {}: {}", failure.pass_id, failure.reason).map_err(fmt_err)?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DnsTimings, PassFailure, ResolverTiming, SubTestFailure};
    use crate::stats::Aggregator;
    use std::sync::Arc;

    fn pass(pass_id: u32) -> PassResult {
        let now = chrono::Utc::now();
        PassResult {
            pass_id,
            started_at: now,
            finished_at: now,
            bufferbloat: crate::grading::grade_bufferbloat(&[20.0], &[25.0], &[30.0]),
            jitter: Err(SubTestFailure::new("no result: incomplete UDP summary from server")),
            route: Ok(Vec::new()),
            mtu: Ok(1492),
            dns: DnsTimings {
                domain: "google.com".to_string(),
                entries: vec![ResolverTiming { resolver: "1.1.1.1".to_string(), latency_ms: Ok(9.5) }],
            },
            nat: Err(SubTestFailure::new("timed out after 3.0s")),
        }
    }

    #[test]
    fn test_pass_block() {
        let block = render_pass_block(&Ok(pass(1))).unwrap();
        assert!(block.starts_with("=== Test Run 1 ===\nTimestamp: "));
        assert!(block.contains("BUFFERBLOAT Results:\n{"));
        assert!(block.contains("\"grade\": \"A\""));
        assert!(block.contains("MTU Results:\n1492"));
        assert!(block.contains("DNS Results:"));
        assert!(!block.contains("JITTER Results:"));
        assert!(block.contains("  JITTER: no result: incomplete UDP summary from server"));
        assert!(block.contains("  CGNAT: timed out after 3.0s"));
        assert!(block.contains(&"-".repeat(40)));
    }

    #[test]
    fn test_failed_pass_block() {
        let block = render_pass_block(&Err(PassFailure::new(2, "pass panicked: boom"))).unwrap();
        assert!(block.starts_with("=== Test Run 2 ===\nFAILED: pass panicked: boom"));
    }

    #[tokio::test]
    async fn test_sink_writes_header_blocks_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network_diagnostics.txt");

        let outcomes = vec![Ok(pass(1)), Err(PassFailure::new(2, "pass was cancelled"))];
        let sink = ReportSink::create(&path).await.unwrap();
        for outcome in &outcomes {
            sink.append_pass(outcome).await.unwrap();
        }
        sink.finish(&Aggregator::aggregate(&outcomes)).await.unwrap();

        let text = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert!(text.starts_with("Network Diagnostics Report - "));
        assert!(text.contains(&"=".repeat(60)));
        assert!(text.find("=== Test Run 1 ===").unwrap() < text.find("=== Test Run 2 ===").unwrap());
        assert!(text.contains("Successful runs: 1\nFailed runs: 1\n"));
    }

    #[tokio::test]
    async fn test_concurrent_writes_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(ReportSink::create(dir.path().join("report.txt")).await.unwrap());

        let handles: Vec<_> = (1..=8)
            .map(|id| {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move { sink.append_pass(&Ok(pass(id))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let text = tokio::fs::read_to_string(sink.path()).await.unwrap();
        let blocks: Vec<&str> = text.split(&"-".repeat(40)).collect();
        // Header + 8 blocks share the file; every block holds exactly one run header
        for block in &blocks[..8] {
            assert_eq!(block.matches("=== Test Run").count(), 1, "{}", block);
        }
    }

    #[tokio::test]
    async fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReportSink::create(dir.path().join("missing").join("report.txt")).await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
