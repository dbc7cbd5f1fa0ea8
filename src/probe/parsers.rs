//! Parsers for the text and JSON emitted by external measurement tools

use crate::{
    error::{ProbeError, ProbeResult},
    models::{HopRecord, UdpStats},
};
use regex::Regex;
use serde_json::Value;

/// `time=12.3 ms` (Linux, macOS) or `time<1ms` / `time=4ms` (Windows)
const PING_TIME_PATTERN: &str = r"time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms";

/// One `mtr -r` row: index, host, Loss%, Snt, Last, Avg, Best, Wrst, StDev
const MTR_ROW_PATTERN: &str = r"^\s*(\d+)\.?\|?-*\s+(\S+)\s+([0-9.]+)%?\s+(\d+)\s+([0-9.]+)\s+([0-9.]+)\s+([0-9.]+)\s+([0-9.]+)\s+([0-9.]+)\s*$";

fn compile(pattern: &str) -> ProbeResult<Regex> {
    Regex::new(pattern).map_err(|e| ProbeError::malformed(format!("invalid pattern: {}", e)))
}

/// Round-trip time in milliseconds from one echo's output
pub fn parse_ping_rtt(output: &str) -> ProbeResult<f64> {
    let re = compile(PING_TIME_PATTERN)?;

    let captures = re
        .captures(output)
        .ok_or_else(|| ProbeError::malformed("no round-trip time in ping output"))?;

    captures[1]
        .parse::<f64>()
        .map_err(|e| ProbeError::malformed(format!("bad round-trip time '{}': {}", &captures[1], e)))
}

/// UDP summary (`end.sum`) from `iperf3 --json` output.
///
/// Missing fields stay `None`; deciding what that means is left to grading.
pub fn parse_iperf3_udp(json: &str) -> ProbeResult<UdpStats> {
    let data: Value = serde_json::from_str(json)
        .map_err(|e| ProbeError::malformed(format!("iperf3 output is not JSON: {}", e)))?;

    if let Some(error) = data.get("error").and_then(Value::as_str) {
        return Err(ProbeError::failed(format!("iperf3: {}", error)));
    }

    let sum = data
        .get("end")
        .and_then(|end| end.get("sum"))
        .ok_or_else(|| ProbeError::malformed("iperf3 output has no end.sum section"))?;

    Ok(UdpStats {
        jitter_ms: sum.get("jitter_ms").and_then(Value::as_f64),
        lost: sum.get("lost_packets").and_then(Value::as_u64),
        total: sum.get("packets").and_then(Value::as_u64),
    })
}

/// Hop records from an `mtr -r` report.
///
/// Header and unrecognised lines are skipped. Hop indices must count up from 1
/// without gaps and loss must lie in [0, 100], otherwise the report is rejected.
pub fn parse_mtr_report(output: &str) -> ProbeResult<Vec<HopRecord>> {
    let re = compile(MTR_ROW_PATTERN)?;
    let mut hops: Vec<HopRecord> = Vec::new();

    for line in output.lines() {
        let Some(c) = re.captures(line) else {
            continue;
        };

        let number = |i: usize| -> ProbeResult<f64> {
            c[i].parse::<f64>()
                .map_err(|e| ProbeError::malformed(format!("bad value '{}' in mtr row: {}", &c[i], e)))
        };

        let hop: u32 = c[1]
            .parse()
            .map_err(|e| ProbeError::malformed(format!("bad hop index '{}': {}", &c[1], e)))?;
        let sent: u32 = c[4]
            .parse()
            .map_err(|e| ProbeError::malformed(format!("bad sent count '{}': {}", &c[4], e)))?;

        let record = HopRecord {
            hop,
            host: c[2].to_string(),
            loss_pct: number(3)?,
            sent,
            last_ms: number(5)?,
            avg_ms: number(6)?,
            best_ms: number(7)?,
            worst_ms: number(8)?,
            stdev_ms: number(9)?,
        };

        let expected = hops.last().map_or(1, |previous| previous.hop + 1);
        if record.hop != expected {
            return Err(ProbeError::malformed(format!(
                "hop {} where hop {} was expected", record.hop, expected
            )));
        }

        if !(0.0..=100.0).contains(&record.loss_pct) {
            return Err(ProbeError::malformed(format!(
                "hop {} reports {}% loss", record.hop, record.loss_pct
            )));
        }

        hops.push(record);
    }

    if hops.is_empty() {
        return Err(ProbeError::malformed("no hop rows in mtr output"));
    }

    Ok(hops)
}

/// External address from a plain-text public IP service
pub fn parse_public_ip(body: &str) -> ProbeResult<std::net::IpAddr> {
    let trimmed = body.trim();
    trimmed
        .parse()
        .map_err(|_| ProbeError::malformed(format!("'{}' is not an IP address", trimmed)))
}
