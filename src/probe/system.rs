//! Probe implementation backed by system tools and network clients

use super::{bounded, parsers, upnp::UpnpClient, ProbeAdapter};
use crate::{
    defaults,
    error::{AppError, ProbeError, ProbeResult, Result},
    models::{Config, HopRecord, UdpStats},
    types::Direction,
};
use async_trait::async_trait;
use reqwest::Client;
use std::ffi::OsStr;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::process::Command;
use trust_dns_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

/// Tools that must be on PATH before any measurement starts
pub const REQUIRED_TOOLS: [&str; 2] = ["ping", "iperf3"];

/// Fail fast when a required tool is missing
pub fn check_dependencies() -> Result<()> {
    let path = std::env::var_os("PATH").unwrap_or_default();

    for tool in REQUIRED_TOOLS {
        if find_on_path(tool, &path).is_none() {
            return Err(AppError::missing_dependency(format!("{} not found on PATH", tool)));
        }
    }

    Ok(())
}

/// Locate an executable in a PATH-style list of directories
pub fn find_on_path(tool: &str, path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path).find_map(|dir| {
        let candidates = [dir.join(tool), dir.join(format!("{}.exe", tool))];
        candidates.into_iter().find(|candidate| candidate.is_file())
    })
}

/// Probes that shell out to `ping`, `iperf3` and `mtr` and talk to the network directly
#[derive(Debug, Clone)]
pub struct SystemProbes {
    http: Client,
    public_ip_url: String,
    upnp: UpnpClient,
}

impl SystemProbes {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(defaults::PUBLIC_IP_TIMEOUT)
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            upnp: UpnpClient::new(http.clone(), defaults::UPNP_DISCOVERY_TIMEOUT),
            http,
            public_ip_url: config.public_ip_url.clone(),
        })
    }

    /// Run a tool to completion within `limit`; the child is killed if the bound expires
    async fn run(&self, program: &str, args: &[String], limit: Duration) -> ProbeResult<Output> {
        bounded(limit, async {
            Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => ProbeError::unavailable(format!("{} not installed", program)),
                    _ => ProbeError::from(e),
                })
        })
        .await
    }

    fn iperf3_args(host: &str, port: u16) -> Vec<String> {
        vec!["-c".to_string(), host.to_string(), "-p".to_string(), port.to_string()]
    }

    fn failure_reason(program: &str, output: &Output) -> String {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            format!("{} exited with {}", program, output.status)
        } else {
            format!("{}: {}", program, stderr)
        }
    }

    fn mtu_args(host: &str, payload: u32) -> ProbeResult<Vec<String>> {
        let size = payload.to_string();
        let args: Vec<&str> = if cfg!(linux_platform) {
            vec!["-M", "do", "-c", "1", "-s", size.as_str(), host]
        } else if cfg!(windows_platform) {
            vec!["-f", "-n", "1", "-l", size.as_str(), host]
        } else {
            return Err(ProbeError::unavailable(format!(
                "MTU discovery unsupported on {}",
                std::env::consts::OS
            )));
        };
        Ok(args.into_iter().map(String::from).collect())
    }
}

#[async_trait]
impl ProbeAdapter for SystemProbes {
    async fn connectivity_probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeResult<()> {
        bounded(timeout, async {
            TcpStream::connect((host, port)).await?;
            Ok::<(), ProbeError>(())
        })
        .await
    }

    async fn capability_probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeResult<()> {
        let mut args = Self::iperf3_args(host, port);
        args.extend(["-u", "-b", "1M", "-t", "1", "--json"].map(String::from));

        let output = self.run("iperf3", &args, timeout).await?;
        let stats = parsers::parse_iperf3_udp(&String::from_utf8_lossy(&output.stdout))?;

        match (stats.jitter_ms, stats.lost, stats.total) {
            (Some(_), Some(_), Some(_)) => Ok(()),
            _ => Err(ProbeError::malformed("incomplete UDP summary")),
        }
    }

    async fn latency_probe(&self, host: &str, timeout: Duration) -> ProbeResult<f64> {
        let count_flag = if cfg!(windows_platform) { "-n" } else { "-c" };
        let args = vec![count_flag.to_string(), "1".to_string(), host.to_string()];

        let output = self.run("ping", &args, timeout).await?;
        if !output.status.success() {
            return Err(ProbeError::failed(format!("no echo reply from {}", host)));
        }

        parsers::parse_ping_rtt(&String::from_utf8_lossy(&output.stdout))
    }

    async fn saturating_transfer(
        &self,
        host: &str,
        port: u16,
        direction: Direction,
        duration: Duration,
    ) -> ProbeResult<()> {
        let mut args = Self::iperf3_args(host, port);
        args.extend(["-t".to_string(), duration.as_secs().max(1).to_string()]);
        if direction == Direction::Download {
            args.push("-R".to_string());
        }

        let output = self.run("iperf3", &args, duration + defaults::TRANSFER_GRACE).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ProbeError::failed(Self::failure_reason("iperf3", &output)))
        }
    }

    async fn udp_throughput_probe(
        &self,
        host: &str,
        port: u16,
        bandwidth: &str,
        duration: Duration,
    ) -> ProbeResult<UdpStats> {
        let mut args = Self::iperf3_args(host, port);
        args.extend([
            "-u".to_string(),
            "-b".to_string(),
            bandwidth.to_string(),
            "-t".to_string(),
            duration.as_secs().max(1).to_string(),
            "--json".to_string(),
        ]);

        let output = self.run("iperf3", &args, duration + defaults::TRANSFER_GRACE).await?;
        parsers::parse_iperf3_udp(&String::from_utf8_lossy(&output.stdout))
    }

    async fn route_trace(&self, host: &str, count: u32) -> ProbeResult<Vec<HopRecord>> {
        let args = vec!["-r".to_string(), "-c".to_string(), count.to_string(), host.to_string()];

        // mtr sends one round per second
        let limit = Duration::from_secs(u64::from(count)) + defaults::TRANSFER_GRACE;
        let output = self.run("mtr", &args, limit).await?;
        if !output.status.success() {
            return Err(ProbeError::failed(Self::failure_reason("mtr", &output)));
        }

        parsers::parse_mtr_report(&String::from_utf8_lossy(&output.stdout))
    }

    async fn mtu_probe(&self, host: &str, payload: u32) -> ProbeResult<bool> {
        let args = Self::mtu_args(host, payload)?;
        let output = self.run("ping", &args, defaults::MTU_PROBE_TIMEOUT).await?;
        Ok(output.status.success())
    }

    async fn resolve_timed(&self, domain: &str, resolver: IpAddr, timeout: Duration) -> ProbeResult<f64> {
        let config = ResolverConfig::from_parts(
            None,
            Vec::new(),
            NameServerConfigGroup::from_ips_clear(&[resolver], 53, true),
        );
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        let dns = TokioAsyncResolver::tokio(config, opts);

        let start = Instant::now();
        bounded(timeout, async {
            dns.ipv4_lookup(domain).await?;
            Ok::<(), ProbeError>(())
        })
        .await?;

        Ok(start.elapsed().as_secs_f64() * 1000.0)
    }

    async fn public_ip(&self) -> ProbeResult<IpAddr> {
        let body = bounded(defaults::PUBLIC_IP_TIMEOUT, async {
            let response = self.http.get(&self.public_ip_url).send().await?.error_for_status()?;
            Ok::<String, ProbeError>(response.text().await?)
        })
        .await?;

        parsers::parse_public_ip(&body)
    }

    async fn router_external_ip(&self) -> ProbeResult<IpAddr> {
        let limit = defaults::UPNP_DISCOVERY_TIMEOUT + defaults::PUBLIC_IP_TIMEOUT * 2;
        bounded(limit, self.upnp.external_ip()).await
    }
}
