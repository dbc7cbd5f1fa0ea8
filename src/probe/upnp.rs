//! Minimal UPnP Internet Gateway Device client
//!
//! Only what is needed to ask the home router for its external address:
//! SSDP discovery, the device description lookup and one SOAP call.

use crate::error::{ProbeError, ProbeResult};
use regex::Regex;
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

const SSDP_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(239, 255, 255, 250)), 1900);
const IGD_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:InternetGatewayDevice:1";
const WAN_SERVICES: [&str; 2] = ["WANIPConnection", "WANPPPConnection"];

/// Gateway service able to report the external address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WanService {
    pub service_type: String,
    pub control_url: String,
}

/// UPnP client bound to one HTTP client
#[derive(Debug, Clone)]
pub struct UpnpClient {
    http: Client,
    discovery_timeout: Duration,
}

impl UpnpClient {
    pub fn new(http: Client, discovery_timeout: Duration) -> Self {
        Self { http, discovery_timeout }
    }

    /// Discover the gateway and ask it for its external address
    pub async fn external_ip(&self) -> ProbeResult<IpAddr> {
        let location = self.discover().await?;
        self.external_ip_from_location(&location).await
    }

    /// Multicast an M-SEARCH and return the first gateway's description URL
    pub async fn discover(&self) -> ProbeResult<String> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.send_to(search_request().as_bytes(), SSDP_ADDR).await?;

        let mut buf = [0u8; 2048];
        let deadline = tokio::time::Instant::now() + self.discovery_timeout;

        loop {
            let received = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await;
            match received {
                Ok(Ok((len, _))) => {
                    let reply = String::from_utf8_lossy(&buf[..len]);
                    if let Some(location) = location_header(&reply) {
                        return Ok(location);
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(ProbeError::unavailable("no UPnP devices found")),
            }
        }
    }

    /// Query the gateway whose description lives at `location`
    pub async fn external_ip_from_location(&self, location: &str) -> ProbeResult<IpAddr> {
        let description = self
            .http
            .get(location)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let service = find_wan_service(&description)?;
        let control_url = url::Url::parse(location)
            .and_then(|base| base.join(&service.control_url))
            .map_err(|e| ProbeError::malformed(format!("bad control URL '{}': {}", service.control_url, e)))?;

        let response = self
            .http
            .post(control_url)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPAction", format!("\"{}#GetExternalIPAddress\"", service.service_type))
            .body(soap_envelope(&service.service_type))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_external_ip(&response)
    }
}

fn search_request() -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\nHOST: {}\r\nMAN: \"ssdp:discover\"\r\nMX: 2\r\nST: {}\r\n\r\n",
        SSDP_ADDR, IGD_SEARCH_TARGET
    )
}

fn soap_envelope(service_type: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\"?>",
            "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" ",
            "s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">",
            "<s:Body><u:GetExternalIPAddress xmlns:u=\"{}\"></u:GetExternalIPAddress></s:Body>",
            "</s:Envelope>"
        ),
        service_type
    )
}

/// `LOCATION` header of an SSDP reply
pub fn location_header(reply: &str) -> Option<String> {
    reply.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("location") {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

/// First WAN connection service listed in a device description
pub fn find_wan_service(description: &str) -> ProbeResult<WanService> {
    let service_re = Regex::new(r"(?s)<service>(.*?)</service>")
        .map_err(|e| ProbeError::malformed(e.to_string()))?;
    let type_re = Regex::new(r"<serviceType>\s*(.*?)\s*</serviceType>")
        .map_err(|e| ProbeError::malformed(e.to_string()))?;
    let control_re = Regex::new(r"<controlURL>\s*(.*?)\s*</controlURL>")
        .map_err(|e| ProbeError::malformed(e.to_string()))?;

    let service = service_re
        .captures_iter(description)
        .filter_map(|block| {
            let body = block.get(1)?.as_str();
            let service_type = type_re.captures(body)?.get(1)?.as_str().to_string();
            let control_url = control_re.captures(body)?.get(1)?.as_str().to_string();
            Some(WanService { service_type, control_url })
        })
        .find(|service| WAN_SERVICES.iter().any(|name| service.service_type.contains(name)))
        .ok_or_else(|| ProbeError::unavailable("no UPnP Internet gateway service"));
    service
}

/// Address in a `GetExternalIPAddress` response; `0.0.0.0` means none
pub fn parse_external_ip(response: &str) -> ProbeResult<IpAddr> {
    let re = Regex::new(r"<NewExternalIPAddress>\s*(.*?)\s*</NewExternalIPAddress>")
        .map_err(|e| ProbeError::malformed(e.to_string()))?;

    let value = re
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ProbeError::malformed("gateway response has no external address field"))?;

    if value.is_empty() || value == "0.0.0.0" {
        return Err(ProbeError::unavailable("gateway reported no external address"));
    }

    value
        .parse()
        .map_err(|_| ProbeError::malformed(format!("gateway returned '{}'", value)))
}
