//! # Protocol Fingerprinter
//!
//! Names the protocol behind an open port by replaying the registered
//! probe/response signatures, and extracts banner details for detailed scans.
//!
//! Every exchange is a single connect, an optional write and a single read
//! of at most [`READ_BUDGET`] bytes. Failures at any step simply mean the
//! signature did not match.

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use netmapper_common::config::Config;
use netmapper_common::debug;
use netmapper_protocols::Protocol;
use netmapper_protocols::banner;
use netmapper_protocols::signature::{self, HTTP_PROBE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::model::ServiceFinding;
use crate::network::tcp::{self, ConnectionBudget};

/// Upper bound on bytes read from one probe response.
pub const READ_BUDGET: usize = 1024;

enum Exchange {
    Unreachable,
    /// Connected but nothing came back in time.
    Silent,
    Replied(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct Fingerprinter {
    connect_timeout: Duration,
    read_timeout: Duration,
    budget: ConnectionBudget,
}

impl Fingerprinter {
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        budget: ConnectionBudget,
    ) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            budget,
        }
    }

    pub fn from_config(cfg: &Config, budget: ConnectionBudget) -> Self {
        Self::new(cfg.connect_timeout, cfg.read_timeout, budget)
    }

    /// Protocol on `ip:port` according to the signature registry.
    pub async fn fingerprint(&self, ip: IpAddr, port: u16) -> Option<Protocol> {
        self.identify(ip, port).await.map(|(protocol, _)| protocol)
    }

    /// Distinct protocols across `ports`.
    pub async fn fingerprint_host(&self, ip: IpAddr, ports: &[u16]) -> BTreeSet<Protocol> {
        let mut protocols = BTreeSet::new();
        for &port in ports {
            if let Some(protocol) = self.fingerprint(ip, port).await {
                protocols.insert(protocol);
            }
        }
        protocols
    }

    /// Protocol, banner, version and capabilities of `ip:port`.
    ///
    /// Ports without a matching signature get a generic HTTP request and
    /// whatever comes back is identified by its markers.
    pub async fn analyze(&self, ip: IpAddr, port: u16) -> ServiceFinding {
        let (protocol, response) = match self.identify(ip, port).await {
            Some((protocol, response)) => (Some(protocol), response),
            None => match self.exchange(ip, port, Some(HTTP_PROBE)).await {
                Exchange::Replied(response) => (banner::identify_response(&response), response),
                Exchange::Silent | Exchange::Unreachable => (None, Vec::new()),
            },
        };

        let banner = banner::decode_banner(&response);
        let (version, capabilities) = match &banner {
            Some(text) => (
                banner::extract_version(text),
                banner::extract_capabilities(text),
            ),
            None => (None, BTreeSet::new()),
        };

        ServiceFinding {
            port,
            protocol,
            service: None,
            banner,
            version,
            capabilities,
        }
    }

    async fn identify(&self, ip: IpAddr, port: u16) -> Option<(Protocol, Vec<u8>)> {
        for sig in signature::for_port(port) {
            match self.exchange(ip, port, sig.probe).await {
                Exchange::Replied(response) if sig.matches(&response) || sig.is_connect_only() => {
                    return Some((sig.protocol, response));
                }
                Exchange::Silent if sig.is_connect_only() => {
                    return Some((sig.protocol, Vec::new()));
                }
                Exchange::Unreachable => {
                    debug!("{ip}:{port} unreachable while probing {}", sig.protocol);
                }
                _ => {}
            }
        }
        None
    }

    async fn exchange(&self, ip: IpAddr, port: u16, probe: Option<&[u8]>) -> Exchange {
        let Some(_permit) = self.budget.acquire().await else {
            return Exchange::Unreachable;
        };

        let addr = SocketAddr::new(ip, port);
        let Ok((mut stream, _)) = tcp::connect(addr, self.connect_timeout).await else {
            return Exchange::Unreachable;
        };

        if let Some(probe) = probe {
            if stream.write_all(probe).await.is_err() {
                return Exchange::Silent;
            }
        }

        let mut buf = vec![0u8; READ_BUDGET];
        match timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => {
                buf.truncate(n);
                Exchange::Replied(buf)
            }
            _ => Exchange::Silent,
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
