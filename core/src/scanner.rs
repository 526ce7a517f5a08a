//! # Host Discovery
//!
//! Finds the live hosts among a set of target addresses by walking a
//! fallback ladder, one rung at a time:
//!
//! 1. the external [`HostEnumerator`], when one was handed in;
//! 2. an ICMP echo sweep through the system `ping` utility;
//! 3. a TCP handshake sweep, only when `ping` itself cannot be used.
//!
//! Each rung's failure is an explicit [`ToolError`] value that selects the
//! next rung. Running out of rungs is not an error: nobody answered.
//!
//! Survivors are then enriched with neighbour-table MACs and reverse DNS
//! names (see [`resolver`]).

use std::fmt;

use netmapper_common::config::Config;
use netmapper_common::error::ToolError;
use netmapper_common::network::host::HostCandidate;
use netmapper_common::network::range::IpCollection;
use netmapper_common::{info, success, warn};

use crate::enumerator::HostEnumerator;

pub mod resolver;
pub mod sweep;

/// Which rung of the ladder produced the host list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMethod {
    Enumerator,
    IcmpSweep,
    HandshakeSweep,
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumerator => f.write_str("host enumerator"),
            Self::IcmpSweep => f.write_str("ICMP sweep"),
            Self::HandshakeSweep => f.write_str("TCP handshake sweep"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Discovery {
    pub method: DiscoveryMethod,
    /// Sorted by address, one entry per address, all within the targets.
    pub hosts: Vec<HostCandidate>,
}

/// Executes a full host discovery cycle against the specified targets.
///
/// Target addresses are walked lazily by each rung; only the live hosts are
/// held in memory.
pub async fn perform_discovery(
    targets: &IpCollection,
    cfg: &Config,
    enumerator: Option<&dyn HostEnumerator>,
) -> Discovery {
    if targets.is_empty() {
        return Discovery {
            method: DiscoveryMethod::IcmpSweep,
            hosts: Vec::new(),
        };
    }

    let (method, hosts) = match run_ladder(targets, cfg, enumerator).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Discovery unavailable, no hosts reported: {e}");
            (DiscoveryMethod::HandshakeSweep, Vec::new())
        }
    };

    let mut hosts: Vec<HostCandidate> = hosts
        .into_iter()
        .filter(|host| targets.contains(&host.ip))
        .collect();
    hosts.sort_by_key(|host| host.ip);
    hosts.dedup_by_key(|host| host.ip);

    let hosts = resolver::enrich(hosts, cfg).await;
    success!("{} of {} addresses up ({method})", hosts.len(), targets.len());

    Discovery { method, hosts }
}

async fn run_ladder(
    targets: &IpCollection,
    cfg: &Config,
    enumerator: Option<&dyn HostEnumerator>,
) -> Result<(DiscoveryMethod, Vec<HostCandidate>), ToolError> {
    if let Some(enumerator) = enumerator {
        match enumerator.sweep(targets).await {
            Ok(hosts) => return Ok((DiscoveryMethod::Enumerator, hosts)),
            Err(e) => warn!("{} unavailable, falling back to ICMP sweep: {e}", enumerator.name()),
        }
    }

    match sweep::icmp_sweep(targets.iter(), cfg).await {
        Ok(hosts) => return Ok((DiscoveryMethod::IcmpSweep, hosts)),
        Err(e) if e.is_unavailable() => {
            warn!("ICMP sweep unavailable, falling back to TCP handshakes: {e}");
        }
        Err(e) => return Err(e),
    }

    info!("Knocking on {} addresses", targets.len());
    let hosts = sweep::handshake_sweep(targets.iter(), cfg).await;
    Ok((DiscoveryMethod::HandshakeSweep, hosts))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
