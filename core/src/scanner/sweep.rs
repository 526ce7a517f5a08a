use std::net::IpAddr;

use futures::stream::{self, StreamExt};
use netmapper_common::config::Config;
use netmapper_common::debug;
use netmapper_common::error::ToolError;
use netmapper_common::network::host::HostCandidate;

use crate::network::tcp::Knock;
use crate::network::{ping, tcp};

enum Echo {
    Reply,
    Silent,
    Unusable(ToolError),
}

async fn echo(ip: IpAddr, cfg: &Config) -> Echo {
    for attempt in 0..=cfg.retry_attempts {
        match ping::ping(ip, cfg.ping_timeout).await {
            Ok(Some(_)) => return Echo::Reply,
            Ok(None) => debug!("{ip}: no echo reply (attempt {})", attempt + 1),
            Err(e) if e.is_unavailable() => return Echo::Unusable(e),
            Err(e) => debug!("{ip}: ping failed: {e}"),
        }
    }
    Echo::Silent
}

/// One echo request per address, at most `max_concurrent_pings` in flight.
///
/// `Err` only when the ping utility could not be used and nobody replied;
/// a sweep in which every address stayed silent is a valid empty result.
pub async fn icmp_sweep(
    addresses: impl IntoIterator<Item = IpAddr>,
    cfg: &Config,
) -> Result<Vec<HostCandidate>, ToolError> {
    let (hosts, unusable) = stream::iter(addresses)
        .map(|ip| async move { (ip, echo(ip, cfg).await) })
        .buffer_unordered(cfg.max_concurrent_pings.max(1))
        .fold((Vec::new(), None), |(mut hosts, mut unusable), (ip, echo)| async move {
            match echo {
                Echo::Reply => hosts.push(HostCandidate::new(ip)),
                Echo::Silent => {}
                Echo::Unusable(e) => unusable = Some(e),
            }
            (hosts, unusable)
        })
        .await;

    match unusable {
        Some(e) if hosts.is_empty() => Err(e),
        _ => Ok(hosts),
    }
}

/// Handshake answers gathered over a whole sweep.
#[derive(Debug, Default)]
struct Knocks {
    accepted: Vec<IpAddr>,
    refused: Vec<IpAddr>,
    silent: usize,
}

impl Knocks {
    fn record(mut self, ip: IpAddr, knock: Knock) -> Self {
        match knock {
            Knock::Accepted => self.accepted.push(ip),
            Knock::Refused => self.refused.push(ip),
            Knock::Silent => self.silent += 1,
        }
        self
    }

    /// Hosts the sweep can vouch for.
    ///
    /// A reset from a remote address only counts when some other address
    /// stayed silent. When every address resets, a firewall or middlebox is
    /// answering for the whole range and only accepted handshakes are kept.
    /// Loopback resets come from the local stack and always count.
    fn live(self) -> Vec<IpAddr> {
        let trust_resets = self.silent > 0;
        let mut live = self.accepted;
        live.extend(
            self.refused
                .into_iter()
                .filter(|ip| trust_resets || ip.is_loopback()),
        );
        live
    }
}

/// Liveness by TCP handshake on well-known ports, for hosts that cannot be
/// pinged from here.
pub async fn handshake_sweep(
    addresses: impl IntoIterator<Item = IpAddr>,
    cfg: &Config,
) -> Vec<HostCandidate> {
    let knocks = stream::iter(addresses)
        .map(|ip| async move { (ip, tcp::handshake_probe(ip, cfg.connect_timeout).await) })
        .buffer_unordered(cfg.max_concurrent_pings.max(1))
        .fold(Knocks::default(), |knocks, (ip, knock)| async move {
            knocks.record(ip, knock)
        })
        .await;

    debug!(
        "handshake sweep: {} accepted, {} reset, {} silent",
        knocks.accepted.len(),
        knocks.refused.len(),
        knocks.silent
    );
    knocks.live().into_iter().map(HostCandidate::new).collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
