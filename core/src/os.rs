use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use netmapper_common::debug;

use crate::classify::{self, HostFacts};
use crate::enumerator::HostEnumerator;
use crate::model::OsFamily;
use crate::network::ping;

/// What the OS ladder concluded, plus the echo round trip if one was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsVerdict {
    pub family: Option<OsFamily>,
    pub rtt: Option<Duration>,
}

/// OS family detection ladder: enumerator guess, then ICMP TTL.
pub struct OsDetector {
    enumerator: Option<Arc<dyn HostEnumerator>>,
    ping_timeout: Duration,
}

impl OsDetector {
    pub fn new(enumerator: Option<Arc<dyn HostEnumerator>>, ping_timeout: Duration) -> Self {
        Self {
            enumerator,
            ping_timeout,
        }
    }

    pub async fn detect_os(&self, ip: IpAddr, facts: &HostFacts<'_>) -> OsVerdict {
        if let Some(enumerator) = &self.enumerator {
            match enumerator.os_guess(ip).await {
                Ok(Some(guess)) => {
                    return OsVerdict {
                        family: Some(OsFamily::Reported(guess)),
                        rtt: None,
                    };
                }
                Ok(None) => debug!("{} had no OS guess for {ip}", enumerator.name()),
                Err(e) => debug!("{} OS detection unavailable for {ip}: {e}", enumerator.name()),
            }
        }

        match ping::ping(ip, self.ping_timeout).await {
            Ok(Some(reply)) => OsVerdict {
                family: reply.ttl.map(|ttl| classify::refine_os(ttl, facts)),
                rtt: reply.rtt,
            },
            Ok(None) => OsVerdict::default(),
            Err(e) => {
                debug!("no TTL for {ip}: {e}");
                OsVerdict::default()
            }
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
