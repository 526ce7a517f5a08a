use std::net::IpAddr;

use pnet::util::MacAddr;

/// An address believed reachable, pending further probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCandidate {
    pub ip: IpAddr,
    pub mac: Option<MacAddr>,
    pub hostname: Option<String>,
}

impl HostCandidate {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            mac: None,
            hostname: None,
        }
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_hostname(mut self, hostname: String) -> Self {
        self.hostname = Some(hostname);
        self
    }
}
