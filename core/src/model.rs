//! # Scan Result Model
//!
//! The terminal, per-host records produced by the orchestrator and the labels
//! they carry. A [`ScanResult`] is assembled once at the end of a host
//! pipeline and handed to the caller as-is.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use netmapper_common::config::ScanMode;
use netmapper_common::network::host::HostCandidate;
use netmapper_common::network::mac::MacAddr;
use netmapper_protocols::Protocol;
use netmapper_protocols::banner::Capability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceType {
    Router,
    Switch,
    Server,
    Printer,
    Camera,
    Iot,
    Mobile,
    Workstation,
    /// Something speaking HTTP, without enough evidence for a category.
    Device,
    Unknown,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Router => "router",
            Self::Switch => "switch",
            Self::Server => "server",
            Self::Printer => "printer",
            Self::Camera => "camera",
            Self::Iot => "iot",
            Self::Mobile => "mobile",
            Self::Workstation => "workstation",
            Self::Device => "device",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// TTL at or below 64.
    LinuxOrMacos,
    /// TTL at or below 128.
    Windows,
    /// TTL at or below 255.
    NetworkDevice,
    Unknown,
    Linux,
    MacOs,
    CiscoIos,
    Android,
    /// Free-form guess from an external fingerprinting tool.
    Reported(String),
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LinuxOrMacos => "Linux/macOS",
            Self::Windows => "Windows",
            Self::NetworkDevice => "Network Device",
            Self::Unknown => "Unknown",
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
            Self::CiscoIos => "Cisco IOS",
            Self::Android => "Android",
            Self::Reported(guess) => guess.as_str(),
        };
        f.write_str(label)
    }
}

/// Which pipeline produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProfile {
    Discovery,
    LocalDetailed,
}

impl ScanProfile {
    /// Only `local` together with `detailed` buys the deep pipeline.
    pub fn select(mode: ScanMode, detailed: bool) -> Self {
        match (mode, detailed) {
            (ScanMode::Local, true) => Self::LocalDetailed,
            _ => Self::Discovery,
        }
    }
}

impl fmt::Display for ScanProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => f.write_str("discovery"),
            Self::LocalDetailed => f.write_str("local_detailed"),
        }
    }
}

/// What one open port said about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFinding {
    pub port: u16,
    pub protocol: Option<Protocol>,
    /// Service name as an external enumerator reported it.
    pub service: Option<String>,
    pub banner: Option<String>,
    pub version: Option<String>,
    pub capabilities: BTreeSet<Capability>,
}

impl ServiceFinding {
    pub fn unknown(port: u16) -> Self {
        Self {
            port,
            protocol: None,
            service: None,
            banner: None,
            version: None,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        self.protocol.map_or("unknown", Protocol::name)
    }

    /// Service name in the classifier's vocabulary, if anything is known.
    pub fn service_name(&self) -> Option<&str> {
        self.protocol
            .map(Protocol::service)
            .or(self.service.as_deref())
    }

    /// Folds a direct analysis of the same port into an enumerator report.
    ///
    /// The analysis names the protocol and supplies the banner; the report's
    /// version string is kept over one parsed from the banner.
    pub fn merge(self, analyzed: ServiceFinding) -> ServiceFinding {
        let mut capabilities = self.capabilities;
        capabilities.extend(analyzed.capabilities);
        ServiceFinding {
            port: self.port,
            protocol: analyzed.protocol.or(self.protocol),
            service: self.service.or(analyzed.service),
            banner: analyzed.banner.or(self.banner),
            version: self.version.or(analyzed.version),
            capabilities,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub ip: IpAddr,
    pub mac: Option<MacAddr>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub device_type: Option<DeviceType>,
    pub os_family: Option<OsFamily>,
    pub open_ports: BTreeSet<u16>,
    pub services: BTreeMap<u16, String>,
    pub protocols: BTreeSet<Protocol>,
    pub findings: BTreeMap<u16, ServiceFinding>,
    pub response_time: Option<Duration>,
    pub scan_mode: ScanProfile,
}

impl ScanResult {
    /// A result carrying only what discovery already knew.
    pub fn unprobed(host: HostCandidate, scan_mode: ScanProfile) -> Self {
        Self {
            ip: host.ip,
            mac: host.mac,
            hostname: host.hostname,
            vendor: None,
            device_type: None,
            os_family: None,
            open_ports: BTreeSet::new(),
            services: BTreeMap::new(),
            protocols: BTreeSet::new(),
            findings: BTreeMap::new(),
            response_time: None,
            scan_mode,
        }
    }
}
