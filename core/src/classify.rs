//! # Device/OS Classifier
//!
//! Turns the noisy facts gathered about a host (open ports, service names,
//! hostname) into a device category and an OS family.
//!
//! Scoring is additive over static pattern registries:
//!
//! | evidence                                   | weight |
//! |--------------------------------------------|--------|
//! | open port listed by the pattern            | +2     |
//! | detected service listed by the pattern     | +3     |
//! | pattern marker found in the hostname       | +5     |
//!
//! The highest total wins. Equal totals fall to the pattern with the lower
//! `priority` value, so identical facts always yield the same answer.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use crate::model::{DeviceType, OsFamily};

pub const PORT_WEIGHT: u32 = 2;
pub const SERVICE_WEIGHT: u32 = 3;
pub const HOSTNAME_WEIGHT: u32 = 5;

/// The only ports [`quick_classify`] looks at.
pub const QUICK_CLASSIFY_PORTS: [u16; 6] = [22, 23, 80, 443, 3389, 9100];

const SSH_PORT: u16 = 22;
const HTTP_PORTS: [u16; 2] = [80, 443];
const RDP_PORT: u16 = 3389;
const PRINTER_PORT: u16 = 9100;

/// Everything the classifier may look at for one host.
#[derive(Debug, Clone, Copy)]
pub struct HostFacts<'a> {
    pub open_ports: &'a BTreeSet<u16>,
    /// Service name per open port, in the lowercase service vocabulary.
    pub services: &'a BTreeMap<u16, String>,
    pub hostname: Option<&'a str>,
}

#[derive(Debug)]
pub struct DevicePattern {
    pub device: DeviceType,
    pub ports: &'static [u16],
    pub services: &'static [&'static str],
    pub hostname_markers: &'static [&'static str],
    /// Lower wins a tie.
    pub priority: u8,
}

#[derive(Debug)]
pub struct OsPattern {
    pub family: OsFamily,
    /// Initial TTLs this family is seen with.
    pub ttl: RangeInclusive<u32>,
    pub ports: &'static [u16],
    pub services: &'static [&'static str],
    pub hostname_markers: &'static [&'static str],
}

pub static DEVICE_PATTERNS: [DevicePattern; 8] = [
    DevicePattern {
        device: DeviceType::Router,
        ports: &[80, 443, 22, 23],
        services: &["http", "https", "ssh", "telnet"],
        hostname_markers: &["router", "gateway", "cisco", "juniper", "fortinet"],
        priority: 1,
    },
    DevicePattern {
        device: DeviceType::Switch,
        ports: &[22, 23, 80, 443],
        services: &["http", "https", "ssh", "telnet"],
        hostname_markers: &["switch", "catalyst", "nexus"],
        priority: 2,
    },
    DevicePattern {
        device: DeviceType::Server,
        ports: &[22, 80, 443, 3306, 5432, 27017],
        services: &["ssh", "http", "https", "mysql", "postgresql", "mongodb"],
        hostname_markers: &["server", "apache", "nginx", "mysql", "postgresql"],
        priority: 3,
    },
    DevicePattern {
        device: DeviceType::Printer,
        ports: &[80, 443, 631, 9100],
        services: &["http", "https", "ipp", "printer"],
        hostname_markers: &["printer", "hp", "canon", "epson", "brother"],
        priority: 4,
    },
    DevicePattern {
        device: DeviceType::Camera,
        ports: &[80, 443, 554, 8000],
        services: &["http", "https", "rtsp"],
        hostname_markers: &["camera", "ipcam", "dvr", "nvr"],
        priority: 5,
    },
    DevicePattern {
        device: DeviceType::Iot,
        ports: &[80, 443, 1883, 8883],
        services: &["http", "https", "mqtt"],
        hostname_markers: &["iot", "smart", "home", "automation"],
        priority: 6,
    },
    DevicePattern {
        device: DeviceType::Mobile,
        ports: &[80, 443],
        services: &["http", "https"],
        hostname_markers: &["mobile", "android", "ios", "phone"],
        priority: 7,
    },
    DevicePattern {
        device: DeviceType::Workstation,
        ports: &[22, 80, 443, 3389],
        services: &["ssh", "http", "https", "rdp"],
        hostname_markers: &["windows", "linux", "mac", "desktop"],
        priority: 8,
    },
];

pub static OS_PATTERNS: [OsPattern; 5] = [
    OsPattern {
        family: OsFamily::Windows,
        ttl: 65..=128,
        ports: &[135, 139, 445, 3389],
        services: &["msrpc", "netbios-ssn", "microsoft-ds", "rdp"],
        hostname_markers: &["windows", "microsoft", "nt", "win"],
    },
    OsPattern {
        family: OsFamily::Linux,
        ttl: 1..=64,
        ports: &[22, 80, 443],
        services: &["ssh", "http", "https"],
        hostname_markers: &["linux", "ubuntu", "debian", "centos", "redhat"],
    },
    OsPattern {
        family: OsFamily::MacOs,
        ttl: 1..=64,
        ports: &[22, 80, 443, 548],
        services: &["ssh", "http", "https", "afp"],
        hostname_markers: &["mac", "darwin", "apple"],
    },
    OsPattern {
        family: OsFamily::CiscoIos,
        ttl: 129..=255,
        ports: &[22, 23, 80, 443],
        services: &["ssh", "telnet", "http", "https"],
        hostname_markers: &["cisco", "ios", "router"],
    },
    OsPattern {
        family: OsFamily::Android,
        ttl: 1..=64,
        ports: &[80, 443],
        services: &["http", "https"],
        hostname_markers: &["android", "mobile"],
    },
];

fn score(
    facts: &HostFacts<'_>,
    ports: &[u16],
    services: &[&str],
    hostname_markers: &[&str],
) -> u32 {
    let port_hits = facts
        .open_ports
        .iter()
        .filter(|port| ports.contains(*port))
        .count() as u32;

    let service_hits = facts
        .services
        .values()
        .filter(|service| services.contains(&service.as_str()))
        .count() as u32;

    let hostname_hits = facts.hostname.map_or(0, |hostname| {
        let hostname = hostname.to_lowercase();
        hostname_markers
            .iter()
            .filter(|marker| hostname.contains(*marker))
            .count() as u32
    });

    port_hits * PORT_WEIGHT + service_hits * SERVICE_WEIGHT + hostname_hits * HOSTNAME_WEIGHT
}

pub fn score_device(pattern: &DevicePattern, facts: &HostFacts<'_>) -> u32 {
    score(
        facts,
        pattern.ports,
        pattern.services,
        pattern.hostname_markers,
    )
}

/// Weighted classification against [`DEVICE_PATTERNS`].
pub fn classify_device(facts: &HostFacts<'_>) -> DeviceType {
    classify_device_with(&DEVICE_PATTERNS, facts)
}

/// Weighted classification against an arbitrary registry.
///
/// Registry order is irrelevant: the best score wins, then the lowest
/// priority, then the lowest [`DeviceType`] ordinal.
pub fn classify_device_with(patterns: &[DevicePattern], facts: &HostFacts<'_>) -> DeviceType {
    patterns
        .iter()
        .map(|pattern| (score_device(pattern, facts), pattern))
        .filter(|(score, _)| *score > 0)
        .min_by(|(score_a, a), (score_b, b)| {
            score_b
                .cmp(score_a)
                .then(a.priority.cmp(&b.priority))
                .then(a.device.cmp(&b.device))
        })
        .map_or(DeviceType::Unknown, |(_, pattern)| pattern.device)
}

/// Cheap classification from a handful of high-signal ports.
pub fn quick_classify(facts: &HostFacts<'_>) -> DeviceType {
    let open = |port: u16| facts.open_ports.contains(&port);

    if open(PRINTER_PORT) {
        DeviceType::Printer
    } else if open(RDP_PORT) {
        DeviceType::Workstation
    } else if open(SSH_PORT) && open(HTTP_PORTS[0]) {
        DeviceType::Server
    } else if HTTP_PORTS.into_iter().any(open) {
        DeviceType::Device
    } else {
        DeviceType::Unknown
    }
}

/// Coarse OS bucket from an observed IP TTL.
pub fn os_from_ttl(ttl: u32) -> OsFamily {
    match ttl {
        0..=64 => OsFamily::LinuxOrMacos,
        65..=128 => OsFamily::Windows,
        129..=255 => OsFamily::NetworkDevice,
        _ => OsFamily::Unknown,
    }
}

/// TTL bucket, sharpened by [`OS_PATTERNS`] when the evidence is unambiguous.
///
/// A pattern label replaces the bucket only when exactly one pattern whose
/// TTL range contains `ttl` has the strictly highest positive score.
pub fn refine_os(ttl: u32, facts: &HostFacts<'_>) -> OsFamily {
    let scored: Vec<(u32, &OsPattern)> = OS_PATTERNS
        .iter()
        .filter(|pattern| pattern.ttl.contains(&ttl))
        .map(|pattern| {
            let score = score(
                facts,
                pattern.ports,
                pattern.services,
                pattern.hostname_markers,
            );
            (score, pattern)
        })
        .collect();

    let best = scored.iter().map(|(score, _)| *score).max().unwrap_or(0);
    let mut leaders = scored.iter().filter(|(score, _)| *score == best);

    match (leaders.next(), leaders.next()) {
        (Some((_, pattern)), None) if best > 0 => pattern.family.clone(),
        _ => os_from_ttl(ttl),
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
