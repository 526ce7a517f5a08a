//! # Scan Target Model
//!
//! Defines the possible inputs for a network scan.
//!
//! This module handles parsing and representing targets, which can be:
//! * A single IP address (host).
//! * An IPv4 Range (e.g., `192.168.1.1-100`).
//! * A CIDR block (e.g., `192.168.1.0/24`), expanded to its assignable hosts.
//! * A comma-separated list of any of the above.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::error::TargetError;
use crate::network::range::{self, IpCollection, Ipv4Range};
use crate::success;

/// Represents a distinct target to be scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Scan a single specific host.
    Host { target_addr: IpAddr },
    /// Scan a range of IPv4 addresses.
    Range { ipv4_range: Ipv4Range },
    /// Holds a list of different targets
    Multi { targets: Vec<Target> },
}

impl FromStr for Target {
    type Err = TargetError;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Host**: Single IPv4/IPv6 address (e.g., "192.168.1.5").
    /// * **Range**: "Start-End" (e.g., "192.168.1.1-50", "192.168.1.1-192.168.1.50").
    /// * **CIDR**: "Network/Prefix" (e.g., "192.168.1.0/24").
    /// * **List**: any of the above separated by commas.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        Err(TargetError::Invalid(s.to_string()))
    }
}

fn resolve_target(target: Target, collection: &mut IpCollection) {
    match target {
        Target::Host { target_addr } => {
            collection.add_single(target_addr);
        }
        Target::Range { ipv4_range } => {
            collection.add_range(ipv4_range);
        }
        Target::Multi { targets } => {
            for target in targets {
                resolve_target(target, collection);
            }
        }
    }
}

/// Converts a single target into an IP collection.
pub fn to_collection(target: Target) -> IpCollection {
    let mut collection = IpCollection::new();

    resolve_target(target, &mut collection);

    let len: usize = collection.len();
    let unit: &str = if len == 1 { "IP address has been" } else { "IP addresses have been" };
    success!("{len} {unit} parsed successfully");

    collection
}

/// Parses a comma-separated list of targets (e.g., "192.168.1.5, 10.0.0.1-50").
pub fn parse_commas(s: &str) -> Result<Target, TargetError> {
    let mut targets = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let target = Target::from_str(part).map_err(|e| TargetError::Multi {
            part: part.to_string(),
            source: Box::new(e),
        })?;

        targets.push(target);
    }

    if targets.is_empty() {
        return Err(TargetError::Invalid(s.to_string()));
    }

    Ok(Target::Multi { targets })
}

/// Parses a single IP address.
fn parse_host(s: &str) -> Option<Target> {
    s.parse::<IpAddr>()
        .ok()
        .map(|target_addr| Target::Host { target_addr })
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<Target>, TargetError> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| TargetError::RangeStart {
            input: s.to_string(),
            reason: e.to_string(),
        })?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr, s)?;

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    Ok(Some(Target::Range { ipv4_range }))
}

/// Helper to parse the end address of a range.
///
/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(
    end_str: &str,
    start_addr: &Ipv4Addr,
    original_s: &str,
) -> Result<Ipv4Addr, TargetError> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    let range_end = |reason: String| TargetError::RangeEnd {
        input: original_s.to_string(),
        reason,
    };

    if end_str.is_empty() {
        return Err(range_end("end of range cannot be empty".into()));
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| range_end(format!("'{end_str}': {e}")))?;

    if partial_octets.len() > 4 {
        return Err(range_end(format!("too many octets in '{end_str}'")));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<Target>, TargetError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let cidr_error = |reason: String| TargetError::Cidr {
        input: s.to_string(),
        reason,
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| cidr_error(e.to_string()))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| cidr_error(e.to_string()))?;

    let ipv4_range = range::cidr_hosts(ipv4_addr, prefix)?;

    Ok(Some(Target::Range { ipv4_range }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_range_end_addr_helper() {
        let start = Ipv4Addr::new(192, 168, 1, 10);
        let s = "192.168.1.10-255";

        assert_eq!(
            parse_range_end_addr("192.168.1.50", &start, s),
            Ok(Ipv4Addr::new(192, 168, 1, 50))
        );
        assert_eq!(
            parse_range_end_addr("50", &start, s),
            Ok(Ipv4Addr::new(192, 168, 1, 50))
        );
        assert_eq!(
            parse_range_end_addr("2.66", &start, s),
            Ok(Ipv4Addr::new(192, 168, 2, 66))
        );
        assert_eq!(
            parse_range_end_addr("10.2.1", &start, s),
            Ok(Ipv4Addr::new(192, 10, 2, 1))
        );

        assert!(parse_range_end_addr("2.256", &start, "192.168.1.10-2.256").is_err());
        assert!(parse_range_end_addr("1.2.3.4.5", &start, "192.168.1.10-1.2.3.4.5").is_err());
        assert!(parse_range_end_addr("", &start, "192.168.1.10-").is_err());
    }

    #[test]
    fn test_from_str_full_parsing() {
        assert!(matches!(Target::from_str("1.1.1.1"), Ok(Target::Host { .. })));
        assert!(matches!(Target::from_str("::1"), Ok(Target::Host { .. })));
        assert!(matches!(
            Target::from_str("10.0.0.1-10.0.0.255"),
            Ok(Target::Range { .. })
        ));
        assert!(matches!(
            Target::from_str("192.168.1.1-2.255"),
            Ok(Target::Range { .. })
        ));
        assert!(matches!(Target::from_str("10.0.0.0/24"), Ok(Target::Range { .. })));

        assert!(Target::from_str("not-an-ip").is_err());
        assert!(Target::from_str("").is_err());
        assert_eq!(Target::from_str("10.0.0.1/33"), Err(TargetError::Prefix(33)));
        assert!(matches!(
            Target::from_str("10.0.0.256-1.1.1.1"),
            Err(TargetError::RangeStart { .. })
        ));
    }

    #[test]
    fn test_cidr_target_excludes_network_and_broadcast() {
        let collection = to_collection(Target::from_str("192.168.7.0/30").unwrap());
        let addrs: Vec<IpAddr> = collection.iter().collect();
        assert_eq!(
            addrs,
            vec![
                IpAddr::V4(Ipv4Addr::new(192, 168, 7, 1)),
                IpAddr::V4(Ipv4Addr::new(192, 168, 7, 2)),
            ]
        );
    }

    #[test]
    fn test_commas_build_a_multi_target() {
        let target = Target::from_str("10.0.0.1, 10.0.0.5-6,").unwrap();
        let Target::Multi { targets } = &target else {
            panic!("expected a multi target, got {target:?}");
        };
        assert_eq!(targets.len(), 2);
        assert_eq!(to_collection(target).len(), 3);
    }

    #[test]
    fn test_commas_reject_one_bad_member() {
        let err = Target::from_str("10.0.0.1,bogus").unwrap_err();
        assert!(matches!(err, TargetError::Multi { ref part, .. } if part == "bogus"));
        assert!(Target::from_str(",,").is_err());
    }

    #[test]
    fn test_reversed_range_parses_to_nothing() {
        let target = Target::from_str("10.0.0.5-10.0.0.1").unwrap();
        assert!(to_collection(target).is_empty());
    }
}
