//! # Address Ranges
//!
//! Continuous IPv4 ranges and the [`IpCollection`] a parsed target expands
//! into. Ranges stay lazy: the collection is counted arithmetically and
//! walked one address at a time.

use std::collections::BTreeSet;
use std::iter::Peekable;
use std::net::{IpAddr, Ipv4Addr};

use pnet::ipnetwork::Ipv4Network;

use crate::error::TargetError;

/// A continuous range of IPv4 addresses, inclusive.
///
/// A range whose start lies after its end is empty rather than invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Ipv4Addr> + Clone {
        let start: u32 = u32::from(self.start_addr);
        let end: u32 = u32::from(self.end_addr);
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn to_iter(&self) -> impl Iterator<Item = IpAddr> {
        self.iter().map(IpAddr::V4)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.start_addr <= addr && addr <= self.end_addr
    }

    pub fn is_empty(&self) -> bool {
        self.start_addr > self.end_addr
    }

    /// Number of addresses in the range.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        u64::from(u32::from(self.end_addr)) - u64::from(u32::from(self.start_addr)) + 1
    }
}

/// The range covering the entire network block, network and broadcast
/// addresses included.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Range, TargetError> {
    if prefix > 32 {
        return Err(TargetError::Prefix(prefix));
    }
    let network = Ipv4Network::new(ip, prefix).map_err(|e| TargetError::Cidr {
        input: format!("{ip}/{prefix}"),
        reason: e.to_string(),
    })?;

    Ok(Ipv4Range::new(network.network(), network.broadcast()))
}

/// The assignable addresses of a network block.
///
/// Network and broadcast addresses are stripped for /30 and wider; /31 and
/// /32 blocks keep every address.
pub fn cidr_hosts(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Range, TargetError> {
    let block = cidr_range(ip, prefix)?;
    if prefix >= 31 {
        return Ok(block);
    }
    let start = u32::from(block.start_addr).saturating_add(1);
    let end = u32::from(block.end_addr).saturating_sub(1);
    Ok(Ipv4Range::new(Ipv4Addr::from(start), Ipv4Addr::from(end)))
}

/// Every address a target expands to.
///
/// IPv4 ranges are kept merged, sorted and disjoint, so counting and
/// walking the collection never materializes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpCollection {
    singles: BTreeSet<IpAddr>,
    ranges: Vec<Ipv4Range>,
}

impl IpCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_single(&mut self, addr: IpAddr) {
        self.singles.insert(addr);
    }

    pub fn add_range(&mut self, range: Ipv4Range) {
        if range.is_empty() {
            return;
        }
        self.ranges.push(range);
        self.ranges.sort_unstable_by_key(|range| range.start_addr);

        let mut merged: Vec<Ipv4Range> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if touches(last, &range) => {
                    last.end_addr = last.end_addr.max(range.end_addr);
                }
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.singles.contains(addr) || self.in_ranges(addr)
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.ranges.is_empty()
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        let spanned: u64 = self.ranges.iter().map(Ipv4Range::len).sum();
        let loose = self.loose_singles().count() as u64;
        usize::try_from(spanned + loose).unwrap_or(usize::MAX)
    }

    /// Distinct addresses in ascending order, produced on demand.
    pub fn iter(&self) -> Addresses {
        Addresses::new(self.ranges.clone(), self.loose_singles().copied().collect())
    }

    fn in_ranges(&self, addr: &IpAddr) -> bool {
        let IpAddr::V4(v4) = addr else {
            return false;
        };
        let idx = self.ranges.partition_point(|range| range.end_addr < *v4);
        self.ranges.get(idx).is_some_and(|range| range.contains(*v4))
    }

    /// Singles not already covered by a range.
    fn loose_singles(&self) -> impl Iterator<Item = &IpAddr> {
        self.singles.iter().filter(|addr| !self.in_ranges(addr))
    }
}

fn touches(left: &Ipv4Range, right: &Ipv4Range) -> bool {
    u64::from(u32::from(right.start_addr)) <= u64::from(u32::from(left.end_addr)) + 1
}

impl IntoIterator for IpCollection {
    type Item = IpAddr;
    type IntoIter = Addresses;

    fn into_iter(self) -> Self::IntoIter {
        let singles = self.loose_singles().copied().collect();
        Addresses::new(self.ranges, singles)
    }
}

impl<'a> IntoIterator for &'a IpCollection {
    type Item = IpAddr;
    type IntoIter = Addresses;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending walk over an [`IpCollection`].
///
/// Merges the disjoint ranges with the remaining singles one address at a
/// time. IPv4 addresses come before IPv6 ones.
#[derive(Debug)]
pub struct Addresses {
    ranges: std::vec::IntoIter<Ipv4Range>,
    /// Next address and inclusive end of the range being walked.
    cursor: Option<(u32, u32)>,
    singles: Peekable<std::collections::btree_set::IntoIter<IpAddr>>,
}

impl Addresses {
    fn new(ranges: Vec<Ipv4Range>, singles: BTreeSet<IpAddr>) -> Self {
        Self {
            ranges: ranges.into_iter(),
            cursor: None,
            singles: singles.into_iter().peekable(),
        }
    }

    fn advance(&mut self) {
        if let Some((next, end)) = self.cursor {
            self.cursor = (next < end).then(|| (next + 1, end));
        }
    }
}

impl Iterator for Addresses {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        if self.cursor.is_none() {
            self.cursor = self
                .ranges
                .next()
                .map(|range| (u32::from(range.start_addr), u32::from(range.end_addr)));
        }

        let from_range = self.cursor.map(|(next, _)| IpAddr::V4(Ipv4Addr::from(next)));
        match (from_range, self.singles.peek()) {
            (Some(ranged), Some(single)) if *single < ranged => self.singles.next(),
            (Some(ranged), _) => {
                self.advance();
                Some(ranged)
            }
            (None, _) => self.singles.next(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_ipv4range_iter() {
        let start = Ipv4Addr::new(10, 0, 0, 1);
        let end = Ipv4Addr::new(10, 0, 0, 3);
        let range = Ipv4Range::new(start, end);

        let mut iter = range.iter();
        assert_eq!(iter.next(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(iter.next_back(), Some(Ipv4Addr::new(10, 0, 0, 3)));
        assert_eq!(iter.next(), Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(iter.next(), None);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_ipv4range_reversed_is_empty() {
        let range = lan(5, 1);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
        assert_eq!(range.iter().next(), None);
    }

    #[test]
    fn test_cidr_range() {
        let range = cidr_range(Ipv4Addr::new(192, 168, 1, 100), 24).unwrap();
        assert_eq!(range.start_addr, Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(range.end_addr, Ipv4Addr::new(192, 168, 1, 255));
    }

    #[test]
    fn test_cidr_range_invalid_prefix() {
        let result = cidr_range(Ipv4Addr::new(192, 168, 1, 1), 33);
        assert_eq!(result, Err(TargetError::Prefix(33)));
        assert_eq!(result.unwrap_err().to_string(), "invalid prefix: 33 > 32");
    }

    #[test]
    fn test_cidr_hosts_strips_network_and_broadcast() {
        let hosts = cidr_hosts(Ipv4Addr::new(192, 168, 1, 0), 24).unwrap();
        assert_eq!(hosts.start_addr, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(hosts.end_addr, Ipv4Addr::new(192, 168, 1, 254));
        assert_eq!(hosts.len(), 254);

        let point_to_point = cidr_hosts(Ipv4Addr::new(10, 0, 0, 0), 31).unwrap();
        assert_eq!(point_to_point.len(), 2);

        let single = cidr_hosts(Ipv4Addr::new(172, 16, 0, 1), 32).unwrap();
        assert_eq!(single.len(), 1);
    }

    fn lan(first: u8, last: u8) -> Ipv4Range {
        Ipv4Range::new(Ipv4Addr::new(10, 0, 0, first), Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_collection_dedups_overlaps() {
        let mut collection = IpCollection::new();
        collection.add_range(lan(1, 4));
        collection.add_range(lan(3, 6));
        collection.add_single(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));

        assert_eq!(collection.len(), 6);
        let first = collection.iter().next();
        assert_eq!(first, Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
    }

    #[test]
    fn test_collection_membership() {
        let mut collection = IpCollection::new();
        collection.add_range(lan(1, 9));
        collection.add_single("::1".parse().unwrap());

        assert!(collection.contains(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))));
        assert!(!collection.contains(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 10))));
        assert!(collection.contains(&"::1".parse().unwrap()));
    }

    #[test]
    fn test_collection_walks_ranges_and_singles_in_order() {
        let mut collection = IpCollection::new();
        collection.add_range(lan(8, 9));
        collection.add_single(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        collection.add_single(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)));
        collection.add_single("::1".parse().unwrap());
        collection.add_range(lan(3, 4));
        collection.add_range(lan(5, 5));

        let addrs: Vec<IpAddr> = collection.iter().collect();
        let expected: Vec<IpAddr> = [1, 3, 4, 5, 8, 9]
            .into_iter()
            .map(|last| IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)))
            .chain(["::1".parse().unwrap()])
            .collect();
        assert_eq!(addrs, expected);
        assert_eq!(collection.len(), expected.len());
        assert_eq!(collection.into_iter().count(), expected.len());
    }

    #[test]
    fn test_large_block_is_counted_without_expansion() {
        let mut collection = IpCollection::new();
        collection.add_range(cidr_hosts(Ipv4Addr::new(10, 0, 0, 0), 8).unwrap());
        collection.add_range(cidr_range(Ipv4Addr::new(10, 0, 0, 0), 8).unwrap());
        collection.add_single(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)));

        assert_eq!(collection.len(), 1 << 24);
        let mut walk = collection.iter();
        assert_eq!(walk.next(), Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0))));
        assert_eq!(walk.next(), Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(collection.contains(&IpAddr::V4(Ipv4Addr::new(10, 255, 255, 255))));
    }

    #[test]
    fn test_empty_range_is_dropped() {
        let mut collection = IpCollection::new();
        collection.add_range(lan(5, 1));
        assert!(collection.is_empty());
        assert_eq!(collection.len(), 0);
    }
}
