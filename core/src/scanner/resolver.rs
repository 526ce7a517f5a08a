use std::collections::HashMap;
use std::net::IpAddr;

use futures::stream::{self, StreamExt};
use netmapper_common::config::Config;
use netmapper_common::debug;
use netmapper_common::network::host::HostCandidate;
use netmapper_common::network::mac::MacAddr;

use crate::network::{arp, dns};

/// Fills in MAC addresses and hostnames that discovery did not observe.
///
/// Values already present are kept. Every lookup is best effort. At most
/// `max_concurrent_pings` lookups run at once; the output is in address order.
pub async fn enrich(hosts: Vec<HostCandidate>, cfg: &Config) -> Vec<HostCandidate> {
    if hosts.is_empty() {
        return hosts;
    }

    let neighbors = if cfg.mac_lookup {
        arp::neighbor_table().await
    } else {
        HashMap::new()
    };
    debug!("{} entries in the neighbour table", neighbors.len());

    let mut resolved: Vec<HostCandidate> = stream::iter(hosts)
        .map(|host| resolve_host(host, &neighbors, cfg))
        .buffer_unordered(cfg.max_concurrent_pings.max(1))
        .collect()
        .await;
    resolved.sort_by_key(|host| host.ip);
    resolved
}

async fn resolve_host(
    mut host: HostCandidate,
    neighbors: &HashMap<IpAddr, MacAddr>,
    cfg: &Config,
) -> HostCandidate {
    if host.mac.is_none() {
        host.mac = neighbors.get(&host.ip).copied();
    }
    if host.hostname.is_none() && !cfg.no_dns {
        host.hostname = dns::reverse_lookup(host.ip, cfg.dns_timeout).await;
    }
    host
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

    #[tokio::test]
    async fn known_fields_are_not_overwritten() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let mac = MacAddr::new(0x00, 0x0C, 0x29, 0x01, 0x02, 0x03);
        let mut neighbors = HashMap::new();
        neighbors.insert(ip, MacAddr::new(0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF));

        let cfg = Config {
            no_dns: true,
            ..Config::default()
        };
        let host = HostCandidate::new(ip)
            .with_mac(mac)
            .with_hostname("gw.lan".into());
        let host = resolve_host(host, &neighbors, &cfg).await;

        assert_eq!(host.mac, Some(mac));
        assert_eq!(host.hostname.as_deref(), Some("gw.lan"));
    }

    #[tokio::test]
    async fn neighbour_table_supplies_missing_mac() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        let mac = MacAddr::new(0xB8, 0x27, 0xEB, 0x00, 0x00, 0x01);
        let neighbors = HashMap::from([(ip, mac)]);
        let cfg = Config {
            no_dns: true,
            ..Config::default()
        };

        let host = resolve_host(HostCandidate::new(ip), &neighbors, &cfg).await;
        assert_eq!(host.mac, Some(mac));
        assert_eq!(host.hostname, None);
    }

    #[tokio::test]
    async fn bounded_enrichment_keeps_every_host_in_order() {
        let cfg = Config {
            no_dns: true,
            mac_lookup: false,
            max_concurrent_pings: 2,
            ..Config::default()
        };
        let hosts: Vec<HostCandidate> = (1..=50u8)
            .rev()
            .map(|n| HostCandidate::new(IpAddr::V4(Ipv4Addr::new(10, 0, 1, n))))
            .collect();

        let enriched = enrich(hosts, &cfg).await;

        assert_eq!(enriched.len(), 50);
        assert!(enriched.windows(2).all(|pair| pair[0].ip < pair[1].ip));
        assert!(enriched.iter().all(|host| host.mac.is_none() && host.hostname.is_none()));
    }
}
