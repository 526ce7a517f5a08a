use std::net::{IpAddr, Ipv4Addr};

use netmapper_common::network::mac::{self, MacAddr};

/// IP→MAC pairs from a neighbour table dump.
///
/// Understands `/proc/net/arp`, `arp -a`/`arp -an` on Linux and the BSDs
/// (`? (10.0.0.1) at 0:c:29:12:34:56 on en0`) and Windows `arp -a`
/// (`10.0.0.1   00-0c-29-12-34-56   dynamic`). Incomplete entries and
/// placeholder addresses are skipped. The first entry for an address wins.
pub fn parse_neighbors(output: &str) -> Vec<(IpAddr, MacAddr)> {
    let mut neighbors: Vec<(IpAddr, MacAddr)> = Vec::new();

    for line in output.lines() {
        let Some(entry) = parse_line(line) else {
            continue;
        };
        if neighbors.iter().any(|(ip, _)| *ip == entry.0) {
            continue;
        }
        neighbors.push(entry);
    }

    neighbors
}

fn parse_line(line: &str) -> Option<(IpAddr, MacAddr)> {
    let mut ip: Option<Ipv4Addr> = None;
    let mut mac: Option<MacAddr> = None;

    for token in line.split_whitespace() {
        let token = token.trim_matches(|c| c == '(' || c == ')');
        if ip.is_none() {
            if let Ok(addr) = token.parse::<Ipv4Addr>() {
                ip = Some(addr);
                continue;
            }
        }
        if mac.is_none() && (token.contains(':') || token.contains('-')) {
            mac = mac::parse_mac(token);
        }
    }

    let mac = mac.filter(|mac| !mac::is_placeholder(*mac))?;
    Some((IpAddr::V4(ip?), mac))
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

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn parses_proc_net_arp() {
        let table = "IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         a4:2b:b0:11:22:33     *        wlan0
192.168.1.23     0x1         0x0         00:00:00:00:00:00     *        wlan0";
        let neighbors = parse_neighbors(table);
        assert_eq!(
            neighbors,
            vec![(v4(192, 168, 1, 1), MacAddr::new(0xa4, 0x2b, 0xb0, 0x11, 0x22, 0x33))]
        );
    }

    #[test]
    fn parses_bsd_arp_output() {
        let output = "? (10.0.0.1) at 0:c:29:12:34:56 on en0 ifscope [ethernet]
? (10.0.0.9) at (incomplete) on en0 ifscope [ethernet]
gateway (10.0.0.254) at b8:27:eb:01:02:03 [ether] on eth0";
        let neighbors = parse_neighbors(output);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0], (v4(10, 0, 0, 1), MacAddr::new(0, 0x0c, 0x29, 0x12, 0x34, 0x56)));
        assert_eq!(neighbors[1].0, v4(10, 0, 0, 254));
    }

    #[test]
    fn parses_windows_arp_output() {
        let output = "
Interface: 192.168.0.10 --- 0xb
  Internet Address      Physical Address      Type
  192.168.0.1           00-50-56-c0-00-08     dynamic
  192.168.0.255         ff-ff-ff-ff-ff-ff     static";
        let neighbors = parse_neighbors(output);
        assert_eq!(
            neighbors,
            vec![(v4(192, 168, 0, 1), MacAddr::new(0x00, 0x50, 0x56, 0xc0, 0x00, 0x08))]
        );
    }

    #[test]
    fn duplicate_addresses_keep_first_entry() {
        let output = "? (10.0.0.1) at 00:0c:29:00:00:01 on en0
? (10.0.0.1) at 00:0c:29:00:00:02 on en1";
        let neighbors = parse_neighbors(output);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].1, MacAddr::new(0, 0x0c, 0x29, 0, 0, 1));
    }
}
