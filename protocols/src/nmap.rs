//! Arguments for, and parsing of, nmap's grepable output (`-oG -`).
//!
//! A grepable line is a tab-separated list of `Key: value` fields:
//!
//! ```text
//! Host: 10.0.0.1 (router.lan)	Status: Up
//! Host: 10.0.0.1 ()	Ports: 22/open/tcp//ssh///	OS: Linux 4.15 - 5.8	Seq Index: 260
//! ```
//!
//! The same host may appear on several lines; they are merged.

use std::collections::BTreeMap;
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NmapHost {
    pub ip: IpAddr,
    pub hostname: Option<String>,
    pub up: bool,
    pub os: Option<String>,
    /// Open TCP ports from the `Ports:` field, in reported order.
    pub ports: Vec<NmapPort>,
}

/// One `port/state/protocol/owner/service/rpc/version/` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NmapPort {
    pub port: u16,
    pub service: Option<String>,
    pub version: Option<String>,
}

/// Ping sweep over the addresses fed on stdin, without name resolution.
pub fn sweep_args() -> Vec<String> {
    ["-sn", "-n", "-oG", "-", "-iL", "-"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

/// OS fingerprint of a single address.
pub fn os_args(ip: IpAddr) -> Vec<String> {
    let mut args: Vec<String> = ["-O", "--osscan-guess", "-n", "-oG", "-"]
        .iter()
        .map(|arg| arg.to_string())
        .collect();
    if ip.is_ipv6() {
        args.push("-6".into());
    }
    args.push(ip.to_string());
    args
}

/// Service and version detection on `ports` of a single address.
///
/// `-sS` needs raw sockets; without privileges nmap falls back to connect
/// scans on its own.
pub fn services_args(ip: IpAddr, ports: &[u16], privileged: bool) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    if privileged {
        args.push("-sS".into());
    }
    args.extend(["-sV", "-Pn", "-n", "-oG", "-"].iter().map(|arg| arg.to_string()));
    if !ports.is_empty() {
        let list = ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        args.push("-p".into());
        args.push(list);
    }
    if ip.is_ipv6() {
        args.push("-6".into());
    }
    args.push(ip.to_string());
    args
}

pub fn parse_grepable(output: &str) -> Vec<NmapHost> {
    let mut hosts: BTreeMap<IpAddr, NmapHost> = BTreeMap::new();

    for line in output.lines() {
        if line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let Some((ip, hostname)) = fields.next().and_then(parse_host_field) else {
            continue;
        };

        let host = hosts.entry(ip).or_insert_with(|| NmapHost {
            ip,
            hostname: None,
            up: false,
            os: None,
            ports: Vec::new(),
        });
        if host.hostname.is_none() {
            host.hostname = hostname;
        }

        for field in fields {
            let Some((key, value)) = field.split_once(": ") else {
                continue;
            };
            match key.trim() {
                "Status" => host.up |= value.trim().eq_ignore_ascii_case("up"),
                "OS" => {
                    let guess = value.trim();
                    if !guess.is_empty() && host.os.is_none() {
                        host.os = Some(guess.to_string());
                    }
                }
                // A port list means the host answered.
                "Ports" => {
                    host.up = true;
                    for entry in value.split(", ") {
                        if let Some(port) = parse_port_entry(entry) {
                            if !host.ports.iter().any(|known| known.port == port.port) {
                                host.ports.push(port);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    hosts.into_values().collect()
}

/// Open TCP entries only; versions keep nmap's own wording.
fn parse_port_entry(entry: &str) -> Option<NmapPort> {
    let mut parts = entry.trim().split('/');
    let port = parts.next()?.parse::<u16>().ok()?;
    let state = parts.next()?;
    let transport = parts.next()?;
    if state != "open" || transport != "tcp" {
        return None;
    }
    let _owner = parts.next();
    let service = parts.next().and_then(non_empty);
    let _rpc = parts.next();
    let version = parts.next().and_then(non_empty);

    Some(NmapPort {
        port,
        service,
        version,
    })
}

fn non_empty(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty()).then(|| field.to_string())
}

fn parse_host_field(field: &str) -> Option<(IpAddr, Option<String>)> {
    let rest = field.strip_prefix("Host: ")?;
    let (addr, name) = match rest.split_once(' ') {
        Some((addr, name)) => (addr, name),
        None => (rest, ""),
    };
    let ip = addr.trim().parse::<IpAddr>().ok()?;
    let name = name
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    let hostname = (!name.is_empty()).then(|| name.to_string());
    Some((ip, hostname))
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

    const SWEEP: &str = "# Nmap 7.94 scan initiated Mon Oct  6 12:00:00 2025
Host: 192.168.1.1 ()\tStatus: Up
Host: 192.168.1.20 (printer.lan)\tStatus: Up
Host: 192.168.1.30 ()\tStatus: Down
# Nmap done at Mon Oct  6 12:00:02 2025 -- 256 IP addresses (2 hosts up) scanned in 2.10 seconds";

    const OS_SCAN: &str = concat!(
        "Host: 10.0.0.5 ()\tStatus: Up\n",
        "Host: 10.0.0.5 ()\tPorts: 22/open/tcp//ssh///, 80/open/tcp//http///",
        "\tIgnored State: closed (998)\tOS: Linux 4.15 - 5.19\tSeq Index: 260",
    );

    const SERVICE_SCAN: &str = concat!(
        "Host: 10.0.0.7 (nas.lan)\tPorts: ",
        "22/open/tcp//ssh//OpenSSH 8.9p1 Ubuntu 3ubuntu0.6 (Ubuntu Linux; protocol 2.0)/, ",
        "53/open/udp//domain///, ",
        "139/filtered/tcp//netbios-ssn///, ",
        "445/open/tcp//microsoft-ds?///, ",
        "8080/open/tcp//http-proxy///",
        "\tIgnored State: closed (995)",
    );

    #[test]
    fn sweep_reports_up_and_down_hosts() {
        let hosts = parse_grepable(SWEEP);
        assert_eq!(hosts.len(), 3);

        let up: Vec<&NmapHost> = hosts.iter().filter(|host| host.up).collect();
        assert_eq!(up.len(), 2);
        assert_eq!(up[0].ip, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(up[0].hostname, None);
        assert_eq!(up[1].hostname.as_deref(), Some("printer.lan"));
    }

    #[test]
    fn os_guess_is_merged_into_host() {
        let hosts = parse_grepable(OS_SCAN);
        assert_eq!(hosts.len(), 1);
        assert!(hosts[0].up);
        assert_eq!(hosts[0].os.as_deref(), Some("Linux 4.15 - 5.19"));
        assert_eq!(hosts[0].ports.len(), 2);
    }

    #[test]
    fn open_tcp_ports_carry_service_and_version() {
        let hosts = parse_grepable(SERVICE_SCAN);
        assert_eq!(hosts.len(), 1);
        let ports = &hosts[0].ports;

        let numbers: Vec<u16> = ports.iter().map(|port| port.port).collect();
        assert_eq!(numbers, vec![22, 445, 8080]);
        assert_eq!(ports[0].service.as_deref(), Some("ssh"));
        assert_eq!(
            ports[0].version.as_deref(),
            Some("OpenSSH 8.9p1 Ubuntu 3ubuntu0.6 (Ubuntu Linux; protocol 2.0)")
        );
        assert_eq!(ports[1].service.as_deref(), Some("microsoft-ds?"));
        assert_eq!(ports[2].version, None);
    }

    #[test]
    fn services_args_list_ports_before_target() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        let args = services_args(ip, &[22, 80], false);
        assert!(!args.contains(&"-sS".to_string()));
        assert!(args.contains(&"-sV".to_string()));
        let p = args.iter().position(|arg| arg == "-p").unwrap();
        assert_eq!(args[p + 1], "22,80");
        assert_eq!(args.last().map(String::as_str), Some("10.0.0.7"));
        assert_eq!(services_args(ip, &[22], true).first().map(String::as_str), Some("-sS"));
    }

    #[test]
    fn garbage_lines_are_ignored() {
        assert!(parse_grepable("Starting Nmap\nHost: not-an-ip ()\tStatus: Up\n").is_empty());
    }

    #[test]
    fn os_args_end_with_target() {
        let args = os_args(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(args.first().map(String::as_str), Some("-O"));
        assert_eq!(args.last().map(String::as_str), Some("10.0.0.5"));
        assert!(sweep_args().contains(&"-sn".to_string()));
    }
}
