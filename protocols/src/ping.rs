//! Command lines for the system `ping` utility and parsers for what it
//! prints back. Each platform spells the TTL differently (`ttl=`, `TTL=`,
//! `Time to live=`) and measures the timeout in different units.

use std::net::IpAddr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingFlavor {
    /// iputils / busybox: `-W` in seconds.
    Linux,
    /// macOS and the BSDs: `-W` in milliseconds.
    Bsd,
    /// `ping.exe`: `-n` count, `-w` in milliseconds.
    Windows,
}

impl PingFlavor {
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(any(
            target_os = "macos",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd"
        )) {
            Self::Bsd
        } else {
            Self::Linux
        }
    }
}

/// Arguments for a single echo request to `ip` waiting at most `limit`.
pub fn ping_args(flavor: PingFlavor, ip: IpAddr, limit: Duration) -> Vec<String> {
    let millis = limit.as_millis().max(1);
    let mut args: Vec<String> = match flavor {
        PingFlavor::Linux => {
            let secs = limit.as_secs_f64().ceil().max(1.0) as u64;
            vec!["-c".into(), "1".into(), "-W".into(), secs.to_string()]
        }
        PingFlavor::Bsd => vec!["-c".into(), "1".into(), "-W".into(), millis.to_string()],
        PingFlavor::Windows => vec!["-n".into(), "1".into(), "-w".into(), millis.to_string()],
    };
    if ip.is_ipv6() && flavor != PingFlavor::Bsd {
        args.push("-6".into());
    }
    args.push(ip.to_string());
    args
}

/// Program name for `ip`; BSD systems ship IPv6 echo as a separate binary.
pub fn ping_program(flavor: PingFlavor, ip: IpAddr) -> &'static str {
    match (flavor, ip) {
        (PingFlavor::Bsd, IpAddr::V6(_)) => "ping6",
        _ => "ping",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingReply {
    pub ttl: Option<u32>,
    pub rtt: Option<Duration>,
}

static TTL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static RTT_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// TTL value printed on a reply line, whatever the spelling.
pub fn parse_ttl(line: &str) -> Option<u32> {
    let regex = compiled(&TTL_REGEX, r"(?i)\b(?:ttl|hlim|hop limit|time to live)\s*[=:]\s*(\d+)")?;
    regex.captures(line)?.get(1)?.as_str().parse().ok()
}

/// Round trip time printed on a reply line (`time=0.045 ms`, `time<1ms`).
pub fn parse_rtt(line: &str) -> Option<Duration> {
    let regex = compiled(&RTT_REGEX, r"(?i)\btime\s*[=<]\s*([\d.]+)\s*ms")?;
    let millis: f64 = regex.captures(line)?.get(1)?.as_str().parse().ok()?;
    Some(Duration::from_secs_f64(millis / 1000.0))
}

/// The first echo reply in `output`, if any.
///
/// Lines reporting "unreachable" are not replies even when a router answered
/// them with its own TTL.
pub fn parse_reply(output: &str) -> Option<PingReply> {
    output
        .lines()
        .filter(|line| !line.to_ascii_lowercase().contains("unreachable"))
        .find_map(|line| {
            let ttl = parse_ttl(line);
            if ttl.is_none() && !line.contains("bytes from") {
                return None;
            }
            Some(PingReply {
                ttl,
                rtt: parse_rtt(line),
            })
        })
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

    const LINUX: &str = "PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.
64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=0.412 ms

--- 192.168.1.1 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms";

    const MACOS: &str = "PING 10.0.0.7 (10.0.0.7): 56 data bytes
64 bytes from 10.0.0.7: icmp_seq=0 ttl=128 time=3.021 ms";

    const WINDOWS: &str = "Pinging 10.0.0.1 with 32 bytes of data:
Reply from 10.0.0.1: bytes=32 time<1ms TTL=255

Ping statistics for 10.0.0.1:";

    const WINDOWS_UNREACHABLE: &str = "Pinging 10.0.0.9 with 32 bytes of data:
Reply from 10.0.0.1: Destination host unreachable.";

    const LINUX_UNREACHABLE: &str = "PING 10.0.0.9 (10.0.0.9) 56(84) bytes of data.
From 10.0.0.1 icmp_seq=1 Destination Host Unreachable";

    #[test]
    fn parses_linux_reply() {
        let reply = parse_reply(LINUX).unwrap();
        assert_eq!(reply.ttl, Some(64));
        let rtt = reply.rtt.unwrap().as_secs_f64();
        assert!((rtt - 0.000412).abs() < 1e-6, "rtt was {rtt}");
    }

    #[test]
    fn parses_upper_case_ttl() {
        let reply = parse_reply(WINDOWS).unwrap();
        assert_eq!(reply.ttl, Some(255));
        let rtt = reply.rtt.unwrap().as_secs_f64();
        assert!((rtt - 0.001).abs() < 1e-6, "rtt was {rtt}");
        assert_eq!(parse_reply(MACOS).unwrap().ttl, Some(128));
    }

    #[test]
    fn parses_spelled_out_ttl() {
        assert_eq!(parse_ttl("Reply from 10.1.1.1: Time to live=117"), Some(117));
        assert_eq!(parse_ttl("16 bytes from ::1, icmp_seq=0 hlim=64"), Some(64));
        assert_eq!(parse_ttl("no ttl here"), None);
    }

    #[test]
    fn unreachable_is_not_a_reply() {
        assert_eq!(parse_reply(WINDOWS_UNREACHABLE), None);
        assert_eq!(parse_reply(LINUX_UNREACHABLE), None);
        assert_eq!(parse_reply(""), None);
    }

    #[test]
    fn args_follow_platform_units() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let limit = Duration::from_millis(1500);
        assert_eq!(ping_args(PingFlavor::Linux, ip, limit), ["-c", "1", "-W", "2", "10.0.0.1"]);
        assert_eq!(ping_args(PingFlavor::Bsd, ip, limit), ["-c", "1", "-W", "1500", "10.0.0.1"]);
        assert_eq!(
            ping_args(PingFlavor::Windows, ip, limit),
            ["-n", "1", "-w", "1500", "10.0.0.1"]
        );
    }

    #[test]
    fn ipv6_selects_family() {
        let ip: IpAddr = "fe80::1".parse().unwrap();
        let args = ping_args(PingFlavor::Linux, ip, Duration::from_secs(1));
        assert_eq!(args.last().unwrap(), "fe80::1");
        assert!(args.contains(&"-6".to_string()));
        assert_eq!(ping_program(PingFlavor::Bsd, ip), "ping6");
    }
}
