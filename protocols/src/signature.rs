//! # Protocol Signatures
//!
//! A static, ordered registry of probe/response pairs. For a given port the
//! fingerprinter walks the entries whose candidate ports include it, in
//! declaration order, and the first entry whose patterns occur in the reply
//! names the protocol.
//!
//! Entries without response patterns are *connect-only*: an accepted
//! connection on one of their ports is enough. They are declared after every
//! pattern entry so a real exchange always gets the first say.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Http,
    Https,
    Ssh,
    Ftp,
    Smtp,
    Pop3,
    Imap,
    Dns,
    Mysql,
    Postgresql,
    Rdp,
    HttpProxy,
    HttpsAlt,
    HttpAlt,
    Jenkins,
    Mongodb,
    Redis,
    Memcached,
    Amqp,
    Mqtt,
    MqttTls,
}

impl Protocol {
    /// Display name, as reported in scan results.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Ssh => "SSH",
            Self::Ftp => "FTP",
            Self::Smtp => "SMTP",
            Self::Pop3 => "POP3",
            Self::Imap => "IMAP",
            Self::Dns => "DNS",
            Self::Mysql => "MySQL",
            Self::Postgresql => "PostgreSQL",
            Self::Rdp => "RDP",
            Self::HttpProxy => "HTTP-Proxy",
            Self::HttpsAlt => "HTTPS-Alt",
            Self::HttpAlt => "HTTP-Alt",
            Self::Jenkins => "Jenkins",
            Self::Mongodb => "MongoDB",
            Self::Redis => "Redis",
            Self::Memcached => "Memcached",
            Self::Amqp => "AMQP",
            Self::Mqtt => "MQTT",
            Self::MqttTls => "MQTT-SSL",
        }
    }

    /// Lower-case service name, the vocabulary the classifier patterns use.
    pub const fn service(self) -> &'static str {
        match self {
            Self::Http | Self::HttpProxy | Self::HttpAlt | Self::Jenkins => "http",
            Self::Https | Self::HttpsAlt => "https",
            Self::Ssh => "ssh",
            Self::Ftp => "ftp",
            Self::Smtp => "smtp",
            Self::Pop3 => "pop3",
            Self::Imap => "imap",
            Self::Dns => "dns",
            Self::Mysql => "mysql",
            Self::Postgresql => "postgresql",
            Self::Rdp => "rdp",
            Self::Mongodb => "mongodb",
            Self::Redis => "redis",
            Self::Memcached => "memcached",
            Self::Amqp => "amqp",
            Self::Mqtt | Self::MqttTls => "mqtt",
        }
    }

    /// Protocol behind a service name as nmap reports it (`ssl/http`,
    /// `ms-wbt-server`, `domain`, ...).
    pub fn from_service(name: &str) -> Option<Self> {
        let protocol = match name.trim().trim_end_matches('?') {
            "http" => Self::Http,
            "https" | "ssl/http" | "ssl/https" => Self::Https,
            "ssh" => Self::Ssh,
            "ftp" => Self::Ftp,
            "smtp" | "submission" => Self::Smtp,
            "pop3" | "pop3s" => Self::Pop3,
            "imap" | "imaps" => Self::Imap,
            "domain" | "dns" => Self::Dns,
            "mysql" => Self::Mysql,
            "postgresql" => Self::Postgresql,
            "ms-wbt-server" | "rdp" => Self::Rdp,
            "http-proxy" => Self::HttpProxy,
            "https-alt" => Self::HttpsAlt,
            "http-alt" => Self::HttpAlt,
            "mongodb" | "mongod" => Self::Mongodb,
            "redis" => Self::Redis,
            "memcached" | "memcache" => Self::Memcached,
            "amqp" => Self::Amqp,
            "mqtt" => Self::Mqtt,
            "secure-mqtt" => Self::MqttTls,
            _ => return None,
        };
        Some(protocol)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolSignature {
    pub protocol: Protocol,
    pub candidate_ports: &'static [u16],
    /// Bytes written after connecting. `None` for server-initiated protocols.
    pub probe: Option<&'static [u8]>,
    /// Any one of these is enough for a match.
    pub response_patterns: &'static [Pattern],
}

/// How a response pattern is tested against a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// The bytes occur anywhere in the reply.
    Contains(&'static [u8]),
    /// The reply is exactly these bytes.
    Exact(&'static [u8]),
}

impl Pattern {
    pub fn matches(&self, response: &[u8]) -> bool {
        match self {
            Self::Contains(needle) => contains(response, needle),
            Self::Exact(expected) => response == *expected,
        }
    }
}

impl ProtocolSignature {
    pub fn applies_to(&self, port: u16) -> bool {
        self.candidate_ports.contains(&port)
    }

    pub fn is_connect_only(&self) -> bool {
        self.response_patterns.is_empty()
    }

    pub fn matches(&self, response: &[u8]) -> bool {
        self.response_patterns
            .iter()
            .any(|pattern| pattern.matches(response))
    }
}

/// Byte-substring search.
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

pub const HTTP_PROBE: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
const TLS_PROBE: &[u8] = b"\x16\x03\x01\x00\x01\x01";
// Length-prefixed A query for example.com, id "NM", recursion desired.
const DNS_PROBE: &[u8] =
    b"\x00\x1dNM\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\x07example\x03com\x00\x00\x01\x00\x01";
// SSLRequest; the server answers with a single 'S' or 'N'.
const POSTGRES_PROBE: &[u8] = b"\x00\x00\x00\x08\x04\xd2\x16\x2f";
// X.224 connection request carrying an RDP negotiation request.
const RDP_PROBE: &[u8] =
    b"\x03\x00\x00\x13\x0e\xe0\x00\x00\x00\x00\x00\x01\x00\x08\x00\x03\x00\x00\x00";

pub static SIGNATURES: &[ProtocolSignature] = &[
    ProtocolSignature {
        protocol: Protocol::Https,
        candidate_ports: &[443, 8443],
        probe: Some(TLS_PROBE),
        response_patterns: &[
            Pattern::Contains(b"\x16\x03"),
            Pattern::Contains(b"\x17\x03"),
            Pattern::Contains(b"\x15\x03"),
        ],
    },
    ProtocolSignature {
        protocol: Protocol::Http,
        candidate_ports: &[80, 8000, 8080, 8443, 8888],
        probe: Some(HTTP_PROBE),
        response_patterns: &[Pattern::Contains(b"HTTP/")],
    },
    ProtocolSignature {
        protocol: Protocol::Ssh,
        candidate_ports: &[22],
        probe: None,
        response_patterns: &[Pattern::Contains(b"SSH-")],
    },
    ProtocolSignature {
        protocol: Protocol::Ftp,
        candidate_ports: &[21],
        probe: None,
        response_patterns: &[
            Pattern::Contains(b"220 "),
            Pattern::Contains(b"220-"),
            Pattern::Contains(b"FTP"),
        ],
    },
    ProtocolSignature {
        protocol: Protocol::Smtp,
        candidate_ports: &[25, 587],
        probe: None,
        response_patterns: &[
            Pattern::Contains(b"220 "),
            Pattern::Contains(b"220-"),
            Pattern::Contains(b"SMTP"),
        ],
    },
    ProtocolSignature {
        protocol: Protocol::Pop3,
        candidate_ports: &[110, 995],
        probe: None,
        response_patterns: &[Pattern::Contains(b"+OK"), Pattern::Contains(b"POP3")],
    },
    ProtocolSignature {
        protocol: Protocol::Imap,
        candidate_ports: &[143, 993],
        probe: None,
        response_patterns: &[Pattern::Contains(b"* OK"), Pattern::Contains(b"IMAP")],
    },
    ProtocolSignature {
        protocol: Protocol::Dns,
        candidate_ports: &[53],
        probe: Some(DNS_PROBE),
        response_patterns: &[Pattern::Contains(b"NM\x81"), Pattern::Contains(b"NM\x85")],
    },
    ProtocolSignature {
        protocol: Protocol::Mysql,
        candidate_ports: &[3306],
        probe: None,
        response_patterns: &[
            Pattern::Contains(b"mysql_native_password"),
            Pattern::Contains(b"caching_sha2_password"),
            Pattern::Contains(b"MariaDB"),
            Pattern::Contains(b"\x0a5."),
            Pattern::Contains(b"\x0a8."),
        ],
    },
    ProtocolSignature {
        protocol: Protocol::Postgresql,
        candidate_ports: &[5432],
        probe: Some(POSTGRES_PROBE),
        response_patterns: &[Pattern::Exact(b"S"), Pattern::Exact(b"N")],
    },
    ProtocolSignature {
        protocol: Protocol::Rdp,
        candidate_ports: &[3389],
        probe: Some(RDP_PROBE),
        response_patterns: &[Pattern::Contains(b"\x03\x00")],
    },
    ProtocolSignature {
        protocol: Protocol::HttpProxy,
        candidate_ports: &[8080],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::HttpsAlt,
        candidate_ports: &[8443],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::HttpAlt,
        candidate_ports: &[8888, 9090],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::Jenkins,
        candidate_ports: &[9000],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::Mongodb,
        candidate_ports: &[27017],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::Redis,
        candidate_ports: &[6379],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::Memcached,
        candidate_ports: &[11211],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::Amqp,
        candidate_ports: &[5672],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::Mqtt,
        candidate_ports: &[1883],
        probe: None,
        response_patterns: &[],
    },
    ProtocolSignature {
        protocol: Protocol::MqttTls,
        candidate_ports: &[8883],
        probe: None,
        response_patterns: &[],
    },
];

/// Registry entries to try for `port`, in match order.
pub fn for_port(port: u16) -> impl Iterator<Item = &'static ProtocolSignature> {
    SIGNATURES.iter().filter(move |signature| signature.applies_to(port))
}

/// Every port some signature knows how to talk to.
pub fn signature_ports() -> impl Iterator<Item = u16> {
    SIGNATURES
        .iter()
        .flat_map(|signature| signature.candidate_ports.iter().copied())
}

/// Conventional service name for a port, used when nothing was fingerprinted.
pub fn well_known_service(port: u16) -> Option<&'static str> {
    let name = match port {
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 | 587 => "smtp",
        53 => "dns",
        80 => "http",
        110 => "pop3",
        135 => "msrpc",
        139 => "netbios-ssn",
        143 => "imap",
        443 => "https",
        445 => "microsoft-ds",
        548 => "afp",
        554 => "rtsp",
        631 => "ipp",
        993 => "imaps",
        995 => "pop3s",
        1883 | 8883 => "mqtt",
        3306 => "mysql",
        3389 => "rdp",
        5432 => "postgresql",
        6379 => "redis",
        8080 => "http-proxy",
        8443 => "https-alt",
        9100 => "printer",
        27017 => "mongodb",
        _ => return None,
    };
    Some(name)
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

    #[test]
    fn connect_only_entries_come_last() {
        let first_connect_only = SIGNATURES
            .iter()
            .position(ProtocolSignature::is_connect_only)
            .unwrap();
        assert!(SIGNATURES[first_connect_only..]
            .iter()
            .all(ProtocolSignature::is_connect_only));
    }

    #[test]
    fn port_8443_tries_tls_before_plain_http() {
        let order: Vec<Protocol> = for_port(8443).map(|s| s.protocol).collect();
        assert_eq!(order, vec![Protocol::Https, Protocol::Http, Protocol::HttpsAlt]);
    }

    #[test]
    fn unregistered_port_has_no_signature() {
        assert_eq!(for_port(4444).count(), 0);
    }

    #[test]
    fn patterns_match_real_greetings() {
        let ssh = for_port(22).next().unwrap();
        assert!(ssh.matches(b"SSH-2.0-OpenSSH_9.6p1 Ubuntu-3ubuntu13\r\n"));
        assert!(!ssh.matches(b"HTTP/1.1 400 Bad Request\r\n"));

        let http = for_port(80).next().unwrap();
        assert!(http.matches(b"HTTP/1.0 200 OK\r\nServer: lighttpd\r\n"));

        let tls = for_port(443).next().unwrap();
        assert!(tls.matches(b"\x15\x03\x01\x00\x02\x02\x46"));
    }

    #[test]
    fn dns_probe_is_length_prefixed() {
        let dns = for_port(53).next().unwrap();
        let probe = dns.probe.unwrap();
        let declared = u16::from_be_bytes([probe[0], probe[1]]) as usize;
        assert_eq!(declared, probe.len() - 2);
        assert!(dns.matches(b"\x00\x2dNM\x81\x80\x00\x01"));
    }

    #[test]
    fn empty_needle_always_matches() {
        assert!(contains(b"", b""));
        assert!(contains(b"abc", b""));
        assert!(!contains(b"ab", b"abc"));
    }

    #[test]
    fn postgres_needs_the_single_byte_answer() {
        let postgres = for_port(5432).next().unwrap();
        assert!(postgres.matches(b"S"));
        assert!(postgres.matches(b"N"));
        assert!(!postgres.matches(b"SSH-2.0-OpenSSH_9.6\r\n"));
        assert!(!postgres.matches(b"HTTP/1.1 400 Bad Request\r\nServer: nginx\r\n"));
        assert!(!postgres.matches(b""));
    }

    #[test]
    fn services_use_classifier_vocabulary() {
        assert_eq!(Protocol::HttpProxy.service(), "http");
        assert_eq!(Protocol::Https.service(), "https");
        assert_eq!(Protocol::Postgresql.to_string(), "PostgreSQL");
        assert_eq!(well_known_service(9100), Some("printer"));
        assert_eq!(well_known_service(4444), None);
    }

    #[test]
    fn nmap_service_names_map_onto_protocols() {
        assert_eq!(Protocol::from_service("ssl/http"), Some(Protocol::Https));
        assert_eq!(Protocol::from_service("ms-wbt-server"), Some(Protocol::Rdp));
        assert_eq!(Protocol::from_service("domain?"), Some(Protocol::Dns));
        assert_eq!(Protocol::from_service("microsoft-ds"), None);
    }
}
