//! Banner decoding plus version and capability extraction.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use netmapper_common::warn;
use regex::Regex;

use crate::signature::{Protocol, contains};

/// Characters kept from a decoded banner.
pub const BANNER_LIMIT: usize = 200;

const VERSION_PATTERNS: &[&str] = &[
    r"HTTP/(\d+\.\d+)",
    r"SSH-(\d+\.\d+)",
    r"FTP server \(([^)]+)\)",
    r"PostgreSQL/(\d+\.\d+)",
    r"MySQL/(\d+\.\d+)",
];

static VERSION_REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();

fn version_regexes() -> &'static [Regex] {
    VERSION_REGEXES.get_or_init(|| {
        VERSION_PATTERNS
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("skipping version pattern {pattern}: {e}");
                    None
                }
            })
            .collect()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Tls,
    Authentication,
    Compression,
    Encryption,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Tls => "SSL/TLS",
            Self::Authentication => "Authentication",
            Self::Compression => "Compression",
            Self::Encryption => "Encryption",
        };
        f.write_str(label)
    }
}

/// Printable text of a response, capped at [`BANNER_LIMIT`] characters.
///
/// Control bytes other than whitespace are dropped so binary handshakes do not
/// leak escape sequences into terminals. `None` when nothing printable is left.
pub fn decode_banner(response: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(response);
    let printable: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\r' || *c == '\t')
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .take(BANNER_LIMIT)
        .collect();
    let trimmed = printable.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First version token found by the known patterns, tried in order.
pub fn extract_version(text: &str) -> Option<String> {
    version_regexes().iter().find_map(|regex| {
        regex
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|version| version.as_str().to_string())
    })
}

pub fn extract_capabilities(text: &str) -> BTreeSet<Capability> {
    let lower = text.to_lowercase();
    let mut capabilities = BTreeSet::new();
    if lower.contains("ssl") || lower.contains("tls") {
        capabilities.insert(Capability::Tls);
    }
    if lower.contains("authentication") {
        capabilities.insert(Capability::Authentication);
    }
    if lower.contains("compression") {
        capabilities.insert(Capability::Compression);
    }
    if lower.contains("encryption") {
        capabilities.insert(Capability::Encryption);
    }
    capabilities
}

/// Names a protocol from reply markers alone, without port knowledge.
///
/// Used when no port-scoped signature matched but the service did answer.
pub fn identify_response(response: &[u8]) -> Option<Protocol> {
    const MARKERS: &[(&[u8], Protocol)] = &[
        (b"HTTP/", Protocol::Http),
        (b"SSH-", Protocol::Ssh),
        (b"+OK", Protocol::Pop3),
        (b"* OK", Protocol::Imap),
        (b"ESMTP", Protocol::Smtp),
        (b"SMTP", Protocol::Smtp),
        (b"FTP", Protocol::Ftp),
        (b"mysql_native_password", Protocol::Mysql),
        (b"caching_sha2_password", Protocol::Mysql),
    ];

    if response.starts_with(b"\x16\x03") || response.starts_with(b"\x15\x03") {
        return Some(Protocol::Https);
    }
    MARKERS
        .iter()
        .find(|(marker, _)| contains(response, marker))
        .map(|(_, protocol)| *protocol)
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
    fn banner_is_trimmed_and_capped() {
        let long = format!("  {}  ", "x".repeat(500));
        let banner = decode_banner(long.as_bytes()).unwrap();
        assert_eq!(banner.len(), BANNER_LIMIT - 2);

        assert_eq!(decode_banner(b"\x00\x01\x02"), None);
        assert_eq!(
            decode_banner(b"SSH-2.0-OpenSSH_9.6\r\n").as_deref(),
            Some("SSH-2.0-OpenSSH_9.6")
        );
    }

    #[test]
    fn version_follows_pattern_order() {
        assert_eq!(
            extract_version("HTTP/1.1 200 OK\r\nServer: nginx/1.24.0").as_deref(),
            Some("1.1")
        );
        assert_eq!(extract_version("SSH-2.0-OpenSSH_9.6").as_deref(), Some("2.0"));
        assert_eq!(
            extract_version("220 ProFTPD FTP server (Debian) ready").as_deref(),
            Some("Debian")
        );
        assert_eq!(extract_version("hello"), None);
    }

    #[test]
    fn capabilities_from_keywords() {
        let caps = extract_capabilities("250-STARTTLS\r\n250-AUTH PLAIN authentication required");
        assert!(caps.contains(&Capability::Tls));
        assert!(caps.contains(&Capability::Authentication));
        assert!(!caps.contains(&Capability::Compression));
        assert_eq!(Capability::Tls.to_string(), "SSL/TLS");
    }

    #[test]
    fn identifies_protocols_without_port_context() {
        assert_eq!(identify_response(b"HTTP/1.1 404 Not Found"), Some(Protocol::Http));
        assert_eq!(identify_response(b"SSH-2.0-dropbear"), Some(Protocol::Ssh));
        assert_eq!(identify_response(b"220 mail ESMTP Postfix"), Some(Protocol::Smtp));
        assert_eq!(identify_response(b"\x15\x03\x03\x00\x02\x02\x28"), Some(Protocol::Https));
        assert_eq!(identify_response(b"\x00\x00"), None);
    }
}
