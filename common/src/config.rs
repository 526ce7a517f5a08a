use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ScanError;

/// Common service ports probed in discovery mode.
pub const QUICK_SCAN_PORTS: [u16; 16] = [
    21, 22, 23, 25, 53, 80, 110, 143, 443, 993, 995, 3306, 3389, 5432, 8080, 8443,
];

/// How deep the per-host pipeline goes, as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Cheap and broad.
    #[default]
    Discovery,
    /// Expensive and deep when combined with `detailed`.
    Local,
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "discovery" | "d" => Ok(Self::Discovery),
            "local" | "l" => Ok(Self::Local),
            other => Err(format!("unknown scan mode: {other}")),
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => f.write_str("discovery"),
            Self::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Budget for one connection attempt (port probe or fingerprint probe).
    pub connect_timeout: Duration,
    /// Budget for reading a probe response.
    pub read_timeout: Duration,
    /// Budget for a single ICMP echo.
    pub ping_timeout: Duration,
    /// Budget for one reverse DNS lookup.
    pub dns_timeout: Duration,
    /// Budget for every external tool run (host enumeration, OS guess).
    pub timeout: Duration,
    /// Maximum number of host pipelines in flight.
    pub max_concurrent_scans: usize,
    /// Maximum number of TCP sockets open at once across all pipelines.
    pub max_open_connections: usize,
    /// Maximum number of ping processes alive during a sweep.
    pub max_concurrent_pings: usize,
    /// Extra echo attempts for addresses that stay silent during a sweep.
    pub retry_attempts: u8,
    /// Port set for discovery mode.
    pub quick_ports: Vec<u16>,
    /// Port set for detailed mode, on top of `quick_ports`.
    pub detailed_ports: Vec<u16>,
    pub mac_lookup: bool,
    pub os_detection: bool,
    pub protocol_analysis: bool,
    /// Disables reverse DNS lookups.
    pub no_dns: bool,
    /// Allows an external host enumeration tool to be used when installed.
    pub use_enumerator: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            ping_timeout: Duration::from_secs(1),
            dns_timeout: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
            max_concurrent_scans: 10,
            max_open_connections: 100,
            max_concurrent_pings: 64,
            retry_attempts: 0,
            quick_ports: QUICK_SCAN_PORTS.to_vec(),
            detailed_ports: (1..=1024).collect(),
            mac_lookup: true,
            os_detection: true,
            protocol_analysis: true,
            no_dns: false,
            use_enumerator: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.max_concurrent_scans == 0 {
            return Err(ScanError::Config("max_concurrent_scans must be at least 1".into()));
        }
        if self.max_open_connections == 0 {
            return Err(ScanError::Config("max_open_connections must be at least 1".into()));
        }
        if self.max_concurrent_pings == 0 {
            return Err(ScanError::Config("max_concurrent_pings must be at least 1".into()));
        }
        if self.quick_ports.is_empty() {
            return Err(ScanError::Config("quick port set is empty".into()));
        }
        if self.quick_ports.contains(&0) || self.detailed_ports.contains(&0) {
            return Err(ScanError::Config("port 0 cannot be probed".into()));
        }
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(ScanError::Config("probe timeouts must be non-zero".into()));
        }
        Ok(())
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

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_concurrent_scans, 10);
        assert_eq!(cfg.detailed_ports.len(), 1024);
        assert_eq!(cfg.ping_timeout, Duration::from_secs(1));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cfg = Config {
            max_concurrent_scans: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn port_zero_is_rejected() {
        let cfg = Config {
            quick_ports: vec![0, 80],
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn scan_mode_parses_case_insensitively() {
        assert_eq!("LOCAL".parse::<ScanMode>(), Ok(ScanMode::Local));
        assert_eq!("discovery".parse::<ScanMode>(), Ok(ScanMode::Discovery));
        assert!("deep".parse::<ScanMode>().is_err());
    }
}
