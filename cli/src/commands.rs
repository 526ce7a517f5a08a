pub mod scan;

use std::time::Duration;

use clap::Parser;
use netmapper_common::config::{Config, ScanMode};

#[derive(Parser)]
#[command(name = "netmapper")]
#[command(about = "Discovers and fingerprints hosts on a network.")]
pub struct CommandLine {
    /// Address, range (10.0.0.1-50), CIDR block or a comma-separated list
    pub target: String,

    /// Pipeline depth: discovery or local
    #[arg(short, long, default_value_t = ScanMode::Discovery)]
    pub mode: ScanMode,

    /// Full port range, protocol analysis and OS detection (with --mode local)
    #[arg(short, long)]
    pub detailed: bool,

    /// Budget in seconds for external tools such as nmap
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u64,

    /// Hosts scanned at the same time
    #[arg(short = 'j', long = "jobs", default_value_t = 10)]
    pub jobs: usize,

    /// Extra echo attempts for silent addresses
    #[arg(long, default_value_t = 0)]
    pub retries: u8,

    /// Skip reverse DNS lookups
    #[arg(long)]
    pub no_dns: bool,

    /// Never use an installed nmap, even when available
    #[arg(long)]
    pub no_enumerator: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Less output (-q no headers, -qq summary only)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> Config {
        Config {
            timeout: Duration::from_secs(self.timeout.max(1)),
            max_concurrent_scans: self.jobs,
            retry_attempts: self.retries,
            no_dns: self.no_dns,
            use_enumerator: !self.no_enumerator,
            ..Config::default()
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
