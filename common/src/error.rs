use std::time::Duration;

use thiserror::Error;

/// A target string that cannot be turned into addresses.
///
/// Always fatal: the run is aborted before anything is probed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid target: {0}")]
    Invalid(String),
    #[error("invalid start address in range '{input}': {reason}")]
    RangeStart { input: String, reason: String },
    #[error("invalid end of range '{input}': {reason}")]
    RangeEnd { input: String, reason: String },
    #[error("invalid CIDR block '{input}': {reason}")]
    Cidr { input: String, reason: String },
    #[error("invalid prefix: {0} > 32")]
    Prefix(u8),
    #[error("failed to parse target '{part}': {source}")]
    Multi {
        part: String,
        #[source]
        source: Box<TargetError>,
    },
}

/// Errors surfaced by a scan run. Per-host failures never end up here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// An external collaborator (ping, arp, nmap) could not do its job.
///
/// Consumed by the next rung of whatever fallback ladder invoked the tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} is not installed")]
    Missing { tool: &'static str },
    #[error("{tool} requires elevated privileges")]
    Unprivileged { tool: &'static str },
    #[error("{tool} did not finish within {after:?}")]
    TimedOut { tool: &'static str, after: Duration },
    #[error("{tool} failed: {reason}")]
    Failed { tool: &'static str, reason: String },
    #[error("{tool}: {source}")]
    Io {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Maps a spawn error onto the tool taxonomy.
    pub fn from_spawn(tool: &'static str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::Missing { tool },
            std::io::ErrorKind::PermissionDenied => Self::Unprivileged { tool },
            _ => Self::Io { tool, source },
        }
    }

    /// True when retrying the same tool cannot help.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Missing { .. } | Self::Unprivileged { .. })
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
