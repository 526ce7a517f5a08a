//! External host enumeration.
//!
//! A [`HostEnumerator`] is an optional collaborator handed to the scanner by
//! the caller. It is tried first for liveness, open services and OS guesses;
//! when it is absent or fails, the built-in probes take over.

use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use netmapper_common::error::ToolError;
use netmapper_common::network::host::HostCandidate;
use netmapper_common::network::range::IpCollection;
use netmapper_common::{debug, info};
use netmapper_protocols::Protocol;
use netmapper_protocols::nmap::{self, NmapHost, NmapPort};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::{ChildStdin, Command};
use tokio::time::timeout;

use crate::model::ServiceFinding;
use crate::system;

#[async_trait]
pub trait HostEnumerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Live hosts among `targets`. Hosts not in `targets` must not be
    /// reported, but the scanner filters defensively anyway.
    async fn sweep(&self, targets: &IpCollection) -> Result<Vec<HostCandidate>, ToolError>;

    /// The enumerator's own OS guess for `ip`, verbatim.
    async fn os_guess(&self, ip: IpAddr) -> Result<Option<String>, ToolError>;

    /// Open ports among `ports` with the service running on each.
    async fn services(&self, ip: IpAddr, ports: &[u16]) -> Result<Vec<ServiceFinding>, ToolError>;
}

/// Drives the `nmap` binary through its grepable output.
#[derive(Debug, Clone)]
pub struct NmapEnumerator {
    program: String,
    limit: Duration,
}

impl NmapEnumerator {
    pub fn new(program: impl Into<String>, limit: Duration) -> Self {
        Self {
            program: program.into(),
            limit,
        }
    }

    /// `Some` when `nmap` is installed and answers `--version`.
    pub async fn locate(limit: Duration) -> Option<Self> {
        if system::tool_available("nmap", "--version").await {
            info!("Using nmap for host enumeration");
            Some(Self::new("nmap", limit))
        } else {
            debug!("nmap not found on PATH");
            None
        }
    }

    /// Runs nmap to completion. With `targets`, the addresses are streamed
    /// to its stdin for `-iL -` while the output is being collected.
    async fn run(
        &self,
        args: Vec<String>,
        targets: Option<&IpCollection>,
    ) -> Result<String, ToolError> {
        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(if targets.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| ToolError::from_spawn("nmap", e))?;

        let feeder = match (targets, child.stdin.take()) {
            (Some(targets), Some(pipe)) => Some(tokio::spawn(feed(pipe, targets.clone()))),
            _ => None,
        };

        let waited = timeout(self.limit, child.wait_with_output()).await;
        if let Some(feeder) = feeder {
            feeder.abort();
        }
        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ToolError::Io { tool: "nmap", source }),
            Err(_elapsed) => {
                return Err(ToolError::TimedOut {
                    tool: "nmap",
                    after: self.limit,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().next().unwrap_or("non-zero exit").trim();
            if reason.contains("root privileges") {
                return Err(ToolError::Unprivileged { tool: "nmap" });
            }
            return Err(ToolError::Failed {
                tool: "nmap",
                reason: reason.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Writes one address per line; dropping the pipe ends `-iL -`.
async fn feed(pipe: ChildStdin, targets: IpCollection) {
    let mut writer = BufWriter::new(pipe);
    for ip in &targets {
        if let Err(e) = writer.write_all(format!("{ip}\n").as_bytes()).await {
            debug!("nmap stopped reading targets: {e}");
            return;
        }
    }
    if let Err(e) = writer.flush().await {
        debug!("nmap stopped reading targets: {e}");
    }
}

#[async_trait]
impl HostEnumerator for NmapEnumerator {
    fn name(&self) -> &'static str {
        "nmap"
    }

    async fn sweep(&self, targets: &IpCollection) -> Result<Vec<HostCandidate>, ToolError> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let stdout = self.run(nmap::sweep_args(), Some(targets)).await?;

        let hosts = nmap::parse_grepable(&stdout)
            .into_iter()
            .filter(|host| host.up)
            .map(into_candidate)
            .collect::<Vec<_>>();
        debug!("nmap reported {} live hosts", hosts.len());
        Ok(hosts)
    }

    async fn os_guess(&self, ip: IpAddr) -> Result<Option<String>, ToolError> {
        if !system::is_privileged() {
            return Err(ToolError::Unprivileged { tool: "nmap" });
        }
        let stdout = self.run(nmap::os_args(ip), None).await?;
        Ok(nmap::parse_grepable(&stdout)
            .into_iter()
            .find(|host| host.ip == ip)
            .and_then(|host| host.os))
    }

    async fn services(&self, ip: IpAddr, ports: &[u16]) -> Result<Vec<ServiceFinding>, ToolError> {
        let args = nmap::services_args(ip, ports, system::is_privileged());
        let stdout = self.run(args, None).await?;
        let findings = nmap::parse_grepable(&stdout)
            .into_iter()
            .find(|host| host.ip == ip)
            .map(|host| host.ports.into_iter().map(into_finding).collect::<Vec<_>>())
            .unwrap_or_default();
        debug!("nmap reported {} open services on {ip}", findings.len());
        Ok(findings)
    }
}

fn into_candidate(host: NmapHost) -> HostCandidate {
    let candidate = HostCandidate::new(host.ip);
    match host.hostname {
        Some(name) => candidate.with_hostname(name),
        None => candidate,
    }
}

/// nmap marks guessed service names with a trailing `?`; the guess is kept.
fn into_finding(port: NmapPort) -> ServiceFinding {
    let service = port
        .service
        .map(|name| name.trim_end_matches('?').to_string());
    ServiceFinding {
        protocol: service.as_deref().and_then(Protocol::from_service),
        service,
        version: port.version,
        ..ServiceFinding::unknown(port.port)
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
