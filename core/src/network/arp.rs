use std::collections::HashMap;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use netmapper_common::debug;
use netmapper_common::error::ToolError;
use netmapper_common::network::mac::MacAddr;
use netmapper_protocols::arp::parse_neighbors;
use tokio::process::Command;
use tokio::time::timeout;

const ARP_TIMEOUT: Duration = Duration::from_secs(5);
#[cfg(target_os = "linux")]
const PROC_NET_ARP: &str = "/proc/net/arp";

/// Snapshot of the system neighbour table.
///
/// Best effort: any failure yields an empty table and MAC fields stay unset.
pub async fn neighbor_table() -> HashMap<IpAddr, MacAddr> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = tokio::fs::read_to_string(PROC_NET_ARP).await {
            let neighbors = parse_neighbors(&contents);
            if !neighbors.is_empty() {
                return neighbors.into_iter().collect();
            }
        }
    }

    match arp_command().await {
        Ok(output) => parse_neighbors(&output).into_iter().collect(),
        Err(e) => {
            debug!("neighbour table unavailable: {e}");
            HashMap::new()
        }
    }
}

async fn arp_command() -> Result<String, ToolError> {
    let args: &[&str] = if cfg!(windows) { &["-a"] } else { &["-an"] };
    let mut command = Command::new("arp");
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match timeout(ARP_TIMEOUT, command.output()).await {
        Ok(Ok(output)) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        Ok(Err(e)) => Err(ToolError::from_spawn("arp", e)),
        Err(_elapsed) => Err(ToolError::TimedOut {
            tool: "arp",
            after: ARP_TIMEOUT,
        }),
    }
}
