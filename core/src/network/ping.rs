use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use netmapper_common::debug;
use netmapper_common::error::ToolError;
use netmapper_protocols::ping::{self, PingFlavor, PingReply};
use tokio::process::Command;
use tokio::time::timeout;

/// Process start-up allowance on top of the echo timeout.
const SPAWN_SLACK: Duration = Duration::from_millis(500);

const PERMISSION_MARKERS: [&str; 3] = [
    "operation not permitted",
    "permission denied",
    "requires root",
];

/// Sends a single ICMP echo through the system `ping` utility.
///
/// `Ok(None)` means no reply within `limit`. `Err` means the utility itself
/// could not be used, which callers treat as a reason to change technique.
pub async fn ping(ip: IpAddr, limit: Duration) -> Result<Option<PingReply>, ToolError> {
    let flavor = PingFlavor::host();
    let mut command = Command::new(ping::ping_program(flavor, ip));
    command
        .args(ping::ping_args(flavor, ip, limit))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match timeout(limit + SPAWN_SLACK, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ToolError::from_spawn("ping", e)),
        Err(_elapsed) => {
            debug!("ping {ip}: no answer within {limit:?}");
            return Ok(None);
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    if let Some(reply) = ping::parse_reply(&stdout) {
        return Ok(Some(reply));
    }

    // ping without raw socket access starts fine and then refuses to send.
    let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
    if !output.status.success() && PERMISSION_MARKERS.iter().any(|m| stderr.contains(m)) {
        return Err(ToolError::Unprivileged { tool: "ping" });
    }
    Ok(None)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
