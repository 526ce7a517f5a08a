use std::net::IpAddr;
use std::time::Duration;

use netmapper_common::debug;
use tokio::task;
use tokio::time::timeout;

/// Reverse DNS name for `ip`, if the resolver has one within `limit`.
///
/// The system resolver blocks, so the lookup runs on the blocking pool. A
/// lookup that outlives `limit` is abandoned, not cancelled.
pub async fn reverse_lookup(ip: IpAddr, limit: Duration) -> Option<String> {
    let lookup = task::spawn_blocking(move || dns_lookup::lookup_addr(&ip));

    let name = match timeout(limit, lookup).await {
        Ok(Ok(Ok(name))) => name,
        Ok(Ok(Err(e))) => {
            debug!("no PTR record for {ip}: {e}");
            return None;
        }
        Ok(Err(join_error)) => {
            debug!("reverse lookup for {ip} aborted: {join_error}");
            return None;
        }
        Err(_elapsed) => {
            debug!("reverse lookup for {ip} timed out after {limit:?}");
            return None;
        }
    };

    let name = name.trim_end_matches('.').to_string();
    if name.is_empty() || name == ip.to_string() {
        return None;
    }
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
