use std::collections::BTreeSet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;

/// Ports knocked on by the handshake sweep.
pub const HANDSHAKE_PORTS: [u16; 2] = [443, 80];

/// Caps the number of sockets open at once across every pipeline.
///
/// Owned by the orchestrator and shared by the port prober and the
/// fingerprinter, so neither component decides its own fan-out.
#[derive(Debug, Clone)]
pub struct ConnectionBudget {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl ConnectionBudget {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.ok()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Open,
    /// Refused, unreachable or otherwise failed.
    Closed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortProbeOutcome {
    pub port: u16,
    pub state: PortState,
    /// Time to a completed handshake; only set for open ports.
    pub latency: Option<Duration>,
}

impl PortProbeOutcome {
    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

/// Why a connection attempt did not produce a stream.
#[derive(Debug)]
pub enum ConnectFailure {
    TimedOut,
    Failed(io::Error),
}

/// Connects within `limit`, returning the stream and the handshake time.
pub async fn connect(
    addr: SocketAddr,
    limit: Duration,
) -> Result<(TcpStream, Duration), ConnectFailure> {
    let started = Instant::now();
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok((stream, started.elapsed())),
        Ok(Err(e)) => Err(ConnectFailure::Failed(e)),
        Err(_elapsed) => Err(ConnectFailure::TimedOut),
    }
}

pub async fn probe_port(
    ip: IpAddr,
    port: u16,
    limit: Duration,
    budget: &ConnectionBudget,
) -> PortProbeOutcome {
    let Some(_permit) = budget.acquire().await else {
        return PortProbeOutcome {
            port,
            state: PortState::Closed,
            latency: None,
        };
    };

    let (state, latency) = match connect(SocketAddr::new(ip, port), limit).await {
        Ok((_stream, latency)) => (PortState::Open, Some(latency)),
        Err(ConnectFailure::TimedOut) => (PortState::TimedOut, None),
        Err(ConnectFailure::Failed(_)) => (PortState::Closed, None),
    };

    PortProbeOutcome {
        port,
        state,
        latency,
    }
}

/// Probes every port concurrently. Duplicate ports are probed once.
pub async fn probe_ports(
    ip: IpAddr,
    ports: &[u16],
    limit: Duration,
    budget: &ConnectionBudget,
) -> Vec<PortProbeOutcome> {
    let unique: BTreeSet<u16> = ports.iter().copied().collect();
    join_all(
        unique
            .into_iter()
            .map(|port| probe_port(ip, port, limit, budget)),
    )
    .await
}

pub fn open_ports(outcomes: &[PortProbeOutcome]) -> BTreeSet<u16> {
    outcomes
        .iter()
        .filter(|outcome| outcome.is_open())
        .map(|outcome| outcome.port)
        .collect()
}

/// Quickest completed handshake among `outcomes`.
pub fn fastest(outcomes: &[PortProbeOutcome]) -> Option<Duration> {
    outcomes.iter().filter_map(|outcome| outcome.latency).min()
}

/// What a handshake attempt learned about a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knock {
    /// Some handshake port accepted the connection.
    Accepted,
    /// Every handshake port answered with a reset.
    Refused,
    /// Nothing answered in time, or the address was unreachable.
    Silent,
}

/// Liveness check for hosts that cannot be pinged.
///
/// A refusal is reported as such: whether it proves a live stack depends on
/// what the rest of the sweep saw.
pub async fn handshake_probe(ip: IpAddr, limit: Duration) -> Knock {
    let mut knock = Knock::Silent;
    for port in HANDSHAKE_PORTS {
        match connect(SocketAddr::new(ip, port), limit).await {
            Ok(_) => return Knock::Accepted,
            Err(ConnectFailure::Failed(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
                knock = Knock::Refused;
            }
            Err(_) => {}
        }
    }
    knock
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
