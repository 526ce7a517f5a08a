//! # Network Discovery Service
//!
//! Implements the core "Network Scan" use case.
//!
//! A run moves through `Discover → Dispatch → (per host: Resolve → Probe →
//! Fingerprint → Classify) → Aggregate`. Each discovered host gets its own
//! pipeline task; at most `max_concurrent_scans` of them exist at once and
//! the rest wait for a slot. Whatever happens inside a pipeline, the run
//! emits exactly one [`ScanResult`] per discovered host, in address order.

use std::collections::BTreeSet;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures::future::join_all;
use netmapper_common::config::{Config, ScanMode};
use netmapper_common::error::ScanError;
use netmapper_common::network::host::HostCandidate;
use netmapper_common::network::target::{self, Target};
use netmapper_common::{debug, info, success, warn};
use netmapper_protocols::signature;
use tokio::sync::Semaphore;

use crate::classify::{self, HostFacts, QUICK_CLASSIFY_PORTS};
use crate::enumerator::{HostEnumerator, NmapEnumerator};
use crate::fingerprint::Fingerprinter;
use crate::model::{ScanProfile, ScanResult, ServiceFinding};
use crate::network::tcp::{self, ConnectionBudget};
use crate::os::{OsDetector, OsVerdict};
use crate::scanner;
use crate::vendors::VendorResolver;

/// Called with `(completed, total)` each time a host pipeline finishes.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Application Service for Network Discovery.
///
/// Orchestrates the scan by:
/// 1. delegating liveness to the host discovery ladder.
/// 2. running one bounded pipeline per live host.
/// 3. collecting the per-host results in input order.
pub struct DiscoveryService {
    pipeline: Arc<HostPipeline>,
    enumerator: Option<Arc<dyn HostEnumerator>>,
    progress: Option<ProgressFn>,
}

impl DiscoveryService {
    pub fn new(
        cfg: Config,
        vendors: Arc<VendorResolver>,
        enumerator: Option<Arc<dyn HostEnumerator>>,
    ) -> Result<Self, ScanError> {
        cfg.validate()?;

        let budget = ConnectionBudget::new(cfg.max_open_connections);
        let pipeline = HostPipeline {
            fingerprinter: Fingerprinter::from_config(&cfg, budget.clone()),
            os: OsDetector::new(enumerator.clone(), cfg.ping_timeout),
            enumerator: enumerator.clone(),
            budget,
            vendors,
            cfg,
        };

        Ok(Self {
            pipeline: Arc::new(pipeline),
            enumerator,
            progress: None,
        })
    }

    /// Wires in the installed collaborators: the embedded OUI registry and,
    /// when allowed and present, `nmap`.
    pub async fn system(cfg: Config) -> Result<Self, ScanError> {
        let enumerator = if cfg.use_enumerator {
            NmapEnumerator::locate(cfg.timeout)
                .await
                .map(|nmap| Arc::new(nmap) as Arc<dyn HostEnumerator>)
        } else {
            None
        };
        if enumerator.is_none() {
            info!("No host enumerator available, using built-in probes");
        }
        Self::new(cfg, Arc::new(VendorResolver::system()), enumerator)
    }

    pub fn with_progress(
        mut self,
        progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn config(&self) -> &Config {
        &self.pipeline.cfg
    }

    /// Executes a scan against `target`.
    ///
    /// Only a malformed target is an error. No live hosts, or hosts whose
    /// probes all fail, still produce `Ok`.
    pub async fn run(
        &self,
        target: &str,
        mode: ScanMode,
        detailed: bool,
    ) -> Result<Vec<ScanResult>, ScanError> {
        let started = Instant::now();
        let target: Target = target.parse()?;
        let targets = target::to_collection(target);
        let profile = ScanProfile::select(mode, detailed);
        info!("Starting {profile} scan of {} addresses", targets.len());

        let discovery =
            scanner::perform_discovery(&targets, self.config(), self.enumerator.as_deref()).await;
        let results = self.scan_hosts(discovery.hosts, profile).await;

        success!(
            "Scanned {} hosts in {:.2}s",
            results.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(results)
    }

    /// Runs the `profile` pipeline over already discovered hosts.
    pub async fn scan_hosts(
        &self,
        hosts: Vec<HostCandidate>,
        profile: ScanProfile,
    ) -> Vec<ScanResult> {
        let total = hosts.len();
        let completed = Arc::new(AtomicUsize::new(0));

        let outcomes = dispatch(hosts.clone(), self.config().max_concurrent_scans, |host| {
            let pipeline = self.pipeline.clone();
            let progress = self.progress.clone();
            let completed = completed.clone();
            async move {
                let result = pipeline.scan(host, profile).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = progress {
                    progress(done, total);
                }
                result
            }
        })
        .await;

        hosts
            .into_iter()
            .zip(outcomes)
            .map(|(host, outcome)| {
                outcome.unwrap_or_else(|| {
                    warn!("Pipeline for {} aborted, reporting discovery data only", host.ip);
                    ScanResult::unprobed(host, profile)
                })
            })
            .collect()
    }
}

/// Runs `work` over `items` with at most `limit` tasks alive at once.
///
/// A slot is taken before each task is spawned and released when it ends, so
/// excess items wait here rather than as idle tasks. Outputs come back in
/// input order; a task that panicked yields `None`.
pub async fn dispatch<T, R, F, Fut>(items: Vec<T>, limit: usize, work: F) -> Vec<Option<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let slots = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let Ok(permit) = slots.clone().acquire_owned().await else {
            handles.push(None);
            continue;
        };
        let task = work(item);
        handles.push(Some(tokio::spawn(async move {
            let _permit = permit;
            task.await
        })));
    }

    let mut outputs = Vec::with_capacity(handles.len());
    for handle in handles {
        let output = match handle {
            Some(handle) => handle.await.ok(),
            None => None,
        };
        outputs.push(output);
    }
    outputs
}

struct HostPipeline {
    cfg: Config,
    vendors: Arc<VendorResolver>,
    budget: ConnectionBudget,
    fingerprinter: Fingerprinter,
    os: OsDetector,
    enumerator: Option<Arc<dyn HostEnumerator>>,
}

impl HostPipeline {
    async fn scan(&self, host: HostCandidate, profile: ScanProfile) -> ScanResult {
        let vendor = match host.mac {
            Some(mac) if self.cfg.mac_lookup => self.vendors.resolve(mac),
            _ => None,
        };

        let mut result = ScanResult::unprobed(host, profile);
        result.vendor = vendor;

        match profile {
            ScanProfile::Discovery => self.quick(&mut result).await,
            ScanProfile::LocalDetailed => self.deep(&mut result).await,
        }
        debug!(
            "{}: {} open ports, device {:?}",
            result.ip,
            result.open_ports.len(),
            result.device_type
        );
        result
    }

    async fn quick(&self, result: &mut ScanResult) {
        let ports: Vec<u16> = self
            .cfg
            .quick_ports
            .iter()
            .copied()
            .chain(QUICK_CLASSIFY_PORTS)
            .collect();

        let outcomes =
            tcp::probe_ports(result.ip, &ports, self.cfg.connect_timeout, &self.budget).await;
        result.open_ports = tcp::open_ports(&outcomes);

        let device = classify::quick_classify(&HostFacts {
            open_ports: &result.open_ports,
            services: &result.services,
            hostname: result.hostname.as_deref(),
        });
        result.device_type = Some(device);
    }

    async fn deep(&self, result: &mut ScanResult) {
        let ip = result.ip;
        let ports: BTreeSet<u16> = self
            .cfg
            .detailed_ports
            .iter()
            .chain(&self.cfg.quick_ports)
            .copied()
            .chain(signature::signature_ports())
            .collect();
        let ports: Vec<u16> = ports.into_iter().collect();

        let mut outcomes = Vec::new();
        match self.reported_services(ip, &ports).await {
            Some(reported) => {
                for finding in reported {
                    result.open_ports.insert(finding.port);
                    result.findings.insert(finding.port, finding);
                }
            }
            None => {
                outcomes =
                    tcp::probe_ports(ip, &ports, self.cfg.connect_timeout, &self.budget).await;
                result.open_ports = tcp::open_ports(&outcomes);
            }
        }

        let open: Vec<u16> = result.open_ports.iter().copied().collect();
        if self.cfg.protocol_analysis {
            let analyses = open.iter().map(|&port| self.fingerprinter.analyze(ip, port));
            let analyzed = join_all(analyses).await;
            for finding in analyzed {
                let merged = match result.findings.remove(&finding.port) {
                    Some(reported) => reported.merge(finding),
                    None => finding,
                };
                result.findings.insert(merged.port, merged);
            }
            result.protocols = result
                .findings
                .values()
                .filter_map(|finding| finding.protocol)
                .collect();
        } else {
            result.protocols = self.fingerprinter.fingerprint_host(ip, &open).await;
            result
                .protocols
                .extend(result.findings.values().filter_map(|finding| finding.protocol));
        }

        for &port in &open {
            let service = result
                .findings
                .get(&port)
                .and_then(ServiceFinding::service_name)
                .or_else(|| signature::well_known_service(port))
                .unwrap_or("unknown")
                .to_string();
            result.services.insert(port, service);
        }

        let facts = HostFacts {
            open_ports: &result.open_ports,
            services: &result.services,
            hostname: result.hostname.as_deref(),
        };
        let device = classify::classify_device(&facts);
        let verdict = if self.cfg.os_detection {
            self.os.detect_os(ip, &facts).await
        } else {
            OsVerdict::default()
        };

        result.device_type = Some(device);
        result.os_family = verdict.family;
        result.response_time = tcp::fastest(&outcomes).or(verdict.rtt);
    }

    /// Open services as the enumerator sees them; `None` hands the host to
    /// the built-in port scan.
    async fn reported_services(&self, ip: IpAddr, ports: &[u16]) -> Option<Vec<ServiceFinding>> {
        let enumerator = self.enumerator.as_ref()?;
        let tool = enumerator.name();
        match enumerator.services(ip, ports).await {
            Ok(findings) if !findings.is_empty() => Some(findings),
            Ok(_) => {
                debug!("{ip}: {tool} reported no open services, scanning directly");
                None
            }
            Err(e) => {
                warn!("{ip}: {tool} service scan failed, scanning directly: {e}");
                None
            }
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
