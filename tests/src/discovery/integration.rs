use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netmapper_common::config::{Config, ScanMode};
use netmapper_common::error::{ScanError, ToolError};
use netmapper_common::network::host::HostCandidate;
use netmapper_common::network::range::{IpCollection, Ipv4Range};
use netmapper_core::classify::QUICK_CLASSIFY_PORTS;
use netmapper_core::discovery::DiscoveryService;
use netmapper_core::enumerator::HostEnumerator;
use netmapper_core::model::{ScanProfile, ServiceFinding};
use netmapper_core::scanner;
use netmapper_core::vendors::{BuiltinOuiTable, VendorResolver};
use tokio::net::TcpListener;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn loopback_config() -> Config {
    Config {
        connect_timeout: Duration::from_millis(500),
        read_timeout: Duration::from_millis(500),
        ping_timeout: Duration::from_secs(1),
        no_dns: true,
        use_enumerator: false,
        ..Config::default()
    }
}

fn service(cfg: Config) -> anyhow::Result<DiscoveryService> {
    let vendors = Arc::new(VendorResolver::new(Box::new(BuiltinOuiTable)));
    Ok(DiscoveryService::new(cfg, vendors, None)?)
}

/// An enumerator whose sweeps never find anyone.
struct Deserted;

#[async_trait]
impl HostEnumerator for Deserted {
    fn name(&self) -> &'static str {
        "deserted"
    }

    async fn sweep(&self, _: &IpCollection) -> Result<Vec<HostCandidate>, ToolError> {
        Ok(Vec::new())
    }

    async fn os_guess(&self, _: IpAddr) -> Result<Option<String>, ToolError> {
        Ok(None)
    }

    async fn services(&self, _: IpAddr, _: &[u16]) -> Result<Vec<ServiceFinding>, ToolError> {
        Ok(Vec::new())
    }
}

/// Verifies that the built-in ladder finds loopback without any external
/// enumerator, whichever rung ends up answering.
#[tokio::test]
async fn discovery_single_loopback() {
    let mut targets = IpCollection::new();
    targets.add_single(LOCALHOST);

    let discovery = scanner::perform_discovery(&targets, &loopback_config(), None).await;

    assert_eq!(discovery.hosts.len(), 1, "No hosts found when scanning localhost");
    assert_eq!(discovery.hosts[0].ip, LOCALHOST);
}

#[tokio::test]
async fn discovery_range_loopback() {
    let mut targets = IpCollection::new();
    targets.add_range(Ipv4Range::new(
        Ipv4Addr::new(127, 0, 0, 1),
        Ipv4Addr::new(127, 0, 0, 3),
    ));

    let discovery = scanner::perform_discovery(&targets, &loopback_config(), None).await;

    let ips: Vec<IpAddr> = discovery.hosts.iter().map(|host| host.ip).collect();
    assert_eq!(
        ips,
        vec![
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 3)),
        ]
    );
}

#[tokio::test]
async fn run_reports_listener_on_loopback() -> anyhow::Result<()> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let port = listener.local_addr()?.port();
    let cfg = Config {
        quick_ports: vec![port],
        ..loopback_config()
    };

    let results = service(cfg)?.run("127.0.0.1", ScanMode::Discovery, false).await?;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.ip, LOCALHOST);
    assert_eq!(result.scan_mode, ScanProfile::Discovery);
    assert!(result.open_ports.contains(&port));

    let universe: BTreeSet<u16> = std::iter::once(port).chain(QUICK_CLASSIFY_PORTS).collect();
    assert!(result.open_ports.is_subset(&universe));
    Ok(())
}

#[tokio::test]
async fn results_stay_within_targets_and_in_order() -> anyhow::Result<()> {
    let results = service(loopback_config())?
        .run("127.0.0.3, 127.0.0.1", ScanMode::Discovery, false)
        .await?;

    let ips: Vec<IpAddr> = results.iter().map(|result| result.ip).collect();
    assert_eq!(
        ips,
        vec![
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 3)),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn local_without_detailed_stays_shallow() -> anyhow::Result<()> {
    let results = service(loopback_config())?
        .run("127.0.0.1", ScanMode::Local, false)
        .await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].scan_mode, ScanProfile::Discovery);
    assert!(results[0].findings.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_range_is_an_empty_result() -> anyhow::Result<()> {
    let results = service(loopback_config())?
        .run("10.0.0.9-10.0.0.1", ScanMode::Discovery, false)
        .await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn nobody_home_is_an_empty_result() -> anyhow::Result<()> {
    let vendors = Arc::new(VendorResolver::new(Box::new(BuiltinOuiTable)));
    let svc = DiscoveryService::new(loopback_config(), vendors, Some(Arc::new(Deserted)))?;

    let results = svc.run("192.0.2.0/28", ScanMode::Discovery, false).await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn all_down_range_is_an_empty_result() -> anyhow::Result<()> {
    // Needs a network where TEST-NET-1 is neither routed nor reset by a middlebox.
    let results = service(loopback_config())?
        .run("192.0.2.1", ScanMode::Discovery, false)
        .await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_target_is_fatal() -> anyhow::Result<()> {
    let svc = service(loopback_config())?;
    for bad in ["not-a-host", "10.0.0.1/33", "10.0.0.1-300", "10.0.0.1,bogus"] {
        let outcome = svc.run(bad, ScanMode::Discovery, false).await;
        assert!(
            matches!(outcome, Err(ScanError::Target(_))),
            "'{bad}' was accepted"
        );
    }
    Ok(())
}

#[tokio::test]
#[ignore]
async fn detailed_scan_of_loopback() -> anyhow::Result<()> {
    let results = DiscoveryService::system(loopback_config())
        .await?
        .run("127.0.0.1", ScanMode::Local, true)
        .await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].scan_mode, ScanProfile::LocalDetailed);
    assert!(results[0].open_ports.iter().all(|port| *port != 0));
    Ok(())
}
