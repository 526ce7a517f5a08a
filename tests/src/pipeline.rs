use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netmapper_common::config::Config;
use netmapper_common::network::host::HostCandidate;
use netmapper_common::network::mac::MacAddr;
use netmapper_core::classify::{self, HostFacts};
use netmapper_core::discovery::{dispatch, DiscoveryService};
use netmapper_core::model::{DeviceType, OsFamily, ScanProfile};
use netmapper_core::network::tcp::{self, ConnectionBudget};
use netmapper_core::vendors::{BuiltinOuiTable, VendorResolver};
use tokio::net::TcpListener;

#[test]
fn nginx_hostname_outweighs_generic_web_evidence() {
    let open_ports = BTreeSet::from([80]);
    let services = BTreeMap::from([(80, "http".to_string())]);
    let facts = HostFacts {
        open_ports: &open_ports,
        services: &services,
        hostname: Some("nginx01.example.org"),
    };
    assert_eq!(classify::classify_device(&facts), DeviceType::Server);
}

#[test]
fn ttl_fallback_buckets() {
    assert_eq!(classify::os_from_ttl(64), OsFamily::LinuxOrMacos);
    assert_eq!(classify::os_from_ttl(128), OsFamily::Windows);
    assert_eq!(classify::os_from_ttl(64).to_string(), "Linux/macOS");
    assert_eq!(classify::os_from_ttl(128).to_string(), "Windows");
}

#[test]
fn vmware_mac_resolves_to_vmware() {
    let resolver = VendorResolver::system();
    let mac = MacAddr::new(0x00, 0x0C, 0x29, 0x12, 0x34, 0x56);
    let vendor = resolver.resolve(mac).unwrap_or_default();
    assert!(vendor.to_lowercase().contains("vmware"), "got '{vendor}'");
    assert_eq!(resolver.resolve(mac).unwrap_or_default(), vendor);
}

#[tokio::test]
async fn closed_port_is_absent_without_error() {
    let closed = {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let budget = ConnectionBudget::new(2);
    let outcomes = tcp::probe_ports(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        &[closed],
        Duration::from_millis(300),
        &budget,
    )
    .await;
    assert!(tcp::open_ports(&outcomes).is_empty());
}

#[tokio::test]
async fn pipelines_respect_the_concurrency_cap() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    dispatch((0..25).collect::<Vec<u32>>(), 4, |_| {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    })
    .await;

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak concurrency was {peak}");
    assert!(peak >= 1);
}

#[tokio::test]
async fn every_candidate_gets_exactly_one_result() {
    let cfg = Config {
        quick_ports: vec![9],
        connect_timeout: Duration::from_millis(200),
        max_concurrent_scans: 2,
        ..Config::default()
    };
    let seen = Arc::new(Mutex::new(Vec::new()));
    let svc = DiscoveryService::new(
        cfg,
        Arc::new(VendorResolver::new(Box::new(BuiltinOuiTable))),
        None,
    )
    .unwrap()
    .with_progress({
        let seen = seen.clone();
        move |done, total| seen.lock().unwrap().push((done, total))
    });

    let hosts: Vec<HostCandidate> = (1..=5)
        .map(|last| HostCandidate::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, last))))
        .collect();
    let results = svc.scan_hosts(hosts.clone(), ScanProfile::Discovery).await;

    let ips: Vec<IpAddr> = results.iter().map(|result| result.ip).collect();
    let expected: Vec<IpAddr> = hosts.iter().map(|host| host.ip).collect();
    assert_eq!(ips, expected);

    let mut progress = seen.lock().unwrap().clone();
    progress.sort();
    assert_eq!(progress.last(), Some(&(5, 5)));
    assert_eq!(progress.len(), 5);
}
