use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use colored::*;
use netmapper_core::model::{ScanProfile, ScanResult, ServiceFinding};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    if is_global_unicast(ipv6_addr) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

// 2000::/3
fn is_global_unicast(ipv6_addr: &Ipv6Addr) -> bool {
    let first_byte = ipv6_addr.octets()[0];
    (0x20..=0x3F).contains(&first_byte)
}

fn unknown() -> ColoredString {
    "unknown".color(colors::UNKNOWN)
}

pub fn ip_to_detail(ip: &IpAddr) -> Detail {
    match ip {
        IpAddr::V4(ipv4_addr) => ("IPv4".into(), ipv4_addr.to_string().color(colors::IPV4_ADDR)),
        IpAddr::V6(ipv6_addr) => (
            ipv6_to_type_str(ipv6_addr).into(),
            ipv6_addr.to_string().color(colors::IPV6_ADDR),
        ),
    }
}

pub fn latency_to_detail(latency: Option<Duration>) -> Option<Detail> {
    latency.map(|rtt| {
        let ms = format!("{:.1} ms", rtt.as_secs_f64() * 1000.0);
        ("Latency".into(), ms.normal())
    })
}

pub fn ports_to_detail(result: &ScanResult) -> Detail {
    if result.open_ports.is_empty() {
        return ("Ports".into(), "none".color(colors::UNKNOWN));
    }
    let joined = result
        .open_ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    ("Ports".into(), joined.color(colors::PORT))
}

fn finding_to_detail(finding: &ServiceFinding) -> Detail {
    let mut value = finding.protocol_name().to_string();
    if let Some(version) = &finding.version {
        value.push_str(&format!(" {version}"));
    }
    if !finding.capabilities.is_empty() {
        let caps = finding
            .capabilities
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        value.push_str(&format!(" [{caps}]"));
    }
    (format!("{}/tcp", finding.port), value.color(colors::PORT))
}

/// Tree rows for one host, in display order.
pub fn result_details(result: &ScanResult) -> Vec<Detail> {
    let mut details = vec![ip_to_detail(&result.ip)];

    if let Some(mac) = result.mac {
        details.push(("MAC".into(), mac.to_string().color(colors::MAC_ADDR)));
    }
    details.push((
        "Vendor".into(),
        result
            .vendor
            .as_deref()
            .map_or_else(unknown, |vendor| vendor.color(colors::VENDOR)),
    ));
    details.push((
        "Device".into(),
        result
            .device_type
            .map_or_else(unknown, |device| device.to_string().normal()),
    ));

    if result.scan_mode == ScanProfile::LocalDetailed {
        details.push((
            "OS".into(),
            result
                .os_family
                .as_ref()
                .map_or_else(unknown, |os| os.to_string().normal()),
        ));
    }

    details.push(ports_to_detail(result));

    if result.findings.is_empty() {
        for (port, service) in &result.services {
            details.push((format!("{port}/tcp"), service.color(colors::PORT)));
        }
    } else {
        details.extend(result.findings.values().map(finding_to_detail));
    }

    details.extend(latency_to_detail(result.response_time));
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
