//! # Vendor Resolver
//!
//! Maps MAC addresses to the organisation that registered their OUI prefix.
//! Answers (including "no vendor") are memoised per prefix for the lifetime
//! of the resolver, so a table is consulted at most once per prefix.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use mac_oui::Oui;
use netmapper_common::network::mac::{MacAddr, OuiPrefix};
use netmapper_common::{debug, warn};

/// A source of OUI registrations.
pub trait OuiTable: Send + Sync {
    /// Retrieves the vendor name for a specific MAC address.
    ///
    /// # Arguments
    ///
    /// * `mac` - The full address; tables with sub-/24 assignments may use
    ///   more than the first three octets.
    ///
    /// # Returns
    ///
    /// * `Some(String)` - The registered organisation.
    /// * `None` - The prefix is not registered in this table.
    fn lookup(&self, mac: MacAddr) -> Option<String>;
}

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("failed to load OUI database: {e:?}");
                None
            }
        })
        .as_ref()
}

/// The IEEE registry embedded by the `mac_oui` crate.
pub struct MacOuiTable {
    db: &'static Oui,
}

impl MacOuiTable {
    /// `None` when the embedded database cannot be loaded.
    pub fn load() -> Option<Self> {
        get_oui_db().map(|db| Self { db })
    }
}

impl OuiTable for MacOuiTable {
    fn lookup(&self, mac: MacAddr) -> Option<String> {
        let mac_str = mac.to_string();
        match self.db.lookup_by_mac(&mac_str) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}

/// A small compiled-in table of prefixes common on home and lab networks.
pub struct BuiltinOuiTable;

// Sorted by prefix for binary search.
const BUILTIN_OUIS: &[(u32, &str)] = &[
    (0x00000C, "Cisco Systems, Inc"),
    (0x000085, "Canon Inc."),
    (0x000569, "VMware, Inc."),
    (0x000C29, "VMware, Inc."),
    (0x00146C, "Netgear"),
    (0x00155D, "Microsoft Corporation"),
    (0x0017F2, "Apple, Inc."),
    (0x001A11, "Google, Inc."),
    (0x001B21, "Intel Corporate"),
    (0x001B63, "Apple, Inc."),
    (0x001C14, "VMware, Inc."),
    (0x001C58, "Cisco Systems, Inc"),
    (0x0023DF, "Apple, Inc."),
    (0x0026AB, "Seiko Epson Corporation"),
    (0x0026BB, "Apple, Inc."),
    (0x005056, "VMware, Inc."),
    (0x008077, "Brother Industries, Ltd."),
    (0x080027, "PCS Systemtechnik GmbH"),
    (0x24A43C, "Ubiquiti Inc"),
    (0x3CD92B, "Hewlett Packard"),
    (0x50C7BF, "TP-LINK Technologies Co., Ltd."),
    (0x525400, "QEMU virtual NIC"),
    (0xB827EB, "Raspberry Pi Foundation"),
    (0xDCA632, "Raspberry Pi Trading Ltd"),
    (0xE45F01, "Raspberry Pi Trading Ltd"),
    (0xF09FC2, "Ubiquiti Inc"),
];

impl OuiTable for BuiltinOuiTable {
    fn lookup(&self, mac: MacAddr) -> Option<String> {
        let key = OuiPrefix::of(mac).as_u32();
        BUILTIN_OUIS
            .binary_search_by_key(&key, |(prefix, _)| *prefix)
            .ok()
            .map(|idx| BUILTIN_OUIS[idx].1.to_string())
    }
}

pub struct VendorResolver {
    table: Box<dyn OuiTable>,
    cache: Mutex<HashMap<OuiPrefix, Option<String>>>,
}

impl VendorResolver {
    pub fn new(table: Box<dyn OuiTable>) -> Self {
        Self {
            table,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The embedded IEEE registry, or the built-in table if it fails to load.
    pub fn system() -> Self {
        match MacOuiTable::load() {
            Some(table) => Self::new(Box::new(table)),
            None => {
                warn!("falling back to the built-in vendor table");
                Self::new(Box::new(BuiltinOuiTable))
            }
        }
    }

    /// Vendor registered for the prefix of `mac`; `None` means unknown.
    pub fn resolve(&self, mac: MacAddr) -> Option<String> {
        let prefix = OuiPrefix::of(mac);
        if let Some(cached) = self.lock().get(&prefix) {
            return cached.clone();
        }

        // Looked up outside the lock; two racing callers may both consult the
        // table once, and the answers are identical.
        let vendor = self.table.lookup(mac);
        debug!("vendor for {prefix}: {vendor:?}");
        self.lock().entry(prefix).or_insert(vendor).clone()
    }

    /// Number of prefixes answered so far.
    pub fn cached_prefixes(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<OuiPrefix, Option<String>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
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
