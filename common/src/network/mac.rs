use std::fmt;

pub use pnet::util::MacAddr;

/// The vendor-identifying leading 24 bits of a MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OuiPrefix([u8; 3]);

impl OuiPrefix {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    pub fn of(mac: MacAddr) -> Self {
        Self([mac.0, mac.1, mac.2])
    }

    pub fn as_u32(self) -> u32 {
        let [a, b, c] = self.0;
        u32::from_be_bytes([0, a, b, c])
    }
}

impl From<MacAddr> for OuiPrefix {
    fn from(mac: MacAddr) -> Self {
        Self::of(mac)
    }
}

impl fmt::Display for OuiPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}")
    }
}

/// Parses the MAC spellings found in neighbour tables and tool output.
///
/// Accepts `00:0c:29:12:34:56`, `00-0C-29-12-34-56`, the unpadded BSD form
/// `0:c:29:12:34:56`, Cisco dotted `000c.2912.3456` and bare hex.
pub fn parse_mac(s: &str) -> Option<MacAddr> {
    let s = s.trim();
    let octets: Vec<u8> = if s.contains(':') || s.contains('-') {
        s.split([':', '-'])
            .map(|part| {
                if part.is_empty() || part.len() > 2 {
                    return None;
                }
                u8::from_str_radix(part, 16).ok()
            })
            .collect::<Option<Vec<u8>>>()?
    } else {
        let hex: String = s.chars().filter(|c| *c != '.').collect();
        if hex.len() != 12 || (s.contains('.') && s.split('.').count() != 3) {
            return None;
        }
        (0..12)
            .step_by(2)
            .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
            .collect::<Option<Vec<u8>>>()?
    };

    match octets.as_slice() {
        &[a, b, c, d, e, f] => Some(MacAddr::new(a, b, c, d, e, f)),
        _ => None,
    }
}

/// All-zero and broadcast addresses show up in neighbour tables for
/// incomplete entries; they identify nothing.
pub fn is_placeholder(mac: MacAddr) -> bool {
    mac == MacAddr::zero() || mac == MacAddr::broadcast()
}

/// Randomised and virtual addresses set the locally administered bit and
/// carry no registered OUI.
pub fn is_locally_administered(mac: MacAddr) -> bool {
    mac.0 & 0x02 != 0
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
