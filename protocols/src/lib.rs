//! Protocol knowledge that needs no sockets: probe/response signatures,
//! banner analysis and parsers for the text printed by `ping`, `arp` and
//! `nmap`.

pub mod arp;
pub mod banner;
pub mod nmap;
pub mod ping;
pub mod signature;

pub use signature::{Protocol, ProtocolSignature, SIGNATURES};
