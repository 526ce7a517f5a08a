pub mod config;
pub mod error;
pub mod log;
pub mod network;

#[doc(hidden)]
pub use tracing;
