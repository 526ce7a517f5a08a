//! End-to-end tests for the scan engine, run against loopback.

#[cfg(test)]
mod discovery;
#[cfg(test)]
mod pipeline;
