//! Playout - multi-channel live video playout control plane
//!
//! This library crate exposes the control plane for integration testing:
//! the channel registry, the execution scheduler, and the HTTP surface. The
//! schedule store lives in `playout-db` and output planning in `playout-av`.

pub mod config;
pub mod dispatch;
pub mod mixer;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod store;
