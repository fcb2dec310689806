//! Kamino: a Proxmox VE pod-cloning orchestrator (spec.md §1-§2).
//!
//! The crate root exists so both `[[bin]]` targets and the integration
//! tests under `tests/` can share the same module tree.

pub mod args;
pub mod catalog;
pub mod client;
pub mod conf;
pub mod directory;
pub mod engine;
pub mod models;
pub mod progress;
pub mod routes;
pub mod utils;

#[cfg(any(test, feature = "test-utilities"))]
pub mod test_utilities;
