//! Test doubles shared by the integration tests (spec.md §8).

pub mod mock;

pub use mock::MockHypervisor;
