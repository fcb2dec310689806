//! The Hypervisor Client (spec.md §4.A): typed RPC to the cluster.

mod error;
mod helpers;
mod poll;
mod pve;
mod retry;
mod traits;
mod types;

pub use error::HypervisorError;
pub use poll::{poll_backoff, poll_until};
pub use pve::{PveClient, TEMPLATE_POOL_PREFIX};
pub use retry::RetryPolicy;
pub use traits::{Hypervisor, RealmScope};
pub use types::{
    CloneVmRequest, MemoryStatus, NodeStatus, NodeSummary, PoolInfo, Snapshot,
    StorageContentEntry, VNetInfo, VirtualResource, VmConfig, VmStatus,
};
