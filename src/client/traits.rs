//! The `Hypervisor` capability the Cloning Engine is generic over
//! (spec.md §4.A). `PveClient` is the real `reqwest`-backed implementation;
//! `test_utilities::mock::MockHypervisor` stands in for it in tests.

use std::time::Duration;

use async_trait::async_trait;

use super::error::HypervisorError;
use super::types::{NodeStatus, NodeSummary, Snapshot, VNetInfo, VirtualResource, VmConfig};

/// Which realm namespace to reconcile (spec.md §4.A `SyncRealm`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealmScope {
    Users,
    Groups,
}

impl RealmScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RealmScope::Users => "users",
            RealmScope::Groups => "groups",
        }
    }
}

/// Typed, idempotent RPC to the cluster (spec.md §4.A). Safe for concurrent
/// use: implementations must not hold interior state across calls besides a
/// shared, thread-safe transport.
#[async_trait]
pub trait Hypervisor: Send + Sync + 'static {
    async fn cluster_resources(
        &self,
        filter_type: Option<&str>,
    ) -> Result<Vec<VirtualResource>, HypervisorError>;

    async fn nodes(&self) -> Result<Vec<NodeSummary>, HypervisorError>;

    async fn node_status(&self, node: &str) -> Result<NodeStatus, HypervisorError>;

    /// The online node minimizing `(cpuLoad + mem/maxmem)/2`; fails closed
    /// with `Domain("no online nodes")` if none are online.
    async fn find_best_node(&self) -> Result<String, HypervisorError> {
        let nodes = self.nodes().await?;
        let best = nodes
            .into_iter()
            .filter(NodeSummary::is_online)
            .min_by(|a, b| a.load().partial_cmp(&b.load()).unwrap_or(std::cmp::Ordering::Equal));
        match best {
            Some(node) => Ok(node.node),
            None => Err(HypervisorError::Domain("no online nodes".to_owned())),
        }
    }

    async fn create_pool(&self, pool: &str) -> Result<(), HypervisorError>;

    async fn delete_pool(&self, pool: &str) -> Result<(), HypervisorError>;

    /// Pool members filtered to `type=qemu` (spec.md §4.A).
    async fn pool_members(&self, pool: &str) -> Result<Vec<VirtualResource>, HypervisorError>;

    async fn is_pool_empty(&self, pool: &str) -> Result<bool, HypervisorError> {
        Ok(self.pool_members(pool).await?.is_empty())
    }

    /// Polls with exponential backoff 2s→30s until the pool has no `qemu` members.
    async fn wait_for_pool_empty(
        &self,
        pool: &str,
        timeout: Duration,
    ) -> Result<(), HypervisorError>;

    /// Pools with prefix `kamino_template_` (spec.md §3).
    async fn list_template_pools(&self) -> Result<Vec<String>, HypervisorError>;

    async fn set_pool_acl(
        &self,
        path: &str,
        principal: &str,
        is_group: bool,
        roles: &str,
        propagate: bool,
    ) -> Result<(), HypervisorError>;

    async fn start_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError>;
    async fn stop_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError>;
    async fn shutdown_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError>;
    async fn reboot_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError>;
    async fn delete_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError>;

    /// Submits a clone; completion is confirmed separately via
    /// [`Hypervisor::wait_for_lock`].
    #[allow(clippy::too_many_arguments)]
    async fn clone_vm(
        &self,
        source_node: &str,
        source_vmid: u32,
        newid: u32,
        name: &str,
        pool: &str,
        target_node: &str,
        full: bool,
    ) -> Result<(), HypervisorError>;

    /// Polls `config` on a 5s cadence until `lock` is empty.
    async fn wait_for_lock(
        &self,
        node: &str,
        vmid: u32,
        timeout: Duration,
    ) -> Result<(), HypervisorError>;

    /// Polls `status/current` on a 5s cadence until `status` matches `want`.
    async fn wait_for_status(
        &self,
        node: &str,
        vmid: u32,
        want: &str,
        timeout: Duration,
    ) -> Result<(), HypervisorError>;

    /// Polls `config` until `scsi0`/`name` are set, then polls
    /// `storage/{sid}/content?vmid=N` until every disk has non-zero size.
    async fn wait_for_disk(
        &self,
        node: &str,
        vmid: u32,
        storage_id: &str,
        timeout: Duration,
    ) -> Result<(), HypervisorError>;

    /// Idempotent: "can't convert a template to a template" is success.
    async fn convert_to_template(&self, node: &str, vmid: u32) -> Result<(), HypervisorError>;

    async fn get_snapshots(&self, node: &str, vmid: u32) -> Result<Vec<Snapshot>, HypervisorError>;

    async fn delete_snapshot(
        &self,
        node: &str,
        vmid: u32,
        name: &str,
    ) -> Result<(), HypervisorError>;

    async fn get_vm_config(&self, node: &str, vmid: u32) -> Result<VmConfig, HypervisorError>;

    /// Callers MUST call this with 1s→30s backoff up to 5 minutes before
    /// `agent_exec` (spec.md §4.A); this default impl does that polling.
    async fn agent_ping(&self, node: &str, vmid: u32) -> Result<(), HypervisorError>;

    async fn agent_exec(
        &self,
        node: &str,
        vmid: u32,
        argv: &[String],
    ) -> Result<(), HypervisorError>;

    async fn list_vnets(&self) -> Result<Vec<VNetInfo>, HypervisorError>;

    /// Sets `net0`/`net1` to `virtio,bridge={vnet},firewall=1` (spec.md §4.A).
    async fn set_vm_nic(
        &self,
        node: &str,
        vmid: u32,
        nic: &str,
        bridge: &str,
    ) -> Result<(), HypervisorError>;

    async fn sync_realm(&self, scope: RealmScope) -> Result<(), HypervisorError>;
}
