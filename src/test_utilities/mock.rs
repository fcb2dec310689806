//! An in-memory stand-in for [`crate::client::Hypervisor`], used by the
//! integration tests under `tests/` to exercise the Cloning Engine without a
//! real Proxmox cluster (spec.md §8, mirroring the teacher's pattern of a
//! trait-backed test double behind `AppState`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use crate::client::{
    Hypervisor, HypervisorError, NodeStatus, NodeSummary, RealmScope, Snapshot, VNetInfo,
    VirtualResource, VmConfig,
};

#[derive(Debug, Clone)]
struct VmRecord {
    node: String,
    name: String,
    pool: Option<String>,
    status: String,
    lock: String,
    is_template: bool,
    critical: bool,
    nics: HashMap<String, String>,
}

struct State {
    vms: HashMap<u32, VmRecord>,
    pools: std::collections::HashSet<String>,
    nodes: Vec<String>,
    vnets: Vec<VNetInfo>,
    realm_syncs: Vec<RealmScope>,
    agent_execs: Vec<(u32, Vec<String>)>,
    deleted_pools: Vec<String>,
    force_clone_failures: Vec<String>,
}

/// A deterministic, entirely in-memory hypervisor double.
///
/// All state lives behind a single `tokio::sync::Mutex` — sufficient for
/// test concurrency (a handful of simulated jobs), not a production
/// concern this crate has.
pub struct MockHypervisor {
    state: Mutex<State>,
}

impl Default for MockHypervisor {
    fn default() -> Self {
        MockHypervisor {
            state: Mutex::new(State {
                vms: HashMap::new(),
                pools: std::collections::HashSet::new(),
                nodes: vec!["pve1".to_owned(), "pve2".to_owned()],
                vnets: Vec::new(),
                realm_syncs: Vec::new(),
                agent_execs: Vec::new(),
                deleted_pools: Vec::new(),
                force_clone_failures: Vec::new(),
            }),
        }
    }
}

impl MockHypervisor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a template pool with `router_name` (empty to omit a router) and
    /// `member_count` regular VMs, all marked as Proxmox templates so the
    /// Engine prefers linked clones.
    pub async fn seed_template_pool(&self, template: &str, router_name: &str, member_count: u32) {
        let pool = format!("{}{template}", crate::client::TEMPLATE_POOL_PREFIX);
        let mut state = self.state.lock().await;
        state.pools.insert(pool.clone());
        let mut vmid = 9000;
        if !router_name.is_empty() {
            state.vms.insert(
                vmid,
                VmRecord {
                    node: "pve1".to_owned(),
                    name: router_name.to_owned(),
                    pool: Some(pool.clone()),
                    status: "stopped".to_owned(),
                    lock: String::new(),
                    is_template: true,
                    critical: false,
                    nics: HashMap::new(),
                },
            );
            vmid += 1;
        }
        for i in 0..member_count {
            state.vms.insert(
                vmid + i,
                VmRecord {
                    node: "pve1".to_owned(),
                    name: format!("{template}-member-{i}"),
                    pool: Some(pool.clone()),
                    status: "stopped".to_owned(),
                    lock: String::new(),
                    is_template: true,
                    critical: false,
                    nics: HashMap::new(),
                },
            );
        }
    }

    /// Seeds `n` existing live pods occupying the given PodIDs, so allocation
    /// tests can assert the Engine skips them (spec.md §8 S3/S6).
    pub async fn seed_live_pods(&self, pod_ids: &[u32]) {
        let mut state = self.state.lock().await;
        for id in pod_ids {
            state.pools.insert(format!("{id:04}_occupied_user"));
        }
    }

    pub async fn realm_syncs(&self) -> Vec<RealmScope> {
        self.state.lock().await.realm_syncs.clone()
    }

    pub async fn vm(&self, vmid: u32) -> Option<(String, String)> {
        self.state
            .lock()
            .await
            .vms
            .get(&vmid)
            .map(|v| (v.node.clone(), v.name.clone()))
    }

    pub async fn nic(&self, vmid: u32, nic: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .vms
            .get(&vmid)
            .and_then(|v| v.nics.get(nic).cloned())
    }

    /// Every `(vmid, argv)` passed to `agent_exec`, in call order.
    pub async fn agent_execs(&self) -> Vec<(u32, Vec<String>)> {
        self.state.lock().await.agent_execs.clone()
    }

    /// Every pool name that was ever deleted, in call order.
    pub async fn deleted_pools(&self) -> Vec<String> {
        self.state.lock().await.deleted_pools.clone()
    }

    pub async fn pool_exists(&self, pool: &str) -> bool {
        self.state.lock().await.pools.contains(pool)
    }

    /// Forces every subsequent `CloneVM` call whose synthesized VM name
    /// contains `substr` to fail, so a target's clone submissions can be made
    /// to fail entirely (spec.md §8 S5: the target's freshly created pool
    /// must then get cleaned up). `submit_clone` names each clone
    /// `"{source_name}-{target_name}"`, so a target's own name is a
    /// sufficient substring.
    pub async fn fail_clones_matching(&self, substr: &str) {
        self.state
            .lock()
            .await
            .force_clone_failures
            .push(substr.to_owned());
    }
}

#[async_trait]
impl Hypervisor for MockHypervisor {
    async fn cluster_resources(
        &self,
        filter_type: Option<&str>,
    ) -> Result<Vec<VirtualResource>, HypervisorError> {
        let state = self.state.lock().await;
        let mut out = Vec::new();
        if filter_type.map_or(true, |t| t == "vm" || t == "qemu") {
            for (vmid, vm) in &state.vms {
                out.push(VirtualResource {
                    kind: "qemu".to_owned(),
                    node: Some(vm.node.clone()),
                    vmid: Some(*vmid),
                    name: Some(vm.name.clone()),
                    pool: vm.pool.clone(),
                    status: Some(vm.status.clone()),
                    cpu: Some(0.1),
                    maxcpu: Some(1.0),
                    mem: Some(1024),
                    maxmem: Some(4096),
                });
            }
        }
        if filter_type.map_or(true, |t| t == "pool") {
            for pool in &state.pools {
                out.push(VirtualResource {
                    kind: "pool".to_owned(),
                    node: None,
                    vmid: None,
                    name: Some(pool.clone()),
                    pool: Some(pool.clone()),
                    status: None,
                    cpu: None,
                    maxcpu: None,
                    mem: None,
                    maxmem: None,
                });
            }
        }
        Ok(out)
    }

    async fn nodes(&self) -> Result<Vec<NodeSummary>, HypervisorError> {
        let state = self.state.lock().await;
        Ok(state
            .nodes
            .iter()
            .map(|n| NodeSummary {
                node: n.clone(),
                status: "online".to_owned(),
                cpu: 0.1,
                maxcpu: 4.0,
                mem: 1024,
                maxmem: 8192,
            })
            .collect())
    }

    async fn node_status(&self, _node: &str) -> Result<NodeStatus, HypervisorError> {
        Ok(NodeStatus {
            cpu: 0.1,
            memory: crate::client::MemoryStatus {
                used: 1024,
                total: 8192,
            },
        })
    }

    async fn create_pool(&self, pool: &str) -> Result<(), HypervisorError> {
        self.state.lock().await.pools.insert(pool.to_owned());
        Ok(())
    }

    async fn delete_pool(&self, pool: &str) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        if !state.pools.remove(pool) {
            return Err(HypervisorError::HttpStatus {
                code: 404,
                body: format!("pool '{pool}' does not exist"),
            });
        }
        state.deleted_pools.push(pool.to_owned());
        Ok(())
    }

    async fn pool_members(&self, pool: &str) -> Result<Vec<VirtualResource>, HypervisorError> {
        let state = self.state.lock().await;
        Ok(state
            .vms
            .iter()
            .filter(|(_, vm)| vm.pool.as_deref() == Some(pool))
            .map(|(vmid, vm)| VirtualResource {
                kind: "qemu".to_owned(),
                node: Some(vm.node.clone()),
                vmid: Some(*vmid),
                name: Some(vm.name.clone()),
                pool: vm.pool.clone(),
                status: Some(vm.status.clone()),
                cpu: Some(0.1),
                maxcpu: Some(1.0),
                mem: Some(1024),
                maxmem: Some(4096),
            })
            .collect())
    }

    async fn wait_for_pool_empty(
        &self,
        pool: &str,
        _timeout: Duration,
    ) -> Result<(), HypervisorError> {
        if self.is_pool_empty(pool).await? {
            Ok(())
        } else {
            Err(HypervisorError::Domain(format!("pool {pool} never emptied")))
        }
    }

    async fn list_template_pools(&self) -> Result<Vec<String>, HypervisorError> {
        let state = self.state.lock().await;
        Ok(state
            .pools
            .iter()
            .filter(|p| p.starts_with(crate::client::TEMPLATE_POOL_PREFIX))
            .cloned()
            .collect())
    }

    async fn set_pool_acl(
        &self,
        _path: &str,
        _principal: &str,
        _is_group: bool,
        _roles: &str,
        _propagate: bool,
    ) -> Result<(), HypervisorError> {
        Ok(())
    }

    async fn start_vm(&self, _node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        let vm = get_vm_mut(&mut state, vmid)?;
        vm.status = "running".to_owned();
        Ok(())
    }

    async fn stop_vm(&self, _node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        let vm = get_vm_mut(&mut state, vmid)?;
        vm.status = "stopped".to_owned();
        Ok(())
    }

    async fn shutdown_vm(&self, _node: &str, vmid: u32) -> Result<(), HypervisorError> {
        self.stop_vm(_node, vmid).await
    }

    async fn reboot_vm(&self, _node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        get_vm_mut(&mut state, vmid)?;
        Ok(())
    }

    async fn delete_vm(&self, _node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        let vm = get_vm(&state, vmid)?;
        if vm.critical {
            return Err(HypervisorError::Domain(format!("VMID {vmid} in critical pool")));
        }
        state.vms.remove(&vmid);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn clone_vm(
        &self,
        _source_node: &str,
        _source_vmid: u32,
        newid: u32,
        name: &str,
        pool: &str,
        target_node: &str,
        _full: bool,
    ) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        if state.force_clone_failures.iter().any(|s| name.contains(s.as_str())) {
            return Err(HypervisorError::Domain(format!(
                "forced clone failure for '{name}'"
            )));
        }
        if state.vms.contains_key(&newid) {
            return Err(HypervisorError::Domain(format!("VMID {newid} already in use")));
        }
        state.vms.insert(
            newid,
            VmRecord {
                node: target_node.to_owned(),
                name: name.to_owned(),
                pool: Some(pool.to_owned()),
                status: "stopped".to_owned(),
                lock: String::new(),
                is_template: false,
                critical: false,
                nics: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn wait_for_lock(
        &self,
        _node: &str,
        vmid: u32,
        _timeout: Duration,
    ) -> Result<(), HypervisorError> {
        let state = self.state.lock().await;
        let vm = get_vm(&state, vmid)?;
        if vm.lock.is_empty() {
            Ok(())
        } else {
            Err(HypervisorError::Domain(format!("VMID {vmid} still locked")))
        }
    }

    async fn wait_for_status(
        &self,
        _node: &str,
        vmid: u32,
        want: &str,
        _timeout: Duration,
    ) -> Result<(), HypervisorError> {
        let state = self.state.lock().await;
        let vm = get_vm(&state, vmid)?;
        if vm.status == want {
            Ok(())
        } else {
            Err(HypervisorError::Domain(format!(
                "VMID {vmid} did not reach status '{want}'"
            )))
        }
    }

    async fn wait_for_disk(
        &self,
        _node: &str,
        vmid: u32,
        _storage_id: &str,
        _timeout: Duration,
    ) -> Result<(), HypervisorError> {
        let state = self.state.lock().await;
        get_vm(&state, vmid)?;
        Ok(())
    }

    async fn convert_to_template(&self, _node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        let vm = get_vm_mut(&mut state, vmid)?;
        vm.is_template = true;
        Ok(())
    }

    async fn get_snapshots(&self, _node: &str, vmid: u32) -> Result<Vec<Snapshot>, HypervisorError> {
        let state = self.state.lock().await;
        get_vm(&state, vmid)?;
        Ok(Vec::new())
    }

    async fn delete_snapshot(
        &self,
        _node: &str,
        vmid: u32,
        _name: &str,
    ) -> Result<(), HypervisorError> {
        let state = self.state.lock().await;
        get_vm(&state, vmid)?;
        Ok(())
    }

    async fn get_vm_config(&self, _node: &str, vmid: u32) -> Result<VmConfig, HypervisorError> {
        let state = self.state.lock().await;
        let vm = get_vm(&state, vmid)?;
        let mut extra = HashMap::new();
        extra.insert("template".to_owned(), json!(i32::from(vm.is_template)));
        extra.insert("note".to_owned(), json!(vm.name));
        Ok(VmConfig {
            lock: Some(vm.lock.clone()),
            scsi0: Some("local-lvm:vm-disk-0".to_owned()),
            name: Some(vm.name.clone()),
            net0: vm.nics.get("net0").cloned(),
            net1: vm.nics.get("net1").cloned(),
            extra,
        })
    }

    async fn agent_ping(&self, _node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let state = self.state.lock().await;
        get_vm(&state, vmid)?;
        Ok(())
    }

    async fn agent_exec(
        &self,
        _node: &str,
        vmid: u32,
        argv: &[String],
    ) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        get_vm(&state, vmid)?;
        state.agent_execs.push((vmid, argv.to_vec()));
        Ok(())
    }

    async fn list_vnets(&self) -> Result<Vec<VNetInfo>, HypervisorError> {
        Ok(self.state.lock().await.vnets.clone())
    }

    async fn set_vm_nic(
        &self,
        _node: &str,
        vmid: u32,
        nic: &str,
        bridge: &str,
    ) -> Result<(), HypervisorError> {
        let mut state = self.state.lock().await;
        let vm = get_vm_mut(&mut state, vmid)?;
        vm.nics
            .insert(nic.to_owned(), format!("virtio,bridge={bridge},firewall=1"));
        Ok(())
    }

    async fn sync_realm(&self, scope: RealmScope) -> Result<(), HypervisorError> {
        self.state.lock().await.realm_syncs.push(scope);
        Ok(())
    }
}

fn get_vm(state: &State, vmid: u32) -> Result<&VmRecord, HypervisorError> {
    state
        .vms
        .get(&vmid)
        .ok_or_else(|| HypervisorError::Domain(format!("VMID {vmid} not found")))
}

fn get_vm_mut(state: &mut State, vmid: u32) -> Result<&mut VmRecord, HypervisorError> {
    state
        .vms
        .get_mut(&vmid)
        .ok_or_else(|| HypervisorError::Domain(format!("VMID {vmid} not found")))
}
