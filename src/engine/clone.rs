//! The Clone state machine (spec.md §4.E.2) — the Cloning Engine's core.
//!
//! States transition strictly forward; a failure before `PoolCreated`
//! aborts with no side effects, a failure at `PoolCreated` aborts and
//! deletes any pools already created for this job (I5), and a failure after
//! `PoolCreated` is collected and reported as a single `Partial` error once
//! the job reaches `Reported` (spec.md §4.E.2, §7 kind 6).

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::catalog::Catalog;
use crate::client::{Hypervisor, TEMPLATE_POOL_PREFIX};
use crate::conf::{Engine as EngineConf, Hypervisor as HypervisorConf};
use crate::models::{CloneRequest, CloneTarget, PodSlot, VmReference};
use crate::progress::ProgressSender;
use crate::utils::{EngineError, ErrorKind};

use super::router::{self, RouterKind};
use super::{alloc, POOL_ACL_ROLES};

const LOCK_WAIT: Duration = Duration::from_secs(60);
const STATUS_WAIT: Duration = Duration::from_secs(120);

/// One VM submitted for cloning, tracked through `Settled`/`Networked`.
struct ClonedVm {
    node: String,
    vmid: u32,
    is_router: bool,
}

/// Per-target bookkeeping: one pod per `CloneTarget` in the job.
struct TargetJob {
    target: CloneTarget,
    pod: PodSlot,
    pool_name: String,
    clones: Vec<ClonedVm>,
    errors: Vec<EngineError>,
}

impl TargetJob {
    fn router(&self) -> Option<&ClonedVm> {
        self.clones.iter().find(|c| c.is_router)
    }
}

#[instrument(name = "engine::clone", skip(hv, catalog, alloc_lock, progress, req), err(Debug))]
#[allow(clippy::too_many_arguments)]
pub async fn clone<H: Hypervisor>(
    hv: &H,
    catalog: &Catalog,
    engine_conf: &EngineConf,
    hv_conf: &HypervisorConf,
    alloc_lock: &Mutex<()>,
    req: CloneRequest,
    progress: &ProgressSender,
) -> Result<(), EngineError> {
    progress.send("Starting", 0).await;

    // -- Validated --
    let catalog_row = catalog.get(&req.template).await?;
    if catalog_row.is_absent() {
        return Err(EngineError::validation(format!(
            "unknown template '{}'",
            req.template
        )));
    }
    let template_pool = format!("{TEMPLATE_POOL_PREFIX}{}", req.template);
    if !hv.list_template_pools().await?.contains(&template_pool) {
        return Err(EngineError::validation(format!(
            "template pool '{template_pool}' does not exist"
        )));
    }
    if req.check_existing_deployments {
        let resources = hv.cluster_resources(Some("pool")).await?;
        for target in &req.targets {
            let suffix = format!("_{}_{}", req.template, target.name);
            let already = resources
                .iter()
                .filter_map(|r| r.pool.as_deref())
                .any(|pool| pool.ends_with(&suffix));
            if already {
                return Err(EngineError::validation(format!(
                    "'{}' already has a deployment of '{}'",
                    target.name, req.template
                )));
            }
        }
    }
    progress.send("Validated", 10).await;

    // -- Enumerated --
    let source_members = hv.pool_members(&template_pool).await?;
    let source_refs: Vec<VmReference> = source_members
        .iter()
        .filter_map(|r| {
            Some(VmReference {
                node: r.node.clone()?,
                vmid: r.vmid?,
                name: r.name.clone().unwrap_or_default(),
                running_status: r.status.clone().unwrap_or_default(),
                is_qemu: true,
            })
        })
        .collect();
    let split = router::classify(source_refs, &engine_conf.router_name);
    if split.members.is_empty() {
        return Err(EngineError::new(
            ErrorKind::HypervisorDomain,
            format!("template pool '{template_pool}' has no member VMs"),
        ));
    }
    let source_router = split.router;
    let source_vms = split.members;
    let vms_per_target = source_vms.len() + usize::from(source_router.is_some());

    // -- Reserved + initial Cloning submission, under the allocation mutex --
    let _guard = alloc_lock.lock().await;
    let pod_slots = alloc::next_pod_ids(hv, engine_conf, req.targets.len()).await?;
    let total_vmids = (vms_per_target * req.targets.len()) as u32;
    let mut vmids = alloc::next_vm_ids(hv, total_vmids, req.starting_vmid)
        .await?
        .into_iter();
    progress.send("Reserved", 20).await;

    let mut jobs: Vec<TargetJob> = Vec::with_capacity(req.targets.len());
    let mut created_pools: Vec<String> = Vec::new();
    let mut pool_create_failure: Option<EngineError> = None;

    for (target, pod) in req.targets.iter().cloned().zip(pod_slots) {
        let pool_name = format!("{}_{}_{}", pod.as_prefix(), req.template, target.name);
        match hv.create_pool(&pool_name).await {
            Ok(()) => {}
            Err(err) => {
                pool_create_failure = Some(err.into());
                break;
            }
        }
        created_pools.push(pool_name.clone());
        let principal = target.principal(&hv_conf.realm);
        if let Err(err) = hv
            .set_pool_acl(
                &format!("/pool/{pool_name}"),
                &principal,
                target.is_group(),
                POOL_ACL_ROLES,
                true,
            )
            .await
        {
            pool_create_failure = Some(err.into());
            break;
        }
        jobs.push(TargetJob {
            target,
            pod,
            pool_name,
            clones: Vec::new(),
            errors: Vec::new(),
        });
    }

    if let Some(err) = pool_create_failure {
        for pool in &created_pools {
            let _ = hv.delete_pool(pool).await;
        }
        drop(_guard);
        return Err(err);
    }

    for job in &mut jobs {
        let target_node = hv.find_best_node().await?;
        let pool_name = job.pool_name.clone();
        if let Some(router_src) = &source_router {
            submit_clone(hv, router_src, &mut vmids, &pool_name, &target_node, true, job).await;
        }
        for member in &source_vms {
            submit_clone(hv, member, &mut vmids, &pool_name, &target_node, false, job).await;
        }
    }
    drop(_guard);
    progress.send("Cloning", 40).await;

    // -- Settled --
    for job in &mut jobs {
        for clone in &job.clones {
            if let Err(err) = hv.wait_for_lock(&clone.node, clone.vmid, LOCK_WAIT).await {
                job.errors.push(err.into());
            }
        }
    }

    // -- Networked --
    for job in &mut jobs {
        let vnet = job.pod.vnet_name();
        for clone in &job.clones {
            let nic = if clone.is_router { "net1" } else { "net0" };
            if let Err(err) = hv.set_vm_nic(&clone.node, clone.vmid, nic, &vnet).await {
                job.errors.push(err.into());
            }
        }
    }
    progress.send("Networked", 60).await;

    // -- RouterReady --
    let mut router_ready: Vec<bool> = Vec::with_capacity(jobs.len());
    for job in &mut jobs {
        let Some(router_clone) = job.router() else {
            router_ready.push(false);
            continue;
        };
        let (node, vmid) = (router_clone.node.clone(), router_clone.vmid);
        let ready = async {
            hv.wait_for_disk(
                &node,
                vmid,
                &hv_conf.storage_id,
                Duration::from_secs(engine_conf.router_wait_timeout_secs),
            )
            .await?;
            hv.start_vm(&node, vmid).await?;
            hv.wait_for_status(&node, vmid, "running", STATUS_WAIT).await
        }
        .await;
        match ready {
            Ok(()) => router_ready.push(true),
            Err(err) => {
                job.errors.push(err.into());
                router_ready.push(false);
            }
        }
    }
    progress.send("RouterReady", 75).await;

    // -- RouterConfigured --
    for (job, ready) in jobs.iter_mut().zip(router_ready.iter().copied()) {
        if !ready {
            continue;
        }
        let Some(router_clone) = job.router() else {
            continue;
        };
        let (node, vmid) = (router_clone.node.clone(), router_clone.vmid);

        if let Err(err) = hv.agent_ping(&node, vmid).await {
            job.errors.push(err.into());
            continue;
        }
        let config = match hv.get_vm_config(&node, vmid).await {
            Ok(c) => c,
            Err(err) => {
                job.errors.push(err.into());
                continue;
            }
        };
        let kind = router::detect_kind(&config);
        if kind == RouterKind::Unknown {
            job.errors.push(EngineError::new(
                ErrorKind::HypervisorDomain,
                format!("router VMID {vmid} is not a recognized pfsense/vyos image"),
            ));
            continue;
        }
        let argv_list = router::exec_argv(
            kind,
            job.pod,
            &engine_conf.wan_ip_base,
            &engine_conf.wan_script_path,
            &engine_conf.vip_script_path,
            &engine_conf.vyos_script_path,
        );
        for argv in argv_list {
            if let Err(err) = hv.agent_exec(&node, vmid, &argv).await {
                job.errors.push(err.into());
            }
        }
    }
    progress.send("RouterConfigured", 90).await;

    // -- Counted --
    for job in &mut jobs {
        if !job.clones.is_empty() {
            if let Err(err) = catalog.add_deployment(&req.template, 1).await {
                job.errors.push(err.into());
            }
        }
    }

    // -- Aborted (I5): dangling pools for targets that cloned nothing --
    for job in &jobs {
        if job.clones.is_empty() {
            let _ = hv.delete_pool(&job.pool_name).await;
        }
    }

    progress.send("Completed", 100).await;

    let errors: Vec<EngineError> = jobs.into_iter().flat_map(|j| j.errors).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::partial(&errors))
    }
}

async fn submit_clone<H: Hypervisor>(
    hv: &H,
    source: &VmReference,
    vmids: &mut impl Iterator<Item = u32>,
    pool: &str,
    target_node: &str,
    is_router: bool,
    job: &mut TargetJob,
) {
    let Some(newid) = vmids.next() else {
        job.errors.push(EngineError::exhausted("ran out of allocated VMIDs"));
        return;
    };
    let full = !is_template_source(hv, source).await;
    let name = format!("{}-{}", source.name, job.target.name);
    match hv
        .clone_vm(
            &source.node,
            source.vmid,
            newid,
            &name,
            pool,
            target_node,
            full,
        )
        .await
    {
        Ok(()) => job.clones.push(ClonedVm {
            node: target_node.to_owned(),
            vmid: newid,
            is_router,
        }),
        Err(err) => job.errors.push(err.into()),
    }
}

/// Whether the source VM is itself a Proxmox template object, which prefers
/// a linked clone (spec.md §4.E.2 Cloning).
async fn is_template_source<H: Hypervisor>(hv: &H, source: &VmReference) -> bool {
    match hv.get_vm_config(&source.node, source.vmid).await {
        Ok(config) => config
            .extra
            .get("template")
            .and_then(serde_json::Value::as_i64)
            .is_some_and(|v| v != 0),
        Err(_) => false,
    }
}
