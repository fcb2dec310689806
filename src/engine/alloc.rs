//! PodID and VMID allocation (spec.md §4.E.3).
//!
//! Both operate the same way: re-query the hypervisor (it is the source of
//! truth), compute the lowest free slot(s), and leave mutual exclusion to the
//! caller — the process-wide allocation mutex in [`super::Engine`] is held
//! across a call here plus the immediate `CloneVM` submissions that follow,
//! never across wait loops (spec.md §5, Design Note 1 in §9).

use crate::client::Hypervisor;
use crate::conf::Engine as EngineConf;
use crate::models::PodSlot;
use crate::utils::EngineError;

/// The first `n` integers in `[conf.min_pod_id, conf.max_pod_id]` not
/// currently used by a live pool.
pub async fn next_pod_ids<H: Hypervisor>(
    hv: &H,
    conf: &EngineConf,
    n: usize,
) -> Result<Vec<PodSlot>, EngineError> {
    let resources = hv.cluster_resources(Some("pool")).await?;
    let mut used = std::collections::HashSet::new();
    for r in &resources {
        let Some(pool) = &r.pool else { continue };
        if pool.len() < 4 {
            continue;
        }
        if let Ok(id) = pool[..4].parse::<u32>() {
            if id >= conf.min_pod_id && id <= conf.max_pod_id {
                used.insert(id);
            }
        }
    }
    let mut out = Vec::with_capacity(n);
    let mut candidate = conf.min_pod_id;
    while out.len() < n {
        if candidate > conf.max_pod_id {
            return Err(EngineError::exhausted(format!(
                "no available pod IDs in range {}-{}",
                conf.min_pod_id, conf.max_pod_id
            )));
        }
        if !used.contains(&candidate) {
            out.push(PodSlot(candidate));
            used.insert(candidate);
        }
        candidate += 1;
    }
    Ok(out)
}

/// `n` contiguous VMIDs: the caller's explicit `starting_vmid` if given and
/// free, otherwise either immediately above the highest VMID in use, or
/// inside the first gap between consecutive VMIDs wide enough to hold `n`
/// (spec.md §3 CloneJob, §4.E.3).
pub async fn next_vm_ids<H: Hypervisor>(
    hv: &H,
    n: u32,
    starting_vmid: Option<u32>,
) -> Result<Vec<u32>, EngineError> {
    let resources = hv.cluster_resources(Some("vm")).await?;
    let mut vmids: Vec<u32> = resources.iter().filter_map(|r| r.vmid).collect();
    vmids.sort_unstable();
    vmids.dedup();

    if let Some(start) = starting_vmid {
        let used: std::collections::HashSet<u32> = vmids.iter().copied().collect();
        let end = start + n;
        if (start..end).any(|id| used.contains(&id)) {
            return Err(EngineError::validation(format!(
                "requested starting VMID {start} collides with an in-use VMID in {start}-{}",
                end - 1
            )));
        }
        return Ok((start..end).collect());
    }

    for window in vmids.windows(2) {
        let (low, high) = (window[0], window[1]);
        if high > low && high - low > n {
            let base = low + 1;
            return Ok((base..base + n).collect());
        }
    }
    let base = vmids.last().map_or(100, |highest| highest + 1);
    Ok((base..base + n).collect())
}
