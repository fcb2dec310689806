//! `ListPods` and `ListUnpublishedTemplates` (spec.md §4.E.1).

use regex::Regex;

use crate::catalog::Catalog;
use crate::client::Hypervisor;
use crate::models::{Pod, PodSlot, VmReference};
use crate::utils::EngineError;

use super::router;

fn to_vm_reference(resource: &crate::client::VirtualResource) -> Option<VmReference> {
    Some(VmReference {
        node: resource.node.clone()?,
        vmid: resource.vmid?,
        name: resource.name.clone().unwrap_or_default(),
        running_status: resource.status.clone().unwrap_or_else(|| "unknown".to_owned()),
        is_qemu: resource.kind == "qemu",
    })
}

/// Every pod owned by `principal`, widened to its group memberships, per
/// spec.md §4.E.1 `ListPods`.
pub async fn list_pods<H: Hypervisor>(
    hv: &H,
    principal: &str,
    groups: &[String],
    default_router_name: &str,
) -> Result<Vec<Pod>, EngineError> {
    let mut identities = vec![principal.to_owned()];
    identities.extend(groups.iter().cloned());
    let alternation = identities
        .iter()
        .map(|id| regex::escape(id))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?i)^1[0-9]{{3}}_.*_({alternation})$");
    let owner_re = Regex::new(&pattern)
        .map_err(|e| EngineError::validation(format!("bad ownership filter: {e}")))?;

    let resources = hv.cluster_resources(None).await?;
    let mut pods = Vec::new();
    for resource in &resources {
        if resource.kind != "pool" {
            continue;
        }
        let Some(pool_name) = &resource.pool else {
            continue;
        };
        if !owner_re.is_match(pool_name) {
            continue;
        }
        let Some((pod_id_str, rest)) = pool_name.split_once('_') else {
            continue;
        };
        let Ok(pod_id) = pod_id_str.parse::<u32>() else {
            continue;
        };
        let target = identities
            .iter()
            .find(|id| rest.to_lowercase().ends_with(&format!("_{}", id.to_lowercase())))
            .cloned()
            .unwrap_or_default();
        let template = rest
            .strip_suffix(&format!("_{target}"))
            .unwrap_or(rest)
            .to_owned();

        let members = hv.pool_members(pool_name).await?;
        let vm_refs: Vec<VmReference> = members.iter().filter_map(to_vm_reference).collect();
        let split = router::classify(vm_refs, default_router_name);

        pods.push(Pod {
            pool_name: pool_name.clone(),
            template,
            target,
            vms: split.members,
            router: split.router,
            vnet: Some(PodSlot(pod_id).vnet_name()),
        });
    }
    Ok(pods)
}

/// Template pools on the hypervisor with no corresponding catalog row
/// (spec.md §4.E.1 `ListUnpublishedTemplates`).
pub async fn list_unpublished_templates<H: Hypervisor>(
    hv: &H,
    catalog: &Catalog,
) -> Result<Vec<String>, EngineError> {
    let pools = hv.list_template_pools().await?;
    let published = catalog.list(false).await?;
    let published_names: std::collections::HashSet<_> =
        published.into_iter().map(|t| t.name).collect();
    Ok(pools
        .into_iter()
        .map(|pool| {
            pool.strip_prefix(crate::client::TEMPLATE_POOL_PREFIX)
                .unwrap_or(&pool)
                .to_owned()
        })
        .filter(|name| !published_names.contains(name))
        .collect())
}
