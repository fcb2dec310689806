//! `Publish` (spec.md §4.E.1): converts a template pool's VMs into Proxmox
//! templates and records the catalog row.
//!
//! Resolves the Open Question in spec.md §9 as conversion-before-insert: a
//! failure after conversions but before the insert returns an error with the
//! pool state unchanged from the caller's perspective (already-converted VMs
//! stay templates, which `ConvertVMToTemplate`'s idempotency makes safe to
//! retry).

use std::time::Duration;

use tracing::instrument;

use crate::catalog::Catalog;
use crate::client::Hypervisor;
use crate::models::TemplateInsert;
use crate::utils::EngineError;

const SHUTDOWN_WAIT: Duration = Duration::from_secs(120);

#[instrument(name = "engine::publish", skip(hv, catalog), err(Debug))]
pub async fn publish<H: Hypervisor>(
    hv: &H,
    catalog: &Catalog,
    template: &str,
    authors: Vec<String>,
    description: String,
) -> Result<(), EngineError> {
    let pool_name = format!("{}{template}", crate::client::TEMPLATE_POOL_PREFIX);
    let template_pools = hv.list_template_pools().await?;
    if !template_pools.contains(&pool_name) {
        return Err(EngineError::validation(format!(
            "template pool '{pool_name}' does not exist"
        )));
    }

    let members = hv.pool_members(&pool_name).await?;

    for member in &members {
        if member.status.as_deref() == Some("running") {
            let (node, vmid) = member_location(member)?;
            hv.shutdown_vm(&node, vmid).await?;
            hv.wait_for_status(&node, vmid, "stopped", SHUTDOWN_WAIT)
                .await?;
        }
    }

    for member in &members {
        let (node, vmid) = member_location(member)?;
        match hv.get_snapshots(&node, vmid).await {
            Ok(snapshots) => {
                for snapshot in snapshots {
                    if hv.delete_snapshot(&node, vmid, &snapshot.name).await.is_err() {
                        // best-effort: leftover snapshots push future clones
                        // of this VM to a full clone instead of linked.
                        break;
                    }
                }
            }
            Err(_) => continue,
        }
    }

    for member in &members {
        let (node, vmid) = member_location(member)?;
        hv.convert_to_template(&node, vmid).await?;
    }

    let insert = TemplateInsert {
        name: template.to_owned(),
        description,
        authors,
        vm_count: i32::try_from(members.len()).unwrap_or(i32::MAX),
        template_visible: true,
        pod_visible: true,
        vms_visible: true,
    };
    catalog.insert(&insert).await?;
    Ok(())
}

fn member_location(
    resource: &crate::client::VirtualResource,
) -> Result<(String, u32), EngineError> {
    let node = resource
        .node
        .clone()
        .ok_or_else(|| EngineError::validation("template pool member missing node"))?;
    let vmid = resource
        .vmid
        .ok_or_else(|| EngineError::validation("template pool member missing vmid"))?;
    Ok((node, vmid))
}

