//! `Delete` (spec.md §4.E.1, §4.E.5): idempotent pod teardown with the
//! only authorization the engine enforces — non-admin callers may only
//! delete pods that name them.

use std::time::Duration;

use tracing::instrument;

use crate::client::Hypervisor;
use crate::utils::EngineError;

const POOL_EMPTY_WAIT: Duration = Duration::from_secs(5 * 60);
const STOP_WAIT: Duration = Duration::from_secs(120);

/// spec.md P6: a non-admin delete of a pod not naming the caller returns
/// `ValidationRejected` and makes no hypervisor call.
fn authorize(pod: &str, caller: &str, is_admin: bool) -> Result<(), EngineError> {
    if is_admin {
        return Ok(());
    }
    if pod.to_lowercase().contains(&caller.to_lowercase()) {
        Ok(())
    } else {
        Err(EngineError::validation(format!(
            "'{caller}' is not authorized to delete pod '{pod}'"
        )))
    }
}

#[instrument(name = "engine::delete", skip(hv), err(Debug))]
pub async fn delete<H: Hypervisor>(
    hv: &H,
    pod: &str,
    caller: &str,
    is_admin: bool,
) -> Result<(), EngineError> {
    authorize(pod, caller, is_admin)?;

    let members = hv.pool_members(pod).await?;
    if members.is_empty() {
        hv.delete_pool(pod).await?;
        return Ok(());
    }

    for member in &members {
        if member.status.as_deref() != Some("running") {
            continue;
        }
        let (Some(node), Some(vmid)) = (member.node.clone(), member.vmid) else {
            continue;
        };
        if hv.stop_vm(&node, vmid).await.is_ok() {
            let _ = hv.wait_for_status(&node, vmid, "stopped", STOP_WAIT).await;
        }
    }

    for member in &members {
        let (Some(node), Some(vmid)) = (member.node.clone(), member.vmid) else {
            continue;
        };
        // DeleteVM failures are fatal, unlike the best-effort stop loop above.
        hv.delete_vm(&node, vmid).await?;
    }

    hv.wait_for_pool_empty(pod, POOL_EMPTY_WAIT).await?;
    hv.delete_pool(pod).await?;
    Ok(())
}
