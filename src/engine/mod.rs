//! The Cloning Engine (spec.md §4.E): orchestrates publish / clone / delete /
//! query of pods. The 40%-of-budget core this repo exists to implement.

mod alloc;
mod clone;
mod delete;
mod list;
mod publish;
mod router;

use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::client::{Hypervisor, RealmScope};
use crate::conf::{Engine as EngineConf, Hypervisor as HypervisorConf};
use crate::directory::Directory;
use crate::models::{CloneRequest, Pod};
use crate::progress::ProgressSender;
use crate::utils::EngineError;

/// The roles granted to a pod's owning principal (spec.md §4.E.4).
const POOL_ACL_ROLES: &str = "PVEVMUser,PVEPoolUser";

/// Generic over the [`Hypervisor`] implementation so tests can substitute a
/// mock (spec.md §8). Holds the process-wide allocation mutex described in
/// spec.md §5 / §9 Design Note 1.
pub struct Engine<H: Hypervisor> {
    hypervisor: H,
    catalog: Catalog,
    directory: Directory,
    conf: EngineConf,
    hv_conf: HypervisorConf,
    alloc_lock: Mutex<()>,
}

impl<H: Hypervisor> Engine<H> {
    pub fn new(
        hypervisor: H,
        catalog: Catalog,
        directory: Directory,
        conf: EngineConf,
        hv_conf: HypervisorConf,
    ) -> Self {
        Engine {
            hypervisor,
            catalog,
            directory,
            conf,
            hv_conf,
            alloc_lock: Mutex::new(()),
        }
    }

    pub async fn publish(
        &self,
        template: &str,
        authors: Vec<String>,
        description: String,
    ) -> Result<(), EngineError> {
        publish::publish(&self.hypervisor, &self.catalog, template, authors, description).await
    }

    pub async fn clone(
        &self,
        req: CloneRequest,
        progress: &ProgressSender,
    ) -> Result<(), EngineError> {
        clone::clone(
            &self.hypervisor,
            &self.catalog,
            &self.conf,
            &self.hv_conf,
            &self.alloc_lock,
            req,
            progress,
        )
        .await
    }

    pub async fn delete(&self, pod: &str, caller: &str, is_admin: bool) -> Result<(), EngineError> {
        delete::delete(&self.hypervisor, pod, caller, is_admin).await
    }

    /// Widens the ownership filter with `principal`'s group memberships
    /// before listing, per spec.md §4.C.
    pub async fn list_pods(&self, principal: &str) -> Result<Vec<Pod>, EngineError> {
        let groups = self.directory.get_user_groups(principal).await?;
        list::list_pods(&self.hypervisor, principal, &groups, &self.conf.router_name).await
    }

    pub async fn list_unpublished_templates(&self) -> Result<Vec<String>, EngineError> {
        list::list_unpublished_templates(&self.hypervisor, &self.catalog).await
    }

    /// Ambient maintenance operation exposed to the edge/CLI (SPEC_FULL.md §10).
    pub async fn sync_realm(&self, scope: RealmScope) -> Result<(), EngineError> {
        self.hypervisor.sync_realm(scope).await.map_err(Into::into)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Exposes the underlying hypervisor client, e.g. so tests can seed or
    /// inspect a [`crate::test_utilities::MockHypervisor`].
    pub fn hypervisor(&self) -> &H {
        &self.hypervisor
    }
}
