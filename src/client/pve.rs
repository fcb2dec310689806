//! The real hypervisor client: typed `reqwest` calls to a Proxmox-style
//! cluster REST API (spec.md §4.A, §6).

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use crate::conf::Hypervisor as HypervisorConf;

use super::error::HypervisorError;
use super::helpers::{send_empty, send_envelope};
use super::poll::{poll_backoff, poll_until};
use super::retry::RetryPolicy;
use super::traits::{Hypervisor, RealmScope};
use super::types::{
    CloneVmRequest, NodeStatus, NodeSummary, PoolInfo, Snapshot, StorageContentEntry, VNetInfo,
    VirtualResource, VmConfig, VmStatus,
};

/// Prefix used to tag published template pools (spec.md §3, GLOSSARY).
pub const TEMPLATE_POOL_PREFIX: &str = "kamino_template_";

/// A `reqwest`-backed client talking to the Proxmox cluster API.
///
/// Safe for concurrent use: `reqwest::Client` pools its own connections and
/// is cheap to clone.
#[derive(Clone)]
pub struct PveClient {
    host: String,
    token: String,
    client: reqwest::Client,
    critical_pool: Option<String>,
    realm: String,
}

impl PveClient {
    /// Builds the client from config; fails fast on a malformed base URL or
    /// TLS builder error (spec.md §7 kind 1).
    pub fn new(conf: &HypervisorConf) -> Result<Self, HypervisorError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(conf.insecure_tls)
            .timeout(Duration::from_secs(conf.http_timeout_secs))
            .build()
            .map_err(|e| HypervisorError::Transport(e.to_string()))?;
        Ok(PveClient {
            host: conf.host.trim_end_matches('/').to_owned(),
            token: format!("PVEAPIToken={}", conf.token),
            client,
            critical_pool: conf.critical_pool.clone(),
            realm: conf.realm.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    fn req(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("Authorization", &self.token)
            .header("Accept", "application/json")
    }

    /// Fail-closed guard applied before every destructive VM operation
    /// (spec.md §4.A): the VMID must exist in cluster resources and must not
    /// belong to the configured critical pool.
    async fn guard_destructive(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let resources = self.cluster_resources(Some("vm")).await?;
        let found = resources
            .iter()
            .find(|r| r.vmid == Some(vmid) && r.node.as_deref() == Some(node));
        let found = match found {
            Some(r) => r,
            None => {
                return Err(HypervisorError::Domain(format!(
                    "VMID {vmid} not found"
                )))
            }
        };
        if let Some(critical) = &self.critical_pool {
            if found.pool.as_deref() == Some(critical.as_str()) {
                return Err(HypervisorError::Domain(format!(
                    "VMID {vmid} in critical pool"
                )));
            }
        }
        Ok(())
    }

    async fn status_action(
        &self,
        node: &str,
        vmid: u32,
        action: &str,
    ) -> Result<(), HypervisorError> {
        self.guard_destructive(node, vmid).await?;
        let req = self.req(
            reqwest::Method::POST,
            &format!("/nodes/{node}/qemu/{vmid}/status/{action}"),
        );
        send_envelope::<String>(req).await.map(|_| ())
    }
}

#[async_trait]
impl Hypervisor for PveClient {
    #[instrument(name = "client::pve::cluster_resources", skip(self), err(Debug))]
    async fn cluster_resources(
        &self,
        filter_type: Option<&str>,
    ) -> Result<Vec<VirtualResource>, HypervisorError> {
        let mut req = self.req(reqwest::Method::GET, "/cluster/resources");
        if let Some(t) = filter_type {
            req = req.query(&[("type", t)]);
        }
        send_envelope(req).await
    }

    #[instrument(name = "client::pve::nodes", skip(self), err(Debug))]
    async fn nodes(&self) -> Result<Vec<NodeSummary>, HypervisorError> {
        send_envelope(self.req(reqwest::Method::GET, "/nodes")).await
    }

    #[instrument(name = "client::pve::node_status", skip(self), err(Debug))]
    async fn node_status(&self, node: &str) -> Result<NodeStatus, HypervisorError> {
        send_envelope(self.req(reqwest::Method::GET, &format!("/nodes/{node}/status"))).await
    }

    #[instrument(name = "client::pve::create_pool", skip(self), err(Debug))]
    async fn create_pool(&self, pool: &str) -> Result<(), HypervisorError> {
        let req = self
            .req(reqwest::Method::POST, "/pools")
            .json(&serde_json::json!({ "poolid": pool }));
        send_envelope::<Option<String>>(req).await.map(|_| ())
    }

    #[instrument(name = "client::pve::delete_pool", skip(self), err(Debug))]
    async fn delete_pool(&self, pool: &str) -> Result<(), HypervisorError> {
        let req = self.req(reqwest::Method::DELETE, &format!("/pools/{pool}"));
        send_empty(req).await
    }

    #[instrument(name = "client::pve::pool_members", skip(self), err(Debug))]
    async fn pool_members(&self, pool: &str) -> Result<Vec<VirtualResource>, HypervisorError> {
        #[derive(serde::Deserialize)]
        struct PoolDetails {
            #[serde(default)]
            members: Vec<VirtualResource>,
        }
        let req = self.req(reqwest::Method::GET, &format!("/pools/{pool}"));
        let details: PoolDetails = send_envelope(req).await?;
        Ok(details
            .members
            .into_iter()
            .filter(|m| m.kind == "qemu")
            .collect())
    }

    #[instrument(name = "client::pve::wait_for_pool_empty", skip(self), err(Debug))]
    async fn wait_for_pool_empty(
        &self,
        pool: &str,
        timeout: Duration,
    ) -> Result<(), HypervisorError> {
        poll_backoff(
            || async { self.is_pool_empty(pool).await },
            RetryPolicy::backoff(Duration::from_secs(2), Duration::from_secs(30)),
            timeout,
            &format!("pool {pool} did not empty within {}s", timeout.as_secs()),
        )
        .await
    }

    #[instrument(name = "client::pve::list_template_pools", skip(self), err(Debug))]
    async fn list_template_pools(&self) -> Result<Vec<String>, HypervisorError> {
        let req = self.req(reqwest::Method::GET, "/pools");
        let pools: Vec<PoolInfo> = send_envelope(req).await?;
        Ok(pools
            .into_iter()
            .map(|p| p.poolid)
            .filter(|id| id.starts_with(TEMPLATE_POOL_PREFIX))
            .collect())
    }

    #[instrument(name = "client::pve::set_pool_acl", skip(self), err(Debug))]
    async fn set_pool_acl(
        &self,
        path: &str,
        principal: &str,
        is_group: bool,
        roles: &str,
        propagate: bool,
    ) -> Result<(), HypervisorError> {
        let mut body = serde_json::json!({
            "path": path,
            "roles": roles,
            "propagate": if propagate { 1 } else { 0 },
        });
        if is_group {
            body["groups"] = serde_json::Value::String(principal.to_owned());
        } else {
            body["users"] = serde_json::Value::String(principal.to_owned());
        }
        let req = self.req(reqwest::Method::PUT, "/access/acl").json(&body);
        send_empty(req).await
    }

    #[instrument(name = "client::pve::start_vm", skip(self), err(Debug))]
    async fn start_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        self.status_action(node, vmid, "start").await
    }

    #[instrument(name = "client::pve::stop_vm", skip(self), err(Debug))]
    async fn stop_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        self.status_action(node, vmid, "stop").await
    }

    #[instrument(name = "client::pve::shutdown_vm", skip(self), err(Debug))]
    async fn shutdown_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        self.status_action(node, vmid, "shutdown").await
    }

    #[instrument(name = "client::pve::reboot_vm", skip(self), err(Debug))]
    async fn reboot_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        self.status_action(node, vmid, "reboot").await
    }

    #[instrument(name = "client::pve::delete_vm", skip(self), err(Debug))]
    async fn delete_vm(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        self.guard_destructive(node, vmid).await?;
        let req = self.req(reqwest::Method::DELETE, &format!("/nodes/{node}/qemu/{vmid}"));
        send_empty(req).await
    }

    #[instrument(name = "client::pve::clone_vm", skip(self), err(Debug))]
    async fn clone_vm(
        &self,
        source_node: &str,
        source_vmid: u32,
        newid: u32,
        name: &str,
        pool: &str,
        target_node: &str,
        full: bool,
    ) -> Result<(), HypervisorError> {
        let body = CloneVmRequest {
            newid,
            name: name.to_owned(),
            pool: pool.to_owned(),
            full: u8::from(full),
            target: target_node.to_owned(),
        };
        let req = self
            .req(
                reqwest::Method::POST,
                &format!("/nodes/{source_node}/qemu/{source_vmid}/clone"),
            )
            .json(&body);
        send_envelope::<String>(req).await.map(|_| ())
    }

    #[instrument(name = "client::pve::wait_for_lock", skip(self), err(Debug))]
    async fn wait_for_lock(
        &self,
        node: &str,
        vmid: u32,
        timeout: Duration,
    ) -> Result<(), HypervisorError> {
        poll_until(
            || async {
                let config = self.get_vm_config(node, vmid).await?;
                Ok(config.lock.unwrap_or_default().is_empty())
            },
            Duration::from_secs(5),
            timeout,
            &format!("lock on VMID {vmid} did not clear within {}s", timeout.as_secs()),
        )
        .await
    }

    #[instrument(name = "client::pve::wait_for_status", skip(self), err(Debug))]
    async fn wait_for_status(
        &self,
        node: &str,
        vmid: u32,
        want: &str,
        timeout: Duration,
    ) -> Result<(), HypervisorError> {
        let want = want.to_owned();
        poll_until(
            || async {
                let req = self.req(
                    reqwest::Method::GET,
                    &format!("/nodes/{node}/qemu/{vmid}/status/current"),
                );
                let status: VmStatus = send_envelope(req).await?;
                Ok(status.status == want)
            },
            Duration::from_secs(5),
            timeout,
            &format!("VMID {vmid} did not reach status '{want}' within {}s", timeout.as_secs()),
        )
        .await
    }

    #[instrument(name = "client::pve::wait_for_disk", skip(self), err(Debug))]
    async fn wait_for_disk(
        &self,
        node: &str,
        vmid: u32,
        storage_id: &str,
        timeout: Duration,
    ) -> Result<(), HypervisorError> {
        poll_until(
            || async {
                let config = self.get_vm_config(node, vmid).await?;
                Ok(config.scsi0.as_deref().is_some_and(|s| !s.is_empty())
                    && config.name.as_deref().is_some_and(|n| !n.is_empty()))
            },
            Duration::from_secs(2),
            timeout,
            &format!("VMID {vmid} disk config did not appear within {}s", timeout.as_secs()),
        )
        .await?;
        poll_until(
            || async {
                let req = self.req(
                    reqwest::Method::GET,
                    &format!("/nodes/{node}/storage/{storage_id}/content"),
                );
                let req = req.query(&[("vmid", vmid.to_string())]);
                let entries: Vec<StorageContentEntry> = send_envelope(req).await?;
                Ok(!entries.is_empty() && entries.iter().all(|e| e.size > 0))
            },
            Duration::from_secs(2),
            timeout,
            &format!("VMID {vmid} disk content did not appear within {}s", timeout.as_secs()),
        )
        .await
    }

    #[instrument(name = "client::pve::convert_to_template", skip(self), err(Debug))]
    async fn convert_to_template(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        let req = self.req(
            reqwest::Method::POST,
            &format!("/nodes/{node}/qemu/{vmid}/template"),
        );
        match send_envelope::<Option<String>>(req).await {
            Ok(_) => Ok(()),
            Err(HypervisorError::HttpStatus { body, .. })
                if body.contains("can't convert a template to a template") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(name = "client::pve::get_snapshots", skip(self), err(Debug))]
    async fn get_snapshots(&self, node: &str, vmid: u32) -> Result<Vec<Snapshot>, HypervisorError> {
        let req = self.req(
            reqwest::Method::GET,
            &format!("/nodes/{node}/qemu/{vmid}/snapshot"),
        );
        let snaps: Vec<Snapshot> = send_envelope(req).await?;
        Ok(snaps.into_iter().filter(|s| s.name != "current").collect())
    }

    #[instrument(name = "client::pve::delete_snapshot", skip(self), err(Debug))]
    async fn delete_snapshot(
        &self,
        node: &str,
        vmid: u32,
        name: &str,
    ) -> Result<(), HypervisorError> {
        if name == "current" {
            return Ok(());
        }
        let req = self.req(
            reqwest::Method::DELETE,
            &format!("/nodes/{node}/qemu/{vmid}/snapshot/{name}"),
        );
        send_empty(req).await
    }

    #[instrument(name = "client::pve::get_vm_config", skip(self), err(Debug))]
    async fn get_vm_config(&self, node: &str, vmid: u32) -> Result<VmConfig, HypervisorError> {
        let req = self.req(
            reqwest::Method::GET,
            &format!("/nodes/{node}/qemu/{vmid}/config"),
        );
        send_envelope(req).await
    }

    #[instrument(name = "client::pve::agent_ping", skip(self), err(Debug))]
    async fn agent_ping(&self, node: &str, vmid: u32) -> Result<(), HypervisorError> {
        poll_backoff(
            || async {
                let req = self.req(
                    reqwest::Method::POST,
                    &format!("/nodes/{node}/qemu/{vmid}/agent/ping"),
                );
                match send_envelope::<Option<String>>(req).await {
                    Ok(_) => Ok(true),
                    Err(HypervisorError::Transport(_) | HypervisorError::HttpStatus { .. }) => {
                        Ok(false)
                    }
                    Err(e) => Err(e),
                }
            },
            RetryPolicy::backoff(Duration::from_secs(1), Duration::from_secs(30)),
            Duration::from_secs(300),
            &format!("guest agent on VMID {vmid} never became reachable"),
        )
        .await
    }

    #[instrument(name = "client::pve::agent_exec", skip(self), err(Debug))]
    async fn agent_exec(
        &self,
        node: &str,
        vmid: u32,
        argv: &[String],
    ) -> Result<(), HypervisorError> {
        let req = self
            .req(
                reqwest::Method::POST,
                &format!("/nodes/{node}/qemu/{vmid}/agent/exec"),
            )
            .json(&serde_json::json!({ "command": argv }));
        send_envelope::<serde_json::Value>(req).await.map(|_| ())
    }

    #[instrument(name = "client::pve::list_vnets", skip(self), err(Debug))]
    async fn list_vnets(&self) -> Result<Vec<VNetInfo>, HypervisorError> {
        send_envelope(self.req(reqwest::Method::GET, "/cluster/sdn/vnets")).await
    }

    #[instrument(name = "client::pve::set_vm_nic", skip(self), err(Debug))]
    async fn set_vm_nic(
        &self,
        node: &str,
        vmid: u32,
        nic: &str,
        bridge: &str,
    ) -> Result<(), HypervisorError> {
        let value = format!("virtio,bridge={bridge},firewall=1");
        let req = self
            .req(
                reqwest::Method::PUT,
                &format!("/nodes/{node}/qemu/{vmid}/config"),
            )
            .json(&serde_json::json!({ nic: value }));
        send_envelope::<Option<String>>(req).await.map(|_| ())
    }

    #[instrument(name = "client::pve::sync_realm", skip(self), err(Debug))]
    async fn sync_realm(&self, scope: RealmScope) -> Result<(), HypervisorError> {
        let req = self
            .req(
                reqwest::Method::POST,
                &format!("/access/domains/{}/sync", self.realm),
            )
            .query(&[
                ("scope", scope.as_str()),
                ("remove-vanished", "acl;properties;entry"),
            ]);
        send_envelope::<String>(req).await.map(|_| ())
    }
}
