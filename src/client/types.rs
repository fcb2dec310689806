//! Wire types for the Proxmox-style cluster REST surface (spec.md §6).

use serde::{Deserialize, Serialize};

/// One row of `GET /cluster/resources`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirtualResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub node: Option<String>,
    pub vmid: Option<u32>,
    pub name: Option<String>,
    pub pool: Option<String>,
    pub status: Option<String>,
    pub cpu: Option<f64>,
    pub maxcpu: Option<f64>,
    pub mem: Option<u64>,
    pub maxmem: Option<u64>,
}

/// A row of `GET /nodes`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSummary {
    pub node: String,
    pub status: String,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub maxcpu: f64,
    #[serde(default)]
    pub mem: u64,
    #[serde(default)]
    pub maxmem: u64,
}

impl NodeSummary {
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }

    /// `(cpuLoad + mem/maxmem)/2` (spec.md §4.A `FindBestNode`).
    #[must_use]
    pub fn load(&self) -> f64 {
        let mem_ratio = if self.maxmem == 0 {
            0.0
        } else {
            self.mem as f64 / self.maxmem as f64
        };
        (self.cpu + mem_ratio) / 2.0
    }
}

/// `GET /nodes/{n}/status`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeStatus {
    pub cpu: f64,
    pub memory: MemoryStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryStatus {
    pub used: u64,
    pub total: u64,
}

/// The subset of `GET /nodes/{n}/qemu/{id}/config` the engine cares about.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VmConfig {
    #[serde(default)]
    pub lock: Option<String>,
    #[serde(default)]
    pub scsi0: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub net0: Option<String>,
    #[serde(default)]
    pub net1: Option<String>,
    /// Raw JSON fields preserved for router-type detection by substring
    /// match (spec.md §4.E.2, Design Note in §9).
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl VmConfig {
    /// Whether this config's raw contents mention `pfsense`/`vyos`
    /// (case-insensitive substring match, per spec.md §4.E.2). Matches
    /// against the whole config, including typed fields like `name`, not
    /// just the untyped remainder — a router's own name (e.g. `pfSense-fw`)
    /// is itself a mention.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        let haystack = serde_json::to_string(self).unwrap_or_default().to_lowercase();
        haystack.contains(&needle.to_lowercase())
    }
}

/// `GET /nodes/{n}/qemu/{id}/status/current`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VmStatus {
    pub status: String,
}

/// A disk entry from `GET /nodes/{n}/storage/{sid}/content`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageContentEntry {
    pub volid: String,
    #[serde(default)]
    pub vmid: Option<u32>,
    #[serde(default)]
    pub size: u64,
}

/// `POST /nodes/{n}/qemu/{id}/clone` body.
#[derive(Debug, Clone, Serialize)]
pub struct CloneVmRequest {
    pub newid: u32,
    pub name: String,
    pub pool: String,
    pub full: u8,
    pub target: String,
}

/// A snapshot entry from `GET /nodes/{n}/qemu/{id}/snapshot`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Snapshot {
    pub name: String,
}

/// `GET /cluster/sdn/vnets` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VNetInfo {
    pub name: String,
    pub tag: Option<u32>,
}

/// `GET|POST /pools` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolInfo {
    pub poolid: String,
}

