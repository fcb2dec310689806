//! Pod, PodSlot, VM reference, and template-pool types (spec.md §3).

use serde::{Deserialize, Serialize};

/// An allocated pod-number slot in `[MinPodID, MaxPodID]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PodSlot(pub u32);

impl PodSlot {
    /// The four-digit zero-padded string form, e.g. `0042`.
    #[must_use]
    pub fn as_prefix(self) -> String {
        format!("{:04}", self.0)
    }

    /// `VNet index = PodID - 1000` (spec.md §3).
    #[must_use]
    pub fn vnet_index(self) -> u32 {
        self.0 - 1000
    }

    /// `kamino{PodNumber}` (spec.md §4.E.2).
    #[must_use]
    pub fn vnet_name(self) -> String {
        format!("kamino{}", self.vnet_index())
    }
}

/// `{node, vmid, name, runningStatus, type}` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmReference {
    pub node: String,
    pub vmid: u32,
    pub name: String,
    pub running_status: String,
    pub is_qemu: bool,
}

/// Whether a clone target is a user or a group principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalKind {
    User,
    Group,
}

/// One `{name, isGroup}` entry in a `CloneJob` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneTarget {
    pub name: String,
    pub kind: PrincipalKind,
}

impl CloneTarget {
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, PrincipalKind::Group)
    }

    /// `"{name}@{realm}"` for users, `"{name}-{realm}"` for groups
    /// (spec.md §4.E.4).
    #[must_use]
    pub fn principal(&self, realm: &str) -> String {
        match self.kind {
            PrincipalKind::User => format!("{}@{realm}", self.name),
            PrincipalKind::Group => format!("{}-{realm}", self.name),
        }
    }
}

/// A live pod: pool name, owner, and its members (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub pool_name: String,
    pub template: String,
    pub target: String,
    pub vms: Vec<VmReference>,
    pub router: Option<VmReference>,
    pub vnet: Option<String>,
}

/// The members of a template pool, split into router vs. regular members
/// (spec.md §3, Enumerated state in §4.E.2).
#[derive(Debug, Clone)]
pub struct TemplatePoolMembers {
    pub router: Option<VmReference>,
    pub members: Vec<VmReference>,
}
