//! Router detection and router-type command building (spec.md §4.E.1 Enumerated,
//! §4.E.2 RouterConfigured).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::VmConfig;
use crate::models::{PodSlot, TemplatePoolMembers, VmReference};

static ROUTER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i).*(router|pfsense|vyos).*").unwrap());

/// Splits a template pool's members into the router (by name, falling back
/// to the configured default) and the rest. Spec.md §4.E.1 Enumerated:
/// "if none, use configured default router".
#[must_use]
pub fn classify(
    members: Vec<VmReference>,
    default_router_name: &str,
) -> TemplatePoolMembers {
    let mut router = None;
    let mut rest = Vec::with_capacity(members.len());
    for vm in members {
        if router.is_none() && ROUTER_NAME_RE.is_match(&vm.name) {
            router = Some(vm);
        } else {
            rest.push(vm);
        }
    }
    if router.is_none() {
        if let Some(pos) = rest.iter().position(|vm| vm.name == default_router_name) {
            router = Some(rest.remove(pos));
        }
    }
    TemplatePoolMembers {
        router,
        members: rest,
    }
}

/// The detected router flavor, driving `RouterConfigured`'s exec argv.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    Pfsense,
    Vyos,
    Unknown,
}

#[must_use]
pub fn detect_kind(config: &VmConfig) -> RouterKind {
    if config.mentions("pfsense") {
        RouterKind::Pfsense
    } else if config.mentions("vyos") {
        RouterKind::Vyos
    } else {
        RouterKind::Unknown
    }
}

/// The one or two `AgentExec` argv lists to run against a pfsense/vyos
/// router, per spec.md §4.E.2 RouterConfigured.
#[must_use]
pub fn exec_argv(
    kind: RouterKind,
    pod: PodSlot,
    wan_ip_base: &str,
    wan_script_path: &str,
    vip_script_path: &str,
    vyos_script_path: &str,
) -> Vec<Vec<String>> {
    let pod_number = pod.vnet_index();
    match kind {
        RouterKind::Pfsense => vec![
            vec![
                wan_script_path.to_owned(),
                format!("{wan_ip_base}{pod_number}.1"),
            ],
            vec![
                vip_script_path.to_owned(),
                format!("{wan_ip_base}{pod_number}.0"),
            ],
        ],
        RouterKind::Vyos => {
            let script = format!(
                "sed -i -e 's/{{{{THIRD_OCTET}}}}/{pod_number}/g;s/{{{{NETWORK_PREFIX}}}}/{wan_ip_base}/g' {vyos_script_path}"
            );
            vec![vec!["sh".to_owned(), "-c".to_owned(), script]]
        }
        RouterKind::Unknown => Vec::new(),
    }
}
