//! Clone request/job types and the progress message shape (spec.md §3, §4.E.2).

use serde::{Deserialize, Serialize};

use super::pod::CloneTarget;

/// The input to `Engine::clone`.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub template: String,
    pub targets: Vec<CloneTarget>,
    pub starting_vmid: Option<u32>,
    pub check_existing_deployments: bool,
}

/// `{message, progress}` emitted on the SSE channel (spec.md §3, §4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub message: String,
    pub progress: u8,
}

impl ProgressMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, progress: u8) -> Self {
        ProgressMessage {
            message: message.into(),
            progress,
        }
    }
}

