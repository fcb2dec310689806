//! Data types shared across the engine and its collaborators (spec.md §3).

pub mod job;
pub mod pod;
pub mod template;

pub use job::{CloneRequest, ProgressMessage};
pub use pod::{CloneTarget, Pod, PodSlot, PrincipalKind, TemplatePoolMembers, VmReference};
pub use template::{Template, TemplateEdit, TemplateInsert, UploadedImage};
