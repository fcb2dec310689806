//! The `Template` catalog row (spec.md §3, §4.B).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published template pool, as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Template {
    pub name: String,
    pub description: String,
    pub image_path: Option<String>,
    pub authors: Vec<String>,
    pub template_visible: bool,
    pub pod_visible: bool,
    pub vms_visible: bool,
    pub vm_count: i32,
    pub deployments: i32,
    pub created_at: DateTime<Utc>,
}

impl Template {
    /// The zero-value returned by `Get` when a template is absent, per
    /// spec.md §4.B ("returning zero-value when absent (no error)").
    #[must_use]
    pub fn absent(name: &str) -> Self {
        Template {
            name: name.to_owned(),
            description: String::new(),
            image_path: None,
            authors: Vec::new(),
            template_visible: false,
            pod_visible: false,
            vms_visible: false,
            vm_count: 0,
            deployments: 0,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.created_at == DateTime::<Utc>::UNIX_EPOCH && self.vm_count == 0
    }
}

/// The inputs needed to publish a new template row.
#[derive(Debug, Clone)]
pub struct TemplateInsert {
    pub name: String,
    pub description: String,
    pub authors: Vec<String>,
    pub vm_count: i32,
    pub template_visible: bool,
    pub pod_visible: bool,
    pub vms_visible: bool,
}

/// Fields editable after publish; `image_path` only overwrites the stored
/// value when `Some`, so an edit that omits the image leaves it untouched
/// (spec.md §4.B).
#[derive(Debug, Clone, Default)]
pub struct TemplateEdit {
    pub description: Option<String>,
    pub authors: Option<Vec<String>>,
    pub vm_count: Option<i32>,
    pub template_visible: Option<bool>,
    pub pod_visible: Option<bool>,
    pub vms_visible: Option<bool>,
    pub image_path: Option<String>,
}

/// The result of a successful image upload (spec.md §4.B).
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub filename: String,
    pub mime_type: String,
    pub path: String,
}
