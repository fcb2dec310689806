//! Template image upload (spec.md §4.B).
//!
//! Accepts a `multipart/form-data` field named `image`, sniffs its MIME type
//! from the first bytes with `infer` (the same crate the teacher's `agent`
//! binary uses for sample-type detection), and only allows JPEG/PNG.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use uuid::Uuid;

use crate::models::UploadedImage;

use super::error::CatalogError;

const ALLOWED_MIME: &[&str] = &["image/jpeg", "image/png"];

/// Reads the `image` field out of a multipart form, validates it, and writes
/// it under `upload_dir`.
///
/// Rejects: a content-type that isn't `multipart/form-data`, a zero-byte
/// body, and any MIME sniffed outside `{image/jpeg, image/png}`
/// (spec.md §4.B).
pub async fn save_upload(
    content_type: &str,
    mut multipart: Multipart,
    upload_dir: &Path,
) -> Result<UploadedImage, CatalogError> {
    if !content_type.starts_with("multipart/form-data") {
        return Err(CatalogError::InvalidUpload(format!(
            "expected multipart/form-data, got {content_type}"
        )));
    }

    let mut field = None;
    while let Some(f) = multipart
        .next_field()
        .await
        .map_err(|e| CatalogError::InvalidUpload(e.to_string()))?
    {
        if f.name() == Some("image") {
            field = Some(f);
            break;
        }
    }
    let field = field.ok_or_else(|| CatalogError::InvalidUpload("missing 'image' field".into()))?;
    let original_name = field.file_name().unwrap_or("upload").to_owned();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| CatalogError::InvalidUpload(e.to_string()))?;

    if bytes.is_empty() {
        return Err(CatalogError::InvalidUpload("empty upload".into()));
    }

    let sniff_window = &bytes[..bytes.len().min(512)];
    let mime_type = infer::get(sniff_window)
        .map(|kind| kind.mime_type().to_owned())
        .ok_or_else(|| CatalogError::InvalidUpload("unrecognized file type".into()))?;
    if !ALLOWED_MIME.contains(&mime_type.as_str()) {
        return Err(CatalogError::InvalidUpload(format!(
            "unsupported image type: {mime_type}"
        )));
    }

    let sanitized = sanitize_filename(&original_name);
    let filename = format!("{}-{sanitized}", Uuid::new_v4());
    let path: PathBuf = upload_dir.join(&filename);

    tokio::fs::create_dir_all(upload_dir).await?;
    tokio::fs::write(&path, &bytes).await?;

    Ok(UploadedImage {
        filename,
        mime_type,
        path: path.to_string_lossy().into_owned(),
    })
}

/// `basename`, spaces replaced with underscores (spec.md §4.B).
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_owned());
    base.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_paths_and_spaces() {
        assert_eq!(sanitize_filename("my photo.png"), "my_photo.png");
        assert_eq!(sanitize_filename("../../etc/evil name.png"), "evil_name.png");
    }
}
