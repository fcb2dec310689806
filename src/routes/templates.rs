//! Template Catalog routes (spec.md §4.B, SPEC_FULL.md §4.F).

use std::path::PathBuf;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use crate::client::Hypervisor;
use crate::models::Template;
use crate::utils::{ApiError, AppState};

pub fn mount<H: Hypervisor>(router: Router<AppState<H>>) -> Router<AppState<H>> {
    router
        .route("/api/templates", get(list::<H>))
        .route("/api/templates/unpublished", get(unpublished::<H>))
        .route("/api/templates/:name/publish", post(publish::<H>))
        .route("/api/templates/:name/image", post(upload_image::<H>))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    visible_only: bool,
}

#[instrument(name = "routes::templates::list", skip(state), err(Debug))]
async fn list<H: Hypervisor>(
    Query(params): Query<ListParams>,
    State(state): State<AppState<H>>,
) -> Result<Json<Vec<Template>>, ApiError> {
    let templates = state
        .shared
        .engine
        .catalog()
        .list(params.visible_only)
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_GATEWAY, Some(err.to_string())))?;
    Ok(Json(templates))
}

#[instrument(name = "routes::templates::unpublished", skip(state), err(Debug))]
async fn unpublished<H: Hypervisor>(
    State(state): State<AppState<H>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = state.shared.engine.list_unpublished_templates().await?;
    Ok(Json(names))
}

#[derive(Debug, Deserialize)]
struct PublishRequest {
    authors: Vec<String>,
    #[serde(default)]
    description: String,
}

#[instrument(name = "routes::templates::publish", skip(state), err(Debug))]
async fn publish<H: Hypervisor>(
    Path(name): Path<String>,
    State(state): State<AppState<H>>,
    Json(req): Json<PublishRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .shared
        .engine
        .publish(&name, req.authors, req.description)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "routes::templates::upload_image", skip(state, headers, multipart), err(Debug))]
async fn upload_image<H: Hypervisor>(
    Path(name): Path<String>,
    State(state): State<AppState<H>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<crate::models::UploadedImage>, ApiError> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let upload_dir = PathBuf::from(&state.shared.config.catalog.upload_dir);
    let uploaded = crate::catalog::save_upload(content_type, multipart, &upload_dir)
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, Some(err.to_string())))?;

    let edit = crate::models::TemplateEdit {
        image_path: Some(uploaded.path.clone()),
        ..crate::models::TemplateEdit::default()
    };
    state
        .shared
        .engine
        .catalog()
        .edit(&name, &edit)
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_GATEWAY, Some(err.to_string())))?;

    Ok(Json(uploaded))
}
