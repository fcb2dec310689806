//! Pod routes: clone (SSE), delete, list (spec.md §4.E, SPEC_FULL.md §4.F).

use axum::extract::{Path, State};
use axum::response::sse::Sse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use crate::client::Hypervisor;
use crate::models::{CloneRequest, CloneTarget, Pod};
use crate::progress;
use crate::utils::{ApiError, AppState};

use super::principal::Principal;

pub fn mount<H: Hypervisor>(router: Router<AppState<H>>) -> Router<AppState<H>> {
    router
        .route("/api/pods", get(list::<H>))
        .route("/api/pods/clone", post(clone::<H>))
        .route("/api/pods/:pod", delete(delete_pod::<H>))
}

#[instrument(name = "routes::pods::list", skip(state), err(Debug))]
async fn list<H: Hypervisor>(
    principal: Principal,
    State(state): State<AppState<H>>,
) -> Result<Json<Vec<Pod>>, ApiError> {
    let pods = state.shared.engine.list_pods(&principal.name).await?;
    Ok(Json(pods))
}

#[derive(Debug, Deserialize)]
struct CloneBody {
    template: String,
    targets: Vec<CloneTarget>,
    #[serde(default)]
    starting_vmid: Option<u32>,
    #[serde(default = "default_true")]
    check_existing_deployments: bool,
}

fn default_true() -> bool {
    true
}

/// Streams `ProgressMessage`s as the Cloning Engine runs the state machine
/// (spec.md §4.D, §4.E.2). The request completes with the job still running
/// in the background if the client disconnects (spec.md §5 Cancellation).
#[instrument(name = "routes::pods::clone", skip(state, body), err(Debug))]
async fn clone<H: Hypervisor>(
    State(state): State<AppState<H>>,
    Json(body): Json<CloneBody>,
) -> Result<Sse<impl futures_util::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>>, ApiError>
{
    let req = CloneRequest {
        template: body.template,
        targets: body.targets,
        starting_vmid: body.starting_vmid,
        check_existing_deployments: body.check_existing_deployments,
    };
    let (sender, stream) = progress::channel()?;
    let shared = state.shared.clone();
    tokio::spawn(async move {
        if let Err(err) = shared.engine.clone(req, &sender).await {
            sender.send(format!("error: {err}"), 100).await;
        }
    });
    Ok(progress::into_response(stream))
}

#[instrument(name = "routes::pods::delete_pod", skip(state), err(Debug))]
async fn delete_pod<H: Hypervisor>(
    Path(pod): Path<String>,
    principal: Principal,
    State(state): State<AppState<H>>,
) -> Result<axum::http::StatusCode, ApiError> {
    state
        .shared
        .engine
        .delete(&pod, &principal.name, principal.is_admin)
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
