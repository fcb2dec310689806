//! Maintenance routes (SPEC_FULL.md §10): realm sync, triggerable without a
//! direct hypervisor call from an operator's shell.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use crate::client::{Hypervisor, RealmScope};
use crate::utils::{ApiError, AppState};

pub fn mount<H: Hypervisor>(router: Router<AppState<H>>) -> Router<AppState<H>> {
    router.route("/api/admin/sync-realm", post(sync_realm::<H>))
}

#[derive(Debug, Deserialize)]
struct SyncRealmBody {
    scope: SyncScope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SyncScope {
    Users,
    Groups,
}

impl From<SyncScope> for RealmScope {
    fn from(scope: SyncScope) -> Self {
        match scope {
            SyncScope::Users => RealmScope::Users,
            SyncScope::Groups => RealmScope::Groups,
        }
    }
}

#[instrument(name = "routes::admin::sync_realm", skip(state), err(Debug))]
async fn sync_realm<H: Hypervisor>(
    State(state): State<AppState<H>>,
    Json(body): Json<SyncRealmBody>,
) -> Result<StatusCode, ApiError> {
    state.shared.engine.sync_realm(body.scope.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}
