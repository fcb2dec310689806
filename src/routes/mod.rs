//! The HTTP edge (SPEC_FULL.md §4.F) — routing only; every handler is a
//! thin adapter onto the Cloning Engine or Template Catalog.

mod admin;
mod pods;
pub mod principal;
mod templates;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::Hypervisor;
use crate::utils::AppState;

/// Assembles the full router, mounting each resource's routes in turn,
/// mirroring the teacher's `app = module::mount(app)` chain.
pub fn build_app<H: Hypervisor>(state: AppState<H>) -> Router {
    let mut router = Router::new();
    router = templates::mount(router);
    router = pods::mount(router);
    router = admin::mount(router);
    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
