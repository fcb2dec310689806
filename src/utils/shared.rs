//! The shared state handed to every axum handler and owned by the engine.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::client::Hypervisor;
use crate::conf::Conf;
use crate::directory::Directory;
use crate::engine::Engine;

/// Everything a request handler needs, generic over the hypervisor
/// implementation so tests can swap in a mock (spec.md §8).
pub struct Shared<H: Hypervisor> {
    pub config: Conf,
    pub engine: Engine<H>,
}

impl<H: Hypervisor> Shared<H> {
    pub fn new(config: Conf, hypervisor: H, catalog: Catalog, directory: Directory) -> Self {
        let engine = Engine::new(
            hypervisor,
            catalog,
            directory,
            config.engine.clone(),
            config.hypervisor.clone(),
        );
        Shared { config, engine }
    }
}

/// The `axum` state type; a thin `Arc` wrapper so handlers can cheaply clone it.
#[derive(Clone)]
pub struct AppState<H: Hypervisor> {
    pub shared: Arc<Shared<H>>,
}

impl<H: Hypervisor> AppState<H> {
    pub fn new(shared: Shared<H>) -> Self {
        AppState {
            shared: Arc::new(shared),
        }
    }
}
