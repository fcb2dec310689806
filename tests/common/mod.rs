//! Shared fixtures for the integration tests (spec.md §8).
//!
//! Mirrors the teacher's `test_utilities::api` pattern: a `Lazy<Conf>` loaded
//! once from a fixed test config, plus helpers to stand up an [`Engine`]
//! against real backing services with a [`MockHypervisor`] standing in for
//! the Proxmox cluster.

use once_cell::sync::Lazy;

use kamino::catalog::Catalog;
use kamino::conf::{Conf, Engine as EngineConf, Hypervisor as HypervisorConf};
use kamino::directory::Directory;
use kamino::engine::Engine;
use kamino::test_utilities::MockHypervisor;

/// Config pointed at a real test Postgres + LDAP instance an operator or CI
/// runner is expected to have running before `cargo test` is invoked.
pub static CONF: Lazy<Conf> =
    Lazy::new(|| Conf::new("tests/kamino.test.yml").expect("failed to load tests/kamino.test.yml"));

/// Builds an [`Engine`] wired to a fresh [`MockHypervisor`] and real
/// Catalog/Directory connections. Seed the returned mock *before* calling
/// this, since `Engine::new` takes it by value.
pub async fn engine_with(hypervisor: MockHypervisor) -> Engine<MockHypervisor> {
    let catalog = Catalog::connect(&CONF.catalog)
        .await
        .expect("failed to connect to test catalog database");
    let directory = Directory::connect(CONF.directory.clone())
        .await
        .expect("failed to connect to test directory service");
    Engine::new(
        hypervisor,
        catalog,
        directory,
        CONF.engine.clone(),
        CONF.hypervisor.clone(),
    )
}

/// Like [`engine_with`], but with a caller-supplied [`EngineConf`] so a test
/// can narrow `min_pod_id`/`max_pod_id` (spec.md §8 S3) without disturbing
/// the shared [`CONF`].
pub async fn engine_with_conf(
    hypervisor: MockHypervisor,
    engine_conf: EngineConf,
    hv_conf: HypervisorConf,
) -> Engine<MockHypervisor> {
    let catalog = Catalog::connect(&CONF.catalog)
        .await
        .expect("failed to connect to test catalog database");
    let directory = Directory::connect(CONF.directory.clone())
        .await
        .expect("failed to connect to test directory service");
    Engine::new(hypervisor, catalog, directory, engine_conf, hv_conf)
}

/// Deletes `name`'s catalog row if a previous run left one behind, so each
/// test starts from a clean slate without truncating the whole table.
pub async fn ensure_fresh_template(engine: &Engine<MockHypervisor>, name: &str) {
    let _ = engine.catalog().delete(name).await;
}

/// Drains a freshly created engine's catalog table so each test starts from
/// a clean slate, the way the teacher's `tests/system.rs` truncates between
/// `#[serial]` cases.
pub async fn reset_catalog(engine: &Engine<MockHypervisor>) {
    for template in engine
        .catalog()
        .list(false)
        .await
        .expect("failed to list templates for reset")
    {
        engine
            .catalog()
            .delete(&template.name)
            .await
            .expect("failed to delete template during reset");
    }
}
