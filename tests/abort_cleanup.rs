//! Abort-before-VMs cleanup (spec.md §8 S5, I5/P2): if every clone
//! submission for a target fails after its pool already exists, the Engine
//! deletes that pool rather than leaving an empty, orphaned one behind.

mod common;

use kamino::client::Hypervisor;
use kamino::models::{CloneRequest, CloneTarget, PrincipalKind};
use kamino::progress;
use kamino::test_utilities::MockHypervisor;

fn alice() -> CloneTarget {
    CloneTarget {
        name: "alice".to_owned(),
        kind: PrincipalKind::User,
    }
}

#[tokio::test]
#[serial_test::serial]
async fn failed_clone_submissions_delete_the_newly_created_pool() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("abort-s5", "router", 2).await;
    // every clone submitted for alice is synthesized as "{source}-alice", so
    // this forces all three of her submissions to fail regardless of which
    // VMIDs `next_vm_ids` happens to allocate.
    mock.fail_clones_matching("alice").await;
    let engine = common::engine_with(mock).await;
    common::ensure_fresh_template(&engine, "abort-s5").await;
    engine
        .publish("abort-s5", vec!["qa".to_owned()], "abort demo".to_owned())
        .await
        .expect("publish should succeed");

    let (sender, _rx) = progress::raw_channel();
    let req = CloneRequest {
        template: "abort-s5".to_owned(),
        targets: vec![alice()],
        starting_vmid: None,
        check_existing_deployments: true,
    };
    let result = engine.clone(req, &sender).await;
    assert!(result.is_err(), "every submission failing must surface as an error");

    let pool_name = "1001_abort-s5_alice";
    assert!(
        !engine.hypervisor().pool_exists(pool_name).await,
        "the orphaned pool must have been cleaned up"
    );
    let deleted = engine.hypervisor().deleted_pools().await;
    assert_eq!(
        deleted.iter().filter(|p| p.as_str() == pool_name).count(),
        1,
        "the pool must be deleted exactly once: {deleted:?}"
    );

    // the deployment counter never moved, since this target cloned nothing.
    let template = engine
        .catalog()
        .get("abort-s5")
        .await
        .expect("catalog lookup should succeed");
    assert_eq!(template.deployments, 0);

    // the aborted pod's pool is gone from the live resource set entirely.
    let pools = engine
        .hypervisor()
        .cluster_resources(Some("pool"))
        .await
        .expect("listing pools should succeed");
    assert!(pools.iter().all(|p| p.pool.as_deref() != Some(pool_name)));
}
