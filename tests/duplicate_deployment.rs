//! Duplicate-deployment guard (spec.md §8 S4): a second clone request for a
//! target that already has a live deployment of the same template is
//! rejected before any new pool is created.

mod common;

use kamino::models::{CloneRequest, CloneTarget, PrincipalKind};
use kamino::progress;
use kamino::test_utilities::MockHypervisor;
use kamino::utils::ErrorKind;

fn alice() -> CloneTarget {
    CloneTarget {
        name: "alice".to_owned(),
        kind: PrincipalKind::User,
    }
}

#[tokio::test]
#[serial_test::serial]
async fn second_clone_for_already_deployed_target_is_rejected() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("dupe-s4", "pfsense-router", 1).await;
    let engine = common::engine_with(mock).await;
    common::ensure_fresh_template(&engine, "dupe-s4").await;
    engine
        .publish("dupe-s4", vec!["qa".to_owned()], "dup guard demo".to_owned())
        .await
        .expect("publish should succeed");

    let first_req = CloneRequest {
        template: "dupe-s4".to_owned(),
        targets: vec![alice()],
        starting_vmid: None,
        check_existing_deployments: true,
    };
    let (sender, _rx) = progress::raw_channel();
    engine
        .clone(first_req, &sender)
        .await
        .expect("first clone for alice should succeed");

    let pools_after_first = engine.hypervisor().deleted_pools().await;
    assert!(pools_after_first.is_empty());

    let second_req = CloneRequest {
        template: "dupe-s4".to_owned(),
        targets: vec![alice()],
        starting_vmid: None,
        check_existing_deployments: true,
    };
    let (sender, _rx) = progress::raw_channel();
    let err = engine
        .clone(second_req, &sender)
        .await
        .expect_err("re-deploying to the same target must be rejected");
    assert_eq!(err.kind, ErrorKind::ValidationRejected);

    // the guard trips before any hypervisor mutation for the second request,
    // so exactly the one pool from the first clone exists.
    let deployed = engine
        .catalog()
        .get("dupe-s4")
        .await
        .expect("catalog lookup should succeed");
    assert_eq!(deployed.deployments, 1, "deployment counter must not double-count");
}
