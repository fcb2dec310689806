//! The deployment counter (spec.md §8 P4): increments by exactly one per
//! successful clone and never decreases, including across a job that
//! aborts with no VMs cloned.

mod common;

use kamino::models::{CloneRequest, CloneTarget, PrincipalKind};
use kamino::progress;
use kamino::test_utilities::MockHypervisor;

fn target(name: &str) -> CloneTarget {
    CloneTarget {
        name: name.to_owned(),
        kind: PrincipalKind::User,
    }
}

#[tokio::test]
#[serial_test::serial]
async fn counter_increments_once_per_successful_clone_and_never_decreases() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("counter-p4", "pfsense-router", 1).await;
    let engine = common::engine_with(mock).await;
    common::ensure_fresh_template(&engine, "counter-p4").await;
    engine
        .publish("counter-p4", vec!["qa".to_owned()], "counter demo".to_owned())
        .await
        .expect("publish should succeed");

    assert_eq!(
        engine.catalog().get("counter-p4").await.unwrap().deployments,
        0
    );

    for name in ["alice", "bob"] {
        let (sender, _rx) = progress::raw_channel();
        let req = CloneRequest {
            template: "counter-p4".to_owned(),
            targets: vec![target(name)],
            starting_vmid: None,
            check_existing_deployments: true,
        };
        engine
            .clone(req, &sender)
            .await
            .unwrap_or_else(|e| panic!("clone for {name} should succeed: {e:?}"));
    }
    assert_eq!(
        engine.catalog().get("counter-p4").await.unwrap().deployments,
        2,
        "two successful clones must add up to exactly two deployments"
    );

    // an unknown template never touches the counter at all.
    let (sender, _rx) = progress::raw_channel();
    let bad_req = CloneRequest {
        template: "counter-p4-does-not-exist".to_owned(),
        targets: vec![target("carol")],
        starting_vmid: None,
        check_existing_deployments: true,
    };
    let _ = engine.clone(bad_req, &sender).await;
    assert_eq!(
        engine.catalog().get("counter-p4").await.unwrap().deployments,
        2,
        "a rejected job for a different template must not perturb this counter"
    );
}
