//! Concurrent clone uniqueness (spec.md §8 P1, S6): ten simultaneous clone
//! jobs against the same template never collide on PodID, pool name, or
//! VMID, because the allocation mutex serializes the Reserved step.

mod common;

use std::collections::HashSet;

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
async fn ten_concurrent_clones_get_distinct_pods_and_vmids() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("concurrent-s6", "pfsense-router", 1).await;
    let engine = common::engine_with(mock).await;
    common::ensure_fresh_template(&engine, "concurrent-s6").await;
    engine
        .publish("concurrent-s6", vec!["qa".to_owned()], "fan-out demo".to_owned())
        .await
        .expect("publish should succeed");

    let jobs = (0..10).map(|i| {
        let engine = &engine;
        async move {
            let (sender, _rx) = progress::raw_channel();
            let req = CloneRequest {
                template: "concurrent-s6".to_owned(),
                targets: vec![target(&format!("user{i}"))],
                starting_vmid: None,
                check_existing_deployments: true,
            };
            engine.clone(req, &sender).await
        }
    });
    let results = futures_util::future::join_all(jobs).await;
    for (i, result) in results.iter().enumerate() {
        assert!(result.is_ok(), "job {i} should have succeeded: {result:?}");
    }

    let execs = engine.hypervisor().agent_execs().await;
    let vmids: HashSet<u32> = execs.iter().map(|(vmid, _)| *vmid).collect();
    assert_eq!(vmids.len(), execs.len(), "every router clone got its own VMID");

    let deployed = engine
        .catalog()
        .get("concurrent-s6")
        .await
        .expect("catalog lookup should succeed");
    assert_eq!(deployed.deployments, 10, "every job counted exactly once");
}
