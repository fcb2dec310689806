//! PodID exhaustion (spec.md §8 S3): requesting more targets than the
//! configured PodID window can hold fails closed with no side effects.

mod common;

use kamino::conf::{Engine as EngineConf, Hypervisor as HypervisorConf};
use kamino::models::{CloneRequest, CloneTarget, PrincipalKind};
use kamino::progress;
use kamino::test_utilities::MockHypervisor;
use kamino::utils::ErrorKind;

fn target(name: &str) -> CloneTarget {
    CloneTarget {
        name: name.to_owned(),
        kind: PrincipalKind::User,
    }
}

#[tokio::test]
#[serial_test::serial]
async fn exhausted_pod_id_window_rejects_the_whole_job() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("exhaust-s3", "router", 1).await;
    let mut engine_conf: EngineConf = common::CONF.engine.clone();
    engine_conf.min_pod_id = 1001;
    engine_conf.max_pod_id = 1001;
    let hv_conf: HypervisorConf = common::CONF.hypervisor.clone();
    let engine = common::engine_with_conf(mock, engine_conf, hv_conf).await;
    common::ensure_fresh_template(&engine, "exhaust-s3").await;
    engine
        .publish("exhaust-s3", vec!["qa".to_owned()], "narrow window".to_owned())
        .await
        .expect("publish should succeed");

    let (sender, _rx) = progress::raw_channel();
    let req = CloneRequest {
        template: "exhaust-s3".to_owned(),
        targets: vec![target("alice"), target("bob")],
        starting_vmid: None,
        check_existing_deployments: true,
    };
    let err = engine
        .clone(req, &sender)
        .await
        .expect_err("a 1-slot window can't satisfy a 2-target job");
    assert_eq!(err.kind, ErrorKind::ResourceExhausted);

    let pools = engine
        .hypervisor()
        .deleted_pools()
        .await;
    assert!(pools.is_empty(), "no pool should ever have been created: {pools:?}");
}
