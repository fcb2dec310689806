//! Happy-path clone scenarios against pfsense and vyos router images
//! (spec.md §8 S1, S2), also covering P5 (progress monotonicity, terminal
//! 100 iff the job actually completed) and P7 (router NIC on `net1`, every
//! other clone on `net0`).

mod common;

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
async fn pfsense_clone_succeeds_and_wires_router_nic() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("pfsense-s1", "pfsense-gateway", 2).await;
    let engine = common::engine_with(mock).await;
    common::ensure_fresh_template(&engine, "pfsense-s1").await;
    engine
        .publish("pfsense-s1", vec!["qa".to_owned()], "pfsense demo".to_owned())
        .await
        .expect("publish should succeed");

    let (sender, mut rx) = progress::raw_channel();
    let req = CloneRequest {
        template: "pfsense-s1".to_owned(),
        targets: vec![alice()],
        starting_vmid: None,
        check_existing_deployments: true,
    };
    let result = engine.clone(req, &sender).await;
    assert!(result.is_ok(), "clone should succeed: {result:?}");

    let mut progresses = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        progresses.push(msg.progress);
    }
    assert!(
        progresses.windows(2).all(|w| w[0] <= w[1]),
        "progress must never decrease: {progresses:?}"
    );
    assert_eq!(
        *progresses.last().expect("at least one progress message"),
        100,
        "a completed job's final message must report 100"
    );

    // the source pool's router and two members sit at 9000-9002, so the
    // cloned VMs land at 9003 (router) and 9004/9005 (members).
    let router_nic = engine.hypervisor().nic(9003, "net1").await;
    assert_eq!(router_nic.as_deref(), Some("virtio,bridge=kamino1,firewall=1"));
    for vmid in [9004, 9005] {
        let nic = engine.hypervisor().nic(vmid, "net0").await;
        assert_eq!(nic.as_deref(), Some("virtio,bridge=kamino1,firewall=1"));
    }

    let execs = engine.hypervisor().agent_execs().await;
    assert_eq!(execs.len(), 2, "pfsense wires WAN IP and VIP: {execs:?}");
    assert!(execs.iter().all(|(vmid, _)| *vmid == 9003));

    let published = engine
        .catalog()
        .get("pfsense-s1")
        .await
        .expect("catalog lookup should succeed");
    assert_eq!(published.deployments, 1);
}

#[tokio::test]
#[serial_test::serial]
async fn vyos_clone_runs_single_sed_script() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("vyos-s2", "vyos-router", 1).await;
    let engine = common::engine_with(mock).await;
    common::ensure_fresh_template(&engine, "vyos-s2").await;
    engine
        .publish("vyos-s2", vec!["qa".to_owned()], "vyos demo".to_owned())
        .await
        .expect("publish should succeed");

    let (sender, _rx) = progress::raw_channel();
    let req = CloneRequest {
        template: "vyos-s2".to_owned(),
        targets: vec![alice()],
        starting_vmid: None,
        check_existing_deployments: true,
    };
    let result = engine.clone(req, &sender).await;
    assert!(result.is_ok(), "clone should succeed: {result:?}");

    let execs = engine.hypervisor().agent_execs().await;
    assert_eq!(execs.len(), 1, "vyos wires a single sed script: {execs:?}");
    let (_, argv) = &execs[0];
    assert_eq!(argv[0], "sh");
    assert_eq!(argv[1], "-c");
    assert!(argv[2].starts_with("sed -i"));
    assert!(argv[2].contains("/config/scripts/setup.sh"));
}
