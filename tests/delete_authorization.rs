//! Delete authorization (spec.md §8 P6): a non-admin caller may only delete
//! pods naming them, and a rejected delete never reaches the hypervisor.

mod common;

use kamino::test_utilities::MockHypervisor;
use kamino::utils::ErrorKind;

#[tokio::test]
#[serial_test::serial]
async fn non_admin_cannot_delete_a_pod_they_do_not_own() {
    let mock = MockHypervisor::new();
    mock.seed_live_pods(&[1010]).await;
    let pod = "1010_occupied_user";
    let engine = common::engine_with(mock).await;

    let err = engine
        .delete(pod, "mallory", false)
        .await
        .expect_err("mallory does not own this pod");
    assert_eq!(err.kind, ErrorKind::ValidationRejected);

    // the pool is untouched: the authorization check runs before any
    // hypervisor call.
    assert!(engine.hypervisor().pool_exists(pod).await);
    assert!(engine.hypervisor().deleted_pools().await.is_empty());
}

#[tokio::test]
#[serial_test::serial]
async fn owning_caller_can_delete_their_own_empty_pod() {
    let mock = MockHypervisor::new();
    mock.seed_live_pods(&[1011]).await;
    let pod = "1011_occupied_user";
    let engine = common::engine_with(mock).await;

    engine
        .delete(pod, "user", false)
        .await
        .expect("the owning caller should be authorized");
    assert!(!engine.hypervisor().pool_exists(pod).await);
}

#[tokio::test]
#[serial_test::serial]
async fn admin_can_delete_any_pod() {
    let mock = MockHypervisor::new();
    mock.seed_live_pods(&[1012]).await;
    let pod = "1012_occupied_user";
    let engine = common::engine_with(mock).await;

    engine
        .delete(pod, "mallory", true)
        .await
        .expect("an admin caller bypasses ownership");
    assert!(!engine.hypervisor().pool_exists(pod).await);
}
