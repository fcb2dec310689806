//! Idempotent hypervisor operations (spec.md §8 P3): converting an
//! already-converted VM to a template is a no-op success, not an error,
//! matching the real client's "can't convert a template to a template"
//! handling.

mod common;

use kamino::client::Hypervisor;
use kamino::test_utilities::MockHypervisor;

#[tokio::test]
#[serial_test::serial]
async fn converting_an_already_converted_vm_is_a_no_op() {
    let mock = MockHypervisor::new();
    mock.seed_template_pool("idempotent-p3", "router", 1).await;
    let engine = common::engine_with(mock).await;

    // VMID 9000 is the router seeded by `seed_template_pool`, already marked
    // as a Proxmox template.
    engine
        .hypervisor()
        .convert_to_template("pve1", 9000)
        .await
        .expect("first conversion succeeds");
    engine
        .hypervisor()
        .convert_to_template("pve1", 9000)
        .await
        .expect("converting an already-converted VM is safe to retry");
}
