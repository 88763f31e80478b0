use memqdb::{DataTransferTransaction, Error, MemQdb, RequestContext};

fn tx(from_tx: &str, to_status: &str) -> DataTransferTransaction {
    DataTransferTransaction {
        from_shard_id: "sh1".into(),
        to_shard_id: "sh2".into(),
        from_tx_name: from_tx.into(),
        to_tx_name: "to_tx".into(),
        from_status: "in_progress".into(),
        to_status: to_status.into(),
    }
}

#[test]
fn record_keeps_a_single_slot_per_source_shard() {
    let qdb = MemQdb::new();
    let ctx = RequestContext::new();

    qdb.record_transfer_tx(&ctx, "sh1", tx("tx_a", "in_progress"))
        .unwrap();
    qdb.record_transfer_tx(&ctx, "sh1", tx("tx_b", "committed"))
        .unwrap();

    let current = qdb.get_transfer_tx(&ctx, "sh1").unwrap();
    assert_eq!(current.from_tx_name, "tx_b");
    assert_eq!(current.to_status, "committed");
}

#[test]
fn get_on_absent_shard_is_not_found() {
    let qdb = MemQdb::new();
    let ctx = RequestContext::new();
    assert!(matches!(
        qdb.get_transfer_tx(&ctx, "sh1"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn remove_is_an_idempotent_no_op_when_absent() {
    let qdb = MemQdb::new();
    let ctx = RequestContext::new();

    // Removing before anything was recorded succeeds.
    qdb.remove_transfer_tx(&ctx, "sh1").unwrap();

    qdb.record_transfer_tx(&ctx, "sh1", tx("tx_a", "in_progress"))
        .unwrap();
    qdb.remove_transfer_tx(&ctx, "sh1").unwrap();
    qdb.remove_transfer_tx(&ctx, "sh1").unwrap();

    assert!(matches!(
        qdb.get_transfer_tx(&ctx, "sh1"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn records_are_independent_per_source_shard() {
    let qdb = MemQdb::new();
    let ctx = RequestContext::new();

    qdb.record_transfer_tx(&ctx, "sh1", tx("tx_a", "in_progress"))
        .unwrap();
    let mut reverse = tx("tx_b", "in_progress");
    reverse.from_shard_id = "sh2".into();
    reverse.to_shard_id = "sh1".into();
    qdb.record_transfer_tx(&ctx, "sh2", reverse).unwrap();

    qdb.remove_transfer_tx(&ctx, "sh1").unwrap();
    assert_eq!(qdb.get_transfer_tx(&ctx, "sh2").unwrap().from_tx_name, "tx_b");
}
