//! Full-surface concurrency storms: every façade operation fired from its
//! own thread, many rounds, against shared mock entities. Each call must
//! return a well-formed result or a taxonomy error; the suite is meant to be
//! run under a race detector (miri/tsan builds) and must never deadlock.

use memqdb::{
    DataTransferTransaction, Distribution, KeyRange, MemQdb, RequestContext, Router, RouterState,
    Shard, ShardingRule, ShardingRuleEntry,
};
use rand::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn mock_distribution() -> Distribution {
    Distribution::new("123", vec![])
}

fn mock_shard() -> Shard {
    Shard::new("shard_id", vec!["host1".into(), "host2".into()])
}

fn mock_key_range() -> KeyRange {
    KeyRange {
        id: "key_range_id".into(),
        lower_bound: vec![1, 2],
        shard_id: "shard_id".into(),
        distribution_id: "123".into(),
    }
}

fn mock_router() -> Router {
    Router::new("router_id", "address", RouterState::Closed)
}

fn mock_sharding_rule() -> ShardingRule {
    ShardingRule {
        id: "sharding_rule_id".into(),
        table_name: "fake_table".into(),
        entries: vec![ShardingRuleEntry { column: "i".into() }],
        distribution_id: "123".into(),
    }
}

fn mock_transfer_tx() -> DataTransferTransaction {
    DataTransferTransaction {
        from_shard_id: "shard_id".into(),
        to_shard_id: "shard_id".into(),
        from_tx_name: "fake_tx_1".into(),
        to_tx_name: "fake_tx_2".into(),
        from_status: "fake_st_1".into(),
        to_status: "fake_st_2".into(),
    }
}

type Op = fn(&MemQdb, &RequestContext);

fn all_ops() -> Vec<Op> {
    vec![
        |q, c| {
            let _ = q.create_distribution(c, mock_distribution());
        },
        |q, c| {
            let _ = q.add_key_range(c, mock_key_range());
        },
        |q, c| {
            let _ = q.add_router(c, mock_router());
        },
        |q, c| {
            let _ = q.add_shard(c, mock_shard());
        },
        |q, c| {
            let _ = q.add_sharding_rule(c, mock_sharding_rule());
        },
        |q, c| {
            let _ = q.record_transfer_tx(c, "shard_id", mock_transfer_tx());
        },
        |q, c| {
            let _ = q.list_distributions(c);
        },
        |q, c| {
            let _ = q.list_key_ranges(c);
        },
        |q, c| {
            let _ = q.list_routers(c);
        },
        |q, c| {
            let _ = q.list_sharding_rules(c);
        },
        |q, c| {
            let _ = q.list_shards(c);
        },
        |q, c| {
            let _ = q.get_key_range(c, "key_range_id");
        },
        |q, c| {
            let _ = q.get_shard(c, "shard_id");
        },
        |q, c| {
            let _ = q.get_sharding_rule(c, "sharding_rule_id");
        },
        |q, c| {
            let _ = q.get_transfer_tx(c, "shard_id");
        },
        |q, c| {
            let _ = q.share_key_range(c, "key_range_id");
        },
        |q, c| {
            let _ = q.drop_key_range(c, "key_range_id");
        },
        |q, c| {
            let _ = q.drop_key_range_all(c);
        },
        |q, c| {
            let _ = q.drop_sharding_rule(c, "sharding_rule_id");
        },
        |q, c| {
            let _ = q.drop_sharding_rule_all(c);
        },
        |q, c| {
            let _ = q.remove_transfer_tx(c, "shard_id");
        },
        |q, c| {
            if let Ok(token) = q.lock_key_range(c, "key_range_id") {
                let _ = q.unlock_key_range(c, "key_range_id", token);
            }
        },
        |q, c| {
            let _ = q.update_key_range(c, mock_key_range());
        },
        |q, c| {
            let _ = q.delete_router(c, "router_id");
        },
        |q, c| {
            let _ = q.drop_distribution(c, "123");
        },
    ]
}

#[test]
fn full_surface_storm_one_thread_per_operation() {
    let qdb = Arc::new(MemQdb::new());
    let ops = all_ops();

    for _ in 0..10 {
        let handles: Vec<_> = ops
            .iter()
            .map(|op| {
                let qdb = Arc::clone(&qdb);
                let op = *op;
                thread::spawn(move || {
                    let ctx = RequestContext::new();
                    op(&qdb, &ctx);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

#[test]
fn randomized_storm_keeps_every_result_well_formed() {
    let qdb = Arc::new(MemQdb::new());
    let ops = Arc::new(all_ops());

    let workers = 8;
    let iterations = 500;
    let barrier = Arc::new(Barrier::new(workers));
    let executed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let qdb = Arc::clone(&qdb);
            let ops = Arc::clone(&ops);
            let barrier = Arc::clone(&barrier);
            let executed = Arc::clone(&executed);
            thread::spawn(move || {
                let mut rng = rand::rng();
                let ctx = RequestContext::new();
                barrier.wait();
                for _ in 0..iterations {
                    let op = ops.choose(&mut rng).unwrap();
                    op(&qdb, &ctx);
                    executed.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(executed.load(Ordering::SeqCst), workers * iterations);

    // The store is still structurally sound after the storm: listings are
    // consistent with point lookups.
    let ctx = RequestContext::new();
    for distribution in qdb.list_distributions(&ctx).unwrap() {
        assert_eq!(qdb.get_distribution(&ctx, &distribution.id).unwrap(), distribution);
    }
    for range in qdb.list_key_ranges(&ctx).unwrap() {
        assert_eq!(qdb.get_key_range(&ctx, &range.id).unwrap(), range);
    }
    for shard in qdb.list_shards(&ctx).unwrap() {
        assert_eq!(qdb.get_shard(&ctx, &shard.id).unwrap(), shard);
    }
    for router in qdb.list_routers(&ctx).unwrap() {
        assert_eq!(qdb.get_router(&ctx, &router.id).unwrap(), router);
    }
}
