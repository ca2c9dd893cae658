//! Integration tests for the memory engine

use keel_common::{CheckpointId, Error, IteratorType, Result, SpaceId};
use keel_engine::{
    BaseHandler, CheckpointCoordinator, Engine, EngineRegistry, Handler, JoinRelay, RowBuffer,
    RowRequest, Space, SpaceDef, Statement, Transaction, UpdateOp, join, recovery,
};
use keel_memory::MemoryEngine;
use keel_snapshot::SnapshotStore;
use keel_snapshot_memory::MemorySnapshotStore;
use keel_tuple::{FieldType, KeyDef, KeyPart, Tuple, Value};
use std::sync::Arc;

fn user(id: u64, name: &str, age: u64) -> Vec<Value> {
    vec![Value::Unsigned(id), Value::from(name), Value::Unsigned(age)]
}

/// Space with a primary key over the id and a unique secondary over the
/// name.
fn users_space(engine: &MemoryEngine) -> Arc<Space> {
    engine
        .create_space(
            SpaceDef::new(512, "users"),
            vec![
                (
                    0,
                    "pk".to_string(),
                    KeyDef::new(vec![KeyPart::new(0, FieldType::Unsigned)]),
                ),
                (
                    1,
                    "name".to_string(),
                    KeyDef::new(vec![KeyPart::new(1, FieldType::String)]),
                ),
            ],
        )
        .unwrap()
}

fn fill_users(handler: &dyn Handler, space: &Space, count: u64) {
    let mut sink = RowBuffer::new();
    for id in 1..=count {
        let request = RowRequest::write(&user(id, &format!("user-{:02}", id), 20 + id));
        handler
            .execute_replace(None, space, &request, &mut sink)
            .unwrap();
    }
}

fn select_ids(handler: &dyn Handler, space: &Space, request: &RowRequest) -> Vec<u64> {
    let mut sink = RowBuffer::new();
    handler
        .execute_select(None, space, request, &mut sink)
        .unwrap();
    sink.rows()
        .iter()
        .map(|row| row.field(0).unwrap().as_u64().unwrap())
        .collect()
}

// ============================================================================
// Row operations through the handler
// ============================================================================

#[test]
fn test_replace_and_select_via_both_indexes() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();

    let mut sink = RowBuffer::new();
    let request = RowRequest::write(&user(1, "ann", 30));
    handler
        .execute_replace(None, &space, &request, &mut sink)
        .unwrap();
    // The replaced row is emitted back.
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.rows()[0].field(1).unwrap().as_str(), Some("ann"));

    fill_users(handler.as_ref(), &space, 3);

    // Exact match on the primary key.
    let by_id = RowRequest::select(0, IteratorType::Eq).with_key(&[Value::Unsigned(2)]);
    assert_eq!(select_ids(handler.as_ref(), &space, &by_id), vec![2]);

    // Exact match on the secondary.
    let by_name = RowRequest::select(1, IteratorType::Eq).with_key(&[Value::from("user-03")]);
    assert_eq!(select_ids(handler.as_ref(), &space, &by_name), vec![3]);
}

#[test]
fn test_select_window_matches_offset_and_limit() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 10);

    // offset 2, limit 3 over 10 rows: rows 3, 4, 5 in index order.
    let request = RowRequest::select(0, IteratorType::All)
        .with_offset(2)
        .with_limit(3);
    assert_eq!(select_ids(handler.as_ref(), &space, &request), vec![3, 4, 5]);
}

#[test]
fn test_range_select_through_the_handler() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 6);

    let ge = RowRequest::select(0, IteratorType::Ge).with_key(&[Value::Unsigned(4)]);
    assert_eq!(select_ids(handler.as_ref(), &space, &ge), vec![4, 5, 6]);

    let lt = RowRequest::select(0, IteratorType::Lt).with_key(&[Value::Unsigned(4)]);
    assert_eq!(select_ids(handler.as_ref(), &space, &lt), vec![3, 2, 1]);
}

#[test]
fn test_delete_removes_the_row_from_every_index() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 3);

    let mut sink = RowBuffer::new();
    let request = RowRequest::select(0, IteratorType::Eq).with_key(&[Value::Unsigned(2)]);
    handler
        .execute_delete(None, &space, &request, &mut sink)
        .unwrap();
    // The deleted row is emitted back.
    assert_eq!(sink.len(), 1);

    let by_id = RowRequest::select(0, IteratorType::Eq).with_key(&[Value::Unsigned(2)]);
    assert!(select_ids(handler.as_ref(), &space, &by_id).is_empty());
    let by_name = RowRequest::select(1, IteratorType::Eq).with_key(&[Value::from("user-02")]);
    assert!(select_ids(handler.as_ref(), &space, &by_name).is_empty());

    // Deleting a missing row is a no-op, not an error.
    let mut sink = RowBuffer::new();
    handler
        .execute_delete(None, &space, &request, &mut sink)
        .unwrap();
    assert!(sink.is_empty());
}

#[test]
fn test_update_rewrites_secondary_and_protects_the_primary_key() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 2);

    let mut sink = RowBuffer::new();
    let rename = RowRequest::select(0, IteratorType::Eq)
        .with_key(&[Value::Unsigned(1)])
        .with_ops(vec![UpdateOp::assign(1, Value::from("renamed"))]);
    handler
        .execute_update(None, &space, &rename, &mut sink)
        .unwrap();
    assert_eq!(sink.len(), 1);

    // The secondary observes the new name and forgets the old one.
    let new_name = RowRequest::select(1, IteratorType::Eq).with_key(&[Value::from("renamed")]);
    assert_eq!(select_ids(handler.as_ref(), &space, &new_name), vec![1]);
    let old_name = RowRequest::select(1, IteratorType::Eq).with_key(&[Value::from("user-01")]);
    assert!(select_ids(handler.as_ref(), &space, &old_name).is_empty());

    // Rewriting the primary key is rejected.
    let mut sink = RowBuffer::new();
    let rekey = RowRequest::select(0, IteratorType::Eq)
        .with_key(&[Value::Unsigned(1)])
        .with_ops(vec![UpdateOp::assign(0, Value::Unsigned(99))]);
    match handler.execute_update(None, &space, &rekey, &mut sink) {
        Err(Error::InvalidArgument(msg)) => assert!(msg.contains("primary key")),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_upsert_inserts_then_applies_ops() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();

    let mut sink = RowBuffer::new();
    let request = RowRequest::write(&user(7, "grace", 40))
        .with_ops(vec![UpdateOp::assign(2, Value::Unsigned(41))]);

    // Missing row: inserted as-is, nothing emitted.
    handler
        .execute_upsert(None, &space, &request, &mut sink)
        .unwrap();
    assert!(sink.is_empty());
    let by_id = RowRequest::select(0, IteratorType::Eq).with_key(&[Value::Unsigned(7)]);
    let mut check = RowBuffer::new();
    handler
        .execute_select(None, &space, &by_id, &mut check)
        .unwrap();
    assert_eq!(check.rows()[0].field(2).unwrap().as_u64(), Some(40));

    // Existing row: the ops are applied instead.
    handler
        .execute_upsert(None, &space, &request, &mut sink)
        .unwrap();
    let mut check = RowBuffer::new();
    handler
        .execute_select(None, &space, &by_id, &mut check)
        .unwrap();
    assert_eq!(check.rows()[0].field(2).unwrap().as_u64(), Some(41));
}

#[test]
fn test_duplicate_secondary_key_is_rejected_atomically() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 2);

    // New id, name already taken by user 1.
    let mut sink = RowBuffer::new();
    let request = RowRequest::write(&user(3, "user-01", 50));
    match handler.execute_replace(None, &space, &request, &mut sink) {
        Err(Error::InvalidArgument(msg)) => assert!(msg.contains("Duplicate key")),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }

    // The failed replace left nothing behind.
    let by_id = RowRequest::select(0, IteratorType::Eq).with_key(&[Value::Unsigned(3)]);
    assert!(select_ids(handler.as_ref(), &space, &by_id).is_empty());
}

// ============================================================================
// Transactions and statement rollback
// ============================================================================

#[test]
fn test_transaction_hooks_track_known_transactions() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let txn = Transaction::new(42);

    engine.begin_statement(&txn).unwrap();
    engine.prepare(&txn).unwrap();
    engine.commit(&txn);

    // Once committed the transaction is gone.
    match engine.prepare(&txn) {
        Err(Error::InvalidArgument(msg)) => assert!(msg.contains("not found")),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_rollback_undoes_statements_newest_first() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 1);

    let old = Tuple::new(user(1, "user-01", 21));
    let renamed = Tuple::new(user(1, "renamed", 21));
    let inserted = Tuple::new(user(2, "bob", 33));

    // Apply two mutations, recording their statements.
    let mut txn = Transaction::new(7);
    engine.begin_statement(&txn).unwrap();

    let mut sink = RowBuffer::new();
    handler
        .execute_replace(None, &space, &RowRequest::write(renamed.fields()), &mut sink)
        .unwrap();
    txn.push_statement(Statement::new(
        space.id(),
        Some(old.clone()),
        Some(renamed.clone()),
    ));
    handler
        .execute_replace(None, &space, &RowRequest::write(inserted.fields()), &mut sink)
        .unwrap();
    txn.push_statement(Statement::new(space.id(), None, Some(inserted.clone())));

    engine.rollback(&txn);

    // The insert is gone and the rename is undone.
    let by_id = RowRequest::select(0, IteratorType::Eq).with_key(&[Value::Unsigned(2)]);
    assert!(select_ids(handler.as_ref(), &space, &by_id).is_empty());
    let by_name = RowRequest::select(1, IteratorType::Eq).with_key(&[Value::from("user-01")]);
    assert_eq!(select_ids(handler.as_ref(), &space, &by_name), vec![1]);
}

#[test]
fn test_secondary_key_builds_are_deferred_until_recovery_ends() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let space = users_space(&engine);

    assert!(!engine.need_to_build_secondary_key(&space));
    engine.end_recovery().unwrap();
    assert!(engine.need_to_build_secondary_key(&space));
}

// ============================================================================
// Checkpoint, recovery and join
// ============================================================================

/// Engine double whose checkpoint hooks can be made to fail.
struct FlakyEngine {
    fail_begin: bool,
    fail_wait: bool,
}

impl Engine for FlakyEngine {
    fn name(&self) -> &str {
        "flaky"
    }

    fn open(self: Arc<Self>) -> Box<dyn Handler> {
        Box::new(BaseHandler::new(self))
    }

    fn begin_checkpoint(&self, _checkpoint_id: CheckpointId) -> Result<()> {
        if self.fail_begin {
            Err(Error::engine_failure("flaky", "begin refused"))
        } else {
            Ok(())
        }
    }

    fn wait_checkpoint(&self) -> Result<()> {
        if self.fail_wait {
            Err(Error::engine_failure("flaky", "never became durable"))
        } else {
            Ok(())
        }
    }
}

#[test]
fn test_checkpoint_and_recover_roundtrip() {
    let store: Arc<MemorySnapshotStore> = Arc::new(MemorySnapshotStore::new());

    let engine = Arc::new(MemoryEngine::new(store.clone()));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 5);

    let mut registry = EngineRegistry::new();
    registry.register(engine.clone());
    let coordinator = CheckpointCoordinator::new();
    coordinator.checkpoint(&registry, 5).unwrap();

    // A fresh engine over the same store: recreate the schema, then
    // recover. Checkpoint 9 does not exist, so 5 is the one replayed.
    let restored = Arc::new(MemoryEngine::new(store.clone()));
    let restored_space = users_space(&restored);
    let mut registry = EngineRegistry::new();
    registry.register(restored.clone());
    recovery::recover_to_checkpoint(&registry, 9).unwrap();
    recovery::end_recovery(&registry).unwrap();

    let restored_handler = restored.clone().open();
    let all = RowRequest::select(0, IteratorType::All);
    assert_eq!(
        select_ids(restored_handler.as_ref(), &restored_space, &all),
        vec![1, 2, 3, 4, 5]
    );
    // Secondary indexes were rebuilt too.
    let by_name = RowRequest::select(1, IteratorType::Eq).with_key(&[Value::from("user-04")]);
    assert_eq!(
        select_ids(restored_handler.as_ref(), &restored_space, &by_name),
        vec![4]
    );
}

#[test]
fn test_recover_without_an_artifact_is_not_found() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let _space = users_space(&engine);

    match engine.recover_to_checkpoint(3) {
        Err(Error::NotFound { what, name }) => {
            assert_eq!(what, "checkpoint");
            assert_eq!(name, "3");
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_commit_prunes_superseded_artifacts() {
    let store: Arc<MemorySnapshotStore> = Arc::new(MemorySnapshotStore::new());
    let engine = Arc::new(MemoryEngine::new(store.clone()));
    let space = users_space(&engine);
    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &space, 2);

    let mut registry = EngineRegistry::new();
    registry.register(engine.clone());
    let coordinator = CheckpointCoordinator::new();

    coordinator.checkpoint(&registry, 5).unwrap();
    fill_users(handler.as_ref(), &space, 4);
    coordinator.checkpoint(&registry, 9).unwrap();

    let artifacts = store.list("memory");
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].checkpoint_id, 9);
}

#[test]
fn test_aborted_checkpoint_leaves_no_artifact() {
    // Begin-phase failure: the memory engine staged a dump but never
    // wrote it.
    let store: Arc<MemorySnapshotStore> = Arc::new(MemorySnapshotStore::new());
    let engine = Arc::new(MemoryEngine::new(store.clone()));
    let space = users_space(&engine);
    fill_users(engine.clone().open().as_ref(), &space, 3);

    let mut registry = EngineRegistry::new();
    registry.register(engine.clone());
    registry.register(Arc::new(FlakyEngine {
        fail_begin: true,
        fail_wait: false,
    }));
    let coordinator = CheckpointCoordinator::new();

    match coordinator.checkpoint(&registry, 4) {
        Err(Error::EngineFailure { engine, .. }) => assert_eq!(engine, "flaky"),
        other => panic!("Expected EngineFailure, got {:?}", other),
    }
    assert!(store.list("memory").is_empty());

    // Wait-phase failure: the artifact was already durable and must be
    // removed by the abort.
    let mut registry = EngineRegistry::new();
    registry.register(engine.clone());
    registry.register(Arc::new(FlakyEngine {
        fail_begin: false,
        fail_wait: true,
    }));
    match coordinator.checkpoint(&registry, 6) {
        Err(Error::EngineFailure { engine, .. }) => assert_eq!(engine, "flaky"),
        other => panic!("Expected EngineFailure, got {:?}", other),
    }
    assert!(store.list("memory").is_empty());

    // A later attempt without the flaky engine succeeds.
    let mut registry = EngineRegistry::new();
    registry.register(engine.clone());
    coordinator.checkpoint(&registry, 7).unwrap();
    assert_eq!(store.list("memory").len(), 1);
}

/// Relay collecting every streamed row.
#[derive(Default)]
struct VecRelay {
    rows: Vec<(SpaceId, Tuple)>,
}

impl JoinRelay for VecRelay {
    fn send_row(&mut self, space_id: SpaceId, row: Tuple) -> Result<()> {
        self.rows.push((space_id, row));
        Ok(())
    }
}

#[test]
fn test_join_streams_every_row_in_primary_order() {
    let engine = Arc::new(MemoryEngine::new(Arc::new(MemorySnapshotStore::new())));
    let users = users_space(&engine);
    let logs = engine
        .create_space(
            SpaceDef::new(600, "logs"),
            vec![(
                0,
                "pk".to_string(),
                KeyDef::new(vec![KeyPart::new(0, FieldType::Unsigned)]),
            )],
        )
        .unwrap();

    let handler = engine.clone().open();
    fill_users(handler.as_ref(), &users, 3);
    let mut sink = RowBuffer::new();
    for id in [20u64, 10u64] {
        let request = RowRequest::write(&[Value::Unsigned(id), Value::from("entry")]);
        handler
            .execute_replace(None, &logs, &request, &mut sink)
            .unwrap();
    }

    let mut registry = EngineRegistry::new();
    registry.register(engine.clone());

    join::begin_join(&registry).unwrap();
    let mut relay = VecRelay::default();
    join::join(&registry, &mut relay).unwrap();

    let streamed: Vec<(SpaceId, u64)> = relay
        .rows
        .iter()
        .map(|(space_id, row)| (*space_id, row.field(0).unwrap().as_u64().unwrap()))
        .collect();
    // Spaces in id order, rows in primary-key order within each space.
    assert_eq!(
        streamed,
        vec![(512, 1), (512, 2), (512, 3), (600, 10), (600, 20)]
    );
}
