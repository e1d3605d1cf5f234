use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::Utc;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_test_log(action_id: &str, lot_id: &str, actor: &str) -> ActionLog {
    ActionLog {
        action_id: action_id.to_string(),
        lot_id: Some(lot_id.to_string()),
        action_type: ActionType::StatusTransition.as_str().to_string(),
        action_ts: Utc::now().naive_utc(),
        actor: actor.to_string(),
        actor_role: Some("QC".to_string()),
        payload_json: Some(serde_json::json!({"old_status": "RECEIVED", "new_status": "PENDING_QC"})),
        detail: Some("Test log".to_string()),
    }
}

#[test]
fn test_insert_and_read_back() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log("log1", "L1", "user1");
    assert_eq!(repo.insert(&log).unwrap(), "log1");

    let found = repo.find_by_lot_id("L1").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].actor, "user1");
    assert_eq!(found[0].actor_role.as_deref(), Some("QC"));
    assert_eq!(found[0].action_type, "StatusTransition");
    assert_eq!(
        found[0].payload_json.as_ref().unwrap()["new_status"],
        "PENDING_QC"
    );

    assert!(repo.find_by_lot_id("missing").unwrap().is_empty());
}

#[test]
fn test_find_by_lot_id_newest_first() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&make_test_log("log1", "L1", "user1")).unwrap();
    repo.insert(&make_test_log("log2", "L1", "user2")).unwrap();
    repo.insert(&make_test_log("log3", "L2", "user1")).unwrap();

    let logs = repo.find_by_lot_id("L1").unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action_id, "log2");
}

#[test]
fn test_insert_with_rolls_back_with_transaction() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(conn.clone());

    {
        let guard = conn.lock().unwrap();
        let tx = guard.unchecked_transaction().unwrap();
        ActionLogRepository::insert_with(&tx, &make_test_log("log1", "L1", "user1")).unwrap();
        // 未提交，随事务一起回滚
    }

    assert!(repo.find_by_lot_id("L1").unwrap().is_empty());
}
