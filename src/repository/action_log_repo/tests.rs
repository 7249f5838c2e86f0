use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn base_ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 4, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn make_test_log(action_id: &str, schedule_id: &str, action: ActionType, minutes: i64) -> ActionLog {
    ActionLog {
        action_id: action_id.to_string(),
        schedule_id: Some(schedule_id.to_string()),
        action_type: action.to_string(),
        action_ts: base_ts() + Duration::minutes(minutes),
        actor: "planner".to_string(),
        payload_json: Some(serde_json::json!({ "schedule_id": schedule_id })),
        detail: Some("Test log".to_string()),
    }
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log("log1", "S1", ActionType::Generate, 0);
    assert_eq!(repo.insert(&log).unwrap(), "log1");

    let found = repo.find_by_id("log1").unwrap().unwrap();
    assert_eq!(found.schedule_id, Some("S1".to_string()));
    assert_eq!(found.action_type, "GENERATE");
    assert_eq!(found.action_ts, log.action_ts);
    assert_eq!(found.payload_json, log.payload_json);
    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_find_by_schedule_id_in_order() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&make_test_log("log2", "S1", ActionType::Finalize, 10)).unwrap();
    repo.insert(&make_test_log("log1", "S1", ActionType::Generate, 0)).unwrap();
    repo.insert(&make_test_log("log3", "S2", ActionType::Generate, 5)).unwrap();

    let logs = repo.find_by_schedule_id("S1").unwrap();
    let ids: Vec<&str> = logs.iter().map(|l| l.action_id.as_str()).collect();
    assert_eq!(ids, vec!["log1", "log2"]);

    let recent = repo.find_recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].action_id, "log2");
}
