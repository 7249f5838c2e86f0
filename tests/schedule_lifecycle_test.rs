// ==========================================
// 计划生命周期集成测试 (磁盘 SQLite)
// ==========================================
// 覆盖: 生成落库 → 冲突阻断定稿 → 处理 → 定稿不可变 → 派生/归档/删除
//       乐观锁、配置覆写
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use helpers::TestEnv;
use voyage_aps::api::{ApiError, ScheduleUpdate};
use voyage_aps::config::config_keys;
use voyage_aps::domain::schedule::{ConflictResolution, ScheduleFilter};
use voyage_aps::domain::snapshot::MasterDataSnapshot;
use voyage_aps::domain::types::{ConflictType, ScheduleStatus};
use voyage_aps::engine::{CancelToken, ConflictDetector};
use voyage_aps::repository::RepositoryError;

fn scenario() -> MasterDataSnapshot {
    two_port_snapshot(
        vec![
            VesselBuilder::new("A").hire(12_000.0).build(),
            VesselBuilder::new("B").hire(10_000.0).build(),
        ],
        vec![
            CommitmentBuilder::new("C1").build(),
            CommitmentBuilder::new("C2").laycan(t(15, 0), t(18, 0)).build(),
        ],
    )
}

#[tokio::test]
async fn test_full_lifecycle_on_disk() {
    let env = TestEnv::new(scenario());
    let mgr = env.state.schedule_manager.clone();

    let generated = mgr
        .generate(march_request("min_cost"), "planner", CancelToken::new())
        .await
        .unwrap();
    assert_eq!(generated.status, ScheduleStatus::Generated);
    assert_eq!(generated.voyages.len(), 2);
    let id = generated.schedule_id.clone();

    // 另一会话把第二个航次改派到第一个航次的船上并重新检测, 形成同船重叠
    let side = env.side_repo();
    let mut edited = side.find_by_id(&id).unwrap().unwrap();
    let first_vessel = edited.voyages[0].vessel_id.clone();
    let start = edited.voyages[0].start().unwrap();
    let delta = start - edited.voyages[1].start().unwrap() + chrono::Duration::hours(24);
    let second = &mut edited.voyages[1];
    second.vessel_id = first_vessel;
    second.shift(delta);
    edited.conflicts = ConflictDetector::new(&scenario()).detect(&edited);
    assert!(edited
        .conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::TimingOverlap && c.is_open_hard()));
    side.update(&edited).unwrap();

    // 存在硬冲突, 拒绝定稿
    let open_ids = match mgr.finalize(&id, "lead").await.unwrap_err() {
        ApiError::ConflictsUnresolved { count, conflict_ids } => {
            assert_eq!(count, conflict_ids.len());
            conflict_ids
        }
        other => panic!("unexpected error: {:?}", other),
    };

    for conflict_id in &open_ids {
        mgr.resolve_conflict(
            &id,
            conflict_id,
            ConflictResolution::Accept { note: "两票货合并装运, 已人工确认".to_string() },
            "lead",
        )
        .await
        .unwrap();
    }

    let finalized = mgr.finalize(&id, "lead").await.unwrap();
    assert_eq!(finalized.status, ScheduleStatus::Finalized);
    assert!(finalized.open_hard_conflicts().is_empty());

    // 定稿后不可修改
    let err = mgr
        .update_schedule(&id, ScheduleUpdate { name: Some("x".to_string()), notes: None }, "planner")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

    // 派生草稿承接航次与冲突处理结果
    let draft = mgr.derive_draft(&id, "planner").await.unwrap();
    assert_eq!(draft.status, ScheduleStatus::Draft);
    assert_eq!(draft.voyages, finalized.voyages);
    assert_eq!(draft.conflicts, finalized.conflicts);

    mgr.archive(&id, "lead").await.unwrap();
    mgr.delete_schedule(&id, "lead").await.unwrap();

    let visible = mgr.list_schedules(&ScheduleFilter::default()).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].schedule_id, draft.schedule_id);

    let deleted = mgr
        .list_schedules(&ScheduleFilter { year: Some(2026), status: Some(ScheduleStatus::Deleted) })
        .unwrap();
    assert_eq!(deleted.len(), 1);

    let actions: Vec<String> = mgr
        .list_actions(&id)
        .unwrap()
        .into_iter()
        .map(|a| a.action_type)
        .collect();
    assert_eq!(actions.first().map(String::as_str), Some("GENERATE"));
    assert_eq!(
        actions.iter().filter(|a| a.as_str() == "RESOLVE_CONFLICT").count(),
        open_ids.len()
    );
    assert_eq!(&actions[actions.len() - 3..], &["FINALIZE", "ARCHIVE", "DELETE"]);
}

#[tokio::test]
async fn test_stale_writer_rejected() {
    let env = TestEnv::new(scenario());
    let mgr = env.state.schedule_manager.clone();
    let schedule = mgr
        .generate(march_request("balanced"), "planner", CancelToken::new())
        .await
        .unwrap();

    let side = env.side_repo();
    let stale = side.find_by_id(&schedule.schedule_id).unwrap().unwrap();

    mgr.update_schedule(
        &schedule.schedule_id,
        ScheduleUpdate { name: None, notes: Some("首轮评审".to_string()) },
        "planner",
    )
    .await
    .unwrap();

    match side.update(&stale).unwrap_err() {
        RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
            assert_eq!(expected, stale.revision);
            assert_eq!(actual, stale.revision + 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let stored = mgr.get_schedule(&schedule.schedule_id).unwrap();
    assert_eq!(stored.notes.as_deref(), Some("首轮评审"));
}

#[tokio::test]
async fn test_master_data_replaced_between_generations() {
    let env = TestEnv::new(scenario());
    let mgr = env.state.schedule_manager.clone();

    let before = mgr
        .generate(march_request("min_cost"), "planner", CancelToken::new())
        .await
        .unwrap();
    assert_eq!(before.voyages.len(), 2);

    // 外部 CRUD 取消了 C2
    let mut snapshot = scenario();
    snapshot.commitments.retain(|c| c.commitment_id != "C2");
    env.master_data.replace(snapshot).unwrap();

    let after = mgr
        .generate(march_request("min_cost"), "planner", CancelToken::new())
        .await
        .unwrap();
    assert_eq!(after.voyages.len(), 1);

    // 先前的计划不受影响
    assert_eq!(mgr.get_schedule(&before.schedule_id).unwrap().voyages.len(), 2);
}

#[tokio::test]
async fn test_config_overrides_apply_to_generation() {
    let env = TestEnv::new(scenario());
    let mgr = env.state.schedule_manager.clone();
    let config = env.state.config_manager.clone();

    // 非法天气余量: 生成被拒绝, 不落库
    config.set_global_config_value(config_keys::WEATHER_MARGIN, "0.8").unwrap();
    let err = mgr
        .generate(march_request("min_cost"), "planner", CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ConfigurationError(_)));
    assert!(mgr.list_schedules(&ScheduleFilter::default()).unwrap().is_empty());

    // 装港报价与市场价缺失时使用配置缺省油价
    config.set_global_config_value(config_keys::WEATHER_MARGIN, "1.05").unwrap();
    config.set_global_config_value(config_keys::DEFAULT_FUEL_PRICE, "1000").unwrap();
    let mut snapshot = scenario();
    snapshot.market_fuel_prices.clear();
    env.master_data.replace(snapshot).unwrap();

    let schedule = mgr
        .generate(march_request("min_cost"), "planner", CancelToken::new())
        .await
        .unwrap();
    let voyage = &schedule.voyages[0];
    assert!((voyage.cost.bunker_cost - voyage.cost.fuel_consumed_t * 1000.0).abs() < 1e-6);

    let snapshot_json = config.get_config_snapshot().unwrap();
    assert!(snapshot_json.contains(config_keys::DEFAULT_FUEL_PRICE));
}
