// ==========================================
// 航次排产系统 - 优化器 (引擎编排)
// ==========================================
// 主流程: 校验请求 → 分配 → 冲突检测 → KPI → 组装 generated 计划
// compare: 多策略并行试算, 每个策略独立的 FleetState 副本, 不落库
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::cargo::CargoCommitment;
use crate::domain::schedule::{AllocationFailure, Conflict, Schedule, ScheduleConfig, ScheduleKpi};
use crate::domain::snapshot::MasterDataSnapshot;
use crate::domain::types::{ResolutionStatus, ScheduleStatus};
use crate::engine::allocation::AllocationEngine;
use crate::engine::cancel::CancelToken;
use crate::engine::conflict_detector::ConflictDetector;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fleet_state::FleetState;
use crate::engine::kpi::{compute_kpi, schedule_horizon, utilization_warnings, KpiInput};
use crate::engine::strategy::OptimizationStrategy;
use chrono::Datelike;
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// ==========================================
// Optimizer - 优化器
// ==========================================
#[derive(Debug, Clone)]
pub struct Optimizer {
    config: EngineConfig,
}

impl Optimizer {
    /// 创建优化器; 配置非法时返回 Configuration 错误
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 按请求中的策略生成计划 (状态 generated)
    #[instrument(skip_all, fields(strategy = %request.strategy, start = %request.date_range_start, end = %request.date_range_end))]
    pub fn generate(
        &self,
        snapshot: &MasterDataSnapshot,
        request: &ScheduleConfig,
        cancel: &CancelToken,
    ) -> EngineResult<Schedule> {
        let strategy: OptimizationStrategy = request.strategy.parse()?;
        let in_scope = self.scope(snapshot, request)?;
        let fleet = FleetState::from_vessels(snapshot.active_vessels());
        self.run_strategy(snapshot, request, strategy, &in_scope, fleet, cancel)
    }

    /// 多策略并行试算; strategies 为空时比较全部内置策略
    #[instrument(skip_all, fields(strategies = strategies.len()))]
    pub fn compare(
        &self,
        snapshot: &MasterDataSnapshot,
        request: &ScheduleConfig,
        strategies: &[OptimizationStrategy],
        cancel: &CancelToken,
    ) -> EngineResult<Vec<Schedule>> {
        let strategies: Vec<OptimizationStrategy> = if strategies.is_empty() {
            OptimizationStrategy::ALL.to_vec()
        } else {
            strategies.to_vec()
        };
        let in_scope = self.scope(snapshot, request)?;
        let base_fleet = FleetState::from_vessels(snapshot.active_vessels());

        let in_scope = &in_scope;
        let results: Vec<EngineResult<Schedule>> = std::thread::scope(|s| {
            let handles: Vec<_> = strategies
                .iter()
                .map(|&strategy| {
                    let fleet = base_fleet.clone();
                    s.spawn(move || {
                        self.run_strategy(snapshot, request, strategy, in_scope, fleet, cancel)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .map_err(|_| EngineError::Internal("策略试算线程异常退出".to_string()))
                        .and_then(|r| r)
                })
                .collect()
        });

        let schedules = results.into_iter().collect::<EngineResult<Vec<_>>>()?;
        for schedule in &schedules {
            info!(
                strategy = %schedule.strategy,
                profit = schedule.kpi.total_profit,
                score = schedule.kpi.optimality_score,
                "策略试算结果"
            );
        }
        Ok(schedules)
    }

    /// 重新检测冲突并刷新 KPI (人工处理后调用)
    ///
    /// 身份键相同的冲突沿用原编号与处理结果; 新冲突从现有最大编号之后续编
    pub fn rescore(&self, snapshot: &MasterDataSnapshot, schedule: &mut Schedule) {
        let previous: HashMap<String, &Conflict> = schedule
            .conflicts
            .iter()
            .map(|c| (c.identity_key(), c))
            .collect();
        let mut next_no = schedule
            .conflicts
            .iter()
            .filter_map(|c| c.conflict_id.strip_prefix("CF-")?.parse::<usize>().ok())
            .max()
            .unwrap_or(0);

        let mut conflicts = ConflictDetector::new(snapshot).detect(schedule);
        for conflict in &mut conflicts {
            match previous.get(&conflict.identity_key()) {
                Some(prev) => {
                    conflict.conflict_id = prev.conflict_id.clone();
                    if prev.status == ResolutionStatus::Resolved {
                        conflict.resolve(prev.resolution_note.clone());
                    }
                }
                None => {
                    next_no += 1;
                    conflict.conflict_id = format!("CF-{:04}", next_no);
                }
            }
        }

        let kpi = self.score(snapshot, schedule, &conflicts);
        schedule.warnings = build_warnings(&kpi, &schedule.config, &schedule.failures);
        schedule.kpi = kpi;
        schedule.conflicts = conflicts;
    }

    /// 刷新 KPI 与提示 (冲突清单不变)
    pub fn refresh_kpi(&self, snapshot: &MasterDataSnapshot, schedule: &mut Schedule) {
        let kpi = self.score(snapshot, schedule, &schedule.conflicts);
        schedule.warnings = build_warnings(&kpi, &schedule.config, &schedule.failures);
        schedule.kpi = kpi;
    }

    // ==========================================
    // 内部流程
    // ==========================================

    /// 请求校验 + 在范围内的待分配承诺
    fn scope(
        &self,
        snapshot: &MasterDataSnapshot,
        request: &ScheduleConfig,
    ) -> EngineResult<Vec<CargoCommitment>> {
        if request.date_range_end < request.date_range_start {
            return Err(EngineError::Configuration(format!(
                "日期范围非法: {} > {}",
                request.date_range_start, request.date_range_end
            )));
        }
        if request.min_utilization_pct > request.max_utilization_pct {
            return Err(EngineError::Configuration(format!(
                "利用率区间非法: {} > {}",
                request.min_utilization_pct, request.max_utilization_pct
            )));
        }
        if snapshot.active_vessels().is_empty() {
            return Err(EngineError::Configuration("日期范围内无在营船舶".to_string()));
        }

        let horizon = schedule_horizon(request);
        let in_scope: Vec<CargoCommitment> = snapshot
            .commitments
            .iter()
            .filter(|c| c.is_pending() && horizon.contains_half_open(c.laycan.start))
            .cloned()
            .collect();
        if in_scope.is_empty() {
            return Err(EngineError::Configuration(format!(
                "日期范围 {} ~ {} 内无待分配承诺",
                request.date_range_start, request.date_range_end
            )));
        }
        debug!(commitments = in_scope.len(), "范围内待分配承诺");
        Ok(in_scope)
    }

    fn run_strategy(
        &self,
        snapshot: &MasterDataSnapshot,
        request: &ScheduleConfig,
        strategy: OptimizationStrategy,
        in_scope: &[CargoCommitment],
        fleet: FleetState,
        cancel: &CancelToken,
    ) -> EngineResult<Schedule> {
        let horizon_days = request.range_days() as f64;
        let engine = AllocationEngine::new(
            snapshot,
            &self.config,
            strategy,
            request.bunker_optimization_enabled,
            horizon_days,
        );
        let outcome = engine.allocate(in_scope, fleet, cancel)?;

        let mut config = request.clone();
        config.strategy = strategy.as_str().to_string();
        let year = config.date_range_start.year();
        let now = chrono::Local::now().naive_local();

        let mut schedule = Schedule {
            schedule_id: Uuid::new_v4().to_string(),
            name: config
                .name
                .clone()
                .unwrap_or_else(|| format!("{}年度航次计划-{}", year, strategy.title_cn())),
            year,
            status: ScheduleStatus::Generated,
            strategy: strategy.as_str().to_string(),
            config,
            voyages: outcome.voyages,
            conflicts: Vec::new(),
            kpi: ScheduleKpi::default(),
            failures: outcome.failures,
            warnings: Vec::new(),
            notes: None,
            engine_config_json: serde_json::to_string(&self.config).ok(),
            derived_from: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        };

        let conflicts = ConflictDetector::new(snapshot).detect(&schedule);
        let kpi = self.score(snapshot, &schedule, &conflicts);
        schedule.warnings = build_warnings(&kpi, &schedule.config, &schedule.failures);
        schedule.kpi = kpi;
        schedule.conflicts = conflicts;

        info!(
            schedule_id = %schedule.schedule_id,
            strategy = %strategy,
            voyages = schedule.kpi.voyage_count,
            unallocated = schedule.kpi.unallocated_count,
            conflicts = schedule.conflicts.len(),
            utilization_pct = schedule.kpi.fleet_utilization_pct,
            "计划生成完成"
        );
        Ok(schedule)
    }

    fn score(&self, snapshot: &MasterDataSnapshot, schedule: &Schedule, conflicts: &[Conflict]) -> ScheduleKpi {
        compute_kpi(
            &KpiInput {
                voyages: &schedule.voyages,
                conflicts,
                unallocated_count: schedule.failures.len(),
                active_vessel_count: snapshot.active_vessels().len(),
                config: &schedule.config,
            },
            &self.config.score_weights,
        )
    }
}

fn build_warnings(kpi: &ScheduleKpi, config: &ScheduleConfig, failures: &[AllocationFailure]) -> Vec<String> {
    let mut warnings = utilization_warnings(kpi, config);
    if !failures.is_empty() {
        warnings.push(format!("{} 个承诺未能分配, 详见 failures", failures.len()));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cargo::CargoCommitment;
    use crate::domain::port::{CargoHandlingRate, GeoPoint, Port, Route};
    use crate::domain::types::{CommitmentStatus, FuelType, VesselStatus};
    use crate::domain::vessel::{ConsumptionProfile, Vessel};
    use crate::domain::window::TimeWindow;
    use chrono::{NaiveDate, NaiveDateTime};

    fn t(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn port(id: &str, lon: f64) -> Port {
        Port {
            port_id: id.to_string(),
            name: id.to_string(),
            position: GeoPoint::new(0.0, lon),
            default_rate: CargoHandlingRate { load_t_per_day: 20_000.0, discharge_t_per_day: 20_000.0 },
            cargo_rates: Default::default(),
            waiting_hours: Some(0.0),
            congestion_factor: 1.0,
            port_fee_usd: 10_000.0,
            max_draft_m: None,
            bunker_prices: Default::default(),
        }
    }

    fn vessel(id: &str, dwt: f64, hire: f64) -> Vessel {
        Vessel {
            vessel_id: id.to_string(),
            name: id.to_string(),
            dwt_t: dwt,
            service_speed_kn: 12.0,
            consumption: ConsumptionProfile {
                fuel_type: FuelType::Vlsfo,
                laden_t_per_day: 30.0,
                ballast_t_per_day: 25.0,
                port_t_per_day: 3.0,
            },
            length_m: 200.0,
            beam_m: 32.0,
            draft_m: 12.0,
            daily_hire_usd: hire,
            status: VesselStatus::Active,
            open_port_id: "X".to_string(),
            open_from: t(1),
            cargo_capabilities: vec![],
            fuel_capacity_t: 0.0,
            fuel_on_board_t: 5_000.0,
        }
    }

    fn snapshot() -> MasterDataSnapshot {
        MasterDataSnapshot {
            vessels: vec![vessel("A", 50_000.0, 15_000.0), vessel("B", 50_000.0, 10_000.0)],
            ports: vec![port("X", 0.0), port("Z", 10.0)],
            berths: vec![],
            routes: vec![Route {
                route_id: "XZ".to_string(),
                from_port_id: "X".to_string(),
                to_port_id: "Z".to_string(),
                distance_nm: 720.0,
                typical_duration_hours: None,
                canal_id: None,
                weather_factor: Some(1.0),
                waypoints: vec![],
            }],
            commitments: vec![CargoCommitment {
                commitment_id: "C1".to_string(),
                commodity: "coal".to_string(),
                quantity_t: 40_000.0,
                load_port_id: "X".to_string(),
                discharge_port_id: "Z".to_string(),
                laycan: TimeWindow::new(t(1), t(5)),
                freight_rate_usd_per_t: Some(20.0),
                delivery_deadline: None,
                late_penalty_usd_per_day: None,
                status: CommitmentStatus::Pending,
            }],
            market_fuel_prices: Default::default(),
        }
    }

    fn request(strategy: &str) -> ScheduleConfig {
        ScheduleConfig {
            name: None,
            module_scope: "dry-bulk".to_string(),
            date_range_start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            date_range_end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            strategy: strategy.to_string(),
            min_utilization_pct: 0.0,
            max_utilization_pct: 100.0,
            bunker_optimization_enabled: false,
        }
    }

    #[test]
    fn test_generate_produces_generated_schedule() {
        let optimizer = Optimizer::new(EngineConfig::default()).unwrap();
        let schedule = optimizer
            .generate(&snapshot(), &request("min_cost"), &CancelToken::new())
            .unwrap();
        assert_eq!(schedule.status, ScheduleStatus::Generated);
        assert_eq!(schedule.year, 2026);
        assert_eq!(schedule.voyages.len(), 1);
        // 成本优先选日租较低的 B
        assert_eq!(schedule.voyages[0].vessel_id, "B");
        assert!(schedule.failures.is_empty());
        assert!(schedule.engine_config_json.is_some());
    }

    #[test]
    fn test_configuration_errors_abort() {
        let optimizer = Optimizer::new(EngineConfig::default()).unwrap();
        let snap = snapshot();
        let cancel = CancelToken::new();

        let err = optimizer.generate(&snap, &request("fastest"), &cancel).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let mut reversed = request("balanced");
        reversed.date_range_end = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert!(matches!(
            optimizer.generate(&snap, &reversed, &cancel),
            Err(EngineError::Configuration(_))
        ));

        let mut empty = request("balanced");
        empty.date_range_start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        empty.date_range_end = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        assert!(matches!(
            optimizer.generate(&snap, &empty, &cancel),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_laycan_starting_at_range_end_is_out_of_scope() {
        let optimizer = Optimizer::new(EngineConfig::default()).unwrap();
        let mut snap = snapshot();
        let april_first = NaiveDate::from_ymd_opt(2026, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut next_month = snap.commitments[0].clone();
        next_month.commitment_id = "C2".to_string();
        next_month.laycan = TimeWindow::new(april_first, april_first + chrono::Duration::days(3));
        snap.commitments.push(next_month);

        let schedule = optimizer
            .generate(&snap, &request("min_cost"), &CancelToken::new())
            .unwrap();
        assert_eq!(schedule.voyages.len(), 1);
        assert_eq!(schedule.voyages[0].commitment_ids, vec!["C1".to_string()]);
        assert!(schedule.failures.is_empty());
    }

    #[test]
    fn test_compare_runs_every_strategy() {
        let optimizer = Optimizer::new(EngineConfig::default()).unwrap();
        let schedules = optimizer
            .compare(&snapshot(), &request("balanced"), &[], &CancelToken::new())
            .unwrap();
        let names: Vec<&str> = schedules.iter().map(|s| s.strategy.as_str()).collect();
        assert_eq!(names, vec!["max_revenue", "min_cost", "balanced"]);
        assert!(schedules.iter().all(|s| s.voyages.len() == 1));
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let config = EngineConfig {
            weather_margin: 0.9,
            ..Default::default()
        };
        assert!(matches!(Optimizer::new(config), Err(EngineError::Configuration(_))));
    }
}
