// ==========================================
// 航次排产系统 - 分配引擎
// ==========================================
// 职责: 将待分配货载承诺匹配到船舶, 生成有序航段序列
// 顺序: 受载期开始升序 → 货量降序 → 承诺ID (正确性要求, 不可并行化)
// 航段: 空放 (按受载期倒排起航) → [等泊] → 装货 → [加油] → 重载/运河 → [等待] → 卸货
// 红线: 不修改主数据; 只在返回的承诺副本上修改 status
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::cargo::CargoCommitment;
use crate::domain::port::{Port, Route};
use crate::domain::schedule::{AllocationFailure, FailureKind};
use crate::domain::snapshot::MasterDataSnapshot;
use crate::domain::types::{CommitmentStatus, LegKind};
use crate::domain::vessel::Vessel;
use crate::domain::violation::Violation;
use crate::domain::voyage::{Voyage, VoyageLeg};
use crate::domain::window::{duration_to_hours, hours_to_duration, TimeWindow};
use crate::engine::bunker::{select_bunker_ports, BunkerRequest, BunkerStop};
use crate::engine::cancel::CancelToken;
use crate::engine::constraint_validator::{soft_only, ConstraintValidator};
use crate::engine::cost_estimator::{CostEstimator, VoyageCostInput};
use crate::engine::error::EngineResult;
use crate::engine::fleet_state::FleetState;
use crate::engine::route_search::PortNetwork;
use crate::engine::strategy::{CandidateMetrics, OptimizationStrategy};
use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

// ==========================================
// AllocationOutcome - 分配结果
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub voyages: Vec<Voyage>,
    pub failures: Vec<AllocationFailure>,
    /// 输入承诺的副本, 已分配者 status = Assigned
    pub commitments: Vec<CargoCommitment>,
    pub fleet: FleetState,
}

/// 候选航次 (尚未编号)
#[derive(Debug, Clone)]
struct PlannedVoyage {
    voyage: Voyage,
    fuel_after_t: f64,
    metrics: CandidateMetrics,
}

/// 泊位时段
#[derive(Debug, Clone)]
struct BerthSlot {
    berth_id: Option<String>,
    start: NaiveDateTime,
    soft: Vec<Violation>,
}

// ==========================================
// LegBuilder - 按游标顺序拼接航段
// ==========================================
struct LegBuilder {
    legs: Vec<VoyageLeg>,
    cursor: NaiveDateTime,
}

impl LegBuilder {
    fn new(start: NaiveDateTime) -> Self {
        Self {
            legs: Vec::new(),
            cursor: start,
        }
    }

    fn cursor(&self) -> NaiveDateTime {
        self.cursor
    }

    /// 追加航段到指定结束时间; 零时长不产生航段
    fn push_until(
        &mut self,
        kind: LegKind,
        end: NaiveDateTime,
        origin: &str,
        destination: &str,
    ) -> Option<&mut VoyageLeg> {
        if end <= self.cursor {
            return None;
        }
        self.legs.push(VoyageLeg {
            kind,
            start: self.cursor,
            end,
            origin: origin.to_string(),
            destination: destination.to_string(),
            cargo_t: 0.0,
            berth_id: None,
            canal_id: None,
        });
        self.cursor = end;
        self.legs.last_mut()
    }

    fn push(&mut self, kind: LegKind, hours: f64, origin: &str, destination: &str) -> Option<&mut VoyageLeg> {
        let end = self.cursor + hours_to_duration(hours);
        self.push_until(kind, end, origin, destination)
    }

    fn wait_until(&mut self, until: NaiveDateTime, port_id: &str) {
        self.push_until(LegKind::Waiting, until, port_id, port_id);
    }

    fn waiting_hours(&self) -> f64 {
        self.legs
            .iter()
            .filter(|l| l.kind == LegKind::Waiting)
            .map(VoyageLeg::duration_hours)
            .sum()
    }
}

// ==========================================
// AllocationEngine - 分配引擎
// ==========================================
pub struct AllocationEngine<'a> {
    snapshot: &'a MasterDataSnapshot,
    config: &'a EngineConfig,
    network: PortNetwork<'a>,
    estimator: CostEstimator<'a>,
    validator: ConstraintValidator,
    strategy: OptimizationStrategy,
    bunker_optimization: bool,
    horizon_days: f64,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(
        snapshot: &'a MasterDataSnapshot,
        config: &'a EngineConfig,
        strategy: OptimizationStrategy,
        bunker_optimization: bool,
        horizon_days: f64,
    ) -> Self {
        Self {
            snapshot,
            config,
            network: PortNetwork::new(&snapshot.ports, &snapshot.routes, config),
            estimator: CostEstimator::new(config),
            validator: ConstraintValidator::new(),
            strategy,
            bunker_optimization,
            horizon_days,
        }
    }

    /// 执行分配
    ///
    /// # 参数
    /// - commitments: 候选承诺 (只处理 Pending)
    /// - fleet: 起始船队状态 (调用方持有的副本)
    /// - cancel: 每处理一个承诺前检查
    #[instrument(skip_all, fields(strategy = %self.strategy, commitments = commitments.len()))]
    pub fn allocate(
        &self,
        commitments: &[CargoCommitment],
        fleet: FleetState,
        cancel: &CancelToken,
    ) -> EngineResult<AllocationOutcome> {
        let mut order: Vec<usize> = (0..commitments.len())
            .filter(|&i| commitments[i].is_pending())
            .collect();
        order.sort_by(|&a, &b| {
            let (x, y) = (&commitments[a], &commitments[b]);
            x.laycan
                .start
                .cmp(&y.laycan.start)
                .then_with(|| y.quantity_t.total_cmp(&x.quantity_t))
                .then_with(|| x.commitment_id.cmp(&y.commitment_id))
        });

        let vessels = self.snapshot.active_vessels();
        let mut fleet = fleet;
        let mut updated = commitments.to_vec();
        let mut voyages: Vec<Voyage> = Vec::new();
        let mut failures: Vec<AllocationFailure> = Vec::new();

        for (processed, idx) in order.into_iter().enumerate() {
            cancel.check(processed)?;

            let cargo = &commitments[idx];
            match self.allocate_one(cargo, &vessels, &fleet) {
                Ok(planned) => {
                    let mut voyage = planned.voyage;
                    voyage.voyage_id = format!("VOY-{:04}", voyages.len() + 1);
                    debug!(
                        commitment_id = %cargo.commitment_id,
                        vessel_id = %voyage.vessel_id,
                        voyage_id = %voyage.voyage_id,
                        profit = voyage.cost.profit(),
                        "承诺已分配"
                    );
                    fleet = fleet.apply_voyage(&voyage, planned.fuel_after_t);
                    updated[idx].status = CommitmentStatus::Assigned;
                    voyages.push(voyage);
                }
                Err(failure) => {
                    warn!(
                        commitment_id = %failure.commitment_id,
                        kind = %failure.kind,
                        reasons = ?failure.reasons,
                        "承诺未能分配"
                    );
                    failures.push(failure);
                }
            }
        }

        info!(
            voyages = voyages.len(),
            failures = failures.len(),
            fleet_version = fleet.version(),
            "分配完成"
        );

        Ok(AllocationOutcome {
            voyages,
            failures,
            commitments: updated,
            fleet,
        })
    }

    fn allocate_one(
        &self,
        cargo: &CargoCommitment,
        vessels: &[&Vessel],
        fleet: &FleetState,
    ) -> Result<PlannedVoyage, AllocationFailure> {
        let missing = |what: &str, id: &str| AllocationFailure {
            commitment_id: cargo.commitment_id.clone(),
            kind: FailureKind::DataIntegrityError,
            reasons: vec![format!("{}(id={})不存在", what, id)],
        };
        let load_port = self
            .snapshot
            .port(&cargo.load_port_id)
            .ok_or_else(|| missing("装港", &cargo.load_port_id))?;
        let discharge_port = self
            .snapshot
            .port(&cargo.discharge_port_id)
            .ok_or_else(|| missing("卸港", &cargo.discharge_port_id))?;

        let mut reasons = Vec::new();
        let mut candidates: Vec<PlannedVoyage> = Vec::new();
        for vessel in vessels {
            match self.plan_candidate(vessel, cargo, load_port, discharge_port, fleet) {
                Ok(planned) => candidates.push(planned),
                Err(reason) => reasons.push(format!("{}: {}", vessel.vessel_id, reason)),
            }
        }
        if vessels.is_empty() {
            reasons.push("无在营船舶".to_string());
        }

        let metrics: Vec<CandidateMetrics> = candidates.iter().map(|c| c.metrics.clone()).collect();
        match self
            .strategy
            .select(&metrics, self.horizon_days, &self.config.strategy_weights)
        {
            Some(best) => Ok(candidates.swap_remove(best)),
            None => Err(AllocationFailure {
                commitment_id: cargo.commitment_id.clone(),
                kind: FailureKind::InfeasibleAssignment,
                reasons,
            }),
        }
    }

    /// 单船候选评估: 任何硬约束不满足即返回原因
    fn plan_candidate(
        &self,
        vessel: &Vessel,
        cargo: &CargoCommitment,
        load_port: &Port,
        discharge_port: &Port,
        fleet: &FleetState,
    ) -> Result<PlannedVoyage, String> {
        let position = fleet
            .position(&vessel.vessel_id)
            .ok_or_else(|| "船队状态中无该船".to_string())?;

        let cargo_check = self.validator.validate_cargo(vessel, cargo);
        if !cargo_check.is_valid {
            return Err(cargo_check.summary());
        }
        for port in [load_port, discharge_port] {
            let port_check = self.validator.validate_port(vessel, port);
            if !port_check.is_valid {
                return Err(port_check.summary());
            }
        }

        let fuel_price = self.estimator.reference_fuel_price(
            vessel.consumption.fuel_type,
            load_port,
            &self.snapshot.market_fuel_prices,
        );

        // 空放
        let ballast = self
            .estimator
            .plan_route(&self.network, vessel, &position.port_id, &load_port.port_id, false, fuel_price)
            .ok_or_else(|| format!("无 {} → {} 的航线", position.port_id, load_port.port_id))?;

        // 空放按受载期倒排起航; 船舶在此之前的空闲不计入航次
        let ballast_duration = ballast
            .edges
            .iter()
            .map(|edge| hours_to_duration(self.estimator.edge_leg_hours(vessel, edge)))
            .fold(Duration::zero(), |acc, d| acc + d);
        let departure = position
            .available_from
            .max(cargo.laycan.start - ballast_duration);

        let mut builder = LegBuilder::new(departure);
        for edge in &ballast.edges {
            self.sail(&mut builder, vessel, edge, 0.0);
        }
        let arrival = builder.cursor();
        if arrival > cargo.laycan.end {
            return Err(format!(
                "预计 {} 抵达装港, 晚于受载期截止 {}",
                arrival, cargo.laycan.end
            ));
        }
        let ready = arrival.max(cargo.laycan.start);

        // 装港泊位 (开工不得晚于受载期截止)
        let load_hours = self.estimator.load_call_hours(cargo, load_port);
        let load_slot = self
            .find_berth_slot(vessel, cargo, load_port, ready, cargo.laycan.end, load_hours, fleet)
            .ok_or_else(|| format!("装港 {} 受载期内无可用泊位", load_port.port_id))?;
        builder.wait_until(load_slot.start, &load_port.port_id);
        if let Some(leg) = builder.push(LegKind::Loading, load_hours, &load_port.port_id, &load_port.port_id) {
            leg.cargo_t = cargo.quantity_t;
            leg.berth_id = load_slot.berth_id.clone();
        }

        // 重载航线
        let laden = self
            .estimator
            .plan_route(&self.network, vessel, &load_port.port_id, &discharge_port.port_id, true, fuel_price)
            .ok_or_else(|| format!("无 {} → {} 的航线", load_port.port_id, discharge_port.port_id))?;
        let ballast_hours = self.estimator.route_hours(vessel, &ballast);
        let laden_hours = self.estimator.route_hours(vessel, &laden);

        // 加油计划
        let bunker_stops: Vec<BunkerStop> = if self.bunker_optimization {
            let discharge_call = self.estimator.discharge_call_hours(cargo, discharge_port);
            let port_hours = builder.waiting_hours() + load_hours + discharge_call;
            let port_rate = vessel.consumption.port_t_per_day;
            let before_route = (vessel.consumption.ballast_t_per_day * ballast_hours.total()
                + port_rate * (builder.waiting_hours() + load_hours))
                / 24.0;
            let request = BunkerRequest {
                vessel,
                laden_route: &laden,
                fuel_on_board_t: position.fuel_on_board_t,
                fuel_before_route_t: before_route,
                voyage_requirement_t: self
                    .estimator
                    .fuel_requirement(vessel, ballast_hours, laden_hours, port_hours),
            };
            select_bunker_ports(&request, &self.network, self.config)
        } else {
            Vec::new()
        };

        self.bunker_call(&mut builder, &bunker_stops, 0);
        for (idx, edge) in laden.edges.iter().enumerate() {
            self.sail(&mut builder, vessel, edge, cargo.quantity_t);
            if idx + 1 < laden.edges.len() {
                self.bunker_call(&mut builder, &bunker_stops, idx + 1);
            }
        }

        // 卸港泊位 (等泊不超过 max_berth_wait_hours)
        let discharge_arrival = builder.cursor();
        let latest = discharge_arrival + hours_to_duration(self.config.max_berth_wait_hours);
        let discharge_hours = self.estimator.discharge_call_hours(cargo, discharge_port);
        let discharge_slot = self
            .find_berth_slot(vessel, cargo, discharge_port, discharge_arrival, latest, discharge_hours, fleet)
            .ok_or_else(|| {
                format!(
                    "卸港 {} 在 {:.0}h 等泊上限内无可用泊位",
                    discharge_port.port_id, self.config.max_berth_wait_hours
                )
            })?;
        builder.wait_until(discharge_slot.start, &discharge_port.port_id);
        if let Some(leg) = builder.push(
            LegKind::Discharge,
            discharge_hours,
            &discharge_port.port_id,
            &discharge_port.port_id,
        ) {
            leg.cargo_t = cargo.quantity_t;
            leg.berth_id = discharge_slot.berth_id.clone();
        }

        let cost = self.estimator.estimate_voyage(&VoyageCostInput {
            vessel,
            cargo,
            load_port,
            discharge_port,
            ballast: &ballast,
            laden: &laden,
            bunker_stops: &bunker_stops,
            extra_waiting_hours: builder.waiting_hours(),
            reference_fuel_price: fuel_price,
            discharge_end: Some(builder.cursor()),
        });

        let purchased: f64 = bunker_stops.iter().map(|s| s.purchase_t).sum();
        let fuel_after_t = position.fuel_on_board_t + purchased - cost.fuel_consumed_t;

        let mut soft_violations = load_slot.soft;
        soft_violations.extend(discharge_slot.soft);

        let metrics = CandidateMetrics {
            vessel_id: vessel.vessel_id.clone(),
            profit: cost.profit(),
            total_cost: cost.total_cost,
            committed_days: position.committed_days(),
            soft_violation_count: soft_violations.len(),
        };

        Ok(PlannedVoyage {
            voyage: Voyage {
                voyage_id: String::new(),
                vessel_id: vessel.vessel_id.clone(),
                commitment_ids: vec![cargo.commitment_id.clone()],
                legs: builder.legs,
                load_berth_id: load_slot.berth_id,
                discharge_berth_id: discharge_slot.berth_id,
                cost,
                soft_violations,
            },
            fuel_after_t,
            metrics,
        })
    }

    /// 单条边航段: 运河边生成 Canal, 其余按载货与否生成 Transit / Ballast
    fn sail(&self, builder: &mut LegBuilder, vessel: &Vessel, edge: &Route, cargo_t: f64) {
        let hours = self.estimator.edge_leg_hours(vessel, edge);
        let kind = match (&edge.canal_id, cargo_t > 0.0) {
            (Some(_), _) => LegKind::Canal,
            (None, true) => LegKind::Transit,
            (None, false) => LegKind::Ballast,
        };
        if let Some(leg) = builder.push(kind, hours, &edge.from_port_id, &edge.to_port_id) {
            leg.cargo_t = cargo_t;
            leg.canal_id = edge.canal_id.clone();
        }
    }

    fn bunker_call(&self, builder: &mut LegBuilder, stops: &[BunkerStop], anchor_index: usize) {
        for stop in stops.iter().filter(|s| s.anchor_index == anchor_index) {
            builder.push(LegKind::Bunker, stop.leg_hours(), &stop.anchor_port_id, &stop.port_id);
        }
    }

    /// 搜索最早可用泊位时段
    ///
    /// # 规则
    /// - 港口无泊位数据: 视为锚地作业, 不占泊位
    /// - 几何/工艺硬约束不满足的泊位跳过
    /// - 从 earliest 起按 berth_slot_step_hours 步进, 开工不晚于 latest_start
    /// - 多泊位取开工最早者, 同时刻按泊位ID
    #[allow(clippy::too_many_arguments)]
    fn find_berth_slot(
        &self,
        vessel: &Vessel,
        cargo: &CargoCommitment,
        port: &Port,
        earliest: NaiveDateTime,
        latest_start: NaiveDateTime,
        hours: f64,
        fleet: &FleetState,
    ) -> Option<BerthSlot> {
        let berths = self.snapshot.berths_at(&port.port_id);
        if berths.is_empty() {
            return Some(BerthSlot {
                berth_id: None,
                start: earliest,
                soft: Vec::new(),
            });
        }

        let step = hours_to_duration(self.config.berth_slot_step_hours).max(Duration::seconds(60));
        let mut best: Option<BerthSlot> = None;

        for berth in berths {
            if !self.validator.validate_static(vessel, berth, &cargo.commodity).is_valid {
                continue;
            }
            let bookings = fleet.berth_bookings(&berth.berth_id);
            let mut start = earliest;
            while start <= latest_start {
                if best.as_ref().map(|b| start >= b.start).unwrap_or(false) {
                    break;
                }
                let window = TimeWindow::from_hours(start, hours);
                let result = self.validator.validate(vessel, berth, cargo, &window, bookings);
                if result.is_valid {
                    best = Some(BerthSlot {
                        berth_id: Some(berth.berth_id.clone()),
                        start,
                        soft: soft_only(&result),
                    });
                    break;
                }
                start += step;
            }
        }

        if let Some(slot) = &best {
            let waited = duration_to_hours(slot.start - earliest);
            if waited > 0.0 {
                debug!(port_id = %port.port_id, berth_id = ?slot.berth_id, waited_hours = waited, "等泊");
            }
        }
        best
    }
}
