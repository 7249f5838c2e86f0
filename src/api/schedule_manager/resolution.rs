// ==========================================
// 计划管理器 - 冲突处理
// ==========================================
// Accept:         人工接受, 冲突标记为已处理
// ShiftVoyage:    整体平移航次, 装货开始须仍在受载期内
// ReassignVessel: 保留时段改派船舶, 校验载重/泊位几何/港口吃水并重新计价
// 平移/改派后重新检测; 目标冲突消失则以处理说明标记为已处理
// ==========================================

use super::{ensure_mutable, ScheduleManager};
use crate::api::error::{ApiError, ApiResult};
use crate::config::engine_config::EngineConfig;
use crate::domain::action_log::ActionType;
use crate::domain::schedule::{Conflict, ConflictResolution, Schedule};
use crate::domain::snapshot::MasterDataSnapshot;
use crate::domain::types::VesselStatus;
use crate::domain::window::hours_to_duration;
use crate::engine::constraint_validator::{soft_only, ConstraintValidator};
use crate::engine::cost_estimator::CostEstimator;
use tracing::info;

impl ScheduleManager {
    pub async fn resolve_conflict(
        &self,
        schedule_id: &str,
        conflict_id: &str,
        resolution: ConflictResolution,
        actor: &str,
    ) -> ApiResult<Schedule> {
        let lock = self.schedule_lock(schedule_id)?;
        let _guard = lock.lock().await;

        let mut schedule = self.find(schedule_id)?;
        ensure_mutable(&schedule, "RESOLVE_CONFLICT")?;

        let target = schedule
            .conflicts
            .iter()
            .find(|c| c.conflict_id == conflict_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Conflict(id={})不存在", conflict_id)))?;
        if !target.is_open() {
            return Err(ApiError::InvalidInput(format!("冲突 {} 已处理", conflict_id)));
        }

        let snapshot = self.load_snapshot().await?;
        let optimizer = self.optimizer().await?;

        match &resolution {
            ConflictResolution::Accept { note } => {
                if let Some(c) = schedule.conflicts.iter_mut().find(|c| c.conflict_id == conflict_id) {
                    c.resolve(Some(note.clone()));
                }
                optimizer.refresh_kpi(&snapshot, &mut schedule);
            }
            ConflictResolution::ShiftVoyage { voyage_id, hours } => {
                shift_voyage(&snapshot, &mut schedule, voyage_id, *hours)?;
                optimizer.rescore(&snapshot, &mut schedule);
                close_if_gone(&mut schedule, target, format!("平移航次 {} {:+.1}h", voyage_id, hours));
            }
            ConflictResolution::ReassignVessel { voyage_id, vessel_id } => {
                reassign_vessel(&snapshot, optimizer.config(), &mut schedule, voyage_id, vessel_id)?;
                optimizer.rescore(&snapshot, &mut schedule);
                close_if_gone(&mut schedule, target, format!("航次 {} 改派船舶 {}", voyage_id, vessel_id));
            }
        }

        self.save(&mut schedule)?;
        self.log_action(
            schedule_id,
            ActionType::ResolveConflict,
            actor,
            serde_json::json!({
                "conflict_id": conflict_id,
                "resolution": serde_json::to_value(&resolution).unwrap_or_default(),
            }),
            format!("处理冲突 {}", conflict_id),
        )?;
        info!(
            schedule_id,
            conflict_id,
            open_conflicts = schedule.kpi.open_conflict_count,
            "冲突已处理"
        );
        Ok(schedule)
    }
}

/// 整体平移航次; 装货开始必须落在每个承诺的受载期内
fn shift_voyage(
    snapshot: &MasterDataSnapshot,
    schedule: &mut Schedule,
    voyage_id: &str,
    hours: f64,
) -> ApiResult<()> {
    if !hours.is_finite() || hours == 0.0 {
        return Err(ApiError::InvalidInput(format!("平移小时数非法: {}", hours)));
    }
    let voyage = schedule
        .find_voyage_mut(voyage_id)
        .ok_or_else(|| ApiError::NotFound(format!("Voyage(id={})不存在", voyage_id)))?;

    let mut shifted = voyage.clone();
    shifted.shift(hours_to_duration(hours));

    if let Some(loading) = shifted.loading_leg() {
        for commitment_id in &shifted.commitment_ids {
            let commitment = snapshot.commitment(commitment_id).ok_or_else(|| {
                ApiError::NotFound(format!("CargoCommitment(id={})不存在", commitment_id))
            })?;
            if !commitment.laycan.contains(loading.start) {
                return Err(ApiError::InvalidInput(format!(
                    "平移后装货开始 {} 超出承诺 {} 受载期 {} ~ {}",
                    loading.start, commitment_id, commitment.laycan.start, commitment.laycan.end
                )));
            }
        }
    }

    *voyage = shifted;
    Ok(())
}

/// 改派船舶: 时段不变, 校验新船并重新计价
fn reassign_vessel(
    snapshot: &MasterDataSnapshot,
    config: &EngineConfig,
    schedule: &mut Schedule,
    voyage_id: &str,
    vessel_id: &str,
) -> ApiResult<()> {
    let vessel = snapshot
        .vessel(vessel_id)
        .ok_or_else(|| ApiError::NotFound(format!("Vessel(id={})不存在", vessel_id)))?;
    if vessel.status != VesselStatus::Active {
        return Err(ApiError::InvalidInput(format!("船舶 {} 不在营", vessel_id)));
    }
    let voyage = schedule
        .find_voyage_mut(voyage_id)
        .ok_or_else(|| ApiError::NotFound(format!("Voyage(id={})不存在", voyage_id)))?;
    if voyage.vessel_id == vessel_id {
        return Err(ApiError::InvalidInput(format!("航次 {} 已由船舶 {} 执行", voyage_id, vessel_id)));
    }

    let validator = ConstraintValidator::new();
    let mut soft = Vec::new();
    let mut commodity = String::new();
    for commitment_id in &voyage.commitment_ids {
        let cargo = snapshot.commitment(commitment_id).ok_or_else(|| {
            ApiError::NotFound(format!("CargoCommitment(id={})不存在", commitment_id))
        })?;
        let check = validator.validate_cargo(vessel, cargo);
        if !check.is_valid {
            return Err(ApiError::InvalidInput(check.summary()));
        }
        soft.extend(soft_only(&check));
        if commodity.is_empty() {
            commodity = cargo.commodity.clone();
        }
    }
    if voyage.cargo_t() > vessel.dwt_t {
        return Err(ApiError::InvalidInput(format!(
            "货量 {:.0}t 超过船舶 {} 载重 {:.0}t",
            voyage.cargo_t(),
            vessel_id,
            vessel.dwt_t
        )));
    }

    for leg in voyage.legs.iter().filter(|l| l.kind.uses_berth()) {
        if let Some(port) = snapshot.port(&leg.destination) {
            let check = validator.validate_port(vessel, port);
            if !check.is_valid {
                return Err(ApiError::InvalidInput(check.summary()));
            }
        }
        if let Some(berth) = leg.berth_id.as_deref().and_then(|id| snapshot.berth(id)) {
            let check = validator.validate_static(vessel, berth, &commodity);
            if !check.is_valid {
                return Err(ApiError::InvalidInput(check.summary()));
            }
            soft.extend(soft_only(&check));
        }
    }

    let estimator = CostEstimator::new(config);
    let price = voyage
        .loading_leg()
        .and_then(|l| snapshot.port(&l.destination))
        .map(|p| estimator.reference_fuel_price(vessel.consumption.fuel_type, p, &snapshot.market_fuel_prices))
        .or_else(|| snapshot.market_fuel_prices.get(&vessel.consumption.fuel_type).copied())
        .unwrap_or(config.default_fuel_price_usd_per_t);

    voyage.cost = estimator.reprice_for_vessel(&voyage.cost, vessel, price);
    voyage.vessel_id = vessel_id.to_string();
    voyage.soft_violations = soft;
    Ok(())
}

/// 目标冲突在重新检测后消失时, 以处理说明保留为已处理
fn close_if_gone(schedule: &mut Schedule, mut target: Conflict, note: String) {
    let key = target.identity_key();
    if schedule.conflicts.iter().any(|c| c.identity_key() == key) {
        return;
    }
    target.resolve(Some(note));
    schedule.conflicts.push(target);
    schedule.conflicts.sort_by(|a, b| a.conflict_id.cmp(&b.conflict_id));
}
