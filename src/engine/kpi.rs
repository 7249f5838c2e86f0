// ==========================================
// 航次排产系统 - KPI 与最优性评分
// ==========================================
// 利用率 = 范围内已占用船天 / (在役船数 × 范围天数) × 100
// 最优性 = 100 × (w_u·利用率 + w_m·利润率 + w_c·1/(1+P)), 截断到 0..=100
// P = Σ 未处理冲突权重 + 0.5 × 未分配承诺数
// ==========================================

use crate::config::engine_config::ScoreWeights;
use crate::domain::schedule::{Conflict, ScheduleConfig, ScheduleKpi};
use crate::domain::voyage::Voyage;
use crate::domain::window::{duration_to_hours, TimeWindow};
use chrono::Duration;

const UNALLOCATED_PENALTY: f64 = 0.5;

pub struct KpiInput<'a> {
    pub voyages: &'a [Voyage],
    pub conflicts: &'a [Conflict],
    pub unallocated_count: usize,
    pub active_vessel_count: usize,
    pub config: &'a ScheduleConfig,
}

/// 计划范围 [首日 00:00, 末日次日 00:00)
pub fn schedule_horizon(config: &ScheduleConfig) -> TimeWindow {
    let start = config.date_range_start.and_time(chrono::NaiveTime::MIN);
    TimeWindow::new(start, start + Duration::days(config.range_days().max(0)))
}

pub fn compute_kpi(input: &KpiInput<'_>, weights: &ScoreWeights) -> ScheduleKpi {
    let total_revenue: f64 = input.voyages.iter().map(|v| v.total_revenue()).sum();
    let total_cost: f64 = input.voyages.iter().map(|v| v.total_cost()).sum();
    let total_profit = total_revenue - total_cost;

    let horizon = schedule_horizon(input.config);
    let committed_days: f64 = input
        .voyages
        .iter()
        .filter_map(|v| v.window())
        .map(|w| w.overlap_hours(&horizon) / 24.0)
        .sum();
    let available_days = input.active_vessel_count as f64 * duration_to_hours(horizon.end - horizon.start) / 24.0;
    let fleet_utilization_pct = if available_days > 0.0 {
        (committed_days / available_days * 100.0).min(100.0)
    } else {
        0.0
    };

    let average_tce = if input.voyages.is_empty() {
        0.0
    } else {
        input.voyages.iter().map(|v| v.tce()).sum::<f64>() / input.voyages.len() as f64
    };

    let open_conflicts: Vec<&Conflict> = input.conflicts.iter().filter(|c| c.is_open()).collect();
    let penalty: f64 = open_conflicts.iter().map(|c| c.severity.penalty_weight()).sum::<f64>()
        + UNALLOCATED_PENALTY * input.unallocated_count as f64;

    let margin = if total_revenue > 0.0 {
        (total_profit / total_revenue).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let score = 100.0
        * (weights.utilization * fleet_utilization_pct / 100.0
            + weights.margin * margin
            + weights.conflict / (1.0 + penalty));

    ScheduleKpi {
        total_revenue,
        total_cost,
        total_profit,
        voyage_count: input.voyages.len(),
        unallocated_count: input.unallocated_count,
        fleet_utilization_pct,
        average_tce,
        soft_violation_count: input.voyages.iter().map(|v| v.soft_violations.len()).sum(),
        open_conflict_count: open_conflicts.len(),
        optimality_score: score.clamp(0.0, 100.0),
    }
}

/// 利用率超出目标区间时的提示
pub fn utilization_warnings(kpi: &ScheduleKpi, config: &ScheduleConfig) -> Vec<String> {
    let util = kpi.fleet_utilization_pct;
    let mut warnings = Vec::new();
    if util < config.min_utilization_pct {
        warnings.push(format!(
            "船队利用率 {:.1}% 低于下限 {:.1}%",
            util, config.min_utilization_pct
        ));
    }
    if util > config.max_utilization_pct {
        warnings.push(format!(
            "船队利用率 {:.1}% 高于上限 {:.1}%",
            util, config.max_utilization_pct
        ));
    }
    warnings
}
