// ==========================================
// 航次排产系统 - 优化策略定义
// ==========================================
// 用途：
// - 分配引擎在每个承诺的候选船舶中按策略目标函数选船
// - compare 在不落库的前提下并行试算多个策略
// 平局: 取船舶ID最小者 (保证可复现)
// ==========================================

use crate::config::engine_config::StrategyWeights;
use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-9;

/// 优化策略（命名目标函数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    MaxRevenue,
    MinCost,
    Balanced,
}

impl OptimizationStrategy {
    pub const ALL: [OptimizationStrategy; 3] = [
        OptimizationStrategy::MaxRevenue,
        OptimizationStrategy::MinCost,
        OptimizationStrategy::Balanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationStrategy::MaxRevenue => "max_revenue",
            OptimizationStrategy::MinCost => "min_cost",
            OptimizationStrategy::Balanced => "balanced",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            OptimizationStrategy::MaxRevenue => "收益优先",
            OptimizationStrategy::MinCost => "成本优先",
            OptimizationStrategy::Balanced => "均衡方案",
        }
    }

    /// 从候选中选出最优者下标
    ///
    /// # 参数
    /// - candidates: 已按船舶ID升序排列
    /// - horizon_days: 计划范围天数 (利用率贡献的分母)
    pub fn select(
        &self,
        candidates: &[CandidateMetrics],
        horizon_days: f64,
        weights: &StrategyWeights,
    ) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }

        let scores: Vec<f64> = match self {
            OptimizationStrategy::MaxRevenue => candidates.iter().map(|c| c.profit).collect(),
            OptimizationStrategy::MinCost => candidates.iter().map(|c| -c.total_cost).collect(),
            OptimizationStrategy::Balanced => balanced_scores(candidates, horizon_days, weights),
        };

        let mut best = 0usize;
        for idx in 1..scores.len() {
            let better = scores[idx] > scores[best] + EPS
                || ((scores[idx] - scores[best]).abs() <= EPS
                    && candidates[idx].vessel_id < candidates[best].vessel_id);
            if better {
                best = idx;
            }
        }
        Some(best)
    }
}

impl Default for OptimizationStrategy {
    fn default() -> Self {
        OptimizationStrategy::Balanced
    }
}

impl std::fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OptimizationStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max_revenue" | "max-revenue" => Ok(OptimizationStrategy::MaxRevenue),
            "min_cost" | "min-cost" => Ok(OptimizationStrategy::MinCost),
            "balanced" => Ok(OptimizationStrategy::Balanced),
            other => Err(EngineError::Configuration(format!("未知策略类型: {}", other))),
        }
    }
}

// ==========================================
// CandidateMetrics - 候选船舶打分输入
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMetrics {
    pub vessel_id: String,
    pub profit: f64,
    pub total_cost: f64,
    /// 本次分配前已占用天数
    pub committed_days: f64,
    pub soft_violation_count: usize,
}

/// balanced = w1·利润归一化 + w2·利用率贡献 − w3·软约束惩罚
fn balanced_scores(
    candidates: &[CandidateMetrics],
    horizon_days: f64,
    weights: &StrategyWeights,
) -> Vec<f64> {
    let min_profit = candidates.iter().map(|c| c.profit).fold(f64::INFINITY, f64::min);
    let max_profit = candidates.iter().map(|c| c.profit).fold(f64::NEG_INFINITY, f64::max);
    let spread = max_profit - min_profit;

    candidates
        .iter()
        .map(|c| {
            let profit_norm = if spread > EPS {
                (c.profit - min_profit) / spread
            } else {
                1.0
            };
            // 已占用越少, 贡献越大 (摊平船队负荷)
            let utilization = if horizon_days > 0.0 {
                (1.0 - c.committed_days / horizon_days).clamp(0.0, 1.0)
            } else {
                1.0
            };
            weights.profit * profit_norm + weights.utilization * utilization
                - weights.soft_penalty * c.soft_violation_count as f64
        })
        .collect()
}
