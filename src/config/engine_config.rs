// ==========================================
// 航次排产系统 - 引擎配置
// ==========================================
// 职责: 收敛所有可调参数 (天气余量/运河/等待/权重/加油)
// 注入: 引擎构造时注入, 运行期间只读
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

// ==========================================
// CanalSpec - 运河通行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanalSpec {
    pub canal_id: String,
    pub transit_hours: f64, // 固定通行时间
    pub fee_usd: f64,       // 通行费
}

// ==========================================
// StrategyWeights - balanced 策略权重
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub profit: f64,       // w1: 归一化利润
    pub utilization: f64,  // w2: 利用率均衡贡献
    pub soft_penalty: f64, // w3: 软约束违规惩罚
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            profit: 0.5,
            utilization: 0.3,
            soft_penalty: 0.2,
        }
    }
}

// ==========================================
// ScoreWeights - 最优性评分权重
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub utilization: f64,
    pub margin: f64,
    pub conflict: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            utilization: 0.4,
            margin: 0.4,
            conflict: 0.2,
        }
    }
}

// ==========================================
// EngineConfig - 引擎配置全集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 天气余量系数 (>1.0), 航线未给出时使用
    pub weather_margin: f64,
    /// 港口缺省等待时间 (小时)
    pub default_port_waiting_hours: f64,
    pub canals: Vec<CanalSpec>,
    pub strategy_weights: StrategyWeights,
    pub score_weights: ScoreWeights,
    /// 加油安全余量 (吨)
    pub bunker_safety_margin_t: f64,
    /// 加油挂靠时间 (小时)
    pub bunker_call_hours: f64,
    /// 离线加油港最大绕航距离 (海里)
    pub max_bunker_detour_nm: f64,
    /// 卸港等泊最长时间 (小时)
    pub max_berth_wait_hours: f64,
    /// 无任何报价时的缺省油价 (USD/吨)
    pub default_fuel_price_usd_per_t: f64,
    /// 泊位时段搜索步长 (小时)
    pub berth_slot_step_hours: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weather_margin: 1.05,
            default_port_waiting_hours: 12.0,
            canals: vec![
                CanalSpec { canal_id: "SUEZ".to_string(), transit_hours: 14.0, fee_usd: 450_000.0 },
                CanalSpec { canal_id: "PANAMA".to_string(), transit_hours: 10.0, fee_usd: 380_000.0 },
                CanalSpec { canal_id: "KIEL".to_string(), transit_hours: 8.0, fee_usd: 25_000.0 },
            ],
            strategy_weights: StrategyWeights::default(),
            score_weights: ScoreWeights::default(),
            bunker_safety_margin_t: 150.0,
            bunker_call_hours: 6.0,
            max_bunker_detour_nm: 400.0,
            max_berth_wait_hours: 240.0,
            default_fuel_price_usd_per_t: 600.0,
            berth_slot_step_hours: 1.0,
        }
    }
}

impl EngineConfig {
    /// 校验配置合法性
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.weather_margin > 1.0) || !self.weather_margin.is_finite() {
            return Err(EngineError::Configuration(format!(
                "weather_margin 必须大于 1.0, 实际 {}",
                self.weather_margin
            )));
        }
        let w = self.strategy_weights;
        let s = self.score_weights;
        if [w.profit, w.utilization, w.soft_penalty, s.utilization, s.margin, s.conflict]
            .iter()
            .any(|x| *x < 0.0 || !x.is_finite())
        {
            return Err(EngineError::Configuration("权重不能为负数".to_string()));
        }
        if self.default_port_waiting_hours < 0.0
            || self.bunker_safety_margin_t < 0.0
            || self.bunker_call_hours < 0.0
            || self.max_berth_wait_hours < 0.0
        {
            return Err(EngineError::Configuration("时间/余量参数不能为负数".to_string()));
        }
        if !(self.berth_slot_step_hours > 0.0) {
            return Err(EngineError::Configuration("berth_slot_step_hours 必须大于 0".to_string()));
        }
        if let Some(c) = self.canals.iter().find(|c| c.transit_hours < 0.0 || c.fee_usd < 0.0) {
            return Err(EngineError::Configuration(format!("运河 {} 参数不能为负数", c.canal_id)));
        }
        Ok(())
    }

    /// 查询运河参数 (未配置时通行时间/费用按 0 处理)
    pub fn canal(&self, canal_id: &str) -> Option<&CanalSpec> {
        self.canals
            .iter()
            .find(|c| c.canal_id.eq_ignore_ascii_case(canal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.strategy_weights.profit, 0.5);
        assert_eq!(cfg.strategy_weights.utilization, 0.3);
        assert_eq!(cfg.strategy_weights.soft_penalty, 0.2);
        assert!(cfg.canal("suez").is_some());
    }

    #[test]
    fn test_weather_margin_must_exceed_one() {
        let cfg = EngineConfig {
            weather_margin: 1.0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.strategy_weights.utilization = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"weather_margin": 1.2}"#).unwrap();
        assert_eq!(cfg.weather_margin, 1.2);
        assert_eq!(cfg.default_port_waiting_hours, 12.0);
    }
}
