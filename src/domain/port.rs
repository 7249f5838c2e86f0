// ==========================================
// 航次排产系统 - 港口/泊位/航线主数据
// ==========================================
// 红线: 排产运行期间只读
// ==========================================

use crate::domain::types::{ConstraintSeverity, FuelType};
use crate::domain::window::TimeWindow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 地球平均半径 (海里)
const EARTH_RADIUS_NM: f64 = 3440.065;

// ==========================================
// GeoPoint - 地理坐标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// 大圆距离 (haversine, 海里)
    pub fn great_circle_nm(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_NM * a.sqrt().min(1.0).asin()
    }
}

// ==========================================
// CargoHandlingRate - 装卸效率
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CargoHandlingRate {
    pub load_t_per_day: f64,
    pub discharge_t_per_day: f64,
}

// ==========================================
// Port - 港口
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub port_id: String,
    pub name: String,
    pub position: GeoPoint,
    pub default_rate: CargoHandlingRate,           // 默认装卸效率
    #[serde(default)]
    pub cargo_rates: HashMap<String, CargoHandlingRate>, // 按货种装卸效率
    #[serde(default)]
    pub waiting_hours: Option<f64>,                // 典型等待时间 (缺省取配置)
    #[serde(default = "default_congestion")]
    pub congestion_factor: f64,                    // 拥堵系数 (≥1.0)
    #[serde(default)]
    pub port_fee_usd: f64,                         // 港口使费 (每挂靠)
    #[serde(default)]
    pub max_draft_m: Option<f64>,                  // 航道吃水限制
    #[serde(default)]
    pub bunker_prices: HashMap<FuelType, f64>,     // 加油价格 (USD/吨), 空表示不供油
}

fn default_congestion() -> f64 {
    1.0
}

impl Port {
    /// 取指定货种的装卸效率
    pub fn rate_for(&self, commodity: &str) -> CargoHandlingRate {
        self.cargo_rates
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(commodity))
            .map(|(_, r)| *r)
            .unwrap_or(self.default_rate)
    }

    /// 等待时间 (已乘拥堵系数)
    pub fn effective_waiting_hours(&self, default_hours: f64) -> f64 {
        self.waiting_hours.unwrap_or(default_hours) * self.congestion_factor.max(1.0)
    }

    pub fn bunker_price(&self, fuel: FuelType) -> Option<f64> {
        self.bunker_prices.get(&fuel).copied().filter(|p| *p > 0.0)
    }
}

// ==========================================
// BerthWindow - 泊位日历占用 (维修/既有预订)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BerthWindow {
    pub window: TimeWindow,
    #[serde(default)]
    pub reason: String,
}

// ==========================================
// BerthRule - 泊位约束规则 (标签联合)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum BerthRule {
    MaxLength { meters: f64 },
    MaxBeam { meters: f64 },
    MaxDraft { meters: f64 },
    Blackout { window: TimeWindow },
    CargoCompatibility { allowed: Vec<String> },
    MinTurnaroundGap { hours: f64 },
}

// ==========================================
// BerthConstraint - 附加在泊位上的约束
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BerthConstraint {
    pub constraint_id: String,
    pub severity: ConstraintSeverity,
    pub rule: BerthRule,
}

// ==========================================
// Berth - 泊位
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Berth {
    pub berth_id: String,
    pub port_id: String,
    pub max_length_m: f64,
    pub max_beam_m: f64,
    pub max_draft_m: f64,
    #[serde(default)]
    pub cargo_types: Vec<String>,        // 可作业货种 (空 = 不限)
    #[serde(default = "default_capacity")]
    pub capacity: u32,                   // 同时作业船数
    #[serde(default)]
    pub calendar: Vec<BerthWindow>,      // 既有占用
    #[serde(default)]
    pub constraints: Vec<BerthConstraint>,
}

fn default_capacity() -> u32 {
    1
}

impl Berth {
    pub fn handles(&self, commodity: &str) -> bool {
        self.cargo_types.is_empty()
            || self.cargo_types.iter().any(|c| c.eq_ignore_ascii_case(commodity))
    }
}

// ==========================================
// Route - 有向航线边
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub from_port_id: String,
    pub to_port_id: String,
    pub distance_nm: f64,
    #[serde(default)]
    pub typical_duration_hours: Option<f64>,
    #[serde(default)]
    pub canal_id: Option<String>,          // 途经运河
    #[serde(default)]
    pub weather_factor: Option<f64>,       // 天气余量系数 (缺省取配置)
    #[serde(default)]
    pub waypoints: Vec<GeoPoint>,
}

impl Route {
    /// 天气修正系数 (至少 1.0)
    pub fn weather_multiplier(&self, default_margin: f64) -> f64 {
        self.weather_factor.unwrap_or(default_margin).max(1.0)
    }

    /// 加权距离 = 距离 × 天气系数 (A* 边权)
    pub fn weighted_distance(&self, default_margin: f64) -> f64 {
        self.distance_nm * self.weather_multiplier(default_margin)
    }
}
