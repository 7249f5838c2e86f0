// ==========================================
// 航次排产系统 - 航次/航段领域模型
// ==========================================
// 航次 = 一条船履行一个(或多个)货载承诺的有序航段序列
// ==========================================

use crate::domain::types::LegKind;
use crate::domain::violation::Violation;
use crate::domain::window::{duration_to_hours, TimeWindow};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// VoyageLeg - 航段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageLeg {
    pub kind: LegKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub origin: String,            // 起点 (港口ID)
    pub destination: String,       // 终点 (港口ID)
    #[serde(default)]
    pub cargo_t: f64,              // 载货量
    #[serde(default)]
    pub berth_id: Option<String>,  // 占用泊位
    #[serde(default)]
    pub canal_id: Option<String>,  // 通行运河
}

impl VoyageLeg {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    pub fn duration_hours(&self) -> f64 {
        duration_to_hours(self.end - self.start)
    }
}

// ==========================================
// VoyageCostEstimate - 航次成本估算
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoyageCostEstimate {
    pub ballast_sea_days: f64,
    pub laden_sea_days: f64,
    pub sea_days: f64,       // 海上天数 (空放 + 重载, 不含运河)
    pub canal_days: f64,
    pub port_days: f64,      // 装卸 + 等待额度
    pub waiting_days: f64,   // 额外等待 (等装期/等泊位)
    pub bunker_days: f64,    // 加油挂靠 (含绕航)
    pub total_days: f64,
    pub fuel_consumed_t: f64,
    pub bunker_cost: f64,
    pub hire_cost: f64,
    pub port_cost: f64,      // 港口使费 + 运河费
    pub total_cost: f64,
    pub revenue: f64,
    pub tce: f64,            // 期租等价 (USD/天)
}

impl VoyageCostEstimate {
    pub fn profit(&self) -> f64 {
        self.revenue - self.total_cost
    }

    /// 航次可变成本 (不含租金)
    pub fn voyage_variable_cost(&self) -> f64 {
        self.bunker_cost + self.port_cost
    }
}

// ==========================================
// Voyage - 航次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voyage {
    pub voyage_id: String,
    pub vessel_id: String,
    pub commitment_ids: Vec<String>,
    pub legs: Vec<VoyageLeg>,
    #[serde(default)]
    pub load_berth_id: Option<String>,
    #[serde(default)]
    pub discharge_berth_id: Option<String>,
    pub cost: VoyageCostEstimate,
    #[serde(default)]
    pub soft_violations: Vec<Violation>,
}

impl Voyage {
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.legs.iter().map(|l| l.start).min()
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.legs.iter().map(|l| l.end).max()
    }

    pub fn window(&self) -> Option<TimeWindow> {
        Some(TimeWindow::new(self.start()?, self.end()?))
    }

    pub fn duration_days(&self) -> f64 {
        self.window().map(|w| w.duration_hours() / 24.0).unwrap_or(0.0)
    }

    pub fn total_cost(&self) -> f64 {
        self.cost.total_cost
    }

    pub fn total_revenue(&self) -> f64 {
        self.cost.revenue
    }

    /// TCE = (收入 - 航次可变成本) / 航次天数
    pub fn tce(&self) -> f64 {
        let days = self.duration_days();
        if days <= 0.0 {
            return 0.0;
        }
        (self.cost.revenue - self.cost.voyage_variable_cost()) / days
    }

    /// 首个装货航段
    pub fn loading_leg(&self) -> Option<&VoyageLeg> {
        self.legs.iter().find(|l| l.kind == LegKind::Loading)
    }

    /// 最后一个卸货航段
    pub fn discharge_leg(&self) -> Option<&VoyageLeg> {
        self.legs.iter().rev().find(|l| l.kind == LegKind::Discharge)
    }

    /// 装货量 (首个装货航段)
    pub fn cargo_t(&self) -> f64 {
        self.loading_leg().map(|l| l.cargo_t).unwrap_or(0.0)
    }

    /// 整体平移所有航段
    pub fn shift(&mut self, delta: Duration) {
        for leg in &mut self.legs {
            leg.start += delta;
            leg.end += delta;
        }
    }
}
