// ==========================================
// 航次排产系统 - 货载承诺
// ==========================================
// 由外部录入; 分配引擎只读,仅修改 status
// ==========================================

use crate::domain::types::CommitmentStatus;
use crate::domain::window::TimeWindow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoCommitment {
    pub commitment_id: String,
    pub commodity: String,                   // 货种
    pub quantity_t: f64,                     // 数量 (公吨)
    pub load_port_id: String,
    pub discharge_port_id: String,
    pub laycan: TimeWindow,                  // 受载期
    #[serde(default)]
    pub freight_rate_usd_per_t: Option<f64>, // 运价
    #[serde(default)]
    pub delivery_deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub late_penalty_usd_per_day: Option<f64>, // 逾期交付运费扣减
    pub status: CommitmentStatus,
}

impl CargoCommitment {
    pub fn is_pending(&self) -> bool {
        self.status == CommitmentStatus::Pending
    }

    /// 毛运费收入
    pub fn gross_freight(&self) -> f64 {
        self.quantity_t * self.freight_rate_usd_per_t.unwrap_or(0.0)
    }

    /// 按卸毕时间计算的逾期扣减
    pub fn lateness_penalty(&self, discharge_end: NaiveDateTime) -> f64 {
        match (self.delivery_deadline, self.late_penalty_usd_per_day) {
            (Some(deadline), Some(per_day)) if discharge_end > deadline => {
                let late_days = (discharge_end - deadline).num_seconds() as f64 / 86_400.0;
                late_days * per_day
            }
            _ => 0.0,
        }
    }

    /// 是否错过交付期限
    pub fn misses_deadline(&self, discharge_end: NaiveDateTime) -> bool {
        self.delivery_deadline
            .map(|deadline| discharge_end > deadline)
            .unwrap_or(false)
    }
}
