// ==========================================
// 航次排产系统 - 船舶主数据
// ==========================================
// 红线: 排产运行期间只读,仅外部 CRUD 可修改
// ==========================================

use crate::domain::types::{FuelType, VesselStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ConsumptionProfile - 油耗曲线
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionProfile {
    pub fuel_type: FuelType,     // 主机燃油
    pub laden_t_per_day: f64,    // 重载日耗 (吨/天)
    pub ballast_t_per_day: f64,  // 空放日耗 (吨/天)
    #[serde(default)]
    pub port_t_per_day: f64,     // 在港日耗 (吨/天)
}

impl ConsumptionProfile {
    /// 按航段是否载货取日耗
    pub fn sea_rate(&self, laden: bool) -> f64 {
        if laden {
            self.laden_t_per_day
        } else {
            self.ballast_t_per_day
        }
    }
}

// ==========================================
// Vessel - 船舶
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub vessel_id: String,              // 船舶ID
    pub name: String,                   // 船名
    pub dwt_t: f64,                     // 载重吨
    pub service_speed_kn: f64,          // 服务航速 (节)
    pub consumption: ConsumptionProfile,
    pub length_m: f64,                  // 船长
    pub beam_m: f64,                    // 船宽
    pub draft_m: f64,                   // 满载吃水
    pub daily_hire_usd: f64,            // 日租金
    pub status: VesselStatus,
    pub open_port_id: String,           // 最后已知位置/空闲港口
    pub open_from: NaiveDateTime,       // 最早可用时间
    #[serde(default)]
    pub cargo_capabilities: Vec<String>, // 可载货种 (空 = 不限)
    #[serde(default)]
    pub fuel_capacity_t: f64,           // 油舱容量
    #[serde(default)]
    pub fuel_on_board_t: f64,           // 当前存油
}

impl Vessel {
    pub fn is_active(&self) -> bool {
        self.status == VesselStatus::Active
    }

    /// 判断是否可载运指定货种
    pub fn can_carry(&self, commodity: &str) -> bool {
        self.cargo_capabilities.is_empty()
            || self
                .cargo_capabilities
                .iter()
                .any(|c| c.eq_ignore_ascii_case(commodity))
    }

    /// 航行小时数 (不含天气余量)
    pub fn sailing_hours(&self, distance_nm: f64) -> f64 {
        if self.service_speed_kn <= 0.0 {
            return f64::INFINITY;
        }
        distance_nm / self.service_speed_kn
    }
}
