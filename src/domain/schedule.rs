// ==========================================
// 航次排产系统 - 年度排产计划领域模型
// ==========================================
// 生命周期: draft → generated → finalized → archived (+ deleted)
// 红线: finalized 不可变, 修改须派生新草稿
// ==========================================

use crate::domain::types::{
    ConflictSeverity, ConflictType, ResolutionStatus, ScheduleStatus,
};
use crate::domain::voyage::Voyage;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ScheduleConfig - 生成请求参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub module_scope: String,            // 业务范围标签
    pub date_range_start: NaiveDate,
    pub date_range_end: NaiveDate,
    pub strategy: String,                // max_revenue / min_cost / balanced
    #[serde(default)]
    pub min_utilization_pct: f64,
    #[serde(default = "default_max_utilization")]
    pub max_utilization_pct: f64,
    #[serde(default)]
    pub bunker_optimization_enabled: bool,
}

fn default_max_utilization() -> f64 {
    100.0
}

impl ScheduleConfig {
    /// 日期范围天数 (含首尾)
    pub fn range_days(&self) -> i64 {
        (self.date_range_end - self.date_range_start).num_days() + 1
    }
}

// ==========================================
// AllocationFailure - 单承诺失败记录
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    InfeasibleAssignment, // 无船满足硬约束
    DataIntegrityError,   // 引用的港口/泊位/航线不存在
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InfeasibleAssignment => write!(f, "INFEASIBLE_ASSIGNMENT"),
            FailureKind::DataIntegrityError => write!(f, "DATA_INTEGRITY_ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationFailure {
    pub commitment_id: String,
    pub kind: FailureKind,
    pub reasons: Vec<String>,
}

// ==========================================
// Conflict - 冲突
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: String,
    pub severity: ConflictSeverity,
    pub conflict_type: ConflictType,
    pub resource_ids: Vec<String>,      // 船舶/泊位
    pub voyage_ids: Vec<String>,
    pub description: String,
    pub status: ResolutionStatus,
    #[serde(default)]
    pub resolution_note: Option<String>,
}

impl Conflict {
    pub fn is_open(&self) -> bool {
        self.status == ResolutionStatus::Open
    }

    /// 未处理的硬冲突
    pub fn is_open_hard(&self) -> bool {
        self.is_open() && self.severity.is_hard()
    }

    /// 冲突身份键 (重新检测后用于保留人工处理结果)
    pub fn identity_key(&self) -> String {
        let mut resources = self.resource_ids.clone();
        resources.sort();
        let mut voyages = self.voyage_ids.clone();
        voyages.sort();
        format!(
            "{}|{}|{}",
            self.conflict_type,
            resources.join(","),
            voyages.join(",")
        )
    }

    pub fn resolve(&mut self, note: Option<String>) {
        self.status = ResolutionStatus::Resolved;
        self.resolution_note = note;
    }
}

// ==========================================
// ConflictResolution - 冲突处理方式
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConflictResolution {
    /// 人工接受
    Accept { note: String },
    /// 在受载期余量内平移航次
    ShiftVoyage { voyage_id: String, hours: f64 },
    /// 改派船舶
    ReassignVessel { voyage_id: String, vessel_id: String },
}

// ==========================================
// ScheduleKpi - 计划KPI
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub voyage_count: usize,
    pub unallocated_count: usize,
    pub fleet_utilization_pct: f64,
    pub average_tce: f64,
    pub soft_violation_count: usize,
    pub open_conflict_count: usize,
    pub optimality_score: f64, // 0..=100
}

// ==========================================
// Schedule - 年度排产计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub name: String,
    pub year: i32,
    pub status: ScheduleStatus,
    pub strategy: String,
    pub config: ScheduleConfig,
    pub voyages: Vec<Voyage>,
    pub conflicts: Vec<Conflict>,
    pub kpi: ScheduleKpi,
    #[serde(default)]
    pub failures: Vec<AllocationFailure>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub engine_config_json: Option<String>, // 生成时的配置快照
    #[serde(default)]
    pub derived_from: Option<String>,
    pub revision: i32,                      // 乐观锁
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Schedule {
    pub fn find_voyage(&self, voyage_id: &str) -> Option<&Voyage> {
        self.voyages.iter().find(|v| v.voyage_id == voyage_id)
    }

    pub fn find_voyage_mut(&mut self, voyage_id: &str) -> Option<&mut Voyage> {
        self.voyages.iter_mut().find(|v| v.voyage_id == voyage_id)
    }

    pub fn open_hard_conflicts(&self) -> Vec<&Conflict> {
        self.conflicts.iter().filter(|c| c.is_open_hard()).collect()
    }

    pub fn open_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| c.is_open())
    }
}

// ==========================================
// ScheduleFilter - 列表查询条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleFilter {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub status: Option<ScheduleStatus>,
}
