// ==========================================
// 航次排产系统 - 领域类型定义
// ==========================================
// 职责: 各实体共用的枚举 (航段类型/冲突等级/约束分类/生命周期状态)
// 红线: 字符串比较一律收敛为枚举,穷举匹配
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 船舶运营状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VesselStatus {
    Active,   // 在营
    Inactive, // 停航/坞修
}

impl fmt::Display for VesselStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VesselStatus::Active => write!(f, "ACTIVE"),
            VesselStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

// ==========================================
// 燃油类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Vlsfo, // 低硫燃料油
    Hsfo,  // 高硫燃料油 (需脱硫塔)
    Mgo,   // 船用轻柴油
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelType::Vlsfo => write!(f, "VLSFO"),
            FuelType::Hsfo => write!(f, "HSFO"),
            FuelType::Mgo => write!(f, "MGO"),
        }
    }
}

// ==========================================
// 货载承诺状态
// ==========================================
// 分配引擎只修改该字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentStatus {
    Pending,   // 待分配
    Assigned,  // 已分配
    Completed, // 已完成
    Cancelled, // 已取消
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitmentStatus::Pending => write!(f, "PENDING"),
            CommitmentStatus::Assigned => write!(f, "ASSIGNED"),
            CommitmentStatus::Completed => write!(f, "COMPLETED"),
            CommitmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==========================================
// 航段类型 (Voyage Leg Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegKind {
    Ballast,   // 空放
    Loading,   // 装货
    Transit,   // 重载航行
    Discharge, // 卸货
    Canal,     // 运河通行
    Bunker,    // 加油
    Waiting,   // 等待 (等装期/等泊位)
}

impl LegKind {
    /// 是否占用泊位
    pub fn uses_berth(&self) -> bool {
        matches!(self, LegKind::Loading | LegKind::Discharge)
    }
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LegKind::Ballast => "BALLAST",
            LegKind::Loading => "LOADING",
            LegKind::Transit => "TRANSIT",
            LegKind::Discharge => "DISCHARGE",
            LegKind::Canal => "CANAL",
            LegKind::Bunker => "BUNKER",
            LegKind::Waiting => "WAITING",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// 排产计划生命周期状态
// ==========================================
// draft → generated → finalized → archived
// deleted 仅允许从 draft / archived 进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Draft,     // 草稿
    Generated, // 已生成 (优化器产出)
    Finalized, // 已定稿 (锁定)
    Archived,  // 已归档 (只读)
    Deleted,   // 已删除
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ScheduleStatus {
    /// 从字符串解析状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(ScheduleStatus::Draft),
            "GENERATED" => Some(ScheduleStatus::Generated),
            "FINALIZED" => Some(ScheduleStatus::Finalized),
            "ARCHIVED" => Some(ScheduleStatus::Archived),
            "DELETED" => Some(ScheduleStatus::Deleted),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Draft => "DRAFT",
            ScheduleStatus::Generated => "GENERATED",
            ScheduleStatus::Finalized => "FINALIZED",
            ScheduleStatus::Archived => "ARCHIVED",
            ScheduleStatus::Deleted => "DELETED",
        }
    }

    /// 是否允许修改航次/冲突
    pub fn is_mutable(&self) -> bool {
        matches!(self, ScheduleStatus::Draft | ScheduleStatus::Generated)
    }
}

// ==========================================
// 冲突等级
// ==========================================
// 顺序有意义: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    /// High / Critical 视为硬冲突 (阻断定稿)
    pub fn is_hard(&self) -> bool {
        *self >= ConflictSeverity::High
    }

    /// 计算优化评分时的惩罚权重
    pub fn penalty_weight(&self) -> f64 {
        match self {
            ConflictSeverity::Low => 0.25,
            ConflictSeverity::Medium => 0.5,
            ConflictSeverity::High => 1.0,
            ConflictSeverity::Critical => 2.0,
        }
    }

    /// 按重叠时长分级
    pub fn from_overlap_hours(hours: f64) -> Self {
        if hours < 6.0 {
            ConflictSeverity::Low
        } else if hours < 24.0 {
            ConflictSeverity::Medium
        } else if hours < 72.0 {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Critical
        }
    }
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictSeverity::Low => write!(f, "LOW"),
            ConflictSeverity::Medium => write!(f, "MEDIUM"),
            ConflictSeverity::High => write!(f, "HIGH"),
            ConflictSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 冲突类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    TimingOverlap,      // 同船时间重叠
    GeometricViolation, // 船型尺度超限
    LaycanMiss,         // 错过受载期
    CapacityOverrun,    // 泊位/载重超限
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::TimingOverlap => write!(f, "timing-overlap"),
            ConflictType::GeometricViolation => write!(f, "geometric-violation"),
            ConflictType::LaycanMiss => write!(f, "laycan-miss"),
            ConflictType::CapacityOverrun => write!(f, "capacity-overrun"),
        }
    }
}

// ==========================================
// 冲突处理状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStatus {
    Open,
    Resolved,
}

// ==========================================
// 约束分类 / 约束强度
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintCategory {
    Geometric,     // 几何 (船长/船宽/吃水)
    Temporal,      // 时间 (占用/封港/间隔)
    Technological, // 工艺 (货种兼容)
}

impl fmt::Display for ConstraintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintCategory::Geometric => write!(f, "GEOMETRIC"),
            ConstraintCategory::Temporal => write!(f, "TEMPORAL"),
            ConstraintCategory::Technological => write!(f, "TECHNOLOGICAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintSeverity {
    Hard, // 违反即不可行
    Soft, // 违反仅扣分
}

impl fmt::Display for ConstraintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSeverity::Hard => write!(f, "HARD"),
            ConstraintSeverity::Soft => write!(f, "SOFT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_severity_scale() {
        assert_eq!(ConflictSeverity::from_overlap_hours(1.0), ConflictSeverity::Low);
        assert_eq!(ConflictSeverity::from_overlap_hours(12.0), ConflictSeverity::Medium);
        assert_eq!(ConflictSeverity::from_overlap_hours(48.0), ConflictSeverity::High);
        assert_eq!(ConflictSeverity::from_overlap_hours(100.0), ConflictSeverity::Critical);
        assert!(ConflictSeverity::High.is_hard());
        assert!(!ConflictSeverity::Medium.is_hard());
    }

    #[test]
    fn test_schedule_status_parse() {
        assert_eq!(ScheduleStatus::parse("finalized"), Some(ScheduleStatus::Finalized));
        assert_eq!(ScheduleStatus::parse("bogus"), None);
        assert!(ScheduleStatus::Generated.is_mutable());
        assert!(!ScheduleStatus::Finalized.is_mutable());
    }
}
