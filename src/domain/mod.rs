// ==========================================
// 航次排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod cargo;
pub mod port;
pub mod schedule;
pub mod snapshot;
pub mod types;
pub mod vessel;
pub mod violation;
pub mod voyage;
pub mod window;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use cargo::CargoCommitment;
pub use port::{
    Berth, BerthConstraint, BerthRule, BerthWindow, CargoHandlingRate, GeoPoint, Port, Route,
};
pub use schedule::{
    AllocationFailure, Conflict, ConflictResolution, FailureKind, Schedule, ScheduleConfig,
    ScheduleFilter, ScheduleKpi,
};
pub use snapshot::MasterDataSnapshot;
pub use types::{
    CommitmentStatus, ConflictSeverity, ConflictType, ConstraintCategory, ConstraintSeverity,
    FuelType, LegKind, ResolutionStatus, ScheduleStatus, VesselStatus,
};
pub use vessel::{ConsumptionProfile, Vessel};
pub use violation::{ValidationResult, Violation};
pub use voyage::{Voyage, VoyageCostEstimate, VoyageLeg};
pub use window::{hours_to_duration, TimeWindow};
