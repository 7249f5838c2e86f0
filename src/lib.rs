// ==========================================
// 航次排产系统 - 核心库
// ==========================================
// 职责: 年度航次计划生成、约束校验、冲突检测与多策略优化
// 技术栈: Rust + SQLite
// 系统定位: 决策支持系统 (人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 计划与操作日志
pub mod repository;

// 引擎层 - 约束/航线/成本/分配/冲突/优化
pub mod engine;

// 配置层 - 引擎参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 计划管理
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CommitmentStatus, ConflictSeverity, ConflictType, FuelType, LegKind, ScheduleStatus,
    VesselStatus,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Berth, CargoCommitment, Conflict, MasterDataSnapshot, Port, Route,
    Schedule, ScheduleConfig, Vessel, Voyage,
};

// 引擎
pub use engine::{
    AllocationEngine, CancelToken, ConflictDetector, ConstraintValidator, CostEstimator,
    OptimizationStrategy, Optimizer, PortNetwork,
};

// API
pub use api::{ApiError, ScheduleManager};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "航次排产系统";
