// ==========================================
// 航次排产系统 - 引擎层
// ==========================================
// 组件 (由底向上):
// 约束校验 → 航线搜索/加油选港/成本估算 → 分配 → 冲突检测 → KPI → 优化器
// 红线: 引擎不拼 SQL, 不修改主数据; 所有不可行判定必须输出原因
// ==========================================

pub mod allocation;
pub mod bunker;
pub mod cancel;
pub mod conflict_detector;
pub mod constraint_validator;
pub mod cost_estimator;
pub mod error;
pub mod fleet_state;
pub mod kpi;
pub mod optimizer;
pub mod route_search;
pub mod strategy;

// 重导出核心引擎
pub use allocation::{AllocationEngine, AllocationOutcome};
pub use bunker::{select_bunker_ports, BunkerRequest, BunkerStop};
pub use cancel::CancelToken;
pub use conflict_detector::ConflictDetector;
pub use constraint_validator::ConstraintValidator;
pub use cost_estimator::{CostEstimator, VoyageCostInput};
pub use error::{EngineError, EngineResult};
pub use fleet_state::{FleetState, VesselPosition};
pub use kpi::{compute_kpi, utilization_warnings, KpiInput};
pub use optimizer::Optimizer;
pub use route_search::{ComposedRoute, PortNetwork, RouteCostModel};
pub use strategy::{CandidateMetrics, OptimizationStrategy};
