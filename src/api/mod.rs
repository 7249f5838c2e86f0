// ==========================================
// 航次排产系统 - API 层
// ==========================================
// 职责: 对外暴露计划管理操作, 供外部服务/CLI 调用
// ==========================================

pub mod error;
pub mod provider;
pub mod schedule_manager;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use provider::{InMemoryMasterData, JsonFileMasterData, MasterDataProvider};
pub use schedule_manager::{ScheduleManager, ScheduleUpdate};
