// ==========================================
// 航次排产系统 - 应用层
// ==========================================
// 职责: 组装数据库连接、配置与计划管理器, 供 CLI / 宿主服务使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
