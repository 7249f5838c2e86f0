// ==========================================
// 航次排产系统 - 配置层
// ==========================================
// 职责: 引擎参数缺省值 + config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod config_reader;
pub mod engine_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use config_reader::{EngineConfigReader, StaticConfigReader};
pub use engine_config::{CanalSpec, EngineConfig, ScoreWeights, StrategyWeights};
