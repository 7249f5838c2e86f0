// ==========================================
// 航次排产系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 配置协作方接口 (优化权重/天气余量/运河参数)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::engine_config::EngineConfig;
use async_trait::async_trait;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager (config_kv 表), StaticConfigReader (固定配置)
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 读取当前生效的引擎配置 (缺省值 + 覆写)
    async fn load_engine_config(&self) -> anyhow::Result<EngineConfig>;
}

/// 固定配置 (测试/命令行场景)
#[derive(Debug, Clone, Default)]
pub struct StaticConfigReader {
    config: EngineConfig,
}

impl StaticConfigReader {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineConfigReader for StaticConfigReader {
    async fn load_engine_config(&self) -> anyhow::Result<EngineConfig> {
        Ok(self.config.clone())
    }
}
