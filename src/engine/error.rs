// ==========================================
// 航次排产系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 单承诺失败 (不可行/数据缺失) 不走 Err, 记录在结果的 failures 中
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 整体失败: 策略名/日期范围/空船队等, 在任何分配前中止
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 引用的主数据不存在
    #[error("数据完整性错误: {entity}(id={id})不存在")]
    DataIntegrity { entity: String, id: String },

    #[error("生成请求已取消 (已处理承诺 {processed} 个)")]
    Cancelled { processed: usize },

    #[error("内部错误: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn missing(entity: &str, id: &str) -> Self {
        EngineError::DataIntegrity {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
