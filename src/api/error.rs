// ==========================================
// 航次排产系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 转换 Repository / Engine 错误为用户可读的错误消息
// 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 生命周期错误
    // ==========================================
    /// 定稿时仍有未处理的硬冲突
    #[error("存在未处理的硬冲突 {count} 个: {conflict_ids:?}")]
    ConflictsUnresolved {
        count: usize,
        conflict_ids: Vec<String>,
    },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 请求错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigurationError(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    #[error("生成请求已取消: {0}")]
    Cancelled(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                schedule_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "计划{}已被其他操作修改（期望revision={}，实际revision={}）",
                schedule_id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}解析失败: {}", field, message))
            }
            RepositoryError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Configuration(msg) => ApiError::ConfigurationError(msg),
            EngineError::DataIntegrity { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            EngineError::Cancelled { processed } => {
                ApiError::Cancelled(format!("已处理承诺 {} 个", processed))
            }
            EngineError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// API层Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let err: ApiError = RepositoryError::OptimisticLockFailure {
            schedule_id: "S1".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, ApiError::OptimisticLockFailure(_)));
        assert!(err.to_string().contains("S1"));

        let err: ApiError = RepositoryError::NotFound {
            entity: "Schedule".to_string(),
            id: "S9".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: ApiError = EngineError::Configuration("未知策略类型: x".to_string()).into();
        assert!(matches!(err, ApiError::ConfigurationError(_)));

        let err: ApiError = EngineError::Cancelled { processed: 3 }.into();
        assert!(matches!(err, ApiError::Cancelled(_)));
    }
}
