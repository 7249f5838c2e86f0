// ==========================================
// 航次排产系统 - 计划管理器 (对外 API)
// ==========================================
// 职责: 计划生命周期 (draft → generated → finalized → archived / deleted)
//       生成与多策略比较、冲突处理、定稿校验、审计日志
// 并发: 每个计划一把异步互斥锁串行化写入; 仓储 revision 乐观锁兜底
// 红线: finalized / archived / deleted 计划不可修改
// ==========================================

mod generation;
mod lifecycle;
mod resolution;


use crate::api::error::{ApiError, ApiResult};
use crate::api::provider::MasterDataProvider;
use crate::config::config_reader::EngineConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::schedule::Schedule;
use crate::domain::snapshot::MasterDataSnapshot;
use crate::domain::types::ScheduleStatus;
use crate::engine::error::EngineError;
use crate::engine::optimizer::Optimizer;
use crate::repository::{ActionLogRepository, ScheduleRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ScheduleUpdate - 可修改的元数据
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ==========================================
// ScheduleManager - 计划管理器
// ==========================================
pub struct ScheduleManager {
    schedule_repo: Arc<ScheduleRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    master_data: Arc<dyn MasterDataProvider>,
    config_reader: Arc<dyn EngineConfigReader>,
    /// 计划ID → 写锁
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScheduleManager {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        master_data: Arc<dyn MasterDataProvider>,
        config_reader: Arc<dyn EngineConfigReader>,
    ) -> Self {
        Self {
            schedule_repo: Arc::new(ScheduleRepository::new(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
            master_data,
            config_reader,
            locks: Mutex::new(HashMap::new()),
        }
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 获取计划写锁 (同一计划的修改串行执行)
    fn schedule_lock(&self, schedule_id: &str) -> ApiResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| ApiError::InternalError(format!("计划锁表获取失败: {}", e)))?;
        Ok(locks
            .entry(schedule_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    fn release_lock(&self, schedule_id: &str) -> ApiResult<()> {
        self.locks
            .lock()
            .map_err(|e| ApiError::InternalError(format!("计划锁表获取失败: {}", e)))?
            .remove(schedule_id);
        Ok(())
    }

    async fn load_snapshot(&self) -> ApiResult<MasterDataSnapshot> {
        Ok(self.master_data.load_snapshot().await?)
    }

    /// 读取配置并构造优化器; 配置非法转为 ConfigurationError
    async fn optimizer(&self) -> ApiResult<Optimizer> {
        let config = self
            .config_reader
            .load_engine_config()
            .await
            .map_err(|e| match e.downcast::<EngineError>() {
                Ok(engine_err) => ApiError::from(engine_err),
                Err(other) => ApiError::Other(other),
            })?;
        Ok(Optimizer::new(config)?)
    }

    fn find(&self, schedule_id: &str) -> ApiResult<Schedule> {
        self.schedule_repo
            .find_by_id(schedule_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Schedule(id={})不存在", schedule_id)))
    }

    /// 写回计划并刷新 revision
    fn save(&self, schedule: &mut Schedule) -> ApiResult<()> {
        schedule.updated_at = chrono::Local::now().naive_local();
        schedule.revision = self.schedule_repo.update(schedule)?;
        Ok(())
    }

    fn log_action(
        &self,
        schedule_id: &str,
        action: ActionType,
        actor: &str,
        payload: Value,
        detail: String,
    ) -> ApiResult<()> {
        let log = ActionLog {
            action_id: uuid::Uuid::new_v4().to_string(),
            schedule_id: Some(schedule_id.to_string()),
            action_type: action.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: Some(payload),
            detail: Some(detail),
        };
        self.action_log_repo.insert(&log)?;
        Ok(())
    }
}

/// 校验计划可修改
fn ensure_mutable(schedule: &Schedule, operation: &str) -> ApiResult<()> {
    if schedule.status.is_mutable() {
        Ok(())
    } else {
        Err(ApiError::InvalidStateTransition {
            from: schedule.status.to_string(),
            to: operation.to_string(),
        })
    }
}

/// 校验状态转换来源
fn ensure_status(schedule: &Schedule, allowed: &[ScheduleStatus], target: ScheduleStatus) -> ApiResult<()> {
    if allowed.contains(&schedule.status) {
        Ok(())
    } else {
        Err(ApiError::InvalidStateTransition {
            from: schedule.status.to_string(),
            to: target.to_string(),
        })
    }
}
