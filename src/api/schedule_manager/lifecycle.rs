// ==========================================
// 计划管理器 - 查询与生命周期
// ==========================================
// finalize: generated → finalized (存在未处理硬冲突时拒绝)
// archive:  finalized → archived
// delete:   draft / archived → deleted
// derive:   finalized / archived → 新草稿
// ==========================================

use super::{ensure_mutable, ensure_status, ScheduleManager, ScheduleUpdate};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::schedule::{Schedule, ScheduleFilter};
use crate::domain::types::ScheduleStatus;
use tracing::info;

impl ScheduleManager {
    pub fn get_schedule(&self, schedule_id: &str) -> ApiResult<Schedule> {
        self.find(schedule_id)
    }

    pub fn list_schedules(&self, filter: &ScheduleFilter) -> ApiResult<Vec<Schedule>> {
        Ok(self.schedule_repo.list(filter)?)
    }

    pub fn list_actions(&self, schedule_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_schedule_id(schedule_id)?)
    }

    /// 修改名称/备注
    pub async fn update_schedule(
        &self,
        schedule_id: &str,
        update: ScheduleUpdate,
        actor: &str,
    ) -> ApiResult<Schedule> {
        let lock = self.schedule_lock(schedule_id)?;
        let _guard = lock.lock().await;

        let mut schedule = self.find(schedule_id)?;
        ensure_mutable(&schedule, "UPDATE")?;

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ApiError::InvalidInput("计划名称不能为空".to_string()));
            }
            schedule.name = name.trim().to_string();
        }
        if update.notes.is_some() {
            schedule.notes = update.notes.clone();
        }
        self.save(&mut schedule)?;
        self.log_action(
            schedule_id,
            ActionType::Update,
            actor,
            serde_json::to_value(&update).unwrap_or_default(),
            "修改计划信息".to_string(),
        )?;
        Ok(schedule)
    }

    /// 定稿
    ///
    /// # 错误
    /// - `ConflictsUnresolved`: 仍有未处理的 High / Critical 冲突
    /// - `InvalidStateTransition`: 非 generated 状态
    pub async fn finalize(&self, schedule_id: &str, actor: &str) -> ApiResult<Schedule> {
        let lock = self.schedule_lock(schedule_id)?;
        let _guard = lock.lock().await;

        let mut schedule = self.find(schedule_id)?;
        ensure_status(&schedule, &[ScheduleStatus::Generated], ScheduleStatus::Finalized)?;

        let open_hard: Vec<String> = schedule
            .open_hard_conflicts()
            .iter()
            .map(|c| c.conflict_id.clone())
            .collect();
        if !open_hard.is_empty() {
            return Err(ApiError::ConflictsUnresolved {
                count: open_hard.len(),
                conflict_ids: open_hard,
            });
        }

        schedule.status = ScheduleStatus::Finalized;
        self.save(&mut schedule)?;
        self.log_action(
            schedule_id,
            ActionType::Finalize,
            actor,
            serde_json::json!({ "revision": schedule.revision }),
            "计划定稿".to_string(),
        )?;
        info!(schedule_id, "计划已定稿");
        Ok(schedule)
    }

    pub async fn archive(&self, schedule_id: &str, actor: &str) -> ApiResult<Schedule> {
        self.transition(
            schedule_id,
            &[ScheduleStatus::Finalized],
            ScheduleStatus::Archived,
            ActionType::Archive,
            actor,
        )
        .await
    }

    /// 删除 (逻辑删除); 使用中的 generated / finalized 计划须先归档
    pub async fn delete_schedule(&self, schedule_id: &str, actor: &str) -> ApiResult<Schedule> {
        let deleted = self
            .transition(
                schedule_id,
                &[ScheduleStatus::Draft, ScheduleStatus::Archived],
                ScheduleStatus::Deleted,
                ActionType::Delete,
                actor,
            )
            .await?;
        // 已删除计划不再接受写入, 写锁随之释放
        self.release_lock(schedule_id)?;
        Ok(deleted)
    }

    /// 由定稿/归档计划派生新草稿 (航次与冲突一并复制)
    pub async fn derive_draft(&self, schedule_id: &str, actor: &str) -> ApiResult<Schedule> {
        let source = self.find(schedule_id)?;
        ensure_status(
            &source,
            &[ScheduleStatus::Finalized, ScheduleStatus::Archived],
            ScheduleStatus::Draft,
        )?;

        let now = chrono::Local::now().naive_local();
        let draft = Schedule {
            schedule_id: uuid::Uuid::new_v4().to_string(),
            name: format!("{} (派生)", source.name),
            status: ScheduleStatus::Draft,
            derived_from: Some(source.schedule_id.clone()),
            revision: 0,
            created_at: now,
            updated_at: now,
            ..source
        };
        self.schedule_repo.insert(&draft)?;
        self.log_action(
            &draft.schedule_id,
            ActionType::DeriveDraft,
            actor,
            serde_json::json!({ "derived_from": schedule_id }),
            format!("由计划 {} 派生草稿", schedule_id),
        )?;
        Ok(draft)
    }

    async fn transition(
        &self,
        schedule_id: &str,
        allowed: &[ScheduleStatus],
        target: ScheduleStatus,
        action: ActionType,
        actor: &str,
    ) -> ApiResult<Schedule> {
        let lock = self.schedule_lock(schedule_id)?;
        let _guard = lock.lock().await;

        let mut schedule = self.find(schedule_id)?;
        ensure_status(&schedule, allowed, target)?;
        let from = schedule.status;
        schedule.status = target;
        self.save(&mut schedule)?;
        self.log_action(
            schedule_id,
            action,
            actor,
            serde_json::json!({ "from": from.to_string(), "to": target.to_string() }),
            format!("计划状态 {} → {}", from, target),
        )?;
        Ok(schedule)
    }
}
