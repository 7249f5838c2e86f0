// ==========================================
// 计划管理器 - 生成与策略比较
// ==========================================

use super::{ensure_status, ScheduleManager};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionType;
use crate::domain::schedule::{Schedule, ScheduleConfig, ScheduleKpi};
use crate::domain::types::ScheduleStatus;
use crate::engine::cancel::CancelToken;
use crate::engine::strategy::OptimizationStrategy;
use chrono::Datelike;
use tracing::{info, instrument};

impl ScheduleManager {
    /// 新建空草稿 (稍后通过 generate_draft 生成航次)
    pub async fn create_draft(&self, request: ScheduleConfig, actor: &str) -> ApiResult<Schedule> {
        let strategy: OptimizationStrategy = request.strategy.parse()?;
        if request.date_range_end < request.date_range_start {
            return Err(ApiError::ConfigurationError(format!(
                "日期范围非法: {} > {}",
                request.date_range_start, request.date_range_end
            )));
        }

        let year = request.date_range_start.year();
        let now = chrono::Local::now().naive_local();
        let schedule = Schedule {
            schedule_id: uuid::Uuid::new_v4().to_string(),
            name: request
                .name
                .clone()
                .unwrap_or_else(|| format!("{}年度航次计划-{}", year, strategy.title_cn())),
            year,
            status: ScheduleStatus::Draft,
            strategy: strategy.as_str().to_string(),
            config: request,
            voyages: Vec::new(),
            conflicts: Vec::new(),
            kpi: ScheduleKpi::default(),
            failures: Vec::new(),
            warnings: Vec::new(),
            notes: None,
            engine_config_json: None,
            derived_from: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        self.schedule_repo.insert(&schedule)?;
        self.log_action(
            &schedule.schedule_id,
            ActionType::CreateDraft,
            actor,
            serde_json::json!({ "name": schedule.name, "strategy": schedule.strategy }),
            "创建计划草稿".to_string(),
        )?;
        Ok(schedule)
    }

    /// 按请求生成并保存新计划 (状态 generated)
    #[instrument(skip_all, fields(strategy = %request.strategy))]
    pub async fn generate(
        &self,
        request: ScheduleConfig,
        actor: &str,
        cancel: CancelToken,
    ) -> ApiResult<Schedule> {
        let schedule = self.run_generate(request, cancel).await?;
        self.schedule_repo.insert(&schedule)?;
        self.log_generate(&schedule, actor)?;
        Ok(schedule)
    }

    /// 为已有草稿生成航次 (计划ID不变)
    pub async fn generate_draft(
        &self,
        schedule_id: &str,
        actor: &str,
        cancel: CancelToken,
    ) -> ApiResult<Schedule> {
        let lock = self.schedule_lock(schedule_id)?;
        let _guard = lock.lock().await;

        let draft = self.find(schedule_id)?;
        ensure_status(&draft, &[ScheduleStatus::Draft], ScheduleStatus::Generated)?;

        let generated = self.run_generate(draft.config.clone(), cancel).await?;
        let mut schedule = Schedule {
            schedule_id: draft.schedule_id,
            name: draft.name,
            notes: draft.notes,
            derived_from: draft.derived_from,
            revision: draft.revision,
            created_at: draft.created_at,
            ..generated
        };
        self.save(&mut schedule)?;
        self.log_generate(&schedule, actor)?;
        Ok(schedule)
    }

    /// 多策略比较; 结果不落库
    pub async fn compare_strategies(
        &self,
        request: ScheduleConfig,
        strategies: Vec<OptimizationStrategy>,
        cancel: CancelToken,
    ) -> ApiResult<Vec<Schedule>> {
        let snapshot = self.load_snapshot().await?;
        let optimizer = self.optimizer().await?;

        let schedules = tokio::task::spawn_blocking(move || {
            optimizer.compare(&snapshot, &request, &strategies, &cancel)
        })
        .await
        .map_err(|e| ApiError::InternalError(format!("策略比较任务失败: {}", e)))??;

        info!(candidates = schedules.len(), "策略比较完成");
        Ok(schedules)
    }

    async fn run_generate(&self, request: ScheduleConfig, cancel: CancelToken) -> ApiResult<Schedule> {
        let snapshot = self.load_snapshot().await?;
        let optimizer = self.optimizer().await?;

        let schedule = tokio::task::spawn_blocking(move || {
            optimizer.generate(&snapshot, &request, &cancel)
        })
        .await
        .map_err(|e| ApiError::InternalError(format!("生成任务失败: {}", e)))??;
        Ok(schedule)
    }

    fn log_generate(&self, schedule: &Schedule, actor: &str) -> ApiResult<()> {
        self.log_action(
            &schedule.schedule_id,
            ActionType::Generate,
            actor,
            serde_json::json!({
                "strategy": schedule.strategy,
                "voyage_count": schedule.kpi.voyage_count,
                "unallocated": schedule.failures.iter().map(|f| &f.commitment_id).collect::<Vec<_>>(),
                "conflict_count": schedule.conflicts.len(),
                "optimality_score": schedule.kpi.optimality_score,
            }),
            format!(
                "生成计划: {} 个航次, {} 个未分配, {} 个冲突",
                schedule.kpi.voyage_count,
                schedule.failures.len(),
                schedule.conflicts.len()
            ),
        )
    }
}
