// ==========================================
// 航次排产系统 - 年度计划数据仓储
// ==========================================
// 表: voyage_schedule (行内列 + 整体 JSON 载荷)
// 并发控制: revision 乐观锁, 每次更新 +1
// 红线: Repository 不含业务逻辑 (生命周期校验在 ScheduleManager)
// ==========================================

use crate::domain::schedule::{Schedule, ScheduleFilter};
use crate::domain::types::ScheduleStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, types::Value, Connection, Row};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ScheduleRepository - 年度计划仓储
// ==========================================
pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建计划 (revision 以入参为准, 通常为 0)
    pub fn insert(&self, schedule: &Schedule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let payload = serde_json::to_string(schedule)?;

        conn.execute(
            r#"INSERT INTO voyage_schedule (
                   schedule_id, name, year, status, revision, payload_json, created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                schedule.schedule_id,
                schedule.name,
                schedule.year,
                schedule.status.to_db_str(),
                schedule.revision,
                payload,
                schedule.created_at.format(TS_FORMAT).to_string(),
                schedule.updated_at.format(TS_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    /// 更新计划 (带乐观锁检查)
    ///
    /// # 返回
    /// 新的 revision
    ///
    /// # 错误
    /// - `OptimisticLockFailure`: 入参 revision 已过期
    /// - `NotFound`: schedule_id 不存在
    pub fn update(&self, schedule: &Schedule) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;

        let next_revision = schedule.revision + 1;
        let mut stored = schedule.clone();
        stored.revision = next_revision;
        let payload = serde_json::to_string(&stored)?;

        let rows_affected = conn.execute(
            r#"UPDATE voyage_schedule
               SET name = ?1, year = ?2, status = ?3, payload_json = ?4,
                   updated_at = ?5, revision = revision + 1
               WHERE schedule_id = ?6 AND revision = ?7"#,
            params![
                stored.name,
                stored.year,
                stored.status.to_db_str(),
                payload,
                stored.updated_at.format(TS_FORMAT).to_string(),
                stored.schedule_id,
                schedule.revision,
            ],
        )?;

        if rows_affected == 0 {
            let actual: Result<i32, _> = conn.query_row(
                "SELECT revision FROM voyage_schedule WHERE schedule_id = ?1",
                params![schedule.schedule_id],
                |row| row.get(0),
            );
            return match actual {
                Ok(actual) => Err(RepositoryError::OptimisticLockFailure {
                    schedule_id: schedule.schedule_id.clone(),
                    expected: schedule.revision,
                    actual,
                }),
                Err(_) => Err(RepositoryError::NotFound {
                    entity: "Schedule".to_string(),
                    id: schedule.schedule_id.clone(),
                }),
            };
        }

        Ok(next_revision)
    }

    pub fn find_by_id(&self, schedule_id: &str) -> RepositoryResult<Option<Schedule>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT schedule_id, name, year, status, revision, payload_json, created_at, updated_at
               FROM voyage_schedule
               WHERE schedule_id = ?1"#,
            params![schedule_id],
            |row| self.map_row(row),
        ) {
            Ok(schedule) => Ok(Some(schedule)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按年度/状态过滤; 未指定状态时不返回已删除计划
    pub fn list(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        let conn = self.get_conn()?;

        let mut sql = String::from(
            r#"SELECT schedule_id, name, year, status, revision, payload_json, created_at, updated_at
               FROM voyage_schedule
               WHERE 1 = 1"#,
        );
        let mut args: Vec<Value> = Vec::new();
        if let Some(year) = filter.year {
            sql.push_str(" AND year = ?");
            args.push(Value::Integer(year as i64));
        }
        match filter.status {
            Some(status) => {
                sql.push_str(" AND status = ?");
                args.push(Value::Text(status.to_db_str().to_string()));
            }
            None => {
                sql.push_str(" AND status <> ?");
                args.push(Value::Text(ScheduleStatus::Deleted.to_db_str().to_string()));
            }
        }
        sql.push_str(" ORDER BY created_at ASC, schedule_id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let schedules = stmt
            .query_map(rusqlite::params_from_iter(args), |row| self.map_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    /// 行列值覆盖载荷中的同名字段
    fn map_row(&self, row: &Row) -> rusqlite::Result<Schedule> {
        let payload: String = row.get(5)?;
        let mut schedule: Schedule = serde_json::from_str(&payload).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let status_str: String = row.get(3)?;
        schedule.schedule_id = row.get(0)?;
        schedule.name = row.get(1)?;
        schedule.year = row.get(2)?;
        schedule.status = ScheduleStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("未知计划状态: {}", status_str).into(),
            )
        })?;
        schedule.revision = row.get(4)?;
        schedule.created_at = parse_ts(row, 6)?;
        schedule.updated_at = parse_ts(row, 7)?;
        Ok(schedule)
    }
}

fn parse_ts(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&row.get::<_, String>(idx)?, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}
