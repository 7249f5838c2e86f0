// ==========================================
// 航次排产系统 - 应用状态
// ==========================================
// 职责: 管理共享连接与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::api::{MasterDataProvider, ScheduleManager};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};

/// 应用状态
///
/// 一个进程一份, 所有组件共享同一 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 计划管理器
    pub schedule_manager: Arc<ScheduleManager>,

    /// 配置管理器 (config_kv 覆写)
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径 (":memory:" 可用于临时运行)
    /// - master_data: 主数据快照来源
    ///
    /// # 说明
    /// 打开连接后幂等建表, 再构造配置管理器与计划管理器
    pub fn new(db_path: String, master_data: Arc<dyn MasterDataProvider>) -> anyhow::Result<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        init_schema(&conn).context("建表失败")?;
        tracing::debug!(schema_version = ?read_schema_version(&conn)?, "schema 已就绪");
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone())?);
        let schedule_manager = Arc::new(ScheduleManager::new(
            conn,
            master_data,
            config_manager.clone(),
        ));

        Ok(Self {
            db_path,
            schedule_manager,
            config_manager,
        })
    }
}

/// 默认数据库路径
///
/// 优先读取环境变量 VOYAGE_APS_DB_PATH, 否则使用用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("VOYAGE_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./voyage_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("voyage-aps-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("voyage-aps");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("voyage_aps.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryMasterData;
    use crate::domain::schedule::ScheduleFilter;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_on_temp_db() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone(), Arc::new(InMemoryMasterData::default())).unwrap();
        assert!(state
            .schedule_manager
            .list_schedules(&ScheduleFilter::default())
            .unwrap()
            .is_empty());

        state.config_manager.set_global_config_value("weather_margin", "0.1").unwrap();
        drop(state);

        // 重开后配置仍在
        let state = AppState::new(db_path.clone(), Arc::new(InMemoryMasterData::default())).unwrap();
        assert_eq!(
            state.config_manager.get_global_config_value("weather_margin").unwrap().as_deref(),
            Some("0.1")
        );

        // 独立打开的配置管理器读到同一份覆写
        let standalone = crate::config::ConfigManager::new(&db_path).unwrap();
        assert_eq!(
            standalone.get_global_config_value("weather_margin").unwrap().as_deref(),
            Some("0.1")
        );
    }
}
