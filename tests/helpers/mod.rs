// ==========================================
// 集成测试辅助工具
// ==========================================
// 职责: 提供临时数据库、管理器组装与测试数据构建
// ==========================================

#![allow(dead_code)]

pub mod test_data_builder;

use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use voyage_aps::api::InMemoryMasterData;
use voyage_aps::app::AppState;
use voyage_aps::db::open_sqlite_connection;
use voyage_aps::domain::snapshot::MasterDataSnapshot;
use voyage_aps::repository::ScheduleRepository;

/// 基于临时数据库文件的测试环境
pub struct TestEnv {
    pub state: AppState,
    pub master_data: Arc<InMemoryMasterData>,
    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl TestEnv {
    pub fn new(snapshot: MasterDataSnapshot) -> Self {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_string_lossy().to_string();
        let master_data = Arc::new(InMemoryMasterData::new(snapshot));
        let state = AppState::new(db_path, master_data.clone()).unwrap();
        Self {
            state,
            master_data,
            _temp_file: temp_file,
        }
    }

    pub fn db_path(&self) -> &str {
        &self.state.db_path
    }

    /// 独立连接上的计划仓储 (模拟另一进程/会话)
    pub fn side_repo(&self) -> ScheduleRepository {
        let conn = open_sqlite_connection(self.db_path()).unwrap();
        ScheduleRepository::new(Arc::new(Mutex::new(conn)))
    }
}
