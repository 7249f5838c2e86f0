// ==========================================
// 航次排产系统 - 主数据协作方接口
// ==========================================
// 职责: 为每次生成请求提供只读主数据快照 (船舶/港口/泊位/航线/承诺/市场油价)
// 红线: 引擎只读快照, 不回写主数据
// ==========================================

use crate::domain::snapshot::MasterDataSnapshot;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::RwLock;

#[async_trait]
pub trait MasterDataProvider: Send + Sync {
    /// 读取当前主数据快照
    async fn load_snapshot(&self) -> anyhow::Result<MasterDataSnapshot>;
}

// ==========================================
// InMemoryMasterData - 内存快照 (测试/嵌入调用)
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryMasterData {
    snapshot: RwLock<MasterDataSnapshot>,
}

impl InMemoryMasterData {
    pub fn new(snapshot: MasterDataSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// 替换快照 (外部 CRUD 更新主数据后调用)
    pub fn replace(&self, snapshot: MasterDataSnapshot) -> anyhow::Result<()> {
        let mut guard = self
            .snapshot
            .write()
            .map_err(|e| anyhow::anyhow!("主数据锁获取失败: {}", e))?;
        *guard = snapshot;
        Ok(())
    }
}

#[async_trait]
impl MasterDataProvider for InMemoryMasterData {
    async fn load_snapshot(&self) -> anyhow::Result<MasterDataSnapshot> {
        let guard = self
            .snapshot
            .read()
            .map_err(|e| anyhow::anyhow!("主数据锁获取失败: {}", e))?;
        Ok(guard.clone())
    }
}

// ==========================================
// JsonFileMasterData - JSON 场景文件
// ==========================================
#[derive(Debug, Clone)]
pub struct JsonFileMasterData {
    path: PathBuf,
}

impl JsonFileMasterData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MasterDataProvider for JsonFileMasterData {
    async fn load_snapshot(&self) -> anyhow::Result<MasterDataSnapshot> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| anyhow::anyhow!("读取主数据文件失败 {}: {}", self.path.display(), e))?;
        let snapshot: MasterDataSnapshot = serde_json::from_str(&raw)?;
        tracing::debug!(
            path = %self.path.display(),
            vessels = snapshot.vessels.len(),
            commitments = snapshot.commitments.len(),
            "主数据文件已加载"
        );
        Ok(snapshot)
    }
}
