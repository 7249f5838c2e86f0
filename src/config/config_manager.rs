// ==========================================
// 航次排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::config_reader::EngineConfigReader;
use crate::config::engine_config::{CanalSpec, EngineConfig, ScoreWeights, StrategyWeights};
use crate::db::open_sqlite_connection;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const WEATHER_MARGIN: &str = "weather_margin";
    pub const DEFAULT_PORT_WAITING_HOURS: &str = "default_port_waiting_hours";
    pub const CANALS: &str = "canals"; // JSON: [{"canal_id":..,"transit_hours":..,"fee_usd":..}]
    pub const STRATEGY_WEIGHTS: &str = "strategy_weights"; // JSON
    pub const SCORE_WEIGHTS: &str = "score_weights"; // JSON
    pub const BUNKER_SAFETY_MARGIN_T: &str = "bunker_safety_margin_t";
    pub const BUNKER_CALL_HOURS: &str = "bunker_call_hours";
    pub const MAX_BUNKER_DETOUR_NM: &str = "max_bunker_detour_nm";
    pub const MAX_BERTH_WAIT_HOURS: &str = "max_berth_wait_hours";
    pub const DEFAULT_FUEL_PRICE: &str = "default_fuel_price_usd_per_t";
    pub const BERTH_SLOT_STEP_HOURS: &str = "berth_slot_step_hours";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        let conn = open_sqlite_connection(db_path)
            .with_context(|| format!("打开数据库失败: {}", db_path))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> anyhow::Result<Self> {
        {
            let guard = conn.lock().map_err(|e| anyhow!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("锁获取失败: {}", e))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 配置 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 生成计划时记录配置快照, 保证结果可复现
    pub fn get_config_snapshot(&self) -> anyhow::Result<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    fn read_f64(&self, key: &str, current: f64) -> anyhow::Result<f64> {
        match self.get_global_config_value(key)? {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "配置值格式错误，使用缺省值");
                    Ok(current)
                }
            },
            None => Ok(current),
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get_global_config_value(key)? {
            Some(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(v) => Ok(Some(v)),
                Err(e) => {
                    tracing::warn!(config_key = key, error = %e, "配置JSON格式错误，使用缺省值");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// 缺省配置 + config_kv 覆写
    pub fn build_engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut cfg = EngineConfig::default();

        cfg.weather_margin = self.read_f64(config_keys::WEATHER_MARGIN, cfg.weather_margin)?;
        cfg.default_port_waiting_hours =
            self.read_f64(config_keys::DEFAULT_PORT_WAITING_HOURS, cfg.default_port_waiting_hours)?;
        cfg.bunker_safety_margin_t =
            self.read_f64(config_keys::BUNKER_SAFETY_MARGIN_T, cfg.bunker_safety_margin_t)?;
        cfg.bunker_call_hours = self.read_f64(config_keys::BUNKER_CALL_HOURS, cfg.bunker_call_hours)?;
        cfg.max_bunker_detour_nm =
            self.read_f64(config_keys::MAX_BUNKER_DETOUR_NM, cfg.max_bunker_detour_nm)?;
        cfg.max_berth_wait_hours =
            self.read_f64(config_keys::MAX_BERTH_WAIT_HOURS, cfg.max_berth_wait_hours)?;
        cfg.default_fuel_price_usd_per_t =
            self.read_f64(config_keys::DEFAULT_FUEL_PRICE, cfg.default_fuel_price_usd_per_t)?;
        cfg.berth_slot_step_hours =
            self.read_f64(config_keys::BERTH_SLOT_STEP_HOURS, cfg.berth_slot_step_hours)?;

        if let Some(canals) = self.read_json::<Vec<CanalSpec>>(config_keys::CANALS)? {
            cfg.canals = canals;
        }
        if let Some(w) = self.read_json::<StrategyWeights>(config_keys::STRATEGY_WEIGHTS)? {
            cfg.strategy_weights = w;
        }
        if let Some(w) = self.read_json::<ScoreWeights>(config_keys::SCORE_WEIGHTS)? {
            cfg.score_weights = w;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn load_engine_config(&self) -> anyhow::Result<EngineConfig> {
        self.build_engine_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::EngineError;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let manager = setup();
        let cfg = manager.load_engine_config().await.unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[tokio::test]
    async fn test_overrides_are_applied() {
        let manager = setup();
        manager.set_global_config_value(config_keys::WEATHER_MARGIN, "1.15").unwrap();
        manager
            .set_global_config_value(
                config_keys::STRATEGY_WEIGHTS,
                r#"{"profit":0.6,"utilization":0.2,"soft_penalty":0.2}"#,
            )
            .unwrap();
        manager
            .set_global_config_value(
                config_keys::CANALS,
                r#"[{"canal_id":"SUEZ","transit_hours":16.0,"fee_usd":500000.0}]"#,
            )
            .unwrap();

        let cfg = manager.load_engine_config().await.unwrap();
        assert_eq!(cfg.weather_margin, 1.15);
        assert_eq!(cfg.strategy_weights.profit, 0.6);
        assert_eq!(cfg.canals.len(), 1);
        assert_eq!(cfg.canal("SUEZ").unwrap().transit_hours, 16.0);
    }

    #[tokio::test]
    async fn test_malformed_value_falls_back() {
        let manager = setup();
        manager.set_global_config_value(config_keys::DEFAULT_PORT_WAITING_HOURS, "abc").unwrap();
        let cfg = manager.load_engine_config().await.unwrap();
        assert_eq!(cfg.default_port_waiting_hours, 12.0);
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected() {
        let manager = setup();
        manager.set_global_config_value(config_keys::WEATHER_MARGIN, "0.9").unwrap();
        let err = manager.load_engine_config().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_config_snapshot_contains_overrides() {
        let manager = setup();
        manager.set_global_config_value(config_keys::BUNKER_CALL_HOURS, "8").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        let map: HashMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(map.get("bunker_call_hours").map(String::as_str), Some("8"));
    }
}
