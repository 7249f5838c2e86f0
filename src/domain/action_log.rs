// ==========================================
// 航次排产系统 - 操作日志领域模型
// ==========================================
// 红线: 所有计划生命周期写入必须记录
// 用途: 审计追踪
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub schedule_id: Option<String>,     // 关联计划
    pub action_type: String,             // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateDraft,
    Generate,
    Update,
    ResolveConflict,
    Finalize,
    Archive,
    Delete,
    DeriveDraft,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::CreateDraft => "CREATE_DRAFT",
            ActionType::Generate => "GENERATE",
            ActionType::Update => "UPDATE",
            ActionType::ResolveConflict => "RESOLVE_CONFLICT",
            ActionType::Finalize => "FINALIZE",
            ActionType::Archive => "ARCHIVE",
            ActionType::Delete => "DELETE",
            ActionType::DeriveDraft => "DERIVE_DRAFT",
        };
        write!(f, "{}", s)
    }
}
