// ==========================================
// 航次排产系统 - 约束违规记录
// ==========================================

use crate::domain::types::{ConstraintCategory, ConstraintSeverity};
use serde::{Deserialize, Serialize};

/// 单条约束违规
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub constraint_id: String,
    pub category: ConstraintCategory,
    pub severity: ConstraintSeverity,
    pub description: String,
}

impl Violation {
    pub fn hard(constraint_id: impl Into<String>, category: ConstraintCategory, description: String) -> Self {
        Self {
            constraint_id: constraint_id.into(),
            category,
            severity: ConstraintSeverity::Hard,
            description,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.severity == ConstraintSeverity::Hard
    }
}

/// 校验结果: 无硬约束违规即可行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let is_valid = !violations.iter().any(Violation::is_hard);
        Self { is_valid, violations }
    }

    pub fn hard_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_hard())
    }

    pub fn soft_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.is_hard())
    }

    /// 只看某一分类是否有硬违规
    pub fn has_hard(&self, category: ConstraintCategory) -> bool {
        self.hard_violations().any(|v| v.category == category)
    }

    /// 汇总描述 (用于失败原因)
    pub fn summary(&self) -> String {
        self.hard_violations()
            .map(|v| format!("{}: {}", v.constraint_id, v.description))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
