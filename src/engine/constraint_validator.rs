// ==========================================
// 航次排产系统 - 约束校验器
// ==========================================
// 职责: 船舶↔泊位 / 船舶↔港口 / 船舶↔货载 的几何/时间/工艺兼容性判定
// 红线: 无状态、无副作用、无 I/O 操作 (可并发调用)
// ==========================================

use crate::domain::cargo::CargoCommitment;
use crate::domain::port::{Berth, BerthRule, Port};
use crate::domain::types::{ConstraintCategory, ConstraintSeverity};
use crate::domain::vessel::Vessel;
use crate::domain::violation::{ValidationResult, Violation};
use crate::domain::window::{hours_to_duration, TimeWindow};

// 内置约束ID
pub const BUILTIN_MAX_LENGTH: &str = "BERTH_MAX_LENGTH";
pub const BUILTIN_MAX_BEAM: &str = "BERTH_MAX_BEAM";
pub const BUILTIN_MAX_DRAFT: &str = "BERTH_MAX_DRAFT";
pub const BUILTIN_CARGO_HANDLING: &str = "BERTH_CARGO_HANDLING";
pub const BUILTIN_OCCUPANCY: &str = "BERTH_OCCUPANCY";
pub const BUILTIN_PORT_DRAFT: &str = "PORT_MAX_DRAFT";
pub const BUILTIN_VESSEL_DWT: &str = "VESSEL_DWT";
pub const BUILTIN_VESSEL_CARGO: &str = "VESSEL_CARGO_CAPABILITY";

// ==========================================
// ConstraintValidator - 约束校验器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintValidator;

impl ConstraintValidator {
    pub fn new() -> Self {
        Self
    }

    /// 完整校验: 船舶在指定时段靠泊作业指定货载
    ///
    /// # 参数
    /// - bookings: 本次运行中已分配到该泊位的作业时段 (泊位日历另行计入)
    pub fn validate(
        &self,
        vessel: &Vessel,
        berth: &Berth,
        cargo: &CargoCommitment,
        window: &TimeWindow,
        bookings: &[TimeWindow],
    ) -> ValidationResult {
        let mut violations = self.static_violations(vessel, berth, &cargo.commodity);
        violations.extend(self.temporal_violations(berth, window, bookings));
        ValidationResult::from_violations(violations)
    }

    /// 与时间无关的校验 (几何 + 工艺), 冲突检测复核时使用
    pub fn validate_static(&self, vessel: &Vessel, berth: &Berth, commodity: &str) -> ValidationResult {
        ValidationResult::from_violations(self.static_violations(vessel, berth, commodity))
    }

    /// 港口航道吃水限制
    pub fn validate_port(&self, vessel: &Vessel, port: &Port) -> ValidationResult {
        let mut violations = Vec::new();
        if let Some(max_draft) = port.max_draft_m {
            if vessel.draft_m > max_draft {
                violations.push(Violation::hard(
                    BUILTIN_PORT_DRAFT,
                    ConstraintCategory::Geometric,
                    format!(
                        "船舶 {} 吃水 {:.1}m 超过港口 {} 限制 {:.1}m",
                        vessel.vessel_id, vessel.draft_m, port.port_id, max_draft
                    ),
                ));
            }
        }
        ValidationResult::from_violations(violations)
    }

    /// 载重吨与可载货种
    pub fn validate_cargo(&self, vessel: &Vessel, cargo: &CargoCommitment) -> ValidationResult {
        let mut violations = Vec::new();
        if cargo.quantity_t > vessel.dwt_t {
            violations.push(Violation::hard(
                BUILTIN_VESSEL_DWT,
                ConstraintCategory::Technological,
                format!(
                    "货量 {:.0}t 超过船舶 {} 载重 {:.0}t",
                    cargo.quantity_t, vessel.vessel_id, vessel.dwt_t
                ),
            ));
        }
        if !vessel.can_carry(&cargo.commodity) {
            violations.push(Violation::hard(
                BUILTIN_VESSEL_CARGO,
                ConstraintCategory::Technological,
                format!("船舶 {} 不可载运货种 {}", vessel.vessel_id, cargo.commodity),
            ));
        }
        ValidationResult::from_violations(violations)
    }

    // ==========================================
    // 内部: 几何 + 工艺
    // ==========================================
    fn static_violations(&self, vessel: &Vessel, berth: &Berth, commodity: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        let dims = [
            (BUILTIN_MAX_LENGTH, "船长", vessel.length_m, berth.max_length_m),
            (BUILTIN_MAX_BEAM, "船宽", vessel.beam_m, berth.max_beam_m),
            (BUILTIN_MAX_DRAFT, "吃水", vessel.draft_m, berth.max_draft_m),
        ];
        for (id, label, actual, limit) in dims {
            // 0 表示泊位未声明该限制
            if limit > 0.0 && actual > limit {
                violations.push(Violation::hard(
                    id,
                    ConstraintCategory::Geometric,
                    format!(
                        "{} {:.1}m 超过泊位 {} 上限 {:.1}m",
                        label, actual, berth.berth_id, limit
                    ),
                ));
            }
        }

        if !berth.handles(commodity) {
            violations.push(Violation::hard(
                BUILTIN_CARGO_HANDLING,
                ConstraintCategory::Technological,
                format!("泊位 {} 不能作业货种 {}", berth.berth_id, commodity),
            ));
        }

        for constraint in &berth.constraints {
            let breach = match &constraint.rule {
                BerthRule::MaxLength { meters } => (vessel.length_m > *meters).then(|| {
                    (ConstraintCategory::Geometric, format!("船长 {:.1}m > {:.1}m", vessel.length_m, meters))
                }),
                BerthRule::MaxBeam { meters } => (vessel.beam_m > *meters).then(|| {
                    (ConstraintCategory::Geometric, format!("船宽 {:.1}m > {:.1}m", vessel.beam_m, meters))
                }),
                BerthRule::MaxDraft { meters } => (vessel.draft_m > *meters).then(|| {
                    (ConstraintCategory::Geometric, format!("吃水 {:.1}m > {:.1}m", vessel.draft_m, meters))
                }),
                BerthRule::CargoCompatibility { allowed } => {
                    let ok = allowed.iter().any(|c| c.eq_ignore_ascii_case(commodity));
                    (!ok).then(|| {
                        (
                            ConstraintCategory::Technological,
                            format!("货种 {} 不在允许列表 {:?}", commodity, allowed),
                        )
                    })
                }
                // 时间类规则在 temporal_violations 中处理
                BerthRule::Blackout { .. } | BerthRule::MinTurnaroundGap { .. } => None,
            };
            if let Some((category, description)) = breach {
                violations.push(Violation {
                    constraint_id: constraint.constraint_id.clone(),
                    category,
                    severity: constraint.severity,
                    description,
                });
            }
        }

        violations
    }

    // ==========================================
    // 内部: 时间 (占用/封港/作业间隔)
    // ==========================================
    fn temporal_violations(
        &self,
        berth: &Berth,
        window: &TimeWindow,
        bookings: &[TimeWindow],
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        let occupied: Vec<TimeWindow> = berth
            .calendar
            .iter()
            .map(|c| c.window)
            .chain(bookings.iter().copied())
            .collect();

        let peak = peak_concurrency(window, &occupied);
        if peak + 1 > berth.capacity.max(1) as usize {
            violations.push(Violation::hard(
                BUILTIN_OCCUPANCY,
                ConstraintCategory::Temporal,
                format!(
                    "泊位 {} 在 {} ~ {} 已有 {} 个占用 (容量 {})",
                    berth.berth_id, window.start, window.end, peak, berth.capacity
                ),
            ));
        }

        for constraint in &berth.constraints {
            let description = match &constraint.rule {
                BerthRule::Blackout { window: blackout } if blackout.overlaps(window) => Some(format!(
                    "作业时段与封港窗口 {} ~ {} 重叠",
                    blackout.start, blackout.end
                )),
                BerthRule::MinTurnaroundGap { hours } => {
                    let gap = hours_to_duration(*hours);
                    occupied
                        .iter()
                        .filter(|b| !b.overlaps(window))
                        .find(|b| {
                            (b.end <= window.start && window.start - b.end < gap)
                                || (b.start >= window.end && b.start - window.end < gap)
                        })
                        .map(|b| {
                            format!(
                                "与相邻作业 {} ~ {} 间隔不足 {:.1}h",
                                b.start, b.end, hours
                            )
                        })
                }
                _ => None,
            };
            if let Some(description) = description {
                violations.push(Violation {
                    constraint_id: constraint.constraint_id.clone(),
                    category: ConstraintCategory::Temporal,
                    severity: constraint.severity,
                    description,
                });
            }
        }

        violations
    }
}

/// 窗口内已有占用的最大并发数
fn peak_concurrency(window: &TimeWindow, occupied: &[TimeWindow]) -> usize {
    // (时刻, 增量): 同一时刻先处理 -1 (半开区间)
    let mut events: Vec<(chrono::NaiveDateTime, i32)> = Vec::new();
    for w in occupied.iter().filter(|w| w.overlaps(window)) {
        events.push((w.start.max(window.start), 1));
        events.push((w.end.min(window.end), -1));
    }
    events.sort();

    let mut current = 0i32;
    let mut peak = 0i32;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    peak.max(0) as usize
}

/// 是否只有软约束违规 (供评分使用)
pub fn soft_only(result: &ValidationResult) -> Vec<Violation> {
    result
        .violations
        .iter()
        .filter(|v| v.severity == ConstraintSeverity::Soft)
        .cloned()
        .collect()
}
