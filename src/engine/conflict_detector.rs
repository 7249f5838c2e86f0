// ==========================================
// 航次排产系统 - 冲突检测器
// ==========================================
// 职责: 扫描已组装的计划, 输出冲突清单
// 检查项:
// 1. 同船航次时间重叠 (timing-overlap, 按重叠时长分级)
// 2. 泊位并发超容量 (capacity-overrun, 每个超限区段一条)
// 3. 装货开始不在受载期内 (laycan-miss)
// 4. 几何约束复核 (geometric-violation)
// 5. 货量超载重吨 (capacity-overrun)
// 红线: 只读, 不修改计划; 处理冲突是单独的显式操作
// ==========================================

use crate::domain::schedule::{Conflict, Schedule};
use crate::domain::snapshot::MasterDataSnapshot;
use crate::domain::types::{ConflictSeverity, ConflictType, ConstraintCategory, ResolutionStatus};
use crate::domain::voyage::Voyage;
use crate::domain::window::{duration_to_hours, TimeWindow};
use crate::engine::constraint_validator::ConstraintValidator;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// 检测阶段的冲突草稿 (编号前)
struct Finding {
    severity: ConflictSeverity,
    conflict_type: ConflictType,
    resource_ids: Vec<String>,
    voyage_ids: Vec<String>,
    description: String,
}

pub struct ConflictDetector<'a> {
    snapshot: &'a MasterDataSnapshot,
    validator: ConstraintValidator,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(snapshot: &'a MasterDataSnapshot) -> Self {
        Self {
            snapshot,
            validator: ConstraintValidator::new(),
        }
    }

    pub fn detect(&self, schedule: &Schedule) -> Vec<Conflict> {
        self.detect_voyages(&schedule.voyages)
    }

    /// 检测冲突, 编号 CF-0001 起按检查顺序递增
    #[instrument(skip_all, fields(voyages = voyages.len()))]
    pub fn detect_voyages(&self, voyages: &[Voyage]) -> Vec<Conflict> {
        let mut findings = Vec::new();
        findings.extend(self.vessel_overlaps(voyages));
        findings.extend(self.berth_overruns(voyages));
        for voyage in voyages {
            findings.extend(self.laycan_miss(voyage));
            findings.extend(self.geometric_recheck(voyage));
            findings.extend(self.cargo_over_dwt(voyage));
        }

        let conflicts: Vec<Conflict> = findings
            .into_iter()
            .enumerate()
            .map(|(i, f)| Conflict {
                conflict_id: format!("CF-{:04}", i + 1),
                severity: f.severity,
                conflict_type: f.conflict_type,
                resource_ids: f.resource_ids,
                voyage_ids: f.voyage_ids,
                description: f.description,
                status: ResolutionStatus::Open,
                resolution_note: None,
            })
            .collect();

        let hard = conflicts.iter().filter(|c| c.severity.is_hard()).count();
        tracing::info!(total = conflicts.len(), hard, "冲突检测完成");
        conflicts
    }

    // ==========================================
    // 1. 同船时间重叠
    // ==========================================
    fn vessel_overlaps(&self, voyages: &[Voyage]) -> Vec<Finding> {
        let mut by_vessel: BTreeMap<&str, Vec<(TimeWindow, &str)>> = BTreeMap::new();
        for voyage in voyages {
            if let Some(window) = voyage.window() {
                by_vessel
                    .entry(voyage.vessel_id.as_str())
                    .or_default()
                    .push((window, voyage.voyage_id.as_str()));
            }
        }

        let mut findings = Vec::new();
        for (vessel_id, mut spans) in by_vessel {
            spans.sort();
            for i in 0..spans.len() {
                for j in (i + 1)..spans.len() {
                    let (a, a_id) = spans[i];
                    let (b, b_id) = spans[j];
                    if b.start >= a.end {
                        break;
                    }
                    let hours = a.overlap_hours(&b);
                    findings.push(Finding {
                        severity: ConflictSeverity::from_overlap_hours(hours),
                        conflict_type: ConflictType::TimingOverlap,
                        resource_ids: vec![vessel_id.to_string()],
                        voyage_ids: vec![a_id.to_string(), b_id.to_string()],
                        description: format!(
                            "船舶 {} 的航次 {} 与 {} 重叠 {:.1}h",
                            vessel_id, a_id, b_id, hours
                        ),
                    });
                }
            }
        }
        findings
    }

    // ==========================================
    // 2. 泊位并发超容量
    // ==========================================
    fn berth_overruns(&self, voyages: &[Voyage]) -> Vec<Finding> {
        // 泊位 → [(时段, 航次ID; None = 泊位日历)]
        let mut by_berth: BTreeMap<&str, Vec<(TimeWindow, Option<&str>)>> = BTreeMap::new();
        for voyage in voyages {
            for leg in voyage.legs.iter().filter(|l| l.kind.uses_berth()) {
                if let Some(berth_id) = leg.berth_id.as_deref() {
                    by_berth
                        .entry(berth_id)
                        .or_default()
                        .push((leg.window(), Some(voyage.voyage_id.as_str())));
                }
            }
        }

        let mut findings = Vec::new();
        for (berth_id, mut spans) in by_berth {
            let capacity = match self.snapshot.berth(berth_id) {
                Some(berth) => {
                    spans.extend(berth.calendar.iter().map(|c| (c.window, None)));
                    berth.capacity.max(1) as usize
                }
                None => 1,
            };
            for episode in overrun_episodes(&spans, capacity) {
                if episode.voyage_ids.is_empty() {
                    continue;
                }
                let hours = duration_to_hours(episode.end - episode.start);
                findings.push(Finding {
                    severity: ConflictSeverity::from_overlap_hours(hours),
                    conflict_type: ConflictType::CapacityOverrun,
                    resource_ids: vec![berth_id.to_string()],
                    voyage_ids: episode.voyage_ids.iter().map(|s| s.to_string()).collect(),
                    description: format!(
                        "泊位 {} 在 {} ~ {} 并发 {} 艘 (容量 {})",
                        berth_id, episode.start, episode.end, episode.peak, capacity
                    ),
                });
            }
        }
        findings
    }

    // ==========================================
    // 3. 受载期
    // ==========================================
    fn laycan_miss(&self, voyage: &Voyage) -> Vec<Finding> {
        let Some(loading) = voyage.loading_leg() else {
            return Vec::new();
        };
        let discharge_end = voyage.discharge_leg().map(|l| l.end).or(voyage.end());

        voyage
            .commitment_ids
            .iter()
            .filter_map(|id| self.snapshot.commitment(id))
            .filter(|c| !c.laycan.contains(loading.start))
            .map(|c| {
                let late_delivery = discharge_end.map(|end| c.misses_deadline(end)).unwrap_or(false);
                Finding {
                    severity: if late_delivery {
                        ConflictSeverity::Critical
                    } else {
                        ConflictSeverity::High
                    },
                    conflict_type: ConflictType::LaycanMiss,
                    resource_ids: vec![voyage.vessel_id.clone(), c.commitment_id.clone()],
                    voyage_ids: vec![voyage.voyage_id.clone()],
                    description: format!(
                        "航次 {} 装货开始 {} 不在承诺 {} 受载期 {} ~ {}{}",
                        voyage.voyage_id,
                        loading.start,
                        c.commitment_id,
                        c.laycan.start,
                        c.laycan.end,
                        if late_delivery { ", 且错过交付期限" } else { "" }
                    ),
                }
            })
            .collect()
    }

    // ==========================================
    // 4. 几何复核 (泊位 + 港口吃水)
    // ==========================================
    fn geometric_recheck(&self, voyage: &Voyage) -> Vec<Finding> {
        let Some(vessel) = self.snapshot.vessel(&voyage.vessel_id) else {
            return Vec::new();
        };
        let commodity = voyage
            .commitment_ids
            .first()
            .and_then(|id| self.snapshot.commitment(id))
            .map(|c| c.commodity.as_str())
            .unwrap_or("");

        let mut findings = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for leg in voyage.legs.iter().filter(|l| l.kind.uses_berth()) {
            let mut violations = Vec::new();
            let resource = match leg.berth_id.as_deref() {
                Some(berth_id) => {
                    if !seen.insert(berth_id) {
                        continue;
                    }
                    if let Some(berth) = self.snapshot.berth(berth_id) {
                        violations.extend(
                            self.validator
                                .validate_static(vessel, berth, commodity)
                                .violations
                                .into_iter()
                                .filter(|v| v.category == ConstraintCategory::Geometric),
                        );
                    }
                    berth_id.to_string()
                }
                None => leg.destination.clone(),
            };
            if let Some(port) = self.snapshot.port(&leg.destination) {
                violations.extend(self.validator.validate_port(vessel, port).violations);
            }
            if violations.is_empty() {
                continue;
            }

            let severity = if violations.iter().any(|v| v.is_hard()) {
                ConflictSeverity::Critical
            } else {
                ConflictSeverity::Low
            };
            let detail = violations
                .iter()
                .map(|v| format!("{}: {}", v.constraint_id, v.description))
                .collect::<Vec<_>>()
                .join("; ");
            findings.push(Finding {
                severity,
                conflict_type: ConflictType::GeometricViolation,
                resource_ids: vec![vessel.vessel_id.clone(), resource],
                voyage_ids: vec![voyage.voyage_id.clone()],
                description: detail,
            });
        }
        findings
    }

    // ==========================================
    // 5. 超载
    // ==========================================
    fn cargo_over_dwt(&self, voyage: &Voyage) -> Vec<Finding> {
        let Some(vessel) = self.snapshot.vessel(&voyage.vessel_id) else {
            return Vec::new();
        };
        let cargo_t = voyage.cargo_t();
        if cargo_t <= vessel.dwt_t {
            return Vec::new();
        }
        vec![Finding {
            severity: ConflictSeverity::Critical,
            conflict_type: ConflictType::CapacityOverrun,
            resource_ids: vec![vessel.vessel_id.clone()],
            voyage_ids: vec![voyage.voyage_id.clone()],
            description: format!(
                "航次 {} 装货 {:.0}t 超过船舶 {} 载重 {:.0}t",
                voyage.voyage_id, cargo_t, vessel.vessel_id, vessel.dwt_t
            ),
        }]
    }
}

/// 连续超容量区段
struct Episode<'v> {
    start: NaiveDateTime,
    end: NaiveDateTime,
    peak: usize,
    voyage_ids: BTreeSet<&'v str>,
}

/// 扫描线: 同一时刻先出后进 (半开区间)
fn overrun_episodes<'v>(spans: &[(TimeWindow, Option<&'v str>)], capacity: usize) -> Vec<Episode<'v>> {
    // (时刻, 0 = 结束 / 1 = 开始, 下标)
    let mut events: Vec<(NaiveDateTime, u8, usize)> = Vec::with_capacity(spans.len() * 2);
    for (idx, (window, _)) in spans.iter().enumerate() {
        if window.end > window.start {
            events.push((window.start, 1, idx));
            events.push((window.end, 0, idx));
        }
    }
    events.sort();

    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut episodes = Vec::new();
    let mut current: Option<Episode<'v>> = None;

    for (time, kind, idx) in events {
        if kind == 1 {
            active.insert(idx);
        } else {
            active.remove(&idx);
        }

        if active.len() > capacity {
            let episode = current.get_or_insert_with(|| Episode {
                start: time,
                end: time,
                peak: 0,
                voyage_ids: BTreeSet::new(),
            });
            episode.peak = episode.peak.max(active.len());
            episode.voyage_ids.extend(active.iter().filter_map(|&i| spans[i].1));
        } else if let Some(mut episode) = current.take() {
            episode.end = time;
            episodes.push(episode);
        }
    }
    episodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cargo::CargoCommitment;
    use crate::domain::port::{Berth, BerthWindow};
    use crate::domain::types::{CommitmentStatus, FuelType, LegKind, VesselStatus};
    use crate::domain::vessel::{ConsumptionProfile, Vessel};
    use crate::domain::voyage::{VoyageCostEstimate, VoyageLeg};
    use chrono::NaiveDate;

    fn t(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn leg(kind: LegKind, start: NaiveDateTime, end: NaiveDateTime, berth: Option<&str>) -> VoyageLeg {
        VoyageLeg {
            kind,
            start,
            end,
            origin: "P".to_string(),
            destination: "P".to_string(),
            cargo_t: 10_000.0,
            berth_id: berth.map(str::to_string),
            canal_id: None,
        }
    }

    fn voyage(id: &str, vessel: &str, legs: Vec<VoyageLeg>) -> Voyage {
        Voyage {
            voyage_id: id.to_string(),
            vessel_id: vessel.to_string(),
            commitment_ids: vec![],
            legs,
            load_berth_id: None,
            discharge_berth_id: None,
            cost: VoyageCostEstimate::default(),
            soft_violations: vec![],
        }
    }

    fn berth(id: &str, capacity: u32) -> Berth {
        Berth {
            berth_id: id.to_string(),
            port_id: "P".to_string(),
            max_length_m: 0.0,
            max_beam_m: 0.0,
            max_draft_m: 0.0,
            cargo_types: vec![],
            capacity,
            calendar: vec![],
            constraints: vec![],
        }
    }

    #[test]
    fn test_three_voyages_one_episode() {
        let snapshot = MasterDataSnapshot {
            berths: vec![berth("B1", 1)],
            ..Default::default()
        };
        let detector = ConflictDetector::new(&snapshot);
        let voyages = vec![
            voyage("V-1", "A", vec![leg(LegKind::Loading, t(1, 0), t(3, 0), Some("B1"))]),
            voyage("V-2", "B", vec![leg(LegKind::Loading, t(2, 0), t(4, 0), Some("B1"))]),
            voyage("V-3", "C", vec![leg(LegKind::Loading, t(2, 12), t(5, 0), Some("B1"))]),
        ];
        let conflicts = detector.detect_voyages(&voyages);
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.conflict_type, ConflictType::CapacityOverrun);
        assert_eq!(c.voyage_ids, vec!["V-1", "V-2", "V-3"]);
        // t(2,0) ~ t(4,0) 超限 48h → High
        assert_eq!(c.severity, ConflictSeverity::High);
    }

    #[test]
    fn test_capacity_two_allows_pair() {
        let snapshot = MasterDataSnapshot {
            berths: vec![berth("B1", 2)],
            ..Default::default()
        };
        let detector = ConflictDetector::new(&snapshot);
        let voyages = vec![
            voyage("V-1", "A", vec![leg(LegKind::Loading, t(1, 0), t(3, 0), Some("B1"))]),
            voyage("V-2", "B", vec![leg(LegKind::Loading, t(2, 0), t(4, 0), Some("B1"))]),
        ];
        assert!(detector.detect_voyages(&voyages).is_empty());
    }

    #[test]
    fn test_calendar_counts_toward_occupancy() {
        let mut b = berth("B1", 1);
        b.calendar.push(BerthWindow {
            window: TimeWindow::new(t(2, 0), t(2, 4)),
            reason: "dredging".to_string(),
        });
        let snapshot = MasterDataSnapshot {
            berths: vec![b],
            ..Default::default()
        };
        let detector = ConflictDetector::new(&snapshot);
        let voyages = vec![voyage("V-1", "A", vec![leg(LegKind::Loading, t(1, 0), t(3, 0), Some("B1"))])];
        let conflicts = detector.detect_voyages(&voyages);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].voyage_ids, vec!["V-1"]);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Low);
    }

    #[test]
    fn test_vessel_overlap_severity() {
        let snapshot = MasterDataSnapshot::default();
        let detector = ConflictDetector::new(&snapshot);
        let voyages = vec![
            voyage("V-1", "A", vec![leg(LegKind::Transit, t(1, 0), t(5, 0), None)]),
            voyage("V-2", "A", vec![leg(LegKind::Transit, t(4, 12), t(8, 0), None)]),
            voyage("V-3", "A", vec![leg(LegKind::Transit, t(8, 0), t(9, 0), None)]),
        ];
        let conflicts = detector.detect_voyages(&voyages);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_id, "CF-0001");
        assert_eq!(conflicts[0].conflict_type, ConflictType::TimingOverlap);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Medium);
        assert_eq!(conflicts[0].resource_ids, vec!["A"]);
    }

    fn vessel(id: &str, dwt: f64, length: f64) -> Vessel {
        Vessel {
            vessel_id: id.to_string(),
            name: id.to_string(),
            dwt_t: dwt,
            service_speed_kn: 12.0,
            consumption: ConsumptionProfile {
                fuel_type: FuelType::Vlsfo,
                laden_t_per_day: 30.0,
                ballast_t_per_day: 25.0,
                port_t_per_day: 3.0,
            },
            length_m: length,
            beam_m: 32.0,
            draft_m: 12.0,
            daily_hire_usd: 10_000.0,
            status: VesselStatus::Active,
            open_port_id: "P".to_string(),
            open_from: t(1, 0),
            cargo_capabilities: vec![],
            fuel_capacity_t: 0.0,
            fuel_on_board_t: 0.0,
        }
    }

    fn commitment(id: &str, deadline: Option<NaiveDateTime>) -> CargoCommitment {
        CargoCommitment {
            commitment_id: id.to_string(),
            commodity: "COAL".to_string(),
            quantity_t: 10_000.0,
            load_port_id: "P".to_string(),
            discharge_port_id: "Q".to_string(),
            laycan: TimeWindow::new(t(1, 0), t(5, 0)),
            freight_rate_usd_per_t: Some(20.0),
            delivery_deadline: deadline,
            late_penalty_usd_per_day: None,
            status: CommitmentStatus::Assigned,
        }
    }

    /// 8月7日装货, 8月10日卸毕
    fn late_loading_voyage() -> Voyage {
        let mut v = voyage(
            "V-1",
            "A",
            vec![
                leg(LegKind::Loading, t(7, 0), t(8, 0), None),
                leg(LegKind::Transit, t(8, 0), t(9, 0), None),
                leg(LegKind::Discharge, t(9, 0), t(10, 0), None),
            ],
        );
        v.commitment_ids = vec!["C1".to_string()];
        v
    }

    #[test]
    fn test_loading_outside_laycan_is_high() {
        let snapshot = MasterDataSnapshot {
            commitments: vec![commitment("C1", None)],
            ..Default::default()
        };
        let conflicts = ConflictDetector::new(&snapshot).detect_voyages(&[late_loading_voyage()]);

        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.conflict_type, ConflictType::LaycanMiss);
        assert_eq!(c.severity, ConflictSeverity::High);
        assert_eq!(c.resource_ids, vec!["A", "C1"]);
        assert_eq!(c.voyage_ids, vec!["V-1"]);
        assert!(c.is_open_hard());
    }

    #[test]
    fn test_laycan_miss_with_missed_deadline_is_critical() {
        let snapshot = MasterDataSnapshot {
            commitments: vec![commitment("C1", Some(t(9, 12)))],
            ..Default::default()
        };
        let conflicts = ConflictDetector::new(&snapshot).detect_voyages(&[late_loading_voyage()]);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::LaycanMiss);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Critical);
        assert!(conflicts[0].description.contains("交付期限"));
    }

    #[test]
    fn test_loading_inside_laycan_is_clean() {
        let snapshot = MasterDataSnapshot {
            commitments: vec![commitment("C1", Some(t(9, 12)))],
            ..Default::default()
        };
        let mut on_time = late_loading_voyage();
        on_time.shift(chrono::Duration::days(-4));
        assert!(ConflictDetector::new(&snapshot).detect_voyages(&[on_time]).is_empty());
    }

    #[test]
    fn test_cargo_above_dwt_is_critical_overrun() {
        let snapshot = MasterDataSnapshot {
            vessels: vec![vessel("A", 8_000.0, 190.0)],
            ..Default::default()
        };
        let voyages = vec![voyage("V-1", "A", vec![leg(LegKind::Loading, t(1, 0), t(2, 0), None)])];
        let conflicts = ConflictDetector::new(&snapshot).detect_voyages(&voyages);

        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.conflict_type, ConflictType::CapacityOverrun);
        assert_eq!(c.severity, ConflictSeverity::Critical);
        assert_eq!(c.resource_ids, vec!["A"]);
    }

    #[test]
    fn test_geometric_recheck_flags_oversized_vessel() {
        let mut b = berth("B1", 1);
        b.max_length_m = 250.0;
        let snapshot = MasterDataSnapshot {
            vessels: vec![vessel("A", 60_000.0, 260.0)],
            berths: vec![b],
            ..Default::default()
        };
        let voyages = vec![voyage(
            "V-1",
            "A",
            vec![
                leg(LegKind::Loading, t(1, 0), t(2, 0), Some("B1")),
                leg(LegKind::Discharge, t(4, 0), t(5, 0), Some("B1")),
            ],
        )];
        let conflicts = ConflictDetector::new(&snapshot).detect_voyages(&voyages);

        // 同一泊位只复核一次
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.conflict_type, ConflictType::GeometricViolation);
        assert_eq!(c.severity, ConflictSeverity::Critical);
        assert_eq!(c.resource_ids, vec!["A", "B1"]);
    }
}
