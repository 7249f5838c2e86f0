// ==========================================
// 航次排产系统 - 船队状态
// ==========================================
// 显式、带版本的值: 每个分配步骤传入并返回新状态
// 并行策略运行各持一份深拷贝, 互不共享
// ==========================================

use crate::domain::vessel::Vessel;
use crate::domain::voyage::Voyage;
use crate::domain::window::TimeWindow;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

// ==========================================
// VesselPosition - 单船"下次可用"状态
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct VesselPosition {
    pub port_id: String,
    pub available_from: NaiveDateTime,
    pub committed_hours: f64,
    pub fuel_on_board_t: f64,
    pub voyage_count: usize,
}

impl VesselPosition {
    pub fn committed_days(&self) -> f64 {
        self.committed_hours / 24.0
    }
}

// ==========================================
// FleetState
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetState {
    version: u64,
    vessels: BTreeMap<String, VesselPosition>,
    berth_bookings: BTreeMap<String, Vec<TimeWindow>>,
}

impl FleetState {
    /// 由船舶主数据初始化 (版本 0)
    pub fn from_vessels<'a>(vessels: impl IntoIterator<Item = &'a Vessel>) -> Self {
        let vessels = vessels
            .into_iter()
            .map(|v| {
                (
                    v.vessel_id.clone(),
                    VesselPosition {
                        port_id: v.open_port_id.clone(),
                        available_from: v.open_from,
                        committed_hours: 0.0,
                        fuel_on_board_t: v.fuel_on_board_t,
                        voyage_count: 0,
                    },
                )
            })
            .collect();
        Self {
            version: 0,
            vessels,
            berth_bookings: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn position(&self, vessel_id: &str) -> Option<&VesselPosition> {
        self.vessels.get(vessel_id)
    }

    pub fn committed_days(&self, vessel_id: &str) -> f64 {
        self.position(vessel_id).map(VesselPosition::committed_days).unwrap_or(0.0)
    }

    /// 本次运行中已分配到该泊位的作业时段
    pub fn berth_bookings(&self, berth_id: &str) -> &[TimeWindow] {
        self.berth_bookings
            .get(berth_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 登记航次, 返回新版本状态
    ///
    /// - 船舶位置/可用时间推进到卸港/卸毕
    /// - 累计占用小时
    /// - 记录泊位占用
    pub fn apply_voyage(mut self, voyage: &Voyage, fuel_on_board_after_t: f64) -> Self {
        if let (Some(position), Some(window)) = (self.vessels.get_mut(&voyage.vessel_id), voyage.window()) {
            if let Some(last) = voyage.legs.last() {
                position.port_id = last.destination.clone();
            }
            position.available_from = window.end;
            position.committed_hours += window.duration_hours();
            position.fuel_on_board_t = fuel_on_board_after_t.max(0.0);
            position.voyage_count += 1;
        }

        for leg in &voyage.legs {
            if let Some(berth_id) = &leg.berth_id {
                self.berth_bookings
                    .entry(berth_id.clone())
                    .or_default()
                    .push(leg.window());
            }
        }

        self.version += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FuelType, LegKind, VesselStatus};
    use crate::domain::vessel::ConsumptionProfile;
    use crate::domain::voyage::{VoyageCostEstimate, VoyageLeg};
    use chrono::NaiveDate;

    fn t(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 7, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn vessel(id: &str) -> Vessel {
        Vessel {
            vessel_id: id.to_string(),
            name: id.to_string(),
            dwt_t: 50_000.0,
            service_speed_kn: 12.0,
            consumption: ConsumptionProfile {
                fuel_type: FuelType::Vlsfo,
                laden_t_per_day: 25.0,
                ballast_t_per_day: 20.0,
                port_t_per_day: 2.0,
            },
            length_m: 190.0,
            beam_m: 32.0,
            draft_m: 12.0,
            daily_hire_usd: 10_000.0,
            status: VesselStatus::Active,
            open_port_id: "X".to_string(),
            open_from: t(1),
            cargo_capabilities: vec![],
            fuel_capacity_t: 0.0,
            fuel_on_board_t: 500.0,
        }
    }

    fn leg(kind: LegKind, from: NaiveDateTime, to: NaiveDateTime, dest: &str, berth: Option<&str>) -> VoyageLeg {
        VoyageLeg {
            kind,
            start: from,
            end: to,
            origin: "X".to_string(),
            destination: dest.to_string(),
            cargo_t: 0.0,
            berth_id: berth.map(str::to_string),
            canal_id: None,
        }
    }

    #[test]
    fn test_apply_voyage_advances_vessel_and_version() {
        let vessels = vec![vessel("A"), vessel("B")];
        let base = FleetState::from_vessels(&vessels);
        let snapshot_copy = base.clone();

        let voyage = Voyage {
            voyage_id: "VOY-0001".to_string(),
            vessel_id: "A".to_string(),
            commitment_ids: vec!["C1".to_string()],
            legs: vec![
                leg(LegKind::Loading, t(1), t(3), "X", Some("BX")),
                leg(LegKind::Transit, t(3), t(8), "Y", None),
                leg(LegKind::Discharge, t(8), t(10), "Y", Some("BY")),
            ],
            load_berth_id: Some("BX".to_string()),
            discharge_berth_id: Some("BY".to_string()),
            cost: VoyageCostEstimate::default(),
            soft_violations: vec![],
        };

        let next = base.apply_voyage(&voyage, 320.0);
        assert_eq!(next.version(), 1);
        let a = next.position("A").unwrap();
        assert_eq!(a.port_id, "Y");
        assert_eq!(a.available_from, t(10));
        assert!((a.committed_days() - 9.0).abs() < 1e-9);
        assert_eq!(a.fuel_on_board_t, 320.0);
        assert_eq!(next.berth_bookings("BX").len(), 1);
        assert!(next.berth_bookings("BZ").is_empty());

        // 拷贝不受影响
        assert_eq!(snapshot_copy.version(), 0);
        assert_eq!(snapshot_copy.position("A").unwrap().available_from, t(1));
        assert_eq!(next.position("B"), snapshot_copy.position("B"));
    }
}
