// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use voyage_aps::domain::cargo::CargoCommitment;
use voyage_aps::domain::port::{Berth, CargoHandlingRate, GeoPoint, Port, Route};
use voyage_aps::domain::schedule::ScheduleConfig;
use voyage_aps::domain::snapshot::MasterDataSnapshot;
use voyage_aps::domain::types::{CommitmentStatus, FuelType, VesselStatus};
use voyage_aps::domain::vessel::{ConsumptionProfile, Vessel};
use voyage_aps::domain::window::TimeWindow;

/// 2026年3月的时刻
pub fn t(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

// ==========================================
// Vessel 构建器
// ==========================================

pub struct VesselBuilder {
    vessel: Vessel,
}

impl VesselBuilder {
    pub fn new(vessel_id: &str) -> Self {
        Self {
            vessel: Vessel {
                vessel_id: vessel_id.to_string(),
                name: format!("MV {}", vessel_id),
                dwt_t: 60_000.0,
                service_speed_kn: 12.0,
                consumption: ConsumptionProfile {
                    fuel_type: FuelType::Vlsfo,
                    laden_t_per_day: 30.0,
                    ballast_t_per_day: 25.0,
                    port_t_per_day: 3.0,
                },
                length_m: 200.0,
                beam_m: 32.0,
                draft_m: 12.0,
                daily_hire_usd: 10_000.0,
                status: VesselStatus::Active,
                open_port_id: "X".to_string(),
                open_from: t(1, 0),
                cargo_capabilities: vec![],
                fuel_capacity_t: 0.0,
                fuel_on_board_t: 5_000.0,
            },
        }
    }

    pub fn dwt(mut self, dwt_t: f64) -> Self {
        self.vessel.dwt_t = dwt_t;
        self
    }

    pub fn speed(mut self, knots: f64) -> Self {
        self.vessel.service_speed_kn = knots;
        self
    }

    pub fn hire(mut self, usd_per_day: f64) -> Self {
        self.vessel.daily_hire_usd = usd_per_day;
        self
    }

    pub fn open_at(mut self, port_id: &str, from: NaiveDateTime) -> Self {
        self.vessel.open_port_id = port_id.to_string();
        self.vessel.open_from = from;
        self
    }

    pub fn length(mut self, meters: f64) -> Self {
        self.vessel.length_m = meters;
        self
    }

    pub fn build(self) -> Vessel {
        self.vessel
    }
}

// ==========================================
// CargoCommitment 构建器
// ==========================================

pub struct CommitmentBuilder {
    commitment: CargoCommitment,
}

impl CommitmentBuilder {
    pub fn new(commitment_id: &str) -> Self {
        Self {
            commitment: CargoCommitment {
                commitment_id: commitment_id.to_string(),
                commodity: "COAL".to_string(),
                quantity_t: 40_000.0,
                load_port_id: "X".to_string(),
                discharge_port_id: "Z".to_string(),
                laycan: TimeWindow::new(t(1, 0), t(5, 0)),
                freight_rate_usd_per_t: Some(20.0),
                delivery_deadline: None,
                late_penalty_usd_per_day: None,
                status: CommitmentStatus::Pending,
            },
        }
    }

    pub fn quantity(mut self, tonnes: f64) -> Self {
        self.commitment.quantity_t = tonnes;
        self
    }

    pub fn ports(mut self, load: &str, discharge: &str) -> Self {
        self.commitment.load_port_id = load.to_string();
        self.commitment.discharge_port_id = discharge.to_string();
        self
    }

    pub fn laycan(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.commitment.laycan = TimeWindow::new(start, end);
        self
    }

    pub fn deadline(mut self, deadline: NaiveDateTime, penalty_per_day: f64) -> Self {
        self.commitment.delivery_deadline = Some(deadline);
        self.commitment.late_penalty_usd_per_day = Some(penalty_per_day);
        self
    }

    pub fn build(self) -> CargoCommitment {
        self.commitment
    }
}

// ==========================================
// 港口/泊位/航线
// ==========================================

/// 赤道上按经度排布的港口, 无等待, 装卸各 20000 t/天
pub fn port(port_id: &str, lon: f64) -> Port {
    Port {
        port_id: port_id.to_string(),
        name: port_id.to_string(),
        position: GeoPoint::new(0.0, lon),
        default_rate: CargoHandlingRate { load_t_per_day: 20_000.0, discharge_t_per_day: 20_000.0 },
        cargo_rates: HashMap::new(),
        waiting_hours: Some(0.0),
        congestion_factor: 1.0,
        port_fee_usd: 10_000.0,
        max_draft_m: None,
        bunker_prices: HashMap::new(),
    }
}

pub fn berth(berth_id: &str, port_id: &str) -> Berth {
    Berth {
        berth_id: berth_id.to_string(),
        port_id: port_id.to_string(),
        max_length_m: 250.0,
        max_beam_m: 40.0,
        max_draft_m: 15.0,
        cargo_types: vec![],
        capacity: 1,
        calendar: vec![],
        constraints: vec![],
    }
}

/// 天气系数固定为 1.0 的航线
pub fn route(from: &str, to: &str, distance_nm: f64) -> Route {
    Route {
        route_id: format!("{}-{}", from, to),
        from_port_id: from.to_string(),
        to_port_id: to.to_string(),
        distance_nm,
        typical_duration_hours: None,
        canal_id: None,
        weather_factor: Some(1.0),
        waypoints: vec![],
    }
}

// ==========================================
// 快照与请求
// ==========================================

/// X → Z 720 海里的两港场景
pub fn two_port_snapshot(vessels: Vec<Vessel>, commitments: Vec<CargoCommitment>) -> MasterDataSnapshot {
    MasterDataSnapshot {
        vessels,
        ports: vec![port("X", 0.0), port("Z", 12.0)],
        berths: vec![],
        routes: vec![route("X", "Z", 720.0), route("Z", "X", 720.0)],
        commitments,
        market_fuel_prices: [(FuelType::Vlsfo, 600.0)].into_iter().collect(),
    }
}

pub fn march_request(strategy: &str) -> ScheduleConfig {
    ScheduleConfig {
        name: None,
        module_scope: "dry-bulk".to_string(),
        date_range_start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        date_range_end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        strategy: strategy.to_string(),
        min_utilization_pct: 0.0,
        max_utilization_pct: 100.0,
        bunker_optimization_enabled: false,
    }
}
