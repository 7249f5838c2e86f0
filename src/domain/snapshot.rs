// ==========================================
// 航次排产系统 - 主数据快照
// ==========================================
// 由数据访问协作方提供, 一次生成请求内只读
// ==========================================

use crate::domain::cargo::CargoCommitment;
use crate::domain::port::{Berth, Port, Route};
use crate::domain::types::FuelType;
use crate::domain::vessel::Vessel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterDataSnapshot {
    pub vessels: Vec<Vessel>,
    pub ports: Vec<Port>,
    #[serde(default)]
    pub berths: Vec<Berth>,
    pub routes: Vec<Route>,
    pub commitments: Vec<CargoCommitment>,
    #[serde(default)]
    pub market_fuel_prices: HashMap<FuelType, f64>, // 定价协作方提供的市场油价
}

impl MasterDataSnapshot {
    pub fn vessel(&self, vessel_id: &str) -> Option<&Vessel> {
        self.vessels.iter().find(|v| v.vessel_id == vessel_id)
    }

    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.port_id == port_id)
    }

    pub fn berth(&self, berth_id: &str) -> Option<&Berth> {
        self.berths.iter().find(|b| b.berth_id == berth_id)
    }

    /// 港口下的泊位 (按ID排序, 保证确定性)
    pub fn berths_at(&self, port_id: &str) -> Vec<&Berth> {
        let mut berths: Vec<&Berth> = self.berths.iter().filter(|b| b.port_id == port_id).collect();
        berths.sort_by(|a, b| a.berth_id.cmp(&b.berth_id));
        berths
    }

    pub fn commitment(&self, commitment_id: &str) -> Option<&CargoCommitment> {
        self.commitments.iter().find(|c| c.commitment_id == commitment_id)
    }

    /// 活跃船舶 (按ID排序)
    pub fn active_vessels(&self) -> Vec<&Vessel> {
        let mut vessels: Vec<&Vessel> = self.vessels.iter().filter(|v| v.is_active()).collect();
        vessels.sort_by(|a, b| a.vessel_id.cmp(&b.vessel_id));
        vessels
    }
}
