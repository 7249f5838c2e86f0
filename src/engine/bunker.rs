// ==========================================
// 航次排产系统 - 加油港选择
// ==========================================
// 约束最小化 (非 TSP): 每个候选港独立评估, 取总成本最低者
// 总成本 = 绕航天数 × 日租金 + 绕航油耗 × 油价 + 购油量 × 油价
// 约束: 到达加油港前存油不低于安全余量; 购油后不超过油舱容量
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::vessel::Vessel;
use crate::engine::route_search::{ComposedRoute, PortNetwork};
use serde::{Deserialize, Serialize};

// ==========================================
// BunkerStop - 加油挂靠
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerStop {
    pub port_id: String,
    /// 在重载航线第几个港口之后插入 (0 = 装港)
    pub anchor_index: usize,
    pub anchor_port_id: String,
    pub detour_nm: f64,
    pub detour_hours: f64,
    pub call_hours: f64,
    pub purchase_t: f64,
    pub price_usd_per_t: f64,
    pub total_cost: f64,
}

impl BunkerStop {
    /// 加油航段总时长
    pub fn leg_hours(&self) -> f64 {
        self.detour_hours + self.call_hours
    }

    pub fn fuel_cost(&self) -> f64 {
        self.purchase_t * self.price_usd_per_t
    }
}

// ==========================================
// BunkerRequest - 选港输入
// ==========================================
#[derive(Debug, Clone)]
pub struct BunkerRequest<'a> {
    pub vessel: &'a Vessel,
    pub laden_route: &'a ComposedRoute,
    /// 航次开始时存油
    pub fuel_on_board_t: f64,
    /// 到达装港 (含装货) 前已消耗
    pub fuel_before_route_t: f64,
    /// 整个航次预计油耗
    pub voyage_requirement_t: f64,
}

/// 选择加油港
///
/// # 返回
/// - 空: 存油足够, 或无可行候选 (此时油耗按参考价计价)
/// - 单元素: 总成本最低的加油挂靠
pub fn select_bunker_ports(
    request: &BunkerRequest<'_>,
    network: &PortNetwork<'_>,
    config: &EngineConfig,
) -> Vec<BunkerStop> {
    let vessel = request.vessel;
    let fuel_type = vessel.consumption.fuel_type;
    let required = request.voyage_requirement_t + config.bunker_safety_margin_t;
    let shortfall = required - request.fuel_on_board_t;
    if shortfall <= 0.0 {
        return Vec::new();
    }

    let route = request.laden_route;
    if route.ports.len() < 2 || vessel.service_speed_kn <= 0.0 {
        return Vec::new();
    }

    // 到达重载航线第 i 个港口时的累计油耗
    let laden_rate = vessel.consumption.laden_t_per_day;
    let mut fuel_at: Vec<f64> = Vec::with_capacity(route.ports.len());
    let mut used = request.fuel_before_route_t;
    fuel_at.push(used);
    for edge in &route.edges {
        let hours = edge.weighted_distance(config.weather_margin) / vessel.service_speed_kn;
        used += laden_rate * hours / 24.0;
        fuel_at.push(used);
    }

    let mut best: Option<BunkerStop> = None;
    for candidate in network.ports_sorted() {
        let Some(price) = candidate.bunker_price(fuel_type) else {
            continue;
        };

        // 锚点: 航线上的港口 (终点除外); 航线外港口取最近锚点并往返绕航
        let anchor = route.ports[..route.ports.len() - 1]
            .iter()
            .enumerate()
            .filter_map(|(idx, port_id)| {
                let anchor_port = network.port(port_id)?;
                let detour = if *port_id == candidate.port_id {
                    0.0
                } else {
                    2.0 * anchor_port.position.great_circle_nm(&candidate.position)
                };
                Some((idx, port_id, detour))
            })
            .filter(|(_, _, detour)| *detour <= 2.0 * config.max_bunker_detour_nm)
            .min_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.cmp(&b.0)));

        let Some((anchor_index, anchor_port_id, detour_nm)) = anchor else {
            continue;
        };

        let detour_hours = detour_nm / vessel.service_speed_kn * config.weather_margin;
        let detour_fuel = laden_rate * detour_hours / 24.0;

        // 到港前存油须高于安全余量
        let fuel_before_stop = fuel_at[anchor_index] + detour_fuel / 2.0;
        if request.fuel_on_board_t - fuel_before_stop < config.bunker_safety_margin_t {
            continue;
        }

        let mut purchase = shortfall + detour_fuel;
        if vessel.fuel_capacity_t > 0.0 {
            let room = vessel.fuel_capacity_t - (request.fuel_on_board_t - fuel_before_stop);
            if room < purchase {
                continue;
            }
            purchase = purchase.min(room);
        }

        let detour_days = detour_hours / 24.0;
        let total_cost = detour_days * vessel.daily_hire_usd + purchase * price;

        let stop = BunkerStop {
            port_id: candidate.port_id.clone(),
            anchor_index,
            anchor_port_id: anchor_port_id.clone(),
            detour_nm,
            detour_hours,
            call_hours: config.bunker_call_hours,
            purchase_t: purchase,
            price_usd_per_t: price,
            total_cost,
        };

        let better = match &best {
            None => true,
            Some(current) => stop.total_cost < current.total_cost - 1e-6,
        };
        if better {
            best = Some(stop);
        }
    }

    match best {
        Some(stop) => {
            tracing::debug!(
                vessel_id = %vessel.vessel_id,
                port_id = %stop.port_id,
                purchase_t = stop.purchase_t,
                total_cost = stop.total_cost,
                "选定加油港"
            );
            vec![stop]
        }
        None => {
            tracing::debug!(vessel_id = %vessel.vessel_id, shortfall, "无可行加油港, 按参考油价计价");
            Vec::new()
        }
    }
}
