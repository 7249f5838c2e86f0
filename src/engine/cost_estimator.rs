// ==========================================
// 航次排产系统 - 航次成本估算
// ==========================================
// 海上时间 = 距离 / 航速 × 天气系数
// 在港时间 = 货量 / 装卸效率 + 等待额度 (等待小时 × 拥堵系数)
// 运河航段 = 该边航行时间 + 运河固定通行时间, 通行费计入港口费用
// 燃油成本 = 加油计划量 × 加油价 + 其余油耗 × 参考油价
// 租金 = 日租金 × 航次总天数
// TCE 仅作展示, 不参与可行性判定
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::cargo::CargoCommitment;
use crate::domain::port::{Port, Route};
use crate::domain::types::FuelType;
use crate::domain::vessel::Vessel;
use crate::domain::voyage::VoyageCostEstimate;
use crate::engine::bunker::BunkerStop;
use crate::engine::route_search::{ComposedRoute, PortNetwork, RouteCostModel};
use chrono::NaiveDateTime;
use std::collections::HashMap;

// ==========================================
// VoyageCostInput - 估算输入
// ==========================================
#[derive(Debug, Clone)]
pub struct VoyageCostInput<'a> {
    pub vessel: &'a Vessel,
    pub cargo: &'a CargoCommitment,
    pub load_port: &'a Port,
    pub discharge_port: &'a Port,
    pub ballast: &'a ComposedRoute,
    pub laden: &'a ComposedRoute,
    pub bunker_stops: &'a [BunkerStop],
    /// 等装期/等泊位的额外等待
    pub extra_waiting_hours: f64,
    pub reference_fuel_price: f64,
    /// 卸毕时间 (计算逾期扣减)
    pub discharge_end: Option<NaiveDateTime>,
}

/// 单条航线的海上/运河小时数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteHours {
    pub sea_hours: f64,
    pub canal_hours: f64,
}

impl RouteHours {
    pub fn total(&self) -> f64 {
        self.sea_hours + self.canal_hours
    }
}

// ==========================================
// CostEstimator - 成本估算器
// ==========================================
pub struct CostEstimator<'c> {
    config: &'c EngineConfig,
}

impl<'c> CostEstimator<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    /// 单条边的航行小时 (含天气系数, 不含运河固定时间)
    pub fn edge_sea_hours(&self, vessel: &Vessel, edge: &Route) -> f64 {
        vessel.sailing_hours(edge.distance_nm) * edge.weather_multiplier(self.config.weather_margin)
    }

    /// 运河固定通行时间 (未配置的运河按 0 处理)
    pub fn canal_fixed_hours(&self, edge: &Route) -> f64 {
        match edge.canal_id.as_deref() {
            Some(id) => match self.config.canal(id) {
                Some(spec) => spec.transit_hours,
                None => {
                    tracing::warn!(canal_id = id, route_id = %edge.route_id, "运河未配置, 通行时间/费用按 0 处理");
                    0.0
                }
            },
            None => 0.0,
        }
    }

    pub fn canal_fee(&self, edge: &Route) -> f64 {
        edge.canal_id
            .as_deref()
            .and_then(|id| self.config.canal(id))
            .map(|c| c.fee_usd)
            .unwrap_or(0.0)
    }

    /// 单条边航段时长: 运河边 = 航行 + 固定通行
    pub fn edge_leg_hours(&self, vessel: &Vessel, edge: &Route) -> f64 {
        self.edge_sea_hours(vessel, edge) + self.canal_fixed_hours(edge)
    }

    pub fn route_hours(&self, vessel: &Vessel, route: &ComposedRoute) -> RouteHours {
        route.edges.iter().fold(RouteHours::default(), |mut acc, edge| {
            if edge.canal_id.is_some() {
                acc.canal_hours += self.edge_leg_hours(vessel, edge);
            } else {
                acc.sea_hours += self.edge_sea_hours(vessel, edge);
            }
            acc
        })
    }

    /// 装港作业时长 (等待额度 + 装货)
    pub fn load_call_hours(&self, cargo: &CargoCommitment, port: &Port) -> f64 {
        let rate = port.rate_for(&cargo.commodity).load_t_per_day;
        self.waiting_allowance_hours(port) + handling_hours(cargo.quantity_t, rate)
    }

    /// 卸港作业时长 (等待额度 + 卸货)
    pub fn discharge_call_hours(&self, cargo: &CargoCommitment, port: &Port) -> f64 {
        let rate = port.rate_for(&cargo.commodity).discharge_t_per_day;
        self.waiting_allowance_hours(port) + handling_hours(cargo.quantity_t, rate)
    }

    pub fn waiting_allowance_hours(&self, port: &Port) -> f64 {
        port.effective_waiting_hours(self.config.default_port_waiting_hours)
    }

    /// 参考油价: 装港报价 → 市场油价表 → 配置缺省
    pub fn reference_fuel_price(
        &self,
        fuel: FuelType,
        load_port: &Port,
        market: &HashMap<FuelType, f64>,
    ) -> f64 {
        load_port
            .bunker_price(fuel)
            .or_else(|| market.get(&fuel).copied().filter(|p| *p > 0.0))
            .unwrap_or(self.config.default_fuel_price_usd_per_t)
    }

    /// 船舶相关的航线金额模型 (A* 平局裁决)
    pub fn route_cost_model(&self, vessel: &Vessel, laden: bool, fuel_price: f64) -> RouteCostModel {
        RouteCostModel {
            speed_kn: vessel.service_speed_kn,
            fuel_t_per_day: vessel.consumption.sea_rate(laden),
            fuel_price_usd_per_t: fuel_price,
            daily_hire_usd: vessel.daily_hire_usd,
        }
    }

    /// 按船舶上下文查找航线
    pub fn plan_route(
        &self,
        network: &PortNetwork<'_>,
        vessel: &Vessel,
        from: &str,
        to: &str,
        laden: bool,
        fuel_price: f64,
    ) -> Option<ComposedRoute> {
        network.find_route(from, to, &self.route_cost_model(vessel, laden, fuel_price))
    }

    /// 航次油耗 (吨), 不含加油绕航
    pub fn fuel_requirement(
        &self,
        vessel: &Vessel,
        ballast: RouteHours,
        laden: RouteHours,
        port_hours: f64,
    ) -> f64 {
        let c = &vessel.consumption;
        (c.ballast_t_per_day * ballast.total() + c.laden_t_per_day * laden.total() + c.port_t_per_day * port_hours)
            / 24.0
    }

    /// 航次成本估算
    pub fn estimate_voyage(&self, input: &VoyageCostInput<'_>) -> VoyageCostEstimate {
        let vessel = input.vessel;
        let cargo = input.cargo;
        let c = &vessel.consumption;

        let ballast = self.route_hours(vessel, input.ballast);
        let laden = self.route_hours(vessel, input.laden);

        let port_hours = self.load_call_hours(cargo, input.load_port)
            + self.discharge_call_hours(cargo, input.discharge_port);
        let waiting_hours = input.extra_waiting_hours.max(0.0);
        let detour_hours: f64 = input.bunker_stops.iter().map(|s| s.detour_hours).sum();
        let call_hours: f64 = input.bunker_stops.iter().map(|s| s.call_hours).sum();

        let ballast_sea_days = ballast.sea_hours / 24.0;
        let laden_sea_days = laden.sea_hours / 24.0;
        let canal_days = (ballast.canal_hours + laden.canal_hours) / 24.0;
        let port_days = port_hours / 24.0;
        let waiting_days = waiting_hours / 24.0;
        let bunker_days = (detour_hours + call_hours) / 24.0;
        let total_days =
            ballast_sea_days + laden_sea_days + canal_days + port_days + waiting_days + bunker_days;

        let fuel_consumed_t = self.fuel_requirement(vessel, ballast, laden, port_hours + waiting_hours + call_hours)
            + c.laden_t_per_day * detour_hours / 24.0;

        let purchased: f64 = input.bunker_stops.iter().map(|s| s.purchase_t).sum();
        let planned_fuel_cost: f64 = input.bunker_stops.iter().map(BunkerStop::fuel_cost).sum();
        let bunker_cost =
            planned_fuel_cost + (fuel_consumed_t - purchased).max(0.0) * input.reference_fuel_price;

        let hire_cost = vessel.daily_hire_usd * total_days;

        let canal_fees: f64 = input
            .ballast
            .edges
            .iter()
            .chain(input.laden.edges.iter())
            .map(|e| self.canal_fee(e))
            .sum();
        let port_cost = input.load_port.port_fee_usd + input.discharge_port.port_fee_usd + canal_fees;

        let total_cost = bunker_cost + hire_cost + port_cost;

        let penalty = input
            .discharge_end
            .map(|end| cargo.lateness_penalty(end))
            .unwrap_or(0.0);
        let revenue = (cargo.gross_freight() - penalty).max(0.0);

        let tce = if total_days > 0.0 {
            (revenue - bunker_cost - port_cost) / total_days
        } else {
            0.0
        };

        VoyageCostEstimate {
            ballast_sea_days,
            laden_sea_days,
            sea_days: ballast_sea_days + laden_sea_days,
            canal_days,
            port_days,
            waiting_days,
            bunker_days,
            total_days,
            fuel_consumed_t,
            bunker_cost,
            hire_cost,
            port_cost,
            total_cost,
            revenue,
            tce,
        }
    }

    /// 改派船舶后重新计价: 航段时刻不变, 按新船的油耗与日租重算
    ///
    /// 运河与加油挂靠天数按重载油耗计, 等待按在港油耗计; 全部油量按参考油价计价
    pub fn reprice_for_vessel(
        &self,
        estimate: &VoyageCostEstimate,
        vessel: &Vessel,
        reference_fuel_price: f64,
    ) -> VoyageCostEstimate {
        let c = &vessel.consumption;
        let fuel_consumed_t = c.ballast_t_per_day * estimate.ballast_sea_days
            + c.laden_t_per_day * (estimate.laden_sea_days + estimate.canal_days + estimate.bunker_days)
            + c.port_t_per_day * (estimate.port_days + estimate.waiting_days);
        let bunker_cost = fuel_consumed_t * reference_fuel_price;
        let hire_cost = vessel.daily_hire_usd * estimate.total_days;
        let total_cost = bunker_cost + hire_cost + estimate.port_cost;
        let tce = if estimate.total_days > 0.0 {
            (estimate.revenue - bunker_cost - estimate.port_cost) / estimate.total_days
        } else {
            0.0
        };

        VoyageCostEstimate {
            fuel_consumed_t,
            bunker_cost,
            hire_cost,
            total_cost,
            tce,
            ..estimate.clone()
        }
    }
}

/// 装卸小时 (效率缺失时按 0 处理)
fn handling_hours(quantity_t: f64, rate_t_per_day: f64) -> f64 {
    if rate_t_per_day > 0.0 {
        quantity_t / rate_t_per_day * 24.0
    } else {
        0.0
    }
}
