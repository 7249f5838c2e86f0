// ==========================================
// 航次排产系统 - 航线网络与最短路搜索
// ==========================================
// 职责: 直达边优先; 无直达边时 A* 搜索复合航线
// 启发式: 大圆距离 (海里); 边权: 距离 × 天气系数
// 平局: 估算金额更低者优先, 再按港口ID
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::port::{Port, Route};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

const EPS: f64 = 1e-9;

// ==========================================
// RouteCostModel - 边金额估算参数
// ==========================================
// 用于同权重航线的平局裁决: 燃油 + 租金 + 运河费
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCostModel {
    pub speed_kn: f64,
    pub fuel_t_per_day: f64,
    pub fuel_price_usd_per_t: f64,
    pub daily_hire_usd: f64,
}

impl RouteCostModel {
    /// 只比较运河费 (无船舶上下文时)
    pub fn neutral() -> Self {
        Self {
            speed_kn: 1.0,
            fuel_t_per_day: 0.0,
            fuel_price_usd_per_t: 0.0,
            daily_hire_usd: 0.0,
        }
    }

    pub fn edge_cost(&self, route: &Route, config: &EngineConfig) -> f64 {
        let canal_fee = route
            .canal_id
            .as_deref()
            .and_then(|id| config.canal(id))
            .map(|c| c.fee_usd)
            .unwrap_or(0.0);
        if self.speed_kn <= 0.0 {
            return canal_fee;
        }
        let days = route.weighted_distance(config.weather_margin) / self.speed_kn / 24.0;
        days * (self.fuel_t_per_day * self.fuel_price_usd_per_t + self.daily_hire_usd) + canal_fee
    }
}

// ==========================================
// ComposedRoute - 复合航线
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedRoute {
    pub ports: Vec<String>, // 有序港口序列 (含起终点)
    pub edges: Vec<Route>,
    pub distance_nm: f64,
    pub weighted_distance_nm: f64,
    pub estimated_cost: f64,
}

impl ComposedRoute {
    /// 原地不动 (起终点相同)
    pub fn stay(port_id: &str) -> Self {
        Self {
            ports: vec![port_id.to_string()],
            edges: vec![],
            distance_nm: 0.0,
            weighted_distance_nm: 0.0,
            estimated_cost: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn origin(&self) -> Option<&str> {
        self.ports.first().map(String::as_str)
    }

    pub fn destination(&self) -> Option<&str> {
        self.ports.last().map(String::as_str)
    }

    /// 途经运河
    pub fn canal_ids(&self) -> Vec<&str> {
        self.edges.iter().filter_map(|e| e.canal_id.as_deref()).collect()
    }
}

// ==========================================
// A* 前沿节点
// ==========================================
#[derive(Debug, Clone)]
struct Frontier {
    f: f64,
    g: f64,
    money: f64,
    port_id: String,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    // BinaryHeap 是最大堆: 反转比较得到最小 f 优先
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.money.total_cmp(&self.money))
            .then_with(|| other.port_id.cmp(&self.port_id))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ==========================================
// PortNetwork - 港口图
// ==========================================
pub struct PortNetwork<'a> {
    ports: HashMap<&'a str, &'a Port>,
    adjacency: HashMap<&'a str, Vec<&'a Route>>,
    config: &'a EngineConfig,
}

impl<'a> PortNetwork<'a> {
    pub fn new(ports: &'a [Port], routes: &'a [Route], config: &'a EngineConfig) -> Self {
        let ports_map: HashMap<&str, &Port> = ports.iter().map(|p| (p.port_id.as_str(), p)).collect();

        let mut adjacency: HashMap<&str, Vec<&Route>> = HashMap::new();
        for route in routes {
            adjacency.entry(route.from_port_id.as_str()).or_default().push(route);
        }
        // 邻接表按 (终点, 航线ID) 排序, 保证展开顺序确定
        for edges in adjacency.values_mut() {
            edges.sort_by(|a, b| {
                a.to_port_id
                    .cmp(&b.to_port_id)
                    .then_with(|| a.route_id.cmp(&b.route_id))
            });
        }

        Self {
            ports: ports_map,
            adjacency,
            config,
        }
    }

    pub fn port(&self, port_id: &str) -> Option<&'a Port> {
        self.ports.get(port_id).copied()
    }

    /// 全部港口 (按ID排序)
    pub fn ports_sorted(&self) -> Vec<&'a Port> {
        let mut ports: Vec<&Port> = self.ports.values().copied().collect();
        ports.sort_by(|a, b| a.port_id.cmp(&b.port_id));
        ports
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    fn heuristic(&self, from: &str, to: &str) -> f64 {
        match (self.port(from), self.port(to)) {
            (Some(a), Some(b)) => a.position.great_circle_nm(&b.position),
            _ => 0.0,
        }
    }

    /// 查找航线: 有直达边则取直达, 否则 A*
    pub fn find_route(&self, from: &str, to: &str, cost: &RouteCostModel) -> Option<ComposedRoute> {
        if from == to {
            return Some(ComposedRoute::stay(from));
        }
        if let Some(direct) = self.best_direct_edge(from, to, cost) {
            return Some(self.compose(vec![direct], cost));
        }
        self.a_star(from, to, cost)
    }

    fn best_direct_edge(&self, from: &str, to: &str, cost: &RouteCostModel) -> Option<&'a Route> {
        let margin = self.config.weather_margin;
        self.adjacency
            .get(from)?
            .iter()
            .filter(|r| r.to_port_id == to)
            .copied()
            .min_by(|a, b| {
                a.weighted_distance(margin)
                    .total_cmp(&b.weighted_distance(margin))
                    .then_with(|| {
                        cost.edge_cost(a, self.config)
                            .total_cmp(&cost.edge_cost(b, self.config))
                    })
                    .then_with(|| a.route_id.cmp(&b.route_id))
            })
    }

    fn a_star(&self, from: &str, to: &str, cost: &RouteCostModel) -> Option<ComposedRoute> {
        let margin = self.config.weather_margin;

        // 港口 → (g, money)
        let mut best: HashMap<&str, (f64, f64)> = HashMap::new();
        // 港口 → 到达该港口的边
        let mut came_by: HashMap<&str, &'a Route> = HashMap::new();
        let mut heap = BinaryHeap::new();

        best.insert(from, (0.0, 0.0));
        heap.push(Frontier {
            f: self.heuristic(from, to),
            g: 0.0,
            money: 0.0,
            port_id: from.to_string(),
        });

        while let Some(node) = heap.pop() {
            let Some(&(best_g, best_money)) = best.get(node.port_id.as_str()) else {
                continue;
            };
            // 过期条目
            if node.g > best_g + EPS || (node.g > best_g - EPS && node.money > best_money + EPS) {
                continue;
            }
            if node.port_id == to {
                let mut edges = Vec::new();
                let mut cursor = to;
                while cursor != from {
                    let edge = came_by.get(cursor)?;
                    edges.push(*edge);
                    cursor = edge.from_port_id.as_str();
                }
                edges.reverse();
                return Some(self.compose(edges, cost));
            }

            let Some(edges) = self.adjacency.get(node.port_id.as_str()) else {
                continue;
            };
            for edge in edges {
                let next = edge.to_port_id.as_str();
                let g = node.g + edge.weighted_distance(margin);
                let money = node.money + cost.edge_cost(edge, self.config);

                let improved = match best.get(next) {
                    None => true,
                    Some(&(bg, bm)) => g < bg - EPS || (g < bg + EPS && money < bm - EPS),
                };
                if improved {
                    best.insert(next, (g, money));
                    came_by.insert(next, edge);
                    heap.push(Frontier {
                        f: g + self.heuristic(next, to),
                        g,
                        money,
                        port_id: next.to_string(),
                    });
                }
            }
        }

        tracing::debug!(from, to, "港口图中无可达航线");
        None
    }

    fn compose(&self, edges: Vec<&Route>, cost: &RouteCostModel) -> ComposedRoute {
        let margin = self.config.weather_margin;
        let mut ports = Vec::with_capacity(edges.len() + 1);
        if let Some(first) = edges.first() {
            ports.push(first.from_port_id.clone());
        }
        ports.extend(edges.iter().map(|e| e.to_port_id.clone()));

        ComposedRoute {
            ports,
            distance_nm: edges.iter().map(|e| e.distance_nm).sum(),
            weighted_distance_nm: edges.iter().map(|e| e.weighted_distance(margin)).sum(),
            estimated_cost: edges.iter().map(|e| cost.edge_cost(e, self.config)).sum(),
            edges: edges.into_iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::port::{CargoHandlingRate, GeoPoint};

    fn port(id: &str, lat: f64, lon: f64) -> Port {
        Port {
            port_id: id.to_string(),
            name: id.to_string(),
            position: GeoPoint::new(lat, lon),
            default_rate: CargoHandlingRate { load_t_per_day: 20_000.0, discharge_t_per_day: 20_000.0 },
            cargo_rates: HashMap::new(),
            waiting_hours: None,
            congestion_factor: 1.0,
            port_fee_usd: 0.0,
            max_draft_m: None,
            bunker_prices: HashMap::new(),
        }
    }

    fn route(id: &str, from: &str, to: &str, distance: f64, canal: Option<&str>) -> Route {
        Route {
            route_id: id.to_string(),
            from_port_id: from.to_string(),
            to_port_id: to.to_string(),
            distance_nm: distance,
            typical_duration_hours: None,
            canal_id: canal.map(str::to_string),
            weather_factor: Some(1.0),
            waypoints: vec![],
        }
    }

    #[test]
    fn test_same_port_is_empty_route() {
        let config = EngineConfig::default();
        let ports = vec![port("A", 0.0, 0.0)];
        let network = PortNetwork::new(&ports, &[], &config);
        let r = network.find_route("A", "A", &RouteCostModel::neutral()).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.ports, vec!["A".to_string()]);
    }

    #[test]
    fn test_unreachable_returns_none() {
        let config = EngineConfig::default();
        let ports = vec![port("A", 0.0, 0.0), port("B", 0.0, 1.0)];
        let routes = vec![route("R1", "B", "A", 60.0, None)];
        let network = PortNetwork::new(&ports, &routes, &config);
        assert!(network.find_route("A", "B", &RouteCostModel::neutral()).is_none());
    }

    #[test]
    fn test_equal_weight_paths_prefer_cheaper_canal() {
        let config = EngineConfig::default();
        // 两条等长路径, 一条经 SUEZ (45 万美元), 一条经 KIEL (2.5 万美元)
        let ports = vec![
            port("A", 0.0, 0.0),
            port("B", 0.0, 1.0),
            port("C", 0.0, 1.0),
            port("D", 0.0, 2.0),
        ];
        let routes = vec![
            route("AB", "A", "B", 100.0, Some("SUEZ")),
            route("BD", "B", "D", 100.0, None),
            route("AC", "A", "C", 100.0, Some("KIEL")),
            route("CD", "C", "D", 100.0, None),
        ];
        let network = PortNetwork::new(&ports, &routes, &config);
        let r = network.find_route("A", "D", &RouteCostModel::neutral()).unwrap();
        assert_eq!(r.ports, vec!["A", "C", "D"]);
        assert_eq!(r.canal_ids(), vec!["KIEL"]);
        assert!((r.estimated_cost - 25_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_weather_factor_changes_edge_weight() {
        let config = EngineConfig::default();
        let ports = vec![
            port("A", 0.0, 0.0),
            port("B", 0.0, 1.0),
            port("C", 0.0, 2.0),
            port("D", 0.0, 1.0),
        ];
        let mut stormy = route("AB", "A", "B", 80.0, None);
        stormy.weather_factor = Some(1.5);
        let routes = vec![
            stormy,
            route("BC", "B", "C", 70.0, None),
            route("AD", "A", "D", 90.0, None),
            route("DC", "D", "C", 90.0, None),
        ];
        let network = PortNetwork::new(&ports, &routes, &config);
        // 经 B 原始距离更短 (150 < 180), 但加权后 190 > 180
        let r = network.find_route("A", "C", &RouteCostModel::neutral()).unwrap();
        assert_eq!(r.ports, vec!["A", "D", "C"]);
        assert!((r.distance_nm - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_direct_edge_preferred() {
        let config = EngineConfig::default();
        let ports = vec![port("A", 0.0, 0.0), port("B", 0.0, 1.0), port("C", 0.0, 2.0)];
        let routes = vec![
            route("AB", "A", "B", 60.0, None),
            route("BC", "B", "C", 60.0, None),
            route("AC", "A", "C", 200.0, None),
        ];
        let network = PortNetwork::new(&ports, &routes, &config);
        let r = network.find_route("A", "C", &RouteCostModel::neutral()).unwrap();
        assert_eq!(r.edges.len(), 1);
        assert_eq!(r.edges[0].route_id, "AC");
    }
}
