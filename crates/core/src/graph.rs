use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::health::{HealthStatus, NeighborHealth, ServiceHealth};
use crate::model::dependency::DependencyEdge;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub health: HealthStatus,
    pub error_rate: f64,
    pub request_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub call_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyInfo {
    pub service_name: String,
    pub call_count: i64,
    pub health_status: NeighborHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceDependencies {
    pub service_name: String,
    pub inbound: Vec<DependencyInfo>,
    pub outbound: Vec<DependencyInfo>,
}

/// Every service named as a source or target, deduplicated and sorted.
pub fn service_universe(edges: &[DependencyEdge]) -> BTreeSet<&str> {
    edges
        .iter()
        .flat_map(|e| [e.source_service.as_str(), e.target_service.as_str()])
        .collect()
}

/// Joins the edge table with per-service health. Services that emitted no
/// spans in the window still get a node, reported healthy with no traffic.
/// Nodes come out sorted by id; edges keep table order.
pub fn build_graph(edges: &[DependencyEdge], health: &[ServiceHealth]) -> DependencyGraph {
    let by_service: BTreeMap<&str, &ServiceHealth> = health
        .iter()
        .map(|h| (h.service_name.as_str(), h))
        .collect();

    let nodes = service_universe(edges)
        .into_iter()
        .map(|id| match by_service.get(id) {
            Some(h) => GraphNode {
                id: id.to_string(),
                health: h.health_status,
                error_rate: h.current.error_rate,
                request_count: h.current.request_count,
            },
            None => GraphNode {
                id: id.to_string(),
                health: HealthStatus::Healthy,
                error_rate: 0.0,
                request_count: 0,
            },
        })
        .collect();

    let edges = edges
        .iter()
        .map(|e| GraphEdge {
            source: e.source_service.clone(),
            target: e.target_service.clone(),
            call_count: e.call_count,
        })
        .collect();

    DependencyGraph { nodes, edges }
}

/// Splits the edge table around `service`. Neighbours missing from `verdicts`
/// are reported as `unknown`.
pub fn resolve_dependencies(
    service: &str,
    edges: &[DependencyEdge],
    verdicts: &BTreeMap<String, HealthStatus>,
) -> ServiceDependencies {
    let neighbor = |name: &str, call_count: i64| DependencyInfo {
        service_name: name.to_string(),
        call_count,
        health_status: NeighborHealth::from(verdicts.get(name).copied()),
    };

    let mut inbound = Vec::new();
    let mut outbound = Vec::new();
    for edge in edges {
        if edge.target_service == service {
            inbound.push(neighbor(&edge.source_service, edge.call_count));
        }
        if edge.source_service == service {
            outbound.push(neighbor(&edge.target_service, edge.call_count));
        }
    }

    for list in [&mut inbound, &mut outbound] {
        list.sort_by(|a, b| {
            Reverse(a.call_count)
                .cmp(&Reverse(b.call_count))
                .then_with(|| a.service_name.cmp(&b.service_name))
        });
    }

    ServiceDependencies {
        service_name: service.to_string(),
        inbound,
        outbound,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::stats::MetricsSnapshot;

    fn health(service: &str, status: HealthStatus, error_rate: f64, requests: i64) -> ServiceHealth {
        ServiceHealth {
            service_name: service.to_string(),
            health_status: status,
            current: MetricsSnapshot {
                latency_p50: 1.0,
                latency_p95: 1.0,
                latency_p99: 1.0,
                avg_duration_ms: 1.0,
                max_duration_ms: 1.0,
                error_count: (error_rate * requests as f64) as i64,
                error_rate,
                request_count: requests,
                requests_per_second: 0.0,
            },
        }
    }

    fn edges() -> Vec<DependencyEdge> {
        vec![
            DependencyEdge::new("frontend", "checkout", 120),
            DependencyEdge::new("checkout", "payments", 80),
            DependencyEdge::new("checkout", "inventory", 200),
            DependencyEdge::new("frontend", "inventory", 80),
        ]
    }

    #[test]
    fn node_set_equals_edge_endpoints() {
        let edges = edges();
        let graph = build_graph(&edges, &[health("frontend", HealthStatus::Warning, 0.02, 50)]);

        let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let endpoints: HashSet<&str> = edges
            .iter()
            .flat_map(|e| [e.source_service.as_str(), e.target_service.as_str()])
            .collect();
        assert_eq!(node_ids, endpoints);
        assert_eq!(graph.nodes.len(), 4);
        for edge in &graph.edges {
            assert!(node_ids.contains(edge.source.as_str()));
            assert!(node_ids.contains(edge.target.as_str()));
        }
    }

    #[test]
    fn silent_services_default_to_healthy() {
        let graph = build_graph(
            &edges(),
            &[health("checkout", HealthStatus::Critical, 0.1, 40)],
        );
        let checkout = graph.nodes.iter().find(|n| n.id == "checkout").unwrap();
        assert_eq!(checkout.health, HealthStatus::Critical);
        assert_eq!(checkout.request_count, 40);

        let payments = graph.nodes.iter().find(|n| n.id == "payments").unwrap();
        assert_eq!(payments.health, HealthStatus::Healthy);
        assert_eq!(payments.error_rate, 0.0);
        assert_eq!(payments.request_count, 0);
    }

    #[test]
    fn services_outside_edge_table_get_no_node() {
        let graph = build_graph(&edges(), &[health("batch", HealthStatus::Warning, 0.02, 9)]);
        assert!(graph.nodes.iter().all(|n| n.id != "batch"));
    }

    #[test]
    fn edges_pass_through_in_table_order() {
        let graph = build_graph(&edges(), &[]);
        let calls: Vec<i64> = graph.edges.iter().map(|e| e.call_count).collect();
        assert_eq!(calls, vec![120, 80, 200, 80]);
    }

    #[test]
    fn graph_is_deterministic() {
        let h = [
            health("inventory", HealthStatus::Healthy, 0.0, 5),
            health("frontend", HealthStatus::Warning, 0.02, 50),
        ];
        let mut reversed = h.clone();
        reversed.reverse();
        assert_eq!(build_graph(&edges(), &h), build_graph(&edges(), &reversed));
    }

    #[test]
    fn graph_serializes_camel_case() {
        let graph = build_graph(&[DependencyEdge::new("a", "b", 3)], &[]);
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["edges"][0]["callCount"], 3);
        assert_eq!(json["nodes"][0]["requestCount"], 0);
        assert_eq!(json["nodes"][0]["health"], "healthy");
    }

    #[test]
    fn resolver_splits_and_orders_by_call_count() {
        let verdicts = BTreeMap::from([
            ("frontend".to_string(), HealthStatus::Warning),
            ("inventory".to_string(), HealthStatus::Healthy),
        ]);
        let deps = resolve_dependencies("checkout", &edges(), &verdicts);

        assert_eq!(deps.inbound.len(), 1);
        assert_eq!(deps.inbound[0].service_name, "frontend");
        assert_eq!(deps.inbound[0].health_status, NeighborHealth::Warning);

        let outbound: Vec<(&str, i64)> = deps
            .outbound
            .iter()
            .map(|d| (d.service_name.as_str(), d.call_count))
            .collect();
        assert_eq!(outbound, vec![("inventory", 200), ("payments", 80)]);
        assert_eq!(deps.outbound[1].health_status, NeighborHealth::Unknown);
    }

    #[test]
    fn resolver_for_unknown_service_is_empty() {
        let deps = resolve_dependencies("nobody", &edges(), &BTreeMap::new());
        assert!(deps.inbound.is_empty());
        assert!(deps.outbound.is_empty());
        assert_eq!(deps.service_name, "nobody");
    }
}
