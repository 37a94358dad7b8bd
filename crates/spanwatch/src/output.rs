use chrono::{DateTime, SecondsFormat, Utc};
use owo_colors::OwoColorize;
use spanwatch::{ServiceDetail, StoreStatus};
use spanwatch_core::graph::{DependencyGraph, DependencyInfo, ServiceDependencies};
use spanwatch_core::health::{HealthStatus, NeighborHealth, ServiceHealth};
use spanwatch_core::model::trace::{TraceDetail, TraceInfo};

pub fn print_services_human(v: &[ServiceHealth]) {
    for s in v {
        println!(
            "{} {} requests={} rps={:.3} errors={:.2}% p50={:.1}ms p95={:.1}ms p99={:.1}ms",
            health_label(s.health_status),
            s.service_name.cyan(),
            s.current.request_count,
            s.current.requests_per_second,
            s.current.error_rate * 100.0,
            s.current.latency_p50,
            s.current.latency_p95,
            s.current.latency_p99,
        );
    }
    println!("-- {} services --", v.len());
}

pub fn print_service_human(v: &ServiceDetail) {
    println!(
        "SERVICE {} {}",
        v.service_name.cyan(),
        health_label(v.health_status)
    );
    println!(
        "{:<9} {:>9} {:>9} {:>9} {:>9} {:>8} {:>9}",
        "", "p50", "p95", "p99", "avg", "errors", "requests"
    );
    for (label, snap) in [("current", &v.current), ("baseline", &v.baseline)] {
        println!(
            "{:<9} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>8} {:>9}",
            label,
            snap.latency_p50,
            snap.latency_p95,
            snap.latency_p99,
            snap.avg_duration_ms,
            snap.error_count,
            snap.request_count
        );
    }
    for point in &v.trends {
        println!(
            "{} p95={:.1}ms avg={:.1}ms errors={} requests={}",
            ts(point.timestamp),
            point.latency_p95,
            point.avg_duration_ms,
            point.error_count,
            point.request_count
        );
    }
    println!("-- {} trend buckets --", v.trends.len());
}

pub fn print_dependencies_human(v: &ServiceDependencies) {
    println!("SERVICE {}", v.service_name.cyan());
    print_neighbors("inbound", &v.inbound);
    print_neighbors("outbound", &v.outbound);
}

fn print_neighbors(label: &str, neighbors: &[DependencyInfo]) {
    println!("{label} ({})", neighbors.len());
    for n in neighbors {
        println!(
            "  {} {} calls={}",
            neighbor_label(n.health_status),
            n.service_name,
            n.call_count
        );
    }
}

pub fn print_graph_human(v: &DependencyGraph) {
    for node in &v.nodes {
        println!(
            "{} {} requests={} errors={:.2}%",
            health_label(node.health),
            node.id.cyan(),
            node.request_count,
            node.error_rate * 100.0
        );
    }
    for edge in &v.edges {
        println!("{} -> {} calls={}", edge.source, edge.target, edge.call_count);
    }
    println!("-- {} nodes, {} edges --", v.nodes.len(), v.edges.len());
}

pub fn print_traces_human(v: &[TraceInfo]) {
    for t in v {
        println!(
            "{} trace={} duration={:.1}ms spans={} services={}",
            ts(t.trace_start),
            t.trace_id,
            t.total_duration_ms,
            t.span_count,
            t.services_involved.join(",")
        );
    }
    println!("-- {} traces --", v.len());
}

pub fn print_trace_human(v: &TraceDetail) {
    println!("TRACE {} start={}", v.trace_id, ts(v.trace_start));
    let total: f64 = v.spans.iter().map(|s| s.total_duration_ms).sum();
    for s in &v.spans {
        let share = if total > 0.0 {
            s.total_duration_ms / total * 100.0
        } else {
            0.0
        };
        println!(
            "  {:<24} {:>10.1}ms {:>5.1}%",
            s.service_name, s.total_duration_ms, share
        );
    }
}

pub fn print_status_human(v: &StoreStatus) {
    let span = |t: Option<DateTime<Utc>>| t.map(ts).unwrap_or_else(|| "-".to_string());
    println!("engine={}", v.engine);
    println!(
        "traces={} spans={} dependencies={}",
        v.counts.traces, v.counts.spans, v.counts.dependencies
    );
    println!(
        "oldest={} newest={}",
        span(v.counts.oldest_trace),
        span(v.counts.newest_trace)
    );
}

fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn health_label(h: HealthStatus) -> String {
    match h {
        HealthStatus::Healthy => "HEALTHY ".green().to_string(),
        HealthStatus::Warning => "WARNING ".yellow().to_string(),
        HealthStatus::Critical => "CRITICAL".red().to_string(),
    }
}

fn neighbor_label(h: NeighborHealth) -> String {
    match h {
        NeighborHealth::Healthy => health_label(HealthStatus::Healthy),
        NeighborHealth::Warning => health_label(HealthStatus::Warning),
        NeighborHealth::Critical => health_label(HealthStatus::Critical),
        NeighborHealth::Unknown => "UNKNOWN ".bright_black().to_string(),
    }
}
