use chrono::{DateTime, Duration, Utc};
use spanwatch_core::model::dataset::Dataset;
use spanwatch_core::model::dependency::DependencyEdge;
use spanwatch_core::model::span::SpanRecord;
use spanwatch_core::model::trace::TraceRecord;

/// Newest trace in the current hour of [`sample_dataset`].
pub const SAMPLE_TRACE_ID: &str = "trace-current-00";

/// Traces per hour window in [`sample_dataset`].
pub const TRACES_PER_WINDOW: usize = 10;

/// Call table for the sample topology. `search` appears only here, so it has
/// no span-derived health.
pub fn sample_edges() -> Vec<DependencyEdge> {
    vec![
        DependencyEdge::new("frontend", "checkout", 120),
        DependencyEdge::new("checkout", "payments", 80),
        DependencyEdge::new("checkout", "inventory", 60),
        DependencyEdge::new("search", "inventory", 10),
    ]
}

/// Three windows of traffic relative to `now`:
///
/// * current hour: checkout is slow and payments fails every other call
/// * previous hour: the same traffic, fast and error free
/// * a day old: one trace outside every window
pub fn sample_dataset(now: DateTime<Utc>) -> Dataset {
    let mut dataset = Dataset {
        dependencies: sample_edges(),
        ..Dataset::default()
    };

    for i in 0..TRACES_PER_WINDOW {
        let start = now - Duration::minutes(5 + 5 * i as i64);
        let step = i as f64;
        push_trace(
            &mut dataset,
            &format!("trace-current-{i:02}"),
            start,
            &[
                ("frontend", 100.0 + step * 10.0, false),
                ("checkout", 400.0 + step * 20.0, false),
                ("checkout", 50.0, false),
                ("payments", 30.0 + step, i % 2 == 0),
                ("inventory", 20.0, false),
            ],
        );
    }

    for i in 0..TRACES_PER_WINDOW {
        let start = now - Duration::minutes(65 + 5 * i as i64);
        let step = i as f64;
        push_trace(
            &mut dataset,
            &format!("trace-baseline-{i:02}"),
            start,
            &[
                ("frontend", 100.0 + step * 10.0, false),
                ("checkout", 100.0 + step * 5.0, false),
                ("checkout", 50.0, false),
                ("payments", 30.0 + step, false),
                ("inventory", 20.0, false),
            ],
        );
    }

    push_trace(
        &mut dataset,
        "trace-stale",
        now - Duration::hours(30),
        &[("frontend", 5_000.0, true)],
    );

    dataset
}

fn push_trace(
    dataset: &mut Dataset,
    trace_id: &str,
    trace_start: DateTime<Utc>,
    spans: &[(&str, f64, bool)],
) {
    for (idx, (service, duration_ms, is_error)) in spans.iter().enumerate() {
        dataset.spans.push(SpanRecord {
            trace_id: trace_id.to_string(),
            span_id: format!("{trace_id}-span-{idx}"),
            service_name: service.to_string(),
            duration_ms: *duration_ms,
            is_error: *is_error,
        });
    }
    dataset.traces.push(TraceRecord {
        trace_id: trace_id.to_string(),
        trace_start,
        total_duration_ms: spans.iter().map(|(_, d, _)| d).sum(),
        span_count: spans.len() as i64,
    });
}
