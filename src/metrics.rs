use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Pre-register counters so they appear even before the first increment.
    for kind in ["add_buy", "take_profit", "target"] {
        counter!("alerts_fired_total", "kind" => kind).absolute(0);
    }
    counter!("alert_delivery_failures_total").absolute(0);
    counter!("quote_failures_total").absolute(0);
    counter!("commands_processed_total").absolute(0);
    counter!("monitor_passes_total").absolute(0);

    gauge!("tracked_positions").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("monitor_pass_seconds").record(0.0);

    handle
}

/// A handle backed by a recorder that is not installed globally, for
/// building an `AppState` in tests.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
