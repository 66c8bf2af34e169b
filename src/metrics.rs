use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register the series the
    /// pipeline emits.
    pub fn init() -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();
        gauge!("sentinel_boot_ts").set(chrono::Utc::now().timestamp() as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Pipeline invocations.");
        describe_counter!(
            "pipeline_skipped_total",
            "Runs short-circuited by the circuit breaker."
        );
        describe_counter!(
            "pipeline_posts_ingested_total",
            "Posts ingested after merge and dedupe."
        );
        describe_counter!(
            "pipeline_commands_total",
            "Activation/deactivation commands honored."
        );
        describe_counter!("pipeline_decisions_total", "Decision records created.");
        describe_counter!(
            "pipeline_replies_attempted_total",
            "Outbound replies attempted."
        );
        describe_counter!(
            "pipeline_replies_succeeded_total",
            "Outbound replies acknowledged by the platform."
        );
        describe_counter!(
            "ingest_scope_capped_total",
            "Posts shed by the per-scope ingestion cap."
        );
        describe_counter!("ingest_source_errors_total", "Ingest fetch/parse errors.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
        describe_gauge!("sentinel_boot_ts", "Unix ts when the service booted.");
    });
}
