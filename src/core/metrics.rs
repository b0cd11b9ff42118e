use std::sync::OnceLock;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Score over total marks lands in [0, 1].
const SCORE_RATIO_BUCKETS: [f64; 11] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Installs the Prometheus recorder; hosts build their own recorder otherwise.
pub fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .add_global_label("environment", settings.runtime().environment.as_str())
        .set_buckets_for_metric(
            Matcher::Full("submission_score_ratio".to_string()),
            &SCORE_RATIO_BUCKETS,
        )?
        .install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

fn describe() {
    metrics::describe_counter!("attempts_started_total", "Attempts moved from instructions to taking");
    metrics::describe_counter!("submissions_total", "Online submissions stored, by finalize mode");
    metrics::describe_counter!(
        "duplicate_submissions_total",
        "Finalize calls that found an existing submission"
    );
    metrics::describe_counter!("offline_marks_total", "Offline marks recorded, by insert or update");
    metrics::describe_counter!(
        "ai_completion_fallbacks_total",
        "AI completions answered with the static fallback"
    );
    metrics::describe_histogram!("submission_score_ratio", "Score divided by total marks");
}

/// Text exposition of every recorded metric, if the recorder is installed.
pub fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
