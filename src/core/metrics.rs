use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!("submissions_created_total", "Accepted exam submissions");
    metrics::describe_counter!("submissions_rejected_total", "Rejected submission attempts");
    metrics::describe_counter!("results_published_total", "Results made visible to students");
    metrics::describe_counter!("retention_runs_total", "Completed retention sweeps");
    metrics::describe_counter!("retention_files_purged_total", "Submission files purged");
    metrics::describe_counter!(
        "retention_file_delete_failures_total",
        "Object deletions that failed while the record was still cleared"
    );
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
