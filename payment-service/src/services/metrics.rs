use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics handle already initialized");
    }
    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count a payment creation attempt by outcome (`created` or an error kind).
pub fn record_payment_created(outcome: &'static str) {
    metrics::counter!("payments_created_total", "outcome" => outcome).increment(1);
}

/// Count a processed provider notification by outcome (`approved`, `ignored` or an error kind).
pub fn record_webhook(outcome: &'static str) {
    metrics::counter!("payment_webhooks_total", "outcome" => outcome).increment(1);
}
