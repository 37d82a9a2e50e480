//! Latency histograms recorded by the action handler.
//!
//! Every observation goes to a Prometheus histogram, scraped from the metrics
//! port, and to an OpenTelemetry histogram of the same name, pushed to the
//! agent when one is configured.

use opentelemetry::metrics::Histogram;
use opentelemetry::{global, KeyValue};
use prometheus_exporter::prometheus::{
    exponential_buckets, HistogramOpts, HistogramVec, Registry,
};
use std::time::Duration;
use strum_macros::{Display, IntoStaticStr};

use crate::service::telemetry::INSTRUMENTATION_NAME;
use crate::DemoError;

/// First histogram bucket, in seconds.
const BUCKET_START: f64 = 0.01;
/// Growth factor between histogram buckets.
const BUCKET_FACTOR: f64 = 1.8;
const BUCKET_COUNT: usize = 20;

/// Which part of the request a latency observation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum LatencyKind {
    /// Only the simulated processing, excluding downstream calls.
    #[strum(serialize = "internal-only")]
    InternalOnly,
    /// The whole request.
    #[strum(serialize = "total")]
    Total,
}

/// Outcome label attached to a latency observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum LatencyStatus {
    #[strum(serialize = "OK")]
    Ok,
    #[strum(serialize = "ERROR")]
    Error,
}

/// Upper bounds of the latency buckets, in seconds.
pub(crate) fn latency_buckets() -> Result<Vec<f64>, DemoError> {
    Ok(exponential_buckets(BUCKET_START, BUCKET_FACTOR, BUCKET_COUNT)?)
}

/// The `<app>_operation_latency` histograms, labelled by `type` and `status`.
#[derive(Clone)]
pub struct ActionMetrics {
    latency: HistogramVec,
    otel_latency: Histogram<f64>,
}

/// Metric name for a service: spaces become underscores.
pub fn metric_name(app_name: &str) -> String {
    format!("{}_operation_latency", app_name.replace(' ', "_"))
}

impl ActionMetrics {
    /// Create the histograms for `app_name`, registering the Prometheus one
    /// with `registry` and the OpenTelemetry one with the global meter
    /// provider.
    pub fn register(app_name: &str, registry: &Registry) -> Result<Self, DemoError> {
        let opts = HistogramOpts::new(
            metric_name(app_name),
            format!(
                "Processing time for {} (native Prometheus metric).",
                app_name
            ),
        )
        .buckets(latency_buckets()?);
        let latency = HistogramVec::new(opts, &["type", "status"])?;
        registry.register(Box::new(latency.clone()))?;

        let otel_latency = global::meter(INSTRUMENTATION_NAME)
            .f64_histogram(metric_name(app_name))
            .with_description(format!(
                "Processing time for {} (native OpenTelemetry metric).",
                app_name
            ))
            .with_unit("s")
            .build();

        Ok(ActionMetrics {
            latency,
            otel_latency,
        })
    }

    pub fn observe(&self, kind: LatencyKind, status: LatencyStatus, elapsed: Duration) {
        let labels: [&'static str; 2] = [kind.into(), status.into()];
        let seconds = elapsed.as_secs_f64();
        self.latency.with_label_values(&labels).observe(seconds);
        self.otel_latency.record(
            seconds,
            &[
                KeyValue::new("type", labels[0]),
                KeyValue::new("status", labels[1]),
            ],
        );
    }

    /// Number of observations recorded for a label pair.
    pub fn count(&self, kind: LatencyKind, status: LatencyStatus) -> u64 {
        let labels: [&'static str; 2] = [kind.into(), status.into()];
        self.latency.with_label_values(&labels).get_sample_count()
    }
}
