//! OpenTelemetry traces and metrics, exported over OTLP/gRPC.
//!
//! Nothing is exported unless an agent address is configured. Without one the
//! handler's spans have no subscriber, no trace context is propagated, and the
//! OpenTelemetry histogram records into the global no-op meter.
//!
//! Based on the `tracing-opentelemetry` OTLP example: spans are created with
//! [`tracing`] and bridged to an OpenTelemetry tracer by
//! [`tracing_opentelemetry`].

use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapCompositePropagator};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{
    new_view, Aggregation, Instrument, PeriodicReader, SdkMeterProvider, Stream,
};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use std::fmt;
use std::time::Duration;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::layer::SubscriberExt;
use uuid::Uuid;

use crate::service::metrics::latency_buckets;
use crate::DemoError;

/// Environment variable holding the OTLP agent address.
pub const OTEL_AGENT_ENV: &str = "OTEL_AGENT";

/// Name of the tracer and meter the service reports through.
pub(crate) const INSTRUMENTATION_NAME: &str = "action-service";

const METRICS_INTERVAL: Duration = Duration::from_secs(5);

fn telemetry_error(detail: impl fmt::Display) -> DemoError {
    DemoError::Telemetry {
        detail: detail.to_string(),
    }
}

/// The OTLP endpoint for an agent given as `host:port` or as a URL.
pub fn endpoint(agent: &str) -> String {
    if agent.contains("://") {
        agent.to_string()
    } else {
        format!("http://{}", agent)
    }
}

/// Propagate W3C trace context and baggage through HTTP headers.
pub fn install_propagator() {
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));
}

fn resource(app_name: &str, instance_id: Uuid) -> Resource {
    Resource::new([
        KeyValue::new("service.name", app_name.to_string()),
        KeyValue::new("service.instance.id", instance_id.to_string()),
    ])
}

/// Exporting providers. Dropping the guard flushes and shuts them down.
pub struct TelemetryGuard {
    tracer_provider: TracerProvider,
    meter_provider: SdkMeterProvider,
}

impl TelemetryGuard {
    /// Export every span and the latency histogram to `agent`, and install the
    /// global subscriber, providers and propagator. Must be called from within
    /// a Tokio runtime.
    pub fn start(agent: &str, app_name: &str, instance_id: Uuid) -> Result<Self, DemoError> {
        let endpoint = endpoint(agent);
        info!("Exporting OpenTelemetry data to {}", endpoint);

        let span_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .map_err(telemetry_error)?;
        let tracer_provider = TracerProvider::builder()
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource(app_name, instance_id))
            .with_batch_exporter(span_exporter, runtime::Tokio)
            .build();

        let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .map_err(telemetry_error)?;
        let reader = PeriodicReader::builder(metric_exporter, runtime::Tokio)
            .with_interval(METRICS_INTERVAL)
            .build();
        // Same bucket boundaries as the Prometheus histogram.
        let latency_view = new_view(
            Instrument::new().name("*_operation_latency"),
            Stream::new().aggregation(Aggregation::ExplicitBucketHistogram {
                boundaries: latency_buckets()?,
                record_min_max: true,
            }),
        )
        .map_err(telemetry_error)?;
        let meter_provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_view(latency_view)
            .with_resource(resource(app_name, instance_id))
            .build();

        install_propagator();
        global::set_tracer_provider(tracer_provider.clone());
        global::set_meter_provider(meter_provider.clone());

        let tracer = tracer_provider.tracer(INSTRUMENTATION_NAME);
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer));
        tracing::subscriber::set_global_default(subscriber).map_err(telemetry_error)?;

        Ok(TelemetryGuard {
            tracer_provider,
            meter_provider,
        })
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            warn!("failed to shut down the tracer provider: {:?}", e);
        }
        if let Err(e) = self.meter_provider.shutdown() {
            warn!("failed to shut down the meter provider: {:?}", e);
        }
    }
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|key| key.as_str()).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Make the trace context carried by incoming `headers` the parent of `span`.
pub fn continue_trace(span: &tracing::Span, headers: &HeaderMap) {
    let parent =
        global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)));
    span.set_parent(parent);
}

/// Headers carrying the trace context of `span` to the next service.
pub fn trace_headers(span: &tracing::Span) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let context = span.context();
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&context, &mut HeaderInjector(&mut headers))
    });
    headers
}
