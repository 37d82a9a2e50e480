//! The action service the load tests target.
//!
//! Each request to `/api/action` first calls every configured downstream
//! service (skipping itself), then burns CPU in proportion to the complexity
//! multiplier the `config` query parameter assigns to this service. Latency is
//! recorded in a Prometheus histogram twice: once for the internal processing
//! alone, once for the whole request. The response is `200 OK` unless a
//! downstream service could not be reached, in which case it is `500 ERROR`.
//!
//! When an OpenTelemetry agent is configured, each action is traced as a server
//! span continuing the caller's trace, with an `internal-processing` child
//! span, and the trace context is passed on to downstream services.
//!
//! `/api/health` always answers `200 OK` and is not measured. Every other path
//! is `404`, including the `/api/internal` path downstream calls are sent to:
//! two services listing each other would otherwise call each other forever.

use std::{
    convert::Infallible, future::Future, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc,
    time::Duration,
};

use futures::FutureExt as _;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::{
    body::{Bytes, Incoming},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::{rt::TokioIo, server::graceful::GracefulShutdown};
use prometheus_exporter::prometheus;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::complexity::{self, CONFIG_PARAMETER};
use crate::DemoError;

mod config;
mod downstream;
mod metrics;
pub mod telemetry;
pub mod work;

pub use self::config::{parse_services, ServiceConfiguration, ServiceSettings};
pub use self::downstream::{Downstream, INTERNAL_PATH};
pub use self::metrics::{metric_name, ActionMetrics, LatencyKind, LatencyStatus};
pub use crate::site_user::ACTION_PATH;

/// Unmeasured liveness probe.
pub const HEALTH_PATH: &str = "/api/health";

/// Pause before accepting again after a failed accept, such as running out of
/// file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// How long to wait for open connections to finish after shutdown is requested.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

type Body = Full<Bytes>;

/// State shared by all connections.
pub struct Context {
    pub settings: ServiceSettings,
    pub metrics: ActionMetrics,
    pub instance_id: Uuid,
    client: reqwest::Client,
}

impl Context {
    pub fn new(settings: ServiceSettings, metrics: ActionMetrics) -> Result<Self, DemoError> {
        let client = reqwest::Client::builder()
            .timeout(settings.downstream_timeout)
            .build()?;
        Ok(Context {
            settings,
            metrics,
            instance_id: Uuid::new_v4(),
            client,
        })
    }
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

/// The first `config` value in a query string, or an empty string.
fn config_parameter(query: Option<&str>) -> String {
    query
        .and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == CONFIG_PARAMETER)
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}

/// Entry point for a single incoming request.
async fn handle(req: Request<Incoming>, ctx: Arc<Context>) -> Response<Body> {
    let path = req.uri().path().to_string();
    trace!("incoming req: {} {}", req.method(), path);

    match path.as_str() {
        HEALTH_PATH => text_response(StatusCode::OK, "OK"),
        ACTION_PATH => {
            let span = tracing::info_span!(
                "action",
                otel.name = ACTION_PATH,
                otel.kind = "server",
                http.request.method = %req.method(),
            );
            telemetry::continue_trace(&span, req.headers());
            let config = config_parameter(req.uri().query());
            action(&config, &ctx).instrument(span).await
        }
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn action(config: &str, ctx: &Context) -> Response<Body> {
    let started = Instant::now();
    let app_name = &ctx.settings.app_name;

    let mut all_requests_successful = true;
    for service in &ctx.settings.services {
        if &service.address == app_name {
            continue;
        }
        if service.call(&ctx.client, config).await.is_err() {
            all_requests_successful = false;
        }
    }

    let started_internal = Instant::now();
    let multiplier = complexity::multiplier(config, app_name);
    let internal = tokio::task::spawn_blocking(move || work::burn(multiplier))
        .instrument(tracing::info_span!("internal-processing", multiplier));
    if let Err(e) = internal.await {
        error!("internal processing failed: {}", e);
    }
    ctx.metrics.observe(
        LatencyKind::InternalOnly,
        LatencyStatus::Ok,
        started_internal.elapsed(),
    );

    let (response, status) = if all_requests_successful {
        (text_response(StatusCode::OK, "OK"), LatencyStatus::Ok)
    } else {
        (
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "ERROR"),
            LatencyStatus::Error,
        )
    };
    ctx.metrics
        .observe(LatencyKind::Total, status, started.elapsed());

    response
}

/// Serve HTTP on `listener` until `shutdown` resolves, then give open
/// connections a few seconds to finish.
pub async fn serve(
    listener: TcpListener,
    ctx: Arc<Context>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), DemoError> {
    let graceful = GracefulShutdown::new();
    let mut signal = std::pin::pin!(shutdown);
    let http = http1::Builder::new();

    info!("Listening on http://{}", listener.local_addr()?);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        accept_failed(e).await;
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let ctx = Arc::clone(&ctx);
                let conn = http.serve_connection(io, service_fn(move |req| {
                    handle_internal_errors(handle(req, Arc::clone(&ctx)))
                }));
                let fut = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = fut.await {
                        debug!("error serving connection from {}: {:?}", remote, e);
                    }
                });
            },

            _ = &mut signal => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    tokio::select! {
        _ = graceful.shutdown() => {
            info!("All HTTP connections gracefully closed");
        },
        _ = tokio::time::sleep(SHUTDOWN_TIMEOUT) => {
            warn!("Timed out waiting for HTTP connections to close");
        }
    }

    Ok(())
}

/// Log a failed accept and pause before the next one, so persistent errors
/// don't spin the accept loop.
async fn accept_failed(e: std::io::Error) {
    warn!("failed to accept connection: {}", e);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Answer `500` instead of dropping the connection when a handler panics.
async fn handle_internal_errors(
    future: impl Future<Output = Response<Body>>,
) -> Result<Response<Body>, Infallible> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(response) => Ok(response),
        Err(panic) => {
            let msg = panic
                .downcast_ref::<String>()
                .map(|s| s.as_str())
                .or(panic.downcast_ref::<&str>().copied());
            match msg {
                Some(msg) => error!("INTERNAL SERVER ERROR: HTTP handler panicked: '{}'", msg),
                None => error!("INTERNAL SERVER ERROR: HTTP handler panicked"),
            }
            Ok(text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error: panic",
            ))
        }
    }
}

/// Run the service until ctrl-c: metrics exporter, then the HTTP server.
pub async fn run(settings: ServiceSettings) -> Result<(), DemoError> {
    info!("Loaded services: {}", itertools::join(&settings.services, ", "));

    let instance_id = Uuid::new_v4();
    // Flushed and shut down when dropped, after the server stops.
    let _telemetry = match &settings.otel_agent {
        Some(agent) => Some(telemetry::TelemetryGuard::start(
            agent,
            &settings.app_name,
            instance_id,
        )?),
        None => {
            info!(
                "{} not set, not exporting OpenTelemetry data",
                telemetry::OTEL_AGENT_ENV
            );
            None
        }
    };

    info!("Initializing Prometheus");
    let metrics = ActionMetrics::register(&settings.app_name, prometheus::default_registry())?;
    start_exporter(settings.metrics);

    let listener = TcpListener::bind(settings.listen).await?;
    let mut ctx = Context::new(settings, metrics)?;
    ctx.instance_id = instance_id;
    info!(
        "Starting {} (instance {})",
        ctx.settings.app_name, ctx.instance_id
    );

    serve(listener, Arc::new(ctx), shutdown_signal()).await
}

/// The exporter serves the default registry from its own thread. Failing to
/// start it leaves the service running without metrics.
fn start_exporter(addr: SocketAddr) {
    match prometheus_exporter::start(addr) {
        Ok(_) => info!("Serving metrics on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus metric initialization failed: {}", e),
    }
}

/// Resolves on ctrl-c. If the handler can't be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
