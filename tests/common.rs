use gumdrop::Options;
use httpmock::MockServer;
use prometheus_exporter::prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use goose::config::GooseConfiguration;
use goose::metrics::GooseMetrics;
use goose::GooseAttack;
use telemetry_demo::service::{self, ActionMetrics, Context, Downstream, ServiceSettings};

// Not all functions are used by all tests, so we enable allow(dead_code) to avoid
// compiler warnings during testing.

/// The following options are configured by default, if not set to a custom value:
///  --host <mock-server>
///  --users 1
///  --hatch-rate 1
///  --run-time 2
///  --no-reset-metrics
#[allow(dead_code)]
pub fn build_configuration(server: &MockServer, custom: Vec<&str>) -> GooseConfiguration {
    build_configuration_for_host(&server.base_url(), custom)
}

/// Same as [`build_configuration`], load testing an arbitrary host.
#[allow(dead_code)]
pub fn build_configuration_for_host(host: &str, custom: Vec<&str>) -> GooseConfiguration {
    let mut configuration: Vec<&str> = vec![];
    configuration.extend_from_slice(&custom);

    if !configuration.contains(&"--host") {
        configuration.extend_from_slice(&["--host", host]);
    }
    if !configuration.contains(&"--users") {
        configuration.extend_from_slice(&["--users", "1"]);
    }
    if !configuration.contains(&"--hatch-rate") {
        configuration.extend_from_slice(&["--hatch-rate", "1"]);
    }
    if !configuration.contains(&"--run-time") {
        configuration.extend_from_slice(&["--run-time", "2"]);
    }
    // Count every request, not only those made after all users started.
    if !configuration.contains(&"--no-reset-metrics") {
        configuration.push("--no-reset-metrics");
    }

    GooseConfiguration::parse_args_default(&configuration)
        .expect("failed to parse options and generate a configuration")
}

/// Run the actual load test, returning the GooseMetrics.
#[allow(dead_code)]
pub async fn run_load_test(goose_attack: GooseAttack) -> GooseMetrics {
    goose_attack.execute().await.unwrap()
}

/// A running action service, stopped when `stop` is called.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub metrics: ActionMetrics,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl TestService {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.expect("service task panicked");
    }
}

/// Settings for a service listening on an ephemeral local port.
#[allow(dead_code)]
pub fn service_settings(app_name: &str, services: Vec<Downstream>) -> ServiceSettings {
    ServiceSettings {
        app_name: app_name.to_string(),
        services,
        listen: "127.0.0.1:0".parse().unwrap(),
        metrics: "127.0.0.1:0".parse().unwrap(),
        downstream_timeout: Duration::from_secs(2),
        otel_agent: None,
    }
}

/// Start the action service, with metrics in a private registry.
#[allow(dead_code)]
pub async fn start_service(settings: ServiceSettings) -> TestService {
    let registry = Registry::new();
    let metrics = ActionMetrics::register(&settings.app_name, &registry).unwrap();
    let listener = TcpListener::bind(settings.listen).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ctx = Arc::new(Context::new(settings, metrics.clone()).unwrap());

    let (shutdown, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        service::serve(listener, ctx, async {
            let _ = stopped.await;
        })
        .await
        .unwrap();
    });

    TestService {
        addr,
        metrics,
        shutdown,
        handle,
    }
}
