//! Runtime options for the action service.
//!
//! Options are parsed from the command line with [`gumdrop`](https://docs.rs/gumdrop/).
//! The app name, the list of services to call and the OpenTelemetry agent fall
//! back to the `APP_NAME`, `SERVICES_TO_CALL` and `OTEL_AGENT` environment
//! variables, so the service can be configured entirely from a container
//! environment.

use gumdrop::Options;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::service::telemetry::OTEL_AGENT_ENV;
use crate::service::Downstream;
use crate::util;
use crate::DemoError;

/// Environment variable naming this service.
pub const APP_NAME_ENV: &str = "APP_NAME";
/// Environment variable listing `address:port` pairs to call.
pub const SERVICES_TO_CALL_ENV: &str = "SERVICES_TO_CALL";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_METRICS_PORT: u16 = 9000;
const DEFAULT_DOWNSTREAM_TIMEOUT: &str = "10s";

/// Options available when launching the action service.
#[derive(Options, Debug, Clone, Default)]
#[options(
    help = r#"The action service answers /api/action, optionally calling other services first,
and exports its latency as Prometheus metrics.

The following runtime options are available:"#
)]
pub struct ServiceConfiguration {
    /// Displays this help
    #[options(short = "h")]
    pub help: bool,

    /// Names this service (default: $APP_NAME)
    #[options(short = "n", meta = "NAME")]
    pub app_name: String,
    /// Lists services to call as ADDRESS:PORT,... (default: $SERVICES_TO_CALL)
    #[options(short = "s", meta = "LIST")]
    pub services_to_call: Option<String>,
    /// Sets the address to listen on (default: 0.0.0.0)
    #[options(no_short, meta = "ADDRESS")]
    pub address: Option<IpAddr>,
    /// Sets the HTTP port (default: 8080)
    #[options(short = "p")]
    pub port: Option<u16>,
    /// Sets the Prometheus metrics port (default: 9000)
    #[options(no_short, meta = "PORT")]
    pub metrics_port: Option<u16>,
    /// Gives up on a downstream service after (default: 10s)
    #[options(no_short, meta = "TIME")]
    pub downstream_timeout: String,
    /// Exports traces and metrics to an OTLP agent (default: $OTEL_AGENT)
    #[options(no_short, meta = "ADDRESS")]
    pub otel_agent: Option<String>,

    /// Enables log file and sets name
    #[options(no_short, meta = "NAME")]
    pub log_file: String,
    /// Decreases verbosity (-q, -qq, etc)
    #[options(count, short = "q")]
    pub quiet: u8,
    /// Increases verbosity (-v, -vv, etc)
    #[options(count, short = "v")]
    pub verbose: u8,
}

/// Fully resolved service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub app_name: String,
    pub services: Vec<Downstream>,
    pub listen: SocketAddr,
    pub metrics: SocketAddr,
    pub downstream_timeout: Duration,
    /// OTLP agent address, `None` to not export OpenTelemetry data.
    pub otel_agent: Option<String>,
}

impl ServiceConfiguration {
    /// Resolve options and environment into [`ServiceSettings`].
    pub fn configure(&self) -> Result<ServiceSettings, DemoError> {
        let app_name = if !self.app_name.is_empty() {
            self.app_name.clone()
        } else {
            std::env::var(APP_NAME_ENV).unwrap_or_default()
        };
        if app_name.is_empty() {
            return Err(DemoError::InvalidOption {
                option: "--app-name".to_string(),
                value: app_name,
                detail: format!("--app-name or ${} must be set", APP_NAME_ENV),
            });
        }

        let services = match &self.services_to_call {
            Some(services) => parse_services(services)?,
            None => match std::env::var(SERVICES_TO_CALL_ENV) {
                Ok(services) => parse_services(&services)?,
                Err(_) => Vec::new(),
            },
        };

        let address = self.address.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let listen = SocketAddr::new(address, self.port.unwrap_or(DEFAULT_PORT));
        let metrics = SocketAddr::new(address, self.metrics_port.unwrap_or(DEFAULT_METRICS_PORT));

        let timeout = if self.downstream_timeout.is_empty() {
            DEFAULT_DOWNSTREAM_TIMEOUT
        } else {
            self.downstream_timeout.as_str()
        };
        let downstream_timeout = match util::parse_timespan(timeout) {
            Some(seconds) => Duration::from_secs(seconds),
            None => {
                return Err(DemoError::InvalidOption {
                    option: "--downstream-timeout".to_string(),
                    value: timeout.to_string(),
                    detail: "the downstream timeout is too large".to_string(),
                })
            }
        };
        if downstream_timeout.is_zero() {
            return Err(DemoError::InvalidOption {
                option: "--downstream-timeout".to_string(),
                value: timeout.to_string(),
                detail: "the downstream timeout must be at least 1 second".to_string(),
            });
        }

        let otel_agent = self
            .otel_agent
            .clone()
            .or_else(|| std::env::var(OTEL_AGENT_ENV).ok())
            .filter(|agent| !agent.is_empty());

        Ok(ServiceSettings {
            app_name,
            services,
            listen,
            metrics,
            downstream_timeout,
            otel_agent,
        })
    }
}

/// Parse a comma separated list of `address:port` pairs. All spaces are
/// ignored, and an empty list is valid.
///
/// # Example
/// ```rust
/// use telemetry_demo::service::{parse_services, Downstream};
///
/// let services = parse_services("app1:8080, app2:8080").unwrap();
/// assert_eq!(services, vec![Downstream::new("app1", 8080), Downstream::new("app2", 8080)]);
/// ```
pub fn parse_services(services: &str) -> Result<Vec<Downstream>, DemoError> {
    let services = services.replace(' ', "");
    if services.is_empty() {
        return Ok(Vec::new());
    }

    services
        .split(',')
        .map(|service| {
            let invalid = |detail: &str| DemoError::InvalidOption {
                option: SERVICES_TO_CALL_ENV.to_string(),
                value: service.to_string(),
                detail: detail.to_string(),
            };
            let (address, port) = service
                .split_once(':')
                .ok_or_else(|| invalid("expected ADDRESS:PORT"))?;
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid(&format!("invalid port {}", port)))?;
            Ok(Downstream::new(address, port))
        })
        .collect()
}
