use std::fmt;

use tracing::Instrument;
use url::Url;

use crate::complexity::CONFIG_PARAMETER;
use crate::service::telemetry;
use crate::DemoError;

/// Path requested on every downstream service.
pub const INTERNAL_PATH: &str = "/api/internal";

/// A peer service the action handler calls before doing its own work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downstream {
    pub address: String,
    pub port: u16,
}

impl Downstream {
    pub fn new(address: &str, port: u16) -> Self {
        Downstream {
            address: address.to_string(),
            port,
        }
    }

    /// The internal endpoint of this service, forwarding the raw complexity
    /// `config` value form-encoded.
    pub fn url(&self, config: &str) -> Result<Url, DemoError> {
        let base = format!("http://{}:{}{}", self.address, self.port, INTERNAL_PATH);
        let mut url = Url::parse(&base).map_err(|e| DemoError::InvalidOption {
            option: "downstream".to_string(),
            value: self.to_string(),
            detail: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair(CONFIG_PARAMETER, config);
        Ok(url)
    }

    /// Call the downstream service. Only a failure to get any response counts
    /// as an error: the status code is logged but not inspected.
    ///
    /// The call runs in its own client span, whose trace context is sent along.
    pub async fn call(&self, client: &reqwest::Client, config: &str) -> Result<(), DemoError> {
        let span = tracing::info_span!(
            "downstream",
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
            server.address = %self.address,
            server.port = self.port,
        );
        self.send(client, config, &span).instrument(span.clone()).await
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        config: &str,
        span: &tracing::Span,
    ) -> Result<(), DemoError> {
        info!("calling {}", self.address);
        let url = self.url(config)?;
        let request = client.get(url).headers(telemetry::trace_headers(span));
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("{}", e);
                span.record("otel.status_code", "ERROR");
                return Err(e.into());
            }
        };
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|e| {
            warn!("failed to read response body from {}: {}", self.address, e);
            String::new()
        });
        info!(
            "response received from {} ({}): {}",
            self.address, status, body
        );
        Ok(())
    }
}

impl fmt::Display for Downstream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{addr={},port={}}}", self.address, self.port)
    }
}
