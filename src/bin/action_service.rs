//! The action service targeted by the load tests.

use gumdrop::Options;
use log::error;
use std::process::exit;

use telemetry_demo::logger;
use telemetry_demo::service::{self, ServiceConfiguration};
use telemetry_demo::DemoError;

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    let configuration = ServiceConfiguration::parse_args_default_or_exit();

    logger::initialize_logger(
        configuration.verbose,
        configuration.quiet,
        &configuration.log_file,
    )?;

    let settings = match configuration.configure() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    service::run(settings).await
}
