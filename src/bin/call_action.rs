//! Load test calling the action service.
//!
//! Identical to `traffic-camera` apart from the task name, `callAction`. The
//! commented builders below switch to the alternative pacing policies, or make
//! every request shape the work done by each service in the chain.

use goose::prelude::*;
use telemetry_demo::{SiteUser, Variant};

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let user = SiteUser::new(Variant::CallAction);
    // use std::time::Duration;
    // use telemetry_demo::{ComplexityConfig, WaitTime};
    //
    // let user = user.with_wait_time(WaitTime::constant(Duration::from_secs(1)));
    // let user = user.with_wait_time(WaitTime::constant_pacing(Duration::from_secs(1)));
    // let user = user.with_complexity(
    //     ComplexityConfig::new()
    //         .with("app1", 100_000)
    //         .with("app2", 1_000)
    //         .with("app3", 1_000),
    // );

    user.attack()?.execute().await?;

    Ok(())
}
