//! Simulated traffic camera reporting to the action service.
//!
//! Each user requests `/api/action` on http://localhost:8081, pausing between
//! 1 and 2 seconds after every request. All Goose run-time options apply, for
//! example `--users 10 --run-time 1m`.

use goose::prelude::*;
use telemetry_demo::{SiteUser, Variant};

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    SiteUser::new(Variant::TrafficCamera)
        .attack()?
        .execute()
        .await?;

    Ok(())
}
