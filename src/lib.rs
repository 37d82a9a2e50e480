//! # Telemetry demo
//!
//! Load tests for the telemetry demo's action service, and the service itself.
//!
//! The load tests are [Goose](https://docs.rs/goose/) attacks, Goose being a
//! load testing framework inspired by [Locust](https://locust.io/). Goose owns
//! everything about running the load: spawning users, scheduling them,
//! collecting metrics, and coordinating distributed workers. This crate only
//! declares what a single simulated user does, with [`SiteUser`]:
//!
//!  - it targets `http://localhost:8081` by default;
//!  - it issues `GET /api/action`;
//!  - it then waits between 1 and 2 seconds, uniformly at random, before the
//!    next request.
//!
//! Two binaries run the declaration, `traffic-camera` and `call-action`. They
//! behave identically and only report their task under a different name. Both
//! accept all of Goose's run-time options, for example:
//!
//! ```bash
//! cargo run --release --bin call-action -- --users 50 --hatch-rate 5 --run-time 5m
//! ```
//!
//! ## Shaping the workload
//!
//! The action service reads an optional `config` query parameter listing
//! `name:weight` pairs. Each service multiplies its simulated processing by
//! the weight assigned to its own name, see [`complexity`]. Requests carry it
//! once enabled with [`SiteUser::with_complexity`]:
//!
//! ```rust
//! use telemetry_demo::{ComplexityConfig, SiteUser, Variant};
//!
//! let user = SiteUser::new(Variant::CallAction).with_complexity(
//!     ComplexityConfig::new()
//!         .with("app1", 100_000)
//!         .with("app2", 1_000)
//!         .with("app3", 1_000),
//! );
//! assert_eq!(
//!     user.request_path(),
//!     "/api/action?config=app1:100000,app2:1000,app3:1000"
//! );
//! ```
//!
//! ## The action service
//!
//! The `action-service` binary runs the [`service`] under test. It is
//! configured with `--app-name` (or `$APP_NAME`) and optionally with a list of
//! peer services to call first, `--services-to-call` (or `$SERVICES_TO_CALL`):
//!
//! ```bash
//! APP_NAME=app1 SERVICES_TO_CALL=app2:8080,app3:8080 cargo run --bin action-service -- --port 8081
//! ```
//!
//! Latency histograms are exported in Prometheus format on port 9000.

#[macro_use]
extern crate log;

pub mod complexity;
mod error;
pub mod logger;
pub mod service;
pub mod site_user;
pub mod util;
pub mod wait;

pub use crate::complexity::ComplexityConfig;
pub use crate::error::DemoError;
pub use crate::site_user::{SiteUser, Variant, ACTION_PATH, HOST};
pub use crate::wait::WaitTime;
