//! The simulated user hammering the action service.
//!
//! A [`SiteUser`] declares, for the Goose runtime, how one simulated client
//! behaves: which host it targets, how it paces itself, and which tasks it runs.
//! Goose then spawns, schedules and measures as many of these users as the
//! run-time options request.
//!
//! ```rust,no_run
//! use telemetry_demo::{SiteUser, Variant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), goose::GooseError> {
//!     SiteUser::new(Variant::CallAction).attack()?.execute().await?;
//!     Ok(())
//! }
//! ```

use goose::config::GooseConfiguration;
use goose::prelude::*;
use std::fmt;
use std::sync::Arc;

use crate::{ComplexityConfig, WaitTime};

/// Host load tested unless overridden with `--host`.
pub const HOST: &str = "http://localhost:8081";

/// The only path simulated users request.
pub const ACTION_PATH: &str = "/api/action";

/// Name of the Goose scenario every variant registers.
pub const SCENARIO_NAME: &str = "SiteUser";

/// The two flavors of simulated user. They only differ in the name their task
/// is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Reports its task as `trafficCamera`.
    TrafficCamera,
    /// Reports its task as `callAction`.
    CallAction,
}

impl Variant {
    pub fn task_name(&self) -> &'static str {
        match self {
            Variant::TrafficCamera => "trafficCamera",
            Variant::CallAction => "callAction",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.task_name())
    }
}

/// One weighted task: a GET against a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTask {
    pub name: String,
    pub path: String,
    pub weight: usize,
}

/// Declaration of a simulated user: target host, pacing, and tasks.
#[derive(Debug, Clone)]
pub struct SiteUser {
    host: String,
    wait_time: WaitTime,
    variant: Variant,
    complexity: Option<ComplexityConfig>,
}

impl SiteUser {
    /// The default declaration: `GET /api/action` against [`HOST`], waiting
    /// between 1 and 2 seconds after each request.
    pub fn new(variant: Variant) -> Self {
        SiteUser {
            host: HOST.to_string(),
            wait_time: WaitTime::default(),
            variant,
            complexity: None,
        }
    }

    /// Replace the pacing policy.
    pub fn with_wait_time(mut self, wait_time: WaitTime) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Append `config=<pairs>` to every request, shaping how much work each
    /// service behind the endpoint performs.
    pub fn with_complexity(mut self, complexity: ComplexityConfig) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn wait_time(&self) -> WaitTime {
        self.wait_time
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The exact path, including any query string, each task requests.
    pub fn request_path(&self) -> String {
        match &self.complexity {
            Some(complexity) => format!("{}?{}", ACTION_PATH, complexity.query()),
            None => ACTION_PATH.to_string(),
        }
    }

    /// All tasks this user runs. There is always exactly one.
    pub fn tasks(&self) -> Vec<SiteTask> {
        vec![SiteTask {
            name: self.variant.task_name().to_string(),
            path: self.request_path(),
            weight: 1,
        }]
    }

    /// Build the Goose scenario for this user.
    ///
    /// Each transaction issues its request and then sleeps according to the
    /// configured [`WaitTime`]. The response is left to Goose, which records
    /// its status and latency.
    pub fn scenario(&self) -> Result<Scenario, GooseError> {
        let mut scenario = Scenario::new(SCENARIO_NAME);
        for task in self.tasks() {
            let path = task.path;
            let wait_time = self.wait_time;
            let closure: TransactionFunction = Arc::new(move |user| {
                let path = path.clone();
                Box::pin(async move {
                    let started = tokio::time::Instant::now();
                    let _goose = user.get(&path).await?;
                    wait_time.pause(started).await;

                    Ok(())
                })
            });

            scenario = scenario.register_transaction(
                Transaction::new(closure)
                    .set_name(&task.name)
                    .set_weight(task.weight)?,
            );
        }
        Ok(scenario)
    }

    /// Initialize a Goose attack from command line options, defaulting to
    /// this user's host.
    pub fn attack(&self) -> Result<GooseAttack, GooseError> {
        self.register(GooseAttack::initialize()?)
    }

    /// Initialize a Goose attack from a prepared configuration.
    pub fn attack_with_config(
        &self,
        configuration: GooseConfiguration,
    ) -> Result<GooseAttack, GooseError> {
        self.register(GooseAttack::initialize_with_config(configuration)?)
    }

    fn register(&self, goose_attack: GooseAttack) -> Result<GooseAttack, GooseError> {
        info!(
            "{} user: GET {} on {}, waiting {}",
            self.variant,
            self.request_path(),
            self.host,
            self.wait_time
        );
        Ok(*goose_attack
            .register_scenario(self.scenario()?)
            .set_default(GooseDefault::Host, self.host.as_str())?)
    }
}
