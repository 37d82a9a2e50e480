//! The `config` query parameter shaping how much work each service does.
//!
//! The parameter is a comma-separated list of `name:weight` pairs, for example
//! `app1:100000,app2:1000,app3:1000`. Each service looks up its own name and
//! uses the weight as a CPU multiplier, falling back to [`DEFAULT_MULTIPLIER`].

use std::fmt;

/// Multiplier used when the `config` parameter doesn't name the service.
pub const DEFAULT_MULTIPLIER: u64 = 100;

/// Name of the query parameter carrying the complexity configuration.
pub const CONFIG_PARAMETER: &str = "config";

/// An ordered list of `(service name, weight)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplexityConfig {
    entries: Vec<(String, u64)>,
}

impl ComplexityConfig {
    pub fn new() -> Self {
        ComplexityConfig::default()
    }

    /// Append a weight for the named service.
    pub fn with(mut self, name: &str, weight: u64) -> Self {
        self.entries.push((name.to_string(), weight));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The query string fragment, `config=<pairs>`, with the pairs left unescaped.
    ///
    /// # Example
    /// ```rust
    /// use telemetry_demo::ComplexityConfig;
    ///
    /// let config = ComplexityConfig::new().with("app1", 100_000).with("app2", 1_000);
    /// assert_eq!(config.query(), "config=app1:100000,app2:1000");
    /// ```
    pub fn query(&self) -> String {
        format!("{}={}", CONFIG_PARAMETER, self)
    }
}

impl fmt::Display for ComplexityConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pairs = self
            .entries
            .iter()
            .map(|(name, weight)| format!("{}:{}", name, weight));
        write!(f, "{}", itertools::join(pairs, ","))
    }
}

/// Split `s` once on `sep`. A missing separator yields an empty second half.
fn split_pair(s: &str, sep: char) -> (&str, &str) {
    if s.is_empty() {
        return (s, s);
    }
    match s.split_once(sep) {
        Some(pair) => pair,
        None => {
            warn!("invalid complexity argument: {:?}", s);
            (s, "")
        }
    }
}

/// Resolve the multiplier for `service_name` from a raw `config` parameter value.
///
/// The first pair naming the service with a valid, non-negative integer weight
/// wins. Invalid weights are logged and skipped.
///
/// # Example
/// ```rust
/// use telemetry_demo::complexity::{multiplier, DEFAULT_MULTIPLIER};
///
/// assert_eq!(multiplier("app1:100000,app2:1000", "app2"), 1_000);
/// assert_eq!(multiplier("app1:100000,app2:1000", "app3"), DEFAULT_MULTIPLIER);
/// assert_eq!(multiplier("", "app1"), DEFAULT_MULTIPLIER);
/// ```
pub fn multiplier(config: &str, service_name: &str) -> u64 {
    if config.is_empty() {
        return DEFAULT_MULTIPLIER;
    }
    for element in config.split(',') {
        let (name, weight) = split_pair(element, ':');
        if name != service_name {
            continue;
        }
        match weight.parse::<i64>() {
            Ok(weight) if weight >= 0 => return weight as u64,
            _ => warn!("invalid complexity numeric value: {:?}", weight),
        }
    }
    DEFAULT_MULTIPLIER
}
