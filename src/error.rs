use std::{fmt, io};

use prometheus_exporter::prometheus;

/// Definition of all errors the telemetry demo can return.
#[derive(Debug)]
pub enum DemoError {
    /// Wraps a [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    Io(io::Error),
    /// Wraps a [`reqwest::Error`](https://docs.rs/reqwest/*/reqwest/struct.Error.html).
    Reqwest(reqwest::Error),
    /// Wraps a [`hyper::Error`](https://docs.rs/hyper/*/hyper/struct.Error.html).
    Hyper(hyper::Error),
    /// Wraps a [`prometheus::Error`](https://docs.rs/prometheus/*/prometheus/enum.Error.html).
    Prometheus(prometheus::Error),
    /// Invalid option or value specified, may only be invalid in context.
    InvalidOption {
        /// The invalid option that caused this error, may be only invalid in context.
        option: String,
        /// The invalid value that caused this error, may be only invalid in context.
        value: String,
        /// An optional explanation of the error.
        detail: String,
    },
    /// OpenTelemetry exporters or the tracing subscriber could not be set up.
    Telemetry {
        /// What failed.
        detail: String,
    },
    /// Invalid wait time specified.
    InvalidWaitTime {
        // The specified minimum wait time, in milliseconds.
        min_wait: u128,
        // The specified maximum wait time, in milliseconds.
        max_wait: u128,
        /// An optional explanation of the error.
        detail: String,
    },
}

/// Implement a helper to provide a text description of all possible types of errors.
impl DemoError {
    fn describe(&self) -> &str {
        match *self {
            DemoError::Io(_) => "io::Error",
            DemoError::Reqwest(_) => "reqwest::Error",
            DemoError::Hyper(_) => "hyper::Error",
            DemoError::Prometheus(_) => "prometheus::Error",
            DemoError::InvalidOption { .. } => "invalid option or value specified",
            DemoError::Telemetry { .. } => "failed to initialize OpenTelemetry",
            DemoError::InvalidWaitTime { .. } => "invalid wait_time specified",
        }
    }
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DemoError::Io(ref source) => write!(f, "DemoError: {} ({})", self.describe(), source),
            DemoError::Reqwest(ref source) => {
                write!(f, "DemoError: {} ({})", self.describe(), source)
            }
            DemoError::Hyper(ref source) => {
                write!(f, "DemoError: {} ({})", self.describe(), source)
            }
            DemoError::Prometheus(ref source) => {
                write!(f, "DemoError: {} ({})", self.describe(), source)
            }
            DemoError::InvalidOption {
                ref option,
                ref value,
                ref detail,
            } => write!(
                f,
                "DemoError: {} ({} = {:?}): {}",
                self.describe(),
                option,
                value,
                detail
            ),
            DemoError::Telemetry { ref detail } | DemoError::InvalidWaitTime { ref detail, .. } => {
                write!(f, "DemoError: {}: {}", self.describe(), detail)
            }
        }
    }
}

// Define the lower level source of this error, if any.
impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            DemoError::Io(ref source) => Some(source),
            DemoError::Reqwest(ref source) => Some(source),
            DemoError::Hyper(ref source) => Some(source),
            DemoError::Prometheus(ref source) => Some(source),
            _ => None,
        }
    }
}

/// Auto-convert IO errors.
impl From<io::Error> for DemoError {
    fn from(err: io::Error) -> DemoError {
        DemoError::Io(err)
    }
}

/// Auto-convert Reqwest errors.
impl From<reqwest::Error> for DemoError {
    fn from(err: reqwest::Error) -> DemoError {
        DemoError::Reqwest(err)
    }
}

/// Auto-convert Hyper errors.
impl From<hyper::Error> for DemoError {
    fn from(err: hyper::Error) -> DemoError {
        DemoError::Hyper(err)
    }
}

/// Auto-convert Prometheus errors.
impl From<prometheus::Error> for DemoError {
    fn from(err: prometheus::Error) -> DemoError {
        DemoError::Prometheus(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_invalid_option() {
        let error = DemoError::InvalidOption {
            option: "--app-name".to_string(),
            value: "".to_string(),
            detail: "an app name is required".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "DemoError: invalid option or value specified (--app-name = \"\"): an app name is required"
        );
        assert!(std::error::Error::source(&error).is_none());
    }

    #[test]
    fn io_error_has_source() {
        let error: DemoError = io::Error::new(io::ErrorKind::AddrInUse, "busy").into();
        assert!(error.to_string().starts_with("DemoError: io::Error"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
