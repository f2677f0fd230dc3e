// ABOUTME: Configuration constants for liveness tracking, supplied by the embedding application
// ABOUTME: Loading these from a file or environment is explicitly out of scope for this crate

use std::time::Duration;

/// Liveness-tracking configuration: the interval clients are expected to
/// pulse at, how many intervals the sweeper waits between rounds, and how
/// long a connection may stay quiet before it's reported as timed out.
///
/// This crate does not load these values from a file or environment — that
/// responsibility belongs to the embedding application — but it does own
/// the struct and its defaults.
///
/// # Example
///
/// ```rust
/// use ingress_gate::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new(Duration::from_secs(30))
///     .with_check_period(4)
///     .with_keep_alive_prod(Duration::from_secs(90));
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Expected client pulse period.
    pub keep_alive_interval: Duration,

    /// Multiplier giving sweep cadence: the Liveness Sweeper runs every
    /// `keep_alive_interval * keep_alive_check_period`.
    pub keep_alive_check_period: u32,

    /// If `now - last_keep_alive` exceeds this, the connection is reported
    /// as timed out.
    pub keep_alive_prod: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            keep_alive_interval: Duration::from_secs(30),
            keep_alive_check_period: 3,
            keep_alive_prod: Duration::from_secs(90),
        }
    }
}

impl ServerConfig {
    /// Create a configuration with a custom keep-alive interval and default
    /// check period / prod threshold.
    pub fn new(keep_alive_interval: Duration) -> Self {
        Self {
            keep_alive_interval,
            ..Default::default()
        }
    }

    /// Set the sweep-cadence multiplier.
    pub fn with_check_period(mut self, keep_alive_check_period: u32) -> Self {
        self.keep_alive_check_period = keep_alive_check_period;
        self
    }

    /// Set the liveness timeout threshold directly (rather than deriving it
    /// from interval × period).
    pub fn with_keep_alive_prod(mut self, keep_alive_prod: Duration) -> Self {
        self.keep_alive_prod = keep_alive_prod;
        self
    }

    /// The interval at which the Liveness Sweeper runs.
    pub fn sweep_period(&self) -> Duration {
        self.keep_alive_interval * self.keep_alive_check_period
    }
}
