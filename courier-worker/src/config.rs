//! Worker configuration
//!
//! Defines all configurable parameters for the worker: HTTP binding,
//! queue backing store, batch sizing, loop timing and shutdown bounds.

use std::time::Duration;

/// Worker configuration
///
/// Intervals and bounds are configurable so the drain behaviour can be
/// tuned per deployment (a slow mail relay needs a longer drain timeout).
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP trigger surface binds to
    pub bind_addr: String,

    /// PostgreSQL connection string; `None` selects the in-memory queue
    pub database_url: Option<String>,

    /// Delay between the end of one batch and the next fetch
    pub poll_interval: Duration,

    /// Maximum number of tasks fetched per batch
    pub batch_size: usize,

    /// Upper bound on how long shutdown waits for the in-flight batch
    pub drain_timeout: Duration,

    /// Simulated latency of a single send
    pub send_latency: Duration,

    /// How long a fetched task stays invisible to other fetches
    pub lease_duration: Duration,

    /// Start the job loop at boot instead of waiting for a trigger
    pub autostart: bool,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(bind_addr: String) -> Self {
        Self {
            bind_addr,
            database_url: None,
            poll_interval: Duration::from_secs(15),
            batch_size: 5,
            drain_timeout: Duration::from_secs(30),
            send_latency: Duration::from_millis(1000),
            lease_duration: Duration::from_secs(300),
            autostart: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - COURIER_BIND_ADDR (default: 0.0.0.0:3000)
    /// - DATABASE_URL (default: unset, in-memory queue)
    /// - POLL_INTERVAL (seconds, default: 15)
    /// - BATCH_SIZE (default: 5)
    /// - DRAIN_TIMEOUT (seconds, default: 30)
    /// - SEND_LATENCY_MS (milliseconds, default: 1000)
    /// - LEASE_DURATION (seconds, default: 300)
    /// - AUTOSTART (true/false, default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("COURIER_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let poll_interval = env_parse::<u64>("POLL_INTERVAL")
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let batch_size = env_parse::<usize>("BATCH_SIZE").unwrap_or(defaults.batch_size);

        let drain_timeout = env_parse::<u64>("DRAIN_TIMEOUT")
            .map(Duration::from_secs)
            .unwrap_or(defaults.drain_timeout);

        let send_latency = env_parse::<u64>("SEND_LATENCY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.send_latency);

        let lease_duration = env_parse::<u64>("LEASE_DURATION")
            .map(Duration::from_secs)
            .unwrap_or(defaults.lease_duration);

        let autostart = env_parse::<bool>("AUTOSTART").unwrap_or(defaults.autostart);

        Self {
            bind_addr,
            database_url,
            poll_interval,
            batch_size,
            drain_timeout,
            send_latency,
            lease_duration,
            autostart,
        }
    }

    /// Sets the database URL
    #[allow(dead_code)]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("database_url must start with postgres:// or postgresql://");
            }
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than 0");
        }

        if self.drain_timeout.is_zero() {
            anyhow::bail!("drain_timeout must be greater than 0");
        }

        // A lease shorter than a full batch would hand tasks to a second
        // fetch while the first batch is still sending them.
        let Ok(batch_size) = u32::try_from(self.batch_size) else {
            anyhow::bail!("batch_size ({}) is too large", self.batch_size);
        };
        let Some(batch_send_time) = self.send_latency.checked_mul(batch_size) else {
            anyhow::bail!(
                "batch_size * send_latency overflows ({} * {:?})",
                self.batch_size,
                self.send_latency
            );
        };
        if self.lease_duration <= batch_send_time {
            anyhow::bail!(
                "lease_duration ({:?}) must exceed batch_size * send_latency ({:?})",
                self.lease_duration,
                batch_send_time
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("0.0.0.0:3000".to_string())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}
