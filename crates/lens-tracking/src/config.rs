//! Tracking engine configuration.

use std::time::Duration;

use lens_types::Settings;

/// Settings the tracking stores are constructed with.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Maximum log entries kept per build record
    pub build_log_cap: usize,

    /// Compare-and-swap attempts before a build write gives up
    pub write_retry_limit: u32,

    /// Deadline for one build write including retries
    pub write_timeout: Duration,

    /// Allow lookup by ID prefix through the ID index
    pub id_prefix_lookup: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            build_log_cap: 10,
            write_retry_limit: 16,
            write_timeout: Duration::from_millis(2000),
            id_prefix_lookup: true,
        }
    }
}

impl TrackingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            build_log_cap: settings.build_log_cap,
            write_retry_limit: settings.write_retry_limit,
            write_timeout: Duration::from_millis(settings.write_timeout_ms),
            id_prefix_lookup: settings.id_prefix_lookup,
        }
    }

    pub fn with_build_log_cap(mut self, cap: usize) -> Self {
        self.build_log_cap = cap;
        self
    }

    pub fn with_write_retry_limit(mut self, limit: u32) -> Self {
        self.write_retry_limit = limit;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_id_prefix_lookup(mut self, enabled: bool) -> Self {
        self.id_prefix_lookup = enabled;
        self
    }
}
