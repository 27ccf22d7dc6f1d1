use std::time::Duration;

/// Configuration for the session bootstrap probe.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// URL of the current-user endpoint (e.g. https://mro.example.com/api/auth/me)
    pub probe_url: String,

    /// How long a probe result stays fresh before a re-entrant check
    /// re-fetches it (default: 30s).
    pub probe_freshness_secs: u64,
}

impl SessionConfig {
    /// Create a config for the given probe URL with the default freshness.
    pub fn new(probe_url: impl Into<String>) -> Self {
        Self {
            probe_url: probe_url.into(),
            probe_freshness_secs: 30,
        }
    }

    /// Set the probe freshness window in seconds.
    pub fn with_probe_freshness(mut self, secs: u64) -> Self {
        self.probe_freshness_secs = secs;
        self
    }

    /// Probe freshness as a `Duration`.
    pub fn probe_freshness(&self) -> Duration {
        Duration::from_secs(self.probe_freshness_secs)
    }
}
