use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const DEFAULT_AGENT_POLL_MS: u64 = 5_000;
pub const DEFAULT_HOSPITAL_POLL_MS: u64 = 10_000;

/// Where to fetch from and how often each domain refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub api_base: String,
    pub agent_poll_ms: u64,
    pub hospital_poll_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            agent_poll_ms: DEFAULT_AGENT_POLL_MS,
            hospital_poll_ms: DEFAULT_HOSPITAL_POLL_MS,
        }
    }
}

impl SyncConfig {
    pub fn agent_period(&self) -> Duration {
        period_or(self.agent_poll_ms, DEFAULT_AGENT_POLL_MS)
    }

    pub fn hospital_period(&self) -> Duration {
        period_or(self.hospital_poll_ms, DEFAULT_HOSPITAL_POLL_MS)
    }
}

// 0 means "unset"
fn period_or(ms: u64, default_ms: u64) -> Duration {
    Duration::from_millis(if ms == 0 { default_ms } else { ms })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cadences() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.agent_period(), Duration::from_secs(5));
        assert_eq!(cfg.hospital_period(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_falls_back_to_default() {
        let cfg = SyncConfig { agent_poll_ms: 0, hospital_poll_ms: 2_500, ..SyncConfig::default() };
        assert_eq!(cfg.agent_period(), Duration::from_secs(5));
        assert_eq!(cfg.hospital_period(), Duration::from_millis(2_500));
    }
}
