use serde::{Deserialize, Serialize};
use std::path::Path;
use swasthya_core::SyncConfig;
use tokio::fs;
use tracing::warn;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    #[serde(flatten)]
    pub sync: SyncConfig,
    pub http: HttpConf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String, // ex: "127.0.0.1:3000"
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.into() }
    }
}

pub fn parse_config(txt: &str) -> Result<DashboardConfig, serde_yaml::Error> {
    if txt.trim().is_empty() {
        return Ok(DashboardConfig::default());
    }
    serde_yaml::from_str(txt)
}

pub async fn load_config() -> DashboardConfig {
    let path = std::env::var("SWASTHYA_DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        parse_config(&txt).unwrap_or_else(|e| {
            warn!(%path, "invalid config: {e}");
            DashboardConfig::default()
        })
    } else {
        warn!(%path, "no config file, using defaults");
        DashboardConfig::default()
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    cfg
}

fn apply_env_overrides(cfg: &mut DashboardConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(base) = var("SWASTHYA_API_BASE").filter(|v| !v.trim().is_empty()) {
        cfg.sync.api_base = base;
    }
    if let Some(bind) = var("SWASTHYA_BIND").filter(|v| !v.trim().is_empty()) {
        cfg.http.bind = bind;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg = parse_config("  \n").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.http.bind, DEFAULT_BIND);
        assert_eq!(cfg.sync.agent_poll_ms, 5_000);
    }

    #[test]
    fn test_flat_sync_keys_and_nested_http() {
        let yaml = r#"
api_base: "http://backend:9000"
hospital_poll_ms: 2500
http:
  bind: "127.0.0.1:4000"
"#;
        let cfg = parse_config(yaml).unwrap();
        assert_eq!(cfg.sync.api_base, "http://backend:9000");
        assert_eq!(cfg.sync.agent_poll_ms, 5_000);
        assert_eq!(cfg.sync.hospital_poll_ms, 2_500);
        assert_eq!(cfg.http.bind, "127.0.0.1:4000");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_config("agent_poll_ms: [not, a, number]").is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let mut cfg = DashboardConfig::default();
        apply_env_overrides(&mut cfg, |key| match key {
            "SWASTHYA_API_BASE" => Some("http://10.0.0.5:8080".into()),
            "SWASTHYA_BIND" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(cfg.sync.api_base, "http://10.0.0.5:8080");
        assert_eq!(cfg.http.bind, DEFAULT_BIND);
    }
}
