use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:4000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 3;
pub const DEFAULT_BREAKER_RESET: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub sync_enabled: bool,
    pub sync_interval: Duration,
    /// Consecutive sync failures before syncing pauses.
    pub breaker_threshold: u32,
    /// How long a paused sync waits before probing the server again.
    pub breaker_reset: Duration,
    /// Where the offline snapshot lives; `None` keeps the cache in memory.
    pub cache_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            sync_enabled: true,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            breaker_reset: DEFAULT_BREAKER_RESET,
            cache_path: None,
        }
    }
}

fn flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str| value(key).and_then(|v| v.trim().parse::<u64>().ok()).map(Duration::from_secs);
        let defaults = Self::default();

        Self {
            api_url: value("BIYO_API_URL").unwrap_or(defaults.api_url),
            timeout: secs("BIYO_API_TIMEOUT_SECS").unwrap_or(defaults.timeout),
            sync_enabled: value("BIYO_SYNC_ENABLED")
                .and_then(|v| flag(&v))
                .unwrap_or(defaults.sync_enabled),
            sync_interval: secs("BIYO_SYNC_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.sync_interval),
            breaker_threshold: value("BIYO_SYNC_FAILURE_THRESHOLD")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.breaker_threshold),
            breaker_reset: secs("BIYO_SYNC_RESET_SECS").unwrap_or(defaults.breaker_reset),
            cache_path: value("BIYO_CACHE_PATH").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ClientConfig::from_lookup(|key: &str| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(config(&[]), ClientConfig::default());
    }

    #[test]
    fn env_overrides() {
        let c = config(&[
            ("BIYO_API_URL", "https://clinic.example/api"),
            ("BIYO_SYNC_ENABLED", "false"),
            ("BIYO_SYNC_INTERVAL_SECS", "10"),
            ("BIYO_CACHE_PATH", "/tmp/biyo.json"),
        ]);
        assert_eq!(c.api_url, "https://clinic.example/api");
        assert!(!c.sync_enabled);
        assert_eq!(c.sync_interval, Duration::from_secs(10));
        assert_eq!(c.cache_path, Some(PathBuf::from("/tmp/biyo.json")));
    }

    #[test]
    fn bad_numbers_keep_defaults() {
        let c = config(&[("BIYO_SYNC_INTERVAL_SECS", "0"), ("BIYO_SYNC_FAILURE_THRESHOLD", "many")]);
        assert_eq!(c.sync_interval, DEFAULT_SYNC_INTERVAL);
        assert_eq!(c.breaker_threshold, DEFAULT_BREAKER_THRESHOLD);
    }
}
