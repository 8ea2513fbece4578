//! # Configuration
//!
//! A flat string key/value store in the style of Feathers' `app.set()` /
//! `app.get()`. Hooks see an immutable [`BiyoConfigSnapshot`] taken when
//! the call starts.
//!
//! ```rust
//! use biyo_core::BiyoApp;
//! let app = BiyoApp::<(), ()>::new();
//! app.set("tenancy.enforce", "true");
//! assert_eq!(app.get("tenancy.enforce"), Some("true".to_string()));
//! ```
//!
//! Environment overrides use double underscores as separators:
//! `BIYO__TENANCY__ENFORCE=true` becomes `tenancy.enforce`.

use std::collections::HashMap;

use crate::BiyoApp;

#[derive(Debug, Default)]
pub struct BiyoConfig {
    values: HashMap<String, String>,
}

impl BiyoConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> BiyoConfigSnapshot {
        BiyoConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BiyoConfigSnapshot {
    map: HashMap<String, String>,
}

impl BiyoConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    /// Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(parse_flag)
    }
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Normalize `PREFIX__A__B` into `a.b`. Returns `None` for other keys.
pub fn env_key_to_config_key(env_key: &str, prefix: &str) -> Option<String> {
    let stripped = env_key.strip_prefix(prefix)?.strip_prefix("__")?;
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_lowercase().replace("__", "."))
}

/// Copy every `PREFIX__*` environment variable into the app config.
/// Returns how many keys were set.
pub fn load_env_config<R, P>(app: &BiyoApp<R, P>, prefix: &str) -> usize
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    load_config_pairs(app, prefix, std::env::vars())
}

pub fn load_config_pairs<R, P, I>(app: &BiyoApp<R, P>, prefix: &str, vars: I) -> usize
where
    R: Send + 'static,
    P: Send + Clone + 'static,
    I: IntoIterator<Item = (String, String)>,
{
    let mut count = 0;
    for (key, value) in vars {
        if let Some(normalized) = env_key_to_config_key(&key, prefix) {
            app.set(normalized, value);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_dotted_config() {
        assert_eq!(
            env_key_to_config_key("BIYO__TENANCY__ENFORCE", "BIYO"),
            Some("tenancy.enforce".to_string())
        );
        assert_eq!(env_key_to_config_key("BIYO_STORE", "BIYO"), None);
        assert_eq!(env_key_to_config_key("BIYO__", "BIYO"), None);
        assert_eq!(env_key_to_config_key("PATH", "BIYO"), None);
    }

    #[test]
    fn pairs_land_in_app_config() {
        let app = BiyoApp::<(), ()>::new();
        let n = load_config_pairs(
            &app,
            "BIYO",
            vec![
                ("BIYO__HTTP__PORT".to_string(), "4100".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ],
        );
        assert_eq!(n, 1);
        assert_eq!(app.get("http.port"), Some("4100".to_string()));
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
