//! Server settings from the environment.
//!
//! Everything is read through a lookup function so tests can supply their
//! own variables instead of touching the process environment.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use biyo_axum::DEFAULT_BODY_LIMIT;
use biyo_core::config::parse_flag;
use biyo_core::BiyoApp;
use biyo_store::kv::DEFAULT_KEY_PREFIX;
use biyo_store::{
    FileKv, KvTableStore, MemoryKv, RestKv, ServiceAccount, SheetsClient, SheetsTableStore,
    TableStore,
};
use serde_json::Value;
use tracing::info;

use crate::services::ClinicParams;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;

/// Config key read by the tenant guard hook.
pub const ENFORCE_TENANT_KEY: &str = "tenant.enforce";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Memory,
    File {
        dir: PathBuf,
    },
    Kv {
        url: String,
        token: String,
    },
    Sheets {
        spreadsheet_id: String,
        client_email: String,
        private_key: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub key_prefix: String,
    pub enforce_tenant: bool,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            store: StoreConfig::Memory,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            enforce_tenant: false,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("missing required environment variable {key}"))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {key}: {e}")),
        None => Ok(default),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("BIYO_STORE")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "" | "memory" => StoreConfig::Memory,
            "file" => StoreConfig::File {
                dir: PathBuf::from(lookup("BIYO_DATA_DIR").unwrap_or_else(|| "./data".into())),
            },
            "kv" => StoreConfig::Kv {
                url: required(&lookup, "KV_REST_API_URL")?,
                token: required(&lookup, "KV_REST_API_TOKEN")?,
            },
            "sheets" => StoreConfig::Sheets {
                spreadsheet_id: required(&lookup, "GOOGLE_SHEETS_ID")?,
                client_email: required(&lookup, "GOOGLE_CLIENT_EMAIL")?,
                private_key: required(&lookup, "GOOGLE_PRIVATE_KEY")?,
            },
            other => bail!("unknown BIYO_STORE {other:?}; expected memory, file, kv or sheets"),
        };

        let port_key = if lookup("BACKEND_PORT").is_some() { "BACKEND_PORT" } else { "PORT" };

        Ok(Self {
            host: lookup("BIYO_HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parsed(&lookup, port_key, DEFAULT_PORT)?,
            store,
            key_prefix: lookup("BIYO_KEY_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            enforce_tenant: lookup("BIYO_ENFORCE_TENANT")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(false),
            body_limit: parsed(&lookup, "BIYO_BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Publish the settings hooks read at call time.
    pub fn apply(&self, app: &BiyoApp<Value, ClinicParams>) {
        app.set("http.host", self.host.clone());
        app.set("http.port", self.port.to_string());
        app.set(ENFORCE_TENANT_KEY, self.enforce_tenant.to_string());
        app.set("store.backend", self.store.backend_name());
    }

    pub fn open_store(&self) -> Arc<dyn TableStore> {
        let prefix = self.key_prefix.clone();
        let store: Arc<dyn TableStore> = match &self.store {
            StoreConfig::Memory => Arc::new(KvTableStore::with_prefix(MemoryKv::new(), prefix)),
            StoreConfig::File { dir } => {
                Arc::new(KvTableStore::with_prefix(FileKv::new(dir.clone()), prefix))
            }
            StoreConfig::Kv { url, token } => {
                Arc::new(KvTableStore::with_prefix(RestKv::new(url.clone(), token.clone()), prefix))
            }
            StoreConfig::Sheets {
                spreadsheet_id,
                client_email,
                private_key,
            } => {
                let account = ServiceAccount::new(client_email.clone(), private_key.clone());
                let client = SheetsClient::new(spreadsheet_id.clone(), account);
                Arc::new(SheetsTableStore::new(Arc::new(client)))
            }
        };
        info!(backend = store.backend_name(), "table store ready");
        store
    }
}

impl StoreConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::File { .. } => "file",
            StoreConfig::Kv { .. } => "kv",
            StoreConfig::Sheets { .. } => "sheets",
        }
    }
}
