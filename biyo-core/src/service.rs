use async_trait::async_trait;
use anyhow::Result;

use crate::errors::BiyoError;
use crate::tenant::TenantContext;

/// Service methods a transport can route to.
///
/// `Create` is an upsert in this system: a body carrying an existing `id`
/// replaces that record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Remove,
    Custom(&'static str),
}

impl ServiceMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMethodKind::Find => "find",
            ServiceMethodKind::Get => "get",
            ServiceMethodKind::Create => "create",
            ServiceMethodKind::Remove => "remove",
            ServiceMethodKind::Custom(name) => name,
        }
    }
}

/// What a service exposes to transports.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
    /// Query key that turns a list read into a single-record read
    /// (first match or `null`), e.g. `email` for users.
    pub single_lookup: Option<&'static str>,
}

impl ServiceCapabilities {
    /// find, get, create, remove.
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self::from_methods(vec![Find, Get, Create, Remove])
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
            single_lookup: None,
        }
    }

    pub fn with_single_lookup(mut self, key: &'static str) -> Self {
        self.single_lookup = Some(key);
        self
    }

    pub fn allows(&self, method: &ServiceMethodKind) -> bool {
        self.allowed_methods.contains(method)
    }
}

fn not_implemented(method: &str) -> anyhow::Error {
    BiyoError::method_not_allowed(format!("Method not implemented: {method}")).into_anyhow()
}

/// A named, tenant-aware service.
///
/// Every method defaults to a "Method not implemented" error so a service
/// only overrides what it supports.
#[async_trait]
pub trait BiyoService<R, P = ()>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _ctx: &TenantContext, _params: P) -> Result<Vec<R>> {
        Err(not_implemented("find"))
    }

    async fn get(&self, _ctx: &TenantContext, _id: &str, _params: P) -> Result<R> {
        Err(not_implemented("get"))
    }

    /// Create a record, or replace the stored record with the same id.
    async fn create(&self, _ctx: &TenantContext, _data: R, _params: P) -> Result<R> {
        Err(not_implemented("create"))
    }

    /// `id` is `None` when the transport passed the id some other way
    /// (e.g. in the query string) or not at all.
    async fn remove(&self, _ctx: &TenantContext, _id: Option<&str>, _params: P) -> Result<R> {
        Err(not_implemented("remove"))
    }
}
