//! biyo-core: transport-agnostic service runtime for the Biyo clinic backend.
//!
//! Services are named, tenant-aware and wrapped in a Feathers-style hook
//! pipeline. Transports (see `biyo-axum`) only translate requests into
//! calls on a [`ServiceHandle`].

pub mod app;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod registry;
pub mod service;
pub mod tenant;

pub use app::{BiyoApp, ServiceCaller, ServiceHandle};
pub use config::{load_env_config, BiyoConfig, BiyoConfigSnapshot};
pub use errors::{BiyoError, ErrorKind};
pub use hooks::{
    AfterHook, AroundHook, BeforeHook, ErrorHook, HookContext, HookResult, Next, ServiceHooks,
};
pub use registry::ServiceRegistry;
pub use service::{BiyoService, ServiceCapabilities, ServiceMethodKind};
pub use tenant::{TenantContext, TenantId};
