use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use biyo_core::errors::BiyoError;
use biyo_core::{AroundHook, BeforeHook, BiyoApp, HookContext, Next, ServiceMethodKind};
use biyo_model::ids::now_iso;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ENFORCE_TENANT_KEY;
use crate::services::adapters::table_adapter::str_of;
use crate::services::ClinicParams;

pub struct LogAround;

#[async_trait]
impl AroundHook<Value, ClinicParams> for LogAround {
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>, next: Next<Value, ClinicParams>) -> Result<()> {
        let started = Instant::now();
        let res = next.run(ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let clinic = ctx.clinic_id().unwrap_or("-");
        match &res {
            Ok(()) => debug!(
                service = %ctx.service,
                method = ctx.method.as_str(),
                clinic,
                provider = %ctx.params.provider,
                elapsed_ms,
                "service call"
            ),
            Err(e) => warn!(
                service = %ctx.service,
                method = ctx.method.as_str(),
                clinic,
                elapsed_ms,
                error = %e,
                "service call failed"
            ),
        }
        res
    }
}

/// When `tenant.enforce` is on, every call to a clinic-owned service must
/// name a clinic, and a create may not write into another clinic. Open
/// lookups and in-process calls from other hooks pass.
pub struct TenantGuard {
    /// Services whose records do not belong to a clinic.
    pub unscoped_services: &'static [&'static str],
    /// `(service, query key)` lookups allowed without a clinic, such as
    /// finding a user by email at sign-in.
    pub open_lookups: &'static [(&'static str, &'static str)],
}

impl TenantGuard {
    fn is_open_lookup(&self, ctx: &HookContext<Value, ClinicParams>) -> bool {
        self.open_lookups
            .iter()
            .any(|(svc, key)| ctx.service == *svc && ctx.params.query_value(key).is_some())
    }
}

#[async_trait]
impl BeforeHook<Value, ClinicParams> for TenantGuard {
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>) -> Result<()> {
        if !ctx.config.get_bool(ENFORCE_TENANT_KEY).unwrap_or(false)
            || ctx.params.is_internal()
            || self.unscoped_services.contains(&ctx.service.as_str())
        {
            return Ok(());
        }

        let clinic_required = || BiyoError::bad_request("clinicId is required").into_anyhow();
        match ctx.method {
            ServiceMethodKind::Find if !ctx.tenant.is_scoped() && !self.is_open_lookup(ctx) => {
                Err(clinic_required())
            }
            ServiceMethodKind::Get | ServiceMethodKind::Create | ServiceMethodKind::Remove
                if !ctx.tenant.is_scoped() =>
            {
                Err(clinic_required())
            }
            ServiceMethodKind::Create => {
                let body_clinic = ctx
                    .data
                    .as_ref()
                    .and_then(|d| str_of(d, "clinicId"))
                    .filter(|c| !c.is_empty());
                match (ctx.clinic_id(), body_clinic) {
                    (Some(tenant), Some(body)) if tenant != body => Err(BiyoError::forbidden(
                        "clinicId does not match the requesting clinic",
                    )
                    .into_anyhow()),
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

/// Sets `field` to the current time on create. Without `overwrite` an
/// existing value is kept.
pub struct StampTimestamp {
    pub field: &'static str,
    pub overwrite: bool,
}

impl StampTimestamp {
    pub fn if_missing(field: &'static str) -> Arc<Self> {
        Arc::new(Self { field, overwrite: false })
    }

    pub fn always(field: &'static str) -> Arc<Self> {
        Arc::new(Self { field, overwrite: true })
    }
}

#[async_trait]
impl BeforeHook<Value, ClinicParams> for StampTimestamp {
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>) -> Result<()> {
        let Some(Value::Object(obj)) = ctx.data.as_mut() else {
            return Ok(());
        };
        let missing = obj
            .get(self.field)
            .map_or(true, |v| v.is_null() || v.as_str().is_some_and(str::is_empty));
        if self.overwrite || missing {
            obj.insert(self.field.to_string(), Value::String(now_iso()));
        }
        Ok(())
    }
}

/// Refuses a create body that would not read back as a `T`. Top-level
/// `null`s are dropped first so the record's defaults apply.
pub struct TypedRecord<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> TypedRecord<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { _record: PhantomData })
    }
}

#[async_trait]
impl<T> BeforeHook<Value, ClinicParams> for TypedRecord<T>
where
    T: DeserializeOwned + 'static,
{
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>) -> Result<()> {
        let Some(Value::Object(obj)) = ctx.data.as_mut() else {
            return Ok(());
        };
        obj.retain(|_, v| !v.is_null());

        if let Err(e) = serde_json::from_value::<T>(Value::Object(obj.clone())) {
            return Err(BiyoError::bad_request(format!("Invalid {} record", ctx.service))
                .with_errors(json!({ "body": [e.to_string()] }))
                .into_anyhow());
        }
        Ok(())
    }
}

pub fn global_hooks(app: &BiyoApp<Value, ClinicParams>) {
    app.hooks(|h| {
        h.around_all(Arc::new(LogAround));
        h.before_all(Arc::new(TenantGuard {
            unscoped_services: &["clinics", "analytics"],
            open_lookups: &[("users", "email")],
        }));
    });
}
