use anyhow::Result;
use async_trait::async_trait;
use biyo_core::{AfterHook, BeforeHook, HookContext};
use serde_json::{json, Value};
use tracing::debug;

use crate::services::adapters::table_adapter::str_of;
use crate::services::ClinicParams;

/// A fresh patient starts with an empty chart, no enrolled services and a
/// zero balance.
pub struct PatientDefaults;

#[async_trait]
impl BeforeHook<Value, ClinicParams> for PatientDefaults {
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>) -> Result<()> {
        let Some(Value::Object(obj)) = ctx.data.as_mut() else {
            return Ok(());
        };
        for (key, default) in [("teeth", json!([])), ("services", json!([])), ("balance", json!(0))] {
            if obj.get(key).map_or(true, Value::is_null) {
                obj.insert(key.to_string(), default);
            }
        }
        Ok(())
    }
}

/// Removing a patient also removes their visits and files in the same
/// clinic.
pub struct CascadePatientRemoval;

#[async_trait]
impl AfterHook<Value, ClinicParams> for CascadePatientRemoval {
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>) -> Result<()> {
        let Some(patient_id) = ctx.id.clone() else {
            return Ok(());
        };
        if !ctx.tenant.is_scoped() {
            return Ok(());
        }

        for name in ["visits", "files"] {
            let svc = ctx.services.service(name)?;
            let params = ClinicParams::internal([("patientId", patient_id.as_str())]);

            let owned = svc.find(ctx.tenant.clone(), params.clone()).await?;
            for record in &owned {
                if let Some(id) = str_of(record, "id") {
                    svc.remove(ctx.tenant.clone(), Some(id), params.clone()).await?;
                }
            }
            debug!(patient = %patient_id, service = name, removed = owned.len(), "cascade delete");
        }
        Ok(())
    }
}
