use std::sync::Arc;

use biyo_core::{BiyoApp, ServiceCapabilities};
use serde_json::Value;

use biyo_model::Patient;

use crate::hooks::{StampTimestamp, TypedRecord};
use crate::services::ClinicParams;

pub fn crud_capabilities() -> ServiceCapabilities {
    ServiceCapabilities::standard_crud()
}

pub fn register_hooks(app: &BiyoApp<Value, ClinicParams>) -> anyhow::Result<()> {
    app.service("patients")?.hooks(|h| {
        h.before_create(StampTimestamp::if_missing("createdAt"));
        h.before_create(StampTimestamp::always("updatedAt"));
        h.before_create(Arc::new(super::patients_hooks::PatientDefaults));
        h.before_create(TypedRecord::<Patient>::new());

        h.after_remove(Arc::new(super::patients_hooks::CascadePatientRemoval));
    });
    Ok(())
}
