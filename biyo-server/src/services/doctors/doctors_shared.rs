use biyo_core::{BiyoApp, ServiceCapabilities};
use biyo_model::Doctor;
use serde_json::Value;

use crate::hooks::TypedRecord;
use crate::services::ClinicParams;

pub fn crud_capabilities() -> ServiceCapabilities {
    ServiceCapabilities::standard_crud()
}

pub fn register_hooks(app: &BiyoApp<Value, ClinicParams>) -> anyhow::Result<()> {
    app.service("doctors")?.hooks(|h| {
        h.before_create(TypedRecord::<Doctor>::new());
    });
    Ok(())
}
