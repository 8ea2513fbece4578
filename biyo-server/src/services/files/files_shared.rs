use biyo_core::{BiyoApp, ServiceCapabilities};
use serde_json::Value;

use biyo_model::PatientFile;

use crate::hooks::{StampTimestamp, TypedRecord};
use crate::services::ClinicParams;

pub fn crud_capabilities() -> ServiceCapabilities {
    ServiceCapabilities::standard_crud()
}

pub fn register_hooks(app: &BiyoApp<Value, ClinicParams>) -> anyhow::Result<()> {
    app.service("files")?.hooks(|h| {
        h.before_create(StampTimestamp::if_missing("uploadedAt"));
        h.before_create(TypedRecord::<PatientFile>::new());
    });
    Ok(())
}
