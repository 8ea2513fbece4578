use biyo_core::{BiyoApp, ServiceCapabilities};
use biyo_model::Service;
use serde_json::Value;

use crate::hooks::TypedRecord;
use crate::services::ClinicParams;

/// The clinic's price list, served at `/api/services`.
pub fn crud_capabilities() -> ServiceCapabilities {
    ServiceCapabilities::standard_crud()
}

pub fn register_hooks(app: &BiyoApp<Value, ClinicParams>) -> anyhow::Result<()> {
    app.service("services")?.hooks(|h| {
        h.before_create(TypedRecord::<Service>::new());
    });
    Ok(())
}
