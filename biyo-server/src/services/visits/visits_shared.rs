use std::sync::Arc;

use biyo_core::{BiyoApp, ServiceCapabilities};
use serde_json::Value;

use biyo_model::Visit;

use crate::hooks::{StampTimestamp, TypedRecord};
use crate::services::ClinicParams;

pub fn crud_capabilities() -> ServiceCapabilities {
    ServiceCapabilities::standard_crud()
}

pub fn register_hooks(app: &BiyoApp<Value, ClinicParams>) -> anyhow::Result<()> {
    app.service("visits")?.hooks(|h| {
        h.before_create(StampTimestamp::if_missing("createdAt"));
        h.before_create(Arc::new(super::visits_hooks::NormalizeVisit));
        h.before_create(TypedRecord::<Visit>::new());
    });
    Ok(())
}
