use biyo_core::{BiyoApp, ServiceCapabilities, ServiceMethodKind};
use serde_json::Value;

use biyo_model::Clinic;

use crate::hooks::{StampTimestamp, TypedRecord};
use crate::services::ClinicParams;

/// Clinics are never deleted; `GET ?id=` answers one clinic or `null`.
pub fn capabilities() -> ServiceCapabilities {
    ServiceCapabilities::from_methods(vec![
        ServiceMethodKind::Find,
        ServiceMethodKind::Get,
        ServiceMethodKind::Create,
    ])
    .with_single_lookup("id")
}

pub fn register_hooks(app: &BiyoApp<Value, ClinicParams>) -> anyhow::Result<()> {
    app.service("clinics")?.hooks(|h| {
        h.before_create(StampTimestamp::if_missing("createdAt"));
        h.before_create(TypedRecord::<Clinic>::new());
    });
    Ok(())
}
