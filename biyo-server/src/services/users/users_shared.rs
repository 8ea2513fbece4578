use std::sync::Arc;

use biyo_core::{BiyoApp, ServiceCapabilities, ServiceMethodKind};
use serde_json::Value;

use biyo_model::User;

use crate::hooks::{StampTimestamp, TypedRecord};
use crate::services::ClinicParams;

/// `GET ?email=` answers one user or `null`, across all clinics unless a
/// clinic is given.
pub fn capabilities() -> ServiceCapabilities {
    ServiceCapabilities::from_methods(vec![
        ServiceMethodKind::Find,
        ServiceMethodKind::Get,
        ServiceMethodKind::Create,
    ])
    .with_single_lookup("email")
}

pub fn register_hooks(app: &BiyoApp<Value, ClinicParams>) -> anyhow::Result<()> {
    app.service("users")?.hooks(|h| {
        h.before_create(StampTimestamp::if_missing("createdAt"));
        h.before_create(Arc::new(super::users_hooks::UniqueEmail));
        h.before_create(TypedRecord::<User>::new());
    });
    Ok(())
}
