use biyo_core::{ServiceCapabilities, ServiceMethodKind};

/// `POST /` records a payment, `DELETE /{id}` takes it back.
pub fn capabilities() -> ServiceCapabilities {
    ServiceCapabilities::from_methods(vec![ServiceMethodKind::Create, ServiceMethodKind::Remove])
}
