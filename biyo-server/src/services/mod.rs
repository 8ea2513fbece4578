use std::sync::Arc;

use biyo_core::{BiyoApp, BiyoService};
use biyo_store::TableStore;
use serde_json::Value;

pub mod adapters;
pub mod types;
pub use types::ClinicParams;

pub mod analytics;
pub mod catalog;
pub mod clinics;
pub mod doctors;
pub mod files;
pub mod patients;
pub mod payments;
pub mod users;
pub mod visits;

type Svc = Arc<dyn BiyoService<Value, ClinicParams>>;

pub struct ClinicServices {
    pub patients: Svc,
    pub doctors: Svc,
    pub services: Svc,
    pub visits: Svc,
    pub clinics: Svc,
    pub users: Svc,
    pub files: Svc,
    pub payments: Svc,
    pub analytics: Svc,
}

pub fn configure(
    app: &BiyoApp<Value, ClinicParams>,
    store: Arc<dyn TableStore>,
) -> anyhow::Result<ClinicServices> {
    let svcs = ClinicServices {
        patients: Arc::new(patients::PatientsService::new(Arc::clone(&store))),
        doctors: Arc::new(doctors::DoctorsService::new(Arc::clone(&store))),
        services: Arc::new(catalog::CatalogService::new(Arc::clone(&store))),
        visits: Arc::new(visits::VisitsService::new(Arc::clone(&store))),
        clinics: Arc::new(clinics::ClinicsService::new(Arc::clone(&store))),
        users: Arc::new(users::UsersService::new(Arc::clone(&store))),
        files: Arc::new(files::FilesService::new(Arc::clone(&store))),
        payments: Arc::new(payments::PaymentsService::new(Arc::clone(&store))),
        analytics: Arc::new(analytics::AnalyticsService::new(store)),
    };

    for (name, svc) in [
        ("patients", &svcs.patients),
        ("doctors", &svcs.doctors),
        ("services", &svcs.services),
        ("visits", &svcs.visits),
        ("clinics", &svcs.clinics),
        ("users", &svcs.users),
        ("files", &svcs.files),
        ("payments", &svcs.payments),
        ("analytics", &svcs.analytics),
    ] {
        app.register_service(name, Arc::clone(svc));
    }

    patients::patients_shared::register_hooks(app)?;
    doctors::doctors_shared::register_hooks(app)?;
    catalog::catalog_shared::register_hooks(app)?;
    visits::visits_shared::register_hooks(app)?;
    clinics::clinics_shared::register_hooks(app)?;
    users::users_shared::register_hooks(app)?;
    files::files_shared::register_hooks(app)?;

    Ok(svcs)
}
