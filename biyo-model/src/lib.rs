//! biyo-model: the records a dental clinic keeps and the figures derived
//! from them.
//!
//! All records serialize with camelCase keys, the shape stored in tables
//! and exchanged over HTTP.

pub mod analytics;
pub mod balance;
pub mod catalog;
pub mod clinic;
pub mod doctor;
pub mod export;
pub mod file;
pub mod ids;
pub mod money;
pub mod patient;
pub mod time;
pub mod visit;

pub use analytics::{summarize, AnalyticsQuery, ClinicSummary, DailyPoint, DoctorStats, ServiceUsage};
pub use balance::patient_balance;
pub use catalog::{default_services, Service};
pub use clinic::{Clinic, Role, User};
pub use doctor::Doctor;
pub use export::{patients_csv, PatientQuery};
pub use file::PatientFile;
pub use ids::new_id;
pub use money::round2;
pub use patient::{Patient, ToothCondition, ToothStatus};
pub use visit::{Payment, PaymentMethod, PaymentTotals, Visit, VisitService, VisitStatus};

/// Anything stored by `id`.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Anything owned by one clinic.
pub trait ClinicScoped {
    fn clinic_id(&self) -> &str;
}

macro_rules! record_traits {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

macro_rules! clinic_scoped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ClinicScoped for $ty {
                fn clinic_id(&self) -> &str {
                    &self.clinic_id
                }
            }
        )*
    };
}

record_traits!(Clinic, User, Doctor, Service, Patient, Visit, PatientFile, Payment);
clinic_scoped!(User, Doctor, Service, Patient, Visit, PatientFile);
