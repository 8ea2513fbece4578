pub mod clinics_service;
pub mod clinics_shared;

pub use clinics_service::ClinicsService;
