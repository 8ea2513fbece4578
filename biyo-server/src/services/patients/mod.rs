pub mod patients_hooks;
pub mod patients_service;
pub mod patients_shared;

pub use patients_service::PatientsService;
