pub mod visits_hooks;
pub mod visits_service;
pub mod visits_shared;

pub use visits_service::VisitsService;
