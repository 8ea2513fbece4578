pub mod payments_service;
pub mod payments_shared;

pub use payments_service::PaymentsService;
