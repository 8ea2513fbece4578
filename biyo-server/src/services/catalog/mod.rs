pub mod catalog_service;
pub mod catalog_shared;

pub use catalog_service::CatalogService;
