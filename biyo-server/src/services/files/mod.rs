pub mod files_service;
pub mod files_shared;

pub use files_service::FilesService;
