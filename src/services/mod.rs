pub mod auth_service;
pub mod file_service;
pub mod project_service;
