pub mod auth_service;
pub mod summarization_service;
