pub mod mysql;
pub mod user_repository;
