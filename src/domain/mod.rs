pub mod error;
pub mod repository;
pub mod summary;
pub mod user;
