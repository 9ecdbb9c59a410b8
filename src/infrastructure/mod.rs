pub mod config;
pub mod extractor;
pub mod inference;
pub mod logging;
pub mod security;
