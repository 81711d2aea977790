pub mod config;
pub mod errors;
pub mod gateway;
pub mod gitsource;
mod request_logging;
pub mod runservice;
pub mod store;
pub mod types;
