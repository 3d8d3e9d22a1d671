//! Infrastructure adapters and runtime bootstrap.

pub mod console;
pub mod error;
pub mod file_store;
pub mod http_client;
pub mod telemetry;
