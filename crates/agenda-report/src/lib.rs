pub mod config;
pub mod error;
pub mod ingest;
pub mod scheduling;
pub mod telemetry;
