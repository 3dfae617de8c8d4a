pub mod aggregate;
pub mod ingest;
pub mod query;
pub mod service;

pub use service::SensorService;
