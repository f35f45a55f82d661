pub mod aggregate;
pub mod change;
pub mod fleet;
pub mod ingest;
pub mod resolver;
pub mod timeparse;
