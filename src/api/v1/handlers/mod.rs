pub mod documents;
pub(crate) mod health;
pub mod ingest;
pub mod query;
pub mod sync;

pub use health::health_check;
