mod backfill;
mod ingest;
mod retrieval;

pub use backfill::BackfillManager;
pub use ingest::IngestService;
pub use retrieval::RetrievalService;
