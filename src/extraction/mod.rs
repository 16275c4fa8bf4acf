pub mod gateway;
mod provider;

pub use gateway::{EpisodeInput, ExtractionOutcome};
pub use provider::{sanitize_group_id, ExtractionProvider};
