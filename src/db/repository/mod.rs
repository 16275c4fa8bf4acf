mod documents;
mod entity_links;
mod processed_events;

pub use documents::DocumentRepository;
pub use entity_links::EntityLinkRepository;
pub use processed_events::ProcessedEventRepository;
