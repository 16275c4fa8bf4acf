pub(crate) mod api;
mod provider;


pub use provider::EmbeddingProvider;
