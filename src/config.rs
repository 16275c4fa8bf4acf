use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub extraction: Option<ExtractionConfig>,
    pub retrieval: RetrievalConfig,
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

/// Embedding generation happens over an OpenAI-compatible `/embeddings`
/// endpoint. When neither an API key nor a base URL is configured the
/// provider reports itself unavailable and retrieval falls back to
/// lexical search.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Connection details for the graph-extraction gateway. Absent entirely
/// when `EXTRACTION_BASE_URL` is unset; ingestion then stores documents
/// without episodes and queries return documents-only context.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a document to enter the context.
    pub similarity_floor: f32,
    pub max_documents: usize,
    pub max_facts: usize,
    /// Cap on how many distinct entities from the top documents are sent
    /// to the gateway's fact search.
    pub max_entity_fanout: usize,
    /// Budget for the gateway fact lookup before the query degrades to
    /// documents-only.
    pub facts_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// Relevance assigned to links created during extraction.
    pub link_relevance: f32,
    pub backfill_interval_secs: u64,
    pub backfill_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("ENGRAM_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("ENGRAM_PORT", 3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:engram.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 1536),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 32),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 3),
            },
            extraction: env::var("EXTRACTION_BASE_URL").ok().map(|base_url| {
                ExtractionConfig {
                    base_url,
                    api_key: env::var("EXTRACTION_API_KEY").ok(),
                    timeout_secs: parse_env_or("EXTRACTION_TIMEOUT", 60),
                    max_retries: parse_env_or("EXTRACTION_MAX_RETRIES", 3),
                }
            }),
            retrieval: RetrievalConfig {
                similarity_floor: parse_env_or("SIMILARITY_FLOOR", 0.3),
                max_documents: parse_env_or("RETRIEVAL_MAX_DOCUMENTS", 10),
                max_facts: parse_env_or("RETRIEVAL_MAX_FACTS", 10),
                max_entity_fanout: parse_env_or("RETRIEVAL_MAX_ENTITY_FANOUT", 20),
                facts_timeout_secs: parse_env_or("RETRIEVAL_FACTS_TIMEOUT", 10),
            },
            ingestion: IngestionConfig {
                link_relevance: parse_env_or("INGEST_LINK_RELEVANCE", 0.8),
                backfill_interval_secs: parse_env_or("BACKFILL_INTERVAL_SECS", 300),
                backfill_batch_size: parse_env_or("BACKFILL_BATCH_SIZE", 32),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-var mutation is process-global; serialize the tests that touch it.
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_retrieval_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("SIMILARITY_FLOOR");
        std::env::remove_var("RETRIEVAL_MAX_DOCUMENTS");
        std::env::remove_var("RETRIEVAL_MAX_ENTITY_FANOUT");

        let config = Config::default();
        assert_eq!(config.retrieval.similarity_floor, 0.3);
        assert_eq!(config.retrieval.max_documents, 10);
        assert_eq!(config.retrieval.max_facts, 10);
        assert_eq!(config.retrieval.max_entity_fanout, 20);
    }

    #[test]
    fn test_similarity_floor_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("SIMILARITY_FLOOR", "0.55");
        let config = Config::default();
        assert_eq!(config.retrieval.similarity_floor, 0.55);
        std::env::remove_var("SIMILARITY_FLOOR");
    }

    #[test]
    fn test_extraction_config_absent_by_default() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("EXTRACTION_BASE_URL");
        let config = Config::default();
        assert!(config.extraction.is_none());
    }

    #[test]
    fn test_extraction_config_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("EXTRACTION_BASE_URL", "http://localhost:8900");
        std::env::set_var("EXTRACTION_TIMEOUT", "120");

        let config = Config::default();
        let extraction = config.extraction.expect("extraction config should be set");
        assert_eq!(extraction.base_url, "http://localhost:8900");
        assert_eq!(extraction.timeout_secs, 120);
        assert_eq!(extraction.max_retries, 3);

        std::env::remove_var("EXTRACTION_BASE_URL");
        std::env::remove_var("EXTRACTION_TIMEOUT");
    }

    #[test]
    fn test_embeddings_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("EMBEDDING_MODEL");
        std::env::remove_var("EMBEDDING_DIMENSIONS");

        let config = Config::default();
        assert_eq!(config.embeddings.model, "text-embedding-3-small");
        assert_eq!(config.embeddings.dimensions, 1536);
        assert_eq!(config.embeddings.timeout_secs, 30);
    }

    #[test]
    fn test_ingestion_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("INGEST_LINK_RELEVANCE");
        std::env::remove_var("BACKFILL_INTERVAL_SECS");

        let config = Config::default();
        assert_eq!(config.ingestion.link_relevance, 0.8);
        assert_eq!(config.ingestion.backfill_interval_secs, 300);
        assert_eq!(config.ingestion.backfill_batch_size, 32);
    }

    #[test]
    fn test_parse_env_or_valid_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("__TEST_PARSE_PORT", "8080");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 3000);
        assert_eq!(result, 8080);
        std::env::remove_var("__TEST_PARSE_PORT");
    }

    #[test]
    fn test_parse_env_or_invalid_value_falls_back() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("__TEST_PARSE_FLOOR", "not-a-number");
        let result: f32 = parse_env_or("__TEST_PARSE_FLOOR", 0.3);
        assert_eq!(result, 0.3);
        std::env::remove_var("__TEST_PARSE_FLOOR");
    }
}
