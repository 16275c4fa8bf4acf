//! Engram is a self-hostable episodic memory service. It ingests email
//! and message events exactly once, stores them as embedded documents,
//! links them to entities in a knowledge graph, and answers queries with
//! a hybrid of vector-ranked documents and graph facts.

pub mod api;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod extraction;
pub mod models;
pub mod services;

pub use error::{EngramError, Result};
