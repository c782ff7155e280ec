#![deny(missing_docs)]

//! Core library for the ragchat retrieval-augmented chatbot server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Chunking, embedding, and record management over Qdrant.
pub mod documents;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text extraction for uploaded files.
pub mod extract;
/// Chat model client, prompts, and session histories.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and chat metrics helpers.
pub mod metrics;
/// Composition of retrieval and answer generation.
pub mod orchestrator;
/// Qdrant vector store integration.
pub mod qdrant;
