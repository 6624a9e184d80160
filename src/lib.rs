//! # Mnemo
//!
//! A retrieval-augmented memory agent for the command line, built with Rust.
//!
//! ## Features
//!
//! - **Persistent Memory:** Store and recall past interactions via vector search
//! - **Interchangeable Backends:** PostgreSQL + pgvector or Qdrant
//! - **Local or Hosted Embeddings:** fastembed in-process, or the OpenAI embeddings API
//! - **Streaming Chat:** Token-by-token rendering of hosted completions

pub mod agent;
pub mod config;
pub mod database;
pub mod error;
pub mod memory;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
