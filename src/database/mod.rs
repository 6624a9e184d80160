//! Database module - vector store backends
//!
//! Provides the two interchangeable memory backends:
//! - PostgreSQL with pgvector: one SQL table per collection
//! - Qdrant: one Qdrant collection per logical collection

mod pg_memory;
mod postgres;
mod qdrant;

pub use pg_memory::PgVectorMemory;
pub use postgres::{init_pool, init_pool_for_migrations, migrations, PostgresPool};
pub use qdrant::QdrantMemory;
