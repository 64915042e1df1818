//! Research Index Module
//!
//! The last consumer in the chain. Every `COMPLETED` de-identification job becomes one
//! [`IndexDocument`]; everything else on the jobs topic is ignored.
//!
//! ## Submodules
//! - **`service`**: `ResearchIndexer` (write side) and `IndexQueryService` (read side).
//! - **`repository`**: document storage behind the `IndexRepository` trait.
//! - **`cache`**: `doc:{id}` lookup cache and its invalidation hook.
//! - **`handlers`**: HTTP lookups for the Axum router.
//! - **`types`**: the document and response bodies.

pub mod cache;
pub mod handlers;
pub mod repository;
pub mod service;
pub mod types;

pub use cache::{cache_key, CacheInvalidator, DocumentCache};
pub use repository::{InMemoryIndexRepository, IndexRepository};
pub use service::{IndexQueryService, ResearchIndexer};
pub use types::IndexDocument;
