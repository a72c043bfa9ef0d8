//! In-memory storage backend.
//!
//! Rows are kept as JSON values in per-entity tables wrapped in
//! `Arc<RwLock<_>>`. Sessions stage their writes and apply them atomically
//! on commit. Data is not persisted and is lost when the store is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::storage::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! let repository = GenericRepository::<Product, _>::new(Arc::new(store), None, context)?;
//! ```

mod session;
mod store;

pub use session::InMemorySession;
pub use store::{InMemoryStore, StoreStats};
