//! Redis cache backend implementation.
//!
//! Provides a shared cache for deployments running several instances
//! against one store.

mod cache;
mod error;

pub use cache::RedisCache;
