//! Cache backend implementations.
//!
//! Concrete implementations of `repokit_core::cache::Cache`. The in-memory
//! backend is always built; the Redis backend needs the `redis` feature.

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
