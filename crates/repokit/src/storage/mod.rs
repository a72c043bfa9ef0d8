//! Storage backend implementations.
//!
//! Concrete implementations of the `Store` and `Session` traits defined in
//! `repokit_core::storage`.

pub mod inmemory;

pub use inmemory::{InMemorySession, InMemoryStore, StoreStats};
