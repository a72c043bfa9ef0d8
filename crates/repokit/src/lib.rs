//! Imperative shell of the repokit data-access kernel.
//!
//! [`repository::GenericRepository`] gives CRUD over any
//! [`Entity`](repokit_core::entity::Entity) with the entity's capability
//! filters applied. Cacheable entity types are read from a whole-collection
//! snapshot kept by [`repository::CacheAside`]; writes can join a caller-owned
//! [`repository::UnitOfWork`] that defers cache refreshes until it commits.
//!
//! Store and cache backends live in [`storage`] and [`cache`].

pub mod cache;
pub mod config;
pub mod mock_data;
pub mod models;
pub mod repository;
pub mod storage;
