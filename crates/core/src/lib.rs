//! Functional core of the repokit data-access kernel.
//!
//! Everything here is free of I/O: entity capability traits and their
//! registry, the filter and query composer with its in-memory evaluator, and
//! the traits the imperative shell implements for stores and caches.

pub mod cache;
pub mod context;
pub mod entity;
pub mod query;
pub mod storage;

#[cfg(test)]
mod test_support;
