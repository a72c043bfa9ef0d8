//! The generic repository and its cache-aside and unit-of-work collaborators.

mod cache_aside;
mod error;
mod generic;
mod scope;
mod unit_of_work;
mod writes;

pub use cache_aside::CacheAside;
pub use error::{RepositoryError, Result};
pub use generic::{GenericRepository, DEFAULT_MAX_SELECT_COUNT};
pub use unit_of_work::{AfterCommit, UnitOfWork};
