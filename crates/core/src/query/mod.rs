//! Filtering, sorting and pagination shared by live and cached reads.
//!
//! [`Query::compose`] turns capabilities, read options and the tenant context
//! into a [`Query`]; stores translate it to their own query language, while
//! [`Query::evaluate`] applies it to rows already in memory.

mod compose;
mod error;
mod evaluate;
mod types;

pub use compose::{Criteria, Predicate, Query, ReadOptions, Scope, TenantScope};
pub use error::QueryError;
pub use evaluate::{compare_fields, condition_matches, lookup_property};
pub use types::{
    Condition, ConditionOperator, Includes, PagedResult, Pagination, Rows, Sort, SortDirection,
    Window,
};
