use thiserror::Error;

use super::ConditionOperator;

/// Errors that can occur while composing or evaluating a query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Page size must be greater than zero")]
    InvalidPageSize,
    #[error("Condition on '{property}' with operator {operator:?} requires at least one value")]
    MissingValue {
        property: String,
        operator: ConditionOperator,
    },
    #[error("Failed to inspect row: {0}")]
    Serialization(String),
}
