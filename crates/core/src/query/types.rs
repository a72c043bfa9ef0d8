use serde::{Deserialize, Serialize};

use super::QueryError;

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    /// Substring of a string field, or member of an array field.
    Contains,
    StartsWith,
    EndsWith,
    /// Equal to any of the values.
    In,
    /// Equal to none of the values.
    NotIn,
    IsNull,
    IsNotNull,
}

impl ConditionOperator {
    /// Returns true if the operator compares against at least one value.
    pub fn takes_values(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

/// A store-agnostic filter predicate on one property.
///
/// Values are strings and are coerced to the property's type when evaluated,
/// so the same condition works against a live store and a cached snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub property_name: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Condition {
    pub fn new<I, V>(property_name: impl Into<String>, operator: ConditionOperator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            property_name: property_name.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Shorthand for an equality condition.
    pub fn equal(property_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(property_name, ConditionOperator::Equal, [value])
    }

    /// Checks that the operator has the values it needs.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.operator.takes_values() && self.values.is_empty() {
            return Err(QueryError::MissingValue {
                property: self.property_name.clone(),
                operator: self.operator,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Ordering on one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    pub property_name: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            direction: SortDirection::Descending,
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            property_name: self.property_name.clone(),
            direction: self.direction.reversed(),
        }
    }
}

/// A page request. `page_index` starts at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Converts the request into a window, clamping the size to `max_page_size`.
    pub fn window(&self, max_page_size: usize) -> Result<Window, QueryError> {
        if self.page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        let size = self.page_size.min(max_page_size);
        Ok(Window {
            offset: self.page_index.saturating_mul(size),
            limit: Some(size),
        })
    }
}

/// Offset and limit applied after filtering and sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Window {
    /// No offset and no limit. Used by counts and existence checks.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn first(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }
}

/// Related data to load alongside an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Includes {
    #[default]
    None,
    All,
    Only(Vec<String>),
}

impl Includes {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if the relation called `name` should be loaded.
    pub fn keeps(&self, name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        }
    }
}

/// Materialized rows of a query: the windowed items plus the count before the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Rows<E> {
    pub items: Vec<E>,
    pub total: usize,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<E> {
    pub items: Vec<E>,
    pub total_count: usize,
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
}

impl<E> PagedResult<E> {
    /// Builds the page metadata for `rows` fetched through `window`.
    pub fn from_rows(rows: Rows<E>, window: Window) -> Self {
        let page_size = window.limit.unwrap_or(rows.total);
        let (page_index, page_count) = if page_size == 0 {
            (0, 0)
        } else {
            (window.offset / page_size, rows.total.div_ceil(page_size))
        };

        Self {
            items: rows.items,
            total_count: rows.total,
            page_index,
            page_size,
            page_count,
        }
    }
}
