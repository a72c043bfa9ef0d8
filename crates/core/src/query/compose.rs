use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::context::TenantContext;
use crate::entity::{Capabilities, Entity};

use super::{
    compare_fields, condition_matches, lookup_property, Condition, Includes, Pagination,
    QueryError, Rows, Sort, SortDirection, Window,
};

/// Caller-controlled switches of the capability filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Load related data. Only honoured by live reads.
    pub include_children: bool,
    pub include_inactive: bool,
    pub include_deleted: bool,
}

impl ReadOptions {
    pub fn with_children(mut self) -> Self {
        self.include_children = true;
        self
    }

    pub fn with_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

/// Which tenants a query may see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TenantScope {
    #[default]
    Any,
    /// Only rows whose tenant equals this value (`None` means untenanted rows).
    Only(Option<Uuid>),
}

/// The capability filters of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub active_only: bool,
    pub exclude_deleted: bool,
    pub tenant: TenantScope,
}

impl Scope {
    /// Derives the filters from what the entity supports and what the caller asked for.
    pub fn compose(
        capabilities: &Capabilities,
        options: &ReadOptions,
        tenant: &TenantContext,
    ) -> Self {
        let tenant = if capabilities.multi_tenant && !tenant.ignore_tenancy {
            TenantScope::Only(tenant.tenant_id)
        } else {
            TenantScope::Any
        };

        Self {
            active_only: capabilities.active_status && !options.include_inactive,
            exclude_deleted: capabilities.soft_delete && !options.include_deleted,
            tenant,
        }
    }

    /// Returns true if `entity` passes every capability filter.
    pub fn admits<E: Entity>(&self, entity: &E) -> bool {
        if self.active_only && entity.active_status().is_some_and(|a| !a.is_active()) {
            return false;
        }
        if self.exclude_deleted && entity.soft_delete().is_some_and(|d| d.is_deleted()) {
            return false;
        }
        self.admits_tenant(entity)
    }

    /// Returns true if `entity` belongs to the scoped tenant.
    pub fn admits_tenant<E: Entity>(&self, entity: &E) -> bool {
        match self.tenant {
            TenantScope::Any => true,
            TenantScope::Only(tenant_id) => entity
                .tenant()
                .is_none_or(|t| t.tenant_id() == tenant_id),
        }
    }
}

/// Closure filter evaluated against materialized entities.
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Caller-supplied filtering: conditions and a predicate, combined with AND.
pub struct Criteria<E> {
    pub conditions: Vec<Condition>,
    pub predicate: Option<Predicate<E>>,
}

impl<E> Criteria<E> {
    /// Matches everything.
    pub fn all() -> Self {
        Self {
            conditions: Vec::new(),
            predicate: None,
        }
    }

    pub fn conditions(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            predicate: None,
        }
    }

    pub fn predicate(predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            conditions: Vec::new(),
            predicate: Some(Arc::new(predicate)),
        }
    }

    pub fn and_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn and_predicate(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self
    where
        E: 'static,
    {
        self.predicate = Some(match self.predicate.take() {
            None => Arc::new(predicate),
            Some(existing) => Arc::new(move |entity: &E| existing(entity) && predicate(entity)),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.predicate.is_none()
    }
}

impl<E> Default for Criteria<E> {
    fn default() -> Self {
        Self::all()
    }
}

impl<E> Clone for Criteria<E> {
    fn clone(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<E> From<Vec<Condition>> for Criteria<E> {
    fn from(conditions: Vec<Condition>) -> Self {
        Self::conditions(conditions)
    }
}

impl<E> fmt::Debug for Criteria<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("conditions", &self.conditions)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// A filtered, sorted and windowed view over the rows of one entity type.
pub struct Query<E> {
    pub scope: Scope,
    pub criteria: Criteria<E>,
    pub sorts: Vec<Sort>,
    /// Id order applied when `sorts` is empty. `None` leaves order to the source.
    pub id_order: Option<SortDirection>,
    pub window: Window,
    pub includes: Includes,
}

impl<E: Entity> Query<E> {
    /// Builds the capability filters for a read; everything else starts empty.
    pub fn compose(
        capabilities: &Capabilities,
        options: &ReadOptions,
        tenant: &TenantContext,
    ) -> Self {
        Self {
            scope: Scope::compose(capabilities, options, tenant),
            criteria: Criteria::all(),
            sorts: Vec::new(),
            id_order: None,
            window: Window::unbounded(),
            includes: if options.include_children {
                Includes::All
            } else {
                Includes::None
            },
        }
    }

    pub fn matching(mut self, criteria: Criteria<E>) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn sorted_by(mut self, sorts: Vec<Sort>) -> Self {
        self.sorts = sorts;
        self
    }

    pub fn with_id_order(mut self, direction: SortDirection) -> Self {
        self.id_order = Some(direction);
        self
    }

    pub fn windowed(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Applies `pagination`, or limits to `max_count` rows when there is none.
    pub fn paginated(
        self,
        pagination: Option<Pagination>,
        max_count: usize,
    ) -> Result<Self, QueryError> {
        let window = match pagination {
            Some(pagination) => pagination.window(max_count)?,
            None => Window::first(max_count),
        };
        Ok(self.windowed(window))
    }

    /// Reverses the effective order, falling back to descending ids.
    ///
    /// Used to take the last row as the first row of the reversed query.
    pub fn reversed(mut self) -> Self {
        if self.sorts.is_empty() {
            self.id_order = Some(
                self.id_order
                    .map_or(SortDirection::Descending, SortDirection::reversed),
            );
        } else {
            self.sorts = self.sorts.iter().map(Sort::reversed).collect();
        }
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        self.criteria.conditions.iter().try_for_each(Condition::validate)
    }

    /// Returns true if `entity` passes the scope, predicate and conditions.
    pub fn matches(&self, entity: &E) -> Result<bool, QueryError> {
        Ok(self.admits(entity) && self.conditions_match(&self.inspect(entity)?))
    }

    /// Applies the whole query to rows already in memory.
    pub fn evaluate(&self, rows: Vec<E>) -> Result<Rows<E>, QueryError> {
        self.validate()?;

        let needs_json = !self.criteria.conditions.is_empty() || !self.sorts.is_empty();
        let mut matched = Vec::new();
        for mut row in rows {
            if !self.admits(&row) {
                continue;
            }
            let json = if needs_json {
                let json = self.inspect(&row)?;
                if !self.conditions_match(&json) {
                    continue;
                }
                json
            } else {
                Value::Null
            };
            row.retain_relations(&self.includes);
            matched.push((row, json));
        }

        if !self.sorts.is_empty() {
            matched.sort_by(|(_, a), (_, b)| self.compare_rows(a, b));
        } else if let Some(direction) = self.id_order {
            matched.sort_by(|(a, _), (b, _)| directed(a.id().cmp(b.id()), direction));
        }

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(self.window.offset)
            .take(self.window.limit.unwrap_or(usize::MAX))
            .map(|(row, _)| row)
            .collect();

        Ok(Rows { items, total })
    }

    fn admits(&self, entity: &E) -> bool {
        self.scope.admits(entity)
            && self
                .criteria
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate(entity))
    }

    fn inspect(&self, entity: &E) -> Result<Value, QueryError> {
        serde_json::to_value(entity).map_err(|e| QueryError::Serialization(e.to_string()))
    }

    fn conditions_match(&self, json: &Value) -> bool {
        self.criteria
            .conditions
            .iter()
            .all(|condition| condition_matches(json, condition))
    }

    fn compare_rows(&self, a: &Value, b: &Value) -> Ordering {
        self.sorts
            .iter()
            .map(|sort| {
                let ordering = compare_fields(
                    lookup_property(a, &sort.property_name),
                    lookup_property(b, &sort.property_name),
                );
                directed(ordering, sort.direction)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope,
            criteria: self.criteria.clone(),
            sorts: self.sorts.clone(),
            id_order: self.id_order,
            window: self.window,
            includes: self.includes.clone(),
        }
    }
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("scope", &self.scope)
            .field("criteria", &self.criteria)
            .field("sorts", &self.sorts)
            .field("id_order", &self.id_order)
            .field("window", &self.window)
            .field("includes", &self.includes)
            .finish()
    }
}
