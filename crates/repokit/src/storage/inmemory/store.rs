use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use repokit_core::entity::Entity;
use repokit_core::storage::{Result, Store, StoreError};

use super::session::InMemorySession;

/// Rows of one entity type keyed by the display form of their id.
pub(super) type Table = BTreeMap<String, Value>;

/// Tables keyed by `Entity::NAME`.
pub(super) type Tables = HashMap<&'static str, Table>;

#[derive(Debug, Default)]
pub(super) struct Counters {
    pub sessions_opened: AtomicUsize,
    pub sessions_active: AtomicUsize,
    pub full_loads: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

/// Point-in-time usage counters of an [`InMemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub sessions_opened: usize,
    /// Sessions opened and not yet closed.
    pub sessions_active: usize,
    /// Calls to `Session::load_all`, i.e. whole-table reads.
    pub full_loads: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

/// In-memory store for tests, demos and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    counters: Arc<Counters>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes rows straight into the committed tables, replacing rows with the same id.
    pub async fn seed<E: Entity>(&self, rows: &[E]) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(E::NAME).or_default();
        for row in rows {
            table.insert(row_key::<E>(row.id()), encode(row)?);
        }
        Ok(())
    }

    /// Committed rows of `E` with their relations, ignoring every capability filter.
    pub async fn committed_rows<E: Entity>(&self) -> Result<Vec<E>> {
        let tables = self.tables.read().await;
        tables
            .get(E::NAME)
            .map(|table| table.values().map(decode::<E>).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    pub fn stats(&self) -> StoreStats {
        let read = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        StoreStats {
            sessions_opened: read(&self.counters.sessions_opened),
            sessions_active: read(&self.counters.sessions_active),
            full_loads: read(&self.counters.full_loads),
            commits: read(&self.counters.commits),
            rollbacks: read(&self.counters.rollbacks),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession> {
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.counters.sessions_active.fetch_add(1, Ordering::SeqCst);
        Ok(InMemorySession::new(
            Arc::clone(&self.tables),
            Arc::clone(&self.counters),
        ))
    }
}

pub(super) fn row_key<E: Entity>(id: &E::Id) -> String {
    id.to_string()
}

pub(super) fn encode<E: Entity>(row: &E) -> Result<Value> {
    serde_json::to_value(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(super) fn decode<E: Entity>(value: &Value) -> Result<E> {
    E::deserialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}
