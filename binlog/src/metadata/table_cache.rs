use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use lru::LruCache;
use tracing::debug;

use common::config::TableCacheConfig;
use common::config::config::DEFAULT_TABLE_CACHE_CAPACITY;
use common::schema::Table;

/// Thread-safe table schema cache with LRU eviction, filled from table map events.
///
/// MySQL may assign a new table id to the same table (after DDL or a restart), the
/// canonical name index always points at the latest id.
#[derive(Debug, Clone)]
pub struct TableCache {
    /// table_id -> Table
    tables: Arc<RwLock<LruCache<i64, Arc<Table>>>>,

    /// `database.table` -> table_id
    names: Arc<RwLock<LruCache<String, i64>>>,
}

impl TableCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_TABLE_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        TableCache {
            tables: Arc::new(RwLock::new(LruCache::new(cap))),
            names: Arc::new(RwLock::new(LruCache::new(cap))),
        }
    }

    pub fn from_config(config: &TableCacheConfig) -> Self {
        TableCache::new(config.capacity)
    }

    fn tables(&self) -> RwLockWriteGuard<'_, LruCache<i64, Arc<Table>>> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn names(&self) -> RwLockWriteGuard<'_, LruCache<String, i64>> {
        self.names.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a table, replacing any schema cached under the same id.
    pub fn register(&self, table: Arc<Table>) {
        let name = table.canonical_name();
        let id = table.id();

        if let Some(previous) = self.names().put(name.clone(), id) {
            if previous != id {
                debug!("table {} remapped, table id {} -> {}", name, previous, id);
                self.tables().pop(&previous);
            }
        }
        self.tables().put(id, table);
    }

    pub fn get(&self, table_id: i64) -> Option<Arc<Table>> {
        self.tables().get(&table_id).cloned()
    }

    pub fn get_by_name(&self, database: &str, table: &str) -> Option<Arc<Table>> {
        let id = self.names().get(&Table::canonical_name_of(database, table)).copied()?;
        self.get(id)
    }

    pub fn contains(&self, table_id: i64) -> bool {
        self.tables().contains(&table_id)
    }

    pub fn remove(&self, table_id: i64) -> Option<Arc<Table>> {
        let table = self.tables().pop(&table_id)?;
        let mut names = self.names();
        if names.peek(&table.canonical_name()) == Some(&table_id) {
            names.pop(&table.canonical_name());
        }
        Some(table)
    }

    pub fn len(&self) -> usize {
        self.tables().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.tables().clear();
        self.names().clear();
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_CACHE_CAPACITY)
    }
}
