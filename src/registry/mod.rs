//! Store of record interfaces.
//!
//! Ownership model:
//! - `NameRegistry` is the durable source of truth for index names. The index
//!   writes every new name through it and bootstraps from it.
//! - Streaming is visitor based so a bulk load never holds the whole dataset.
//! - Ids are assigned before `insert`; the registry never invents them.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::RwLock;

use crate::data::IndexName;
use crate::errors::NameIndexError;
use crate::types::{DatasetKey, IndexId};

/// SQLite-backed store of record.
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteNameRegistry;

/// Callback receiving each streamed name. Returning an error stops the stream.
pub type NameVisitor<'a> = dyn FnMut(IndexName) -> Result<(), NameIndexError> + 'a;

/// Durable store of record for index names.
pub trait NameRegistry: Send + Sync {
    /// Authoritative number of names owned by `dataset_key`.
    fn count_by_dataset(&self, dataset_key: DatasetKey) -> Result<usize, NameIndexError>;

    /// Visits every name of `dataset_key` in insertion order.
    fn stream_by_dataset(
        &self,
        dataset_key: DatasetKey,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError>;

    /// Visits names of `dataset_key` created strictly after `since`.
    fn stream_since(
        &self,
        dataset_key: DatasetKey,
        since: DateTime<Utc>,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError>;

    /// Persists a name that already carries its id.
    fn insert(&self, name: &IndexName) -> Result<(), NameIndexError>;

    /// Deletes every name of `dataset_key`, returning how many were removed.
    fn delete_by_dataset(&self, dataset_key: DatasetKey) -> Result<usize, NameIndexError>;
}

/// Insertion-ordered in-memory store of record.
#[derive(Debug, Default)]
pub struct InMemoryNameRegistry {
    names: RwLock<IndexMap<IndexId, IndexName>>,
}

impl InMemoryNameRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `names`; later duplicates of an id win.
    pub fn with_names<I: IntoIterator<Item = IndexName>>(names: I) -> Self {
        let map = names
            .into_iter()
            .map(|name| (name.id.clone(), name))
            .collect();
        Self {
            names: RwLock::new(map),
        }
    }

    /// Total rows across all datasets.
    pub fn len(&self) -> usize {
        self.names.read().map(|names| names.len()).unwrap_or(0)
    }

    /// `true` when no dataset has rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row stored under `id`.
    pub fn get(&self, id: &str) -> Result<Option<IndexName>, NameIndexError> {
        let names = self
            .names
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("name registry"))?;
        Ok(names.get(id).cloned())
    }

    fn snapshot(
        &self,
        filter: impl Fn(&IndexName) -> bool,
    ) -> Result<Vec<IndexName>, NameIndexError> {
        let names = self
            .names
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("name registry"))?;
        Ok(names.values().filter(|name| filter(name)).cloned().collect())
    }
}

impl NameRegistry for InMemoryNameRegistry {
    fn count_by_dataset(&self, dataset_key: DatasetKey) -> Result<usize, NameIndexError> {
        let names = self
            .names
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("name registry"))?;
        Ok(names
            .values()
            .filter(|name| name.dataset_key == dataset_key)
            .count())
    }

    fn stream_by_dataset(
        &self,
        dataset_key: DatasetKey,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        // Visit a snapshot so the visitor may call back into the registry.
        for name in self.snapshot(|name| name.dataset_key == dataset_key)? {
            visitor(name)?;
        }
        Ok(())
    }

    fn stream_since(
        &self,
        dataset_key: DatasetKey,
        since: DateTime<Utc>,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        for name in self.snapshot(|name| name.dataset_key == dataset_key && name.created > since)? {
            visitor(name)?;
        }
        Ok(())
    }

    fn insert(&self, name: &IndexName) -> Result<(), NameIndexError> {
        let mut names = self
            .names
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("name registry"))?;
        if names.contains_key(&name.id) {
            return Err(NameIndexError::registry(format!(
                "duplicate index id {}",
                name.id
            )));
        }
        names.insert(name.id.clone(), name.clone());
        Ok(())
    }

    fn delete_by_dataset(&self, dataset_key: DatasetKey) -> Result<usize, NameIndexError> {
        let mut names = self
            .names
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("name registry"))?;
        let before = names.len();
        names.retain(|_, name| name.dataset_key != dataset_key);
        Ok(before - names.len())
    }
}
