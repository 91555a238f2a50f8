use std::path::PathBuf;

use crate::constants::index::{DEFAULT_ID_PREFIX, DEFAULT_LOCK_STRIPES, NAMES_INDEX_DATASET_KEY};
use crate::errors::NameIndexError;
use crate::store::{FileCandidateStore, InMemoryCandidateStore, IndexStore};
use crate::types::DatasetKey;

/// Backing engine for the candidate store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// Plain map, rebuilt from the store of record on every start.
    #[default]
    Memory,
    /// `simd-r-drive` data file. A directory resolves to `names_index.bin` inside it.
    File(PathBuf),
}

/// Top-level names index configuration.
#[derive(Clone, Debug)]
pub struct NameIndexConfig {
    /// Dataset in the store of record owning all index names.
    pub dataset_key: DatasetKey,
    /// Prefix of generated ids.
    pub id_prefix: String,
    /// Candidate store engine.
    pub store: StoreBackend,
    /// Number of striped per-key locks serializing group mutation.
    pub lock_stripes: usize,
}

impl Default for NameIndexConfig {
    fn default() -> Self {
        Self {
            dataset_key: NAMES_INDEX_DATASET_KEY,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            store: StoreBackend::Memory,
            lock_stripes: DEFAULT_LOCK_STRIPES,
        }
    }
}

impl NameIndexConfig {
    /// Config persisting candidate groups under `path`.
    pub fn with_file_store(path: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreBackend::File(path.into()),
            ..Self::default()
        }
    }

    /// Returns the config unchanged when every field is usable.
    pub fn validated(self) -> Result<Self, NameIndexError> {
        if self.lock_stripes == 0 {
            return Err(NameIndexError::Configuration(
                "lock_stripes must be greater than zero".into(),
            ));
        }
        if self.id_prefix.trim().is_empty() {
            return Err(NameIndexError::Configuration(
                "id_prefix must not be empty".into(),
            ));
        }
        if self.id_prefix.chars().any(|c| c.is_ascii_digit()) {
            return Err(NameIndexError::Configuration(format!(
                "id_prefix '{}' must not contain digits",
                self.id_prefix
            )));
        }
        Ok(self)
    }

    /// Opens the configured candidate store.
    pub fn open_store(&self) -> Result<Box<dyn IndexStore>, NameIndexError> {
        match &self.store {
            StoreBackend::Memory => Ok(Box::new(InMemoryCandidateStore::new())),
            StoreBackend::File(path) => Ok(Box::new(FileCandidateStore::open(path.clone())?)),
        }
    }
}
