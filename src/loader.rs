//! Startup population of the candidate store from the store of record.
//!
//! The store of record always wins: an empty candidate store is filled, and
//! a non-empty one whose count disagrees with the authoritative count is
//! cleared and filled again. Afterwards the id generator is seeded past every
//! loaded id.

use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::index::LOAD_BATCH_SIZE;
use crate::data::IndexName;
use crate::errors::NameIndexError;
use crate::idgen::IdGenerator;
use crate::registry::NameRegistry;
use crate::store::{CandidateGroup, IndexStore};
use crate::types::{DatasetKey, NormalizedKey};

/// Outcome of a bootstrap run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Names read from the store of record and written to the candidate store.
    pub loaded: usize,
    /// `true` when a populated candidate store was distrusted and rebuilt.
    pub reloaded: bool,
    /// Candidate store count before loading.
    pub store_count: usize,
    /// Authoritative count reported by the store of record.
    pub registry_count: usize,
    /// Candidate store count after loading.
    pub final_count: usize,
    /// Sequence the id generator was seeded with.
    pub seeded_sequence: u64,
}

/// Populates `store` from `registry` and seeds `ids`.
pub fn bootstrap(
    store: &dyn IndexStore,
    registry: &dyn NameRegistry,
    ids: &dyn IdGenerator,
    dataset_key: DatasetKey,
) -> Result<LoadReport, NameIndexError> {
    let started = Instant::now();
    let registry_count = registry.count_by_dataset(dataset_key)?;
    let store_count = store.count()?;
    info!(
        dataset_key,
        store_count, registry_count, "bootstrapping names index"
    );

    let mut report = LoadReport {
        store_count,
        registry_count,
        ..LoadReport::default()
    };

    let max_sequence = if store_count == 0 {
        let (loaded, max_sequence) = load_all(store, registry, ids, dataset_key)?;
        report.loaded = loaded;
        max_sequence
    } else if store_count != registry_count {
        warn!(
            dataset_key,
            store_count, registry_count, "candidate store count differs from store of record, reloading"
        );
        store.clear()?;
        let (loaded, max_sequence) = load_all(store, registry, ids, dataset_key)?;
        report.loaded = loaded;
        report.reloaded = true;
        max_sequence
    } else {
        match store.load_sequence()? {
            Some(sequence) => sequence,
            None => scan_max_sequence(registry, ids, dataset_key)?,
        }
    };

    let seeded = max_sequence.max(store.load_sequence()?.unwrap_or(0));
    ids.seed(seeded);
    if seeded > 0 {
        store.store_sequence(seeded)?;
    }
    report.seeded_sequence = seeded;
    report.final_count = store.count()?;
    if report.final_count != registry_count {
        warn!(
            dataset_key,
            final_count = report.final_count,
            registry_count,
            "candidate store count still differs after bootstrap"
        );
    }
    info!(
        dataset_key,
        loaded = report.loaded,
        reloaded = report.reloaded,
        count = report.final_count,
        seeded_sequence = seeded,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "names index ready"
    );
    Ok(report)
}

/// Streams every name of `dataset_key` into `store` in batches.
fn load_all(
    store: &dyn IndexStore,
    registry: &dyn NameRegistry,
    ids: &dyn IdGenerator,
    dataset_key: DatasetKey,
) -> Result<(usize, u64), NameIndexError> {
    let mut batch: Vec<IndexName> = Vec::with_capacity(LOAD_BATCH_SIZE);
    let mut loaded = 0usize;
    let mut max_sequence = 0u64;
    registry.stream_by_dataset(dataset_key, &mut |name: IndexName| -> Result<(), NameIndexError> {
        if let Some(sequence) = ids.sequence_of(&name.id) {
            max_sequence = max_sequence.max(sequence);
        }
        batch.push(name);
        if batch.len() >= LOAD_BATCH_SIZE {
            loaded += write_batch(store, std::mem::take(&mut batch))?;
            debug!(loaded, "bulk load progress");
        }
        Ok(())
    })?;
    loaded += write_batch(store, batch)?;
    Ok((loaded, max_sequence))
}

/// Merges `names` into their candidate groups, replacing members with the same id.
pub(crate) fn write_batch(
    store: &dyn IndexStore,
    names: Vec<IndexName>,
) -> Result<usize, NameIndexError> {
    if names.is_empty() {
        return Ok(0);
    }
    let written = names.len();
    let mut groups: HashMap<NormalizedKey, CandidateGroup> = HashMap::new();
    for name in names {
        let key = name.key();
        let group = match groups.remove(&key) {
            Some(group) => group,
            None => store
                .get(&key)?
                .unwrap_or_else(|| CandidateGroup::new(key.clone())),
        };
        let (next, _) = group.upserted(name);
        groups.insert(key, next);
    }
    store.put_all(groups.into_values().collect())?;
    Ok(written)
}

fn scan_max_sequence(
    registry: &dyn NameRegistry,
    ids: &dyn IdGenerator,
    dataset_key: DatasetKey,
) -> Result<u64, NameIndexError> {
    let mut max_sequence = 0u64;
    registry.stream_by_dataset(dataset_key, &mut |name: IndexName| -> Result<(), NameIndexError> {
        if let Some(sequence) = ids.sequence_of(&name.id) {
            max_sequence = max_sequence.max(sequence);
        }
        Ok(())
    })?;
    debug!(dataset_key, max_sequence, "scanned store of record for id sequence");
    Ok(max_sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Name;
    use crate::idgen::SequentialIdGenerator;
    use crate::registry::InMemoryNameRegistry;
    use crate::store::{CandidateStore, InMemoryCandidateStore, SequenceStateStore};
    use crate::vocab::Rank;

    fn record(id: &str, name: &str) -> IndexName {
        IndexName::new(id, 1, Name::new(name, Rank::Species))
    }

    fn registry() -> InMemoryNameRegistry {
        InMemoryNameRegistry::with_names([
            record("NI1", "Abies alba"),
            record("NI2", "Abies albus"),
            record("NI7", "Picea abies"),
            IndexName::new("X9", 2, Name::new("Pinus nigra", Rank::Species)),
        ])
    }

    #[test]
    fn empty_store_is_filled_and_generator_seeded() {
        let store = InMemoryCandidateStore::new();
        let ids = SequentialIdGenerator::default();
        let report = bootstrap(&store, &registry(), &ids, 1).unwrap();
        assert_eq!(report.loaded, 3);
        assert!(!report.reloaded);
        assert_eq!(report.final_count, 3);
        assert_eq!(report.seeded_sequence, 7);
        assert_eq!(store.get("abies alba").unwrap().unwrap().len(), 2);
        assert!(!store.contains_key("pinus nigra").unwrap());
        assert_eq!(ids.next_id(), "NI8");
        assert_eq!(store.load_sequence().unwrap(), Some(7));
    }

    #[test]
    fn count_mismatch_triggers_full_reload() {
        let store = InMemoryCandidateStore::new();
        write_batch(&store, vec![record("NI99", "Stale name")]).unwrap();
        let ids = SequentialIdGenerator::default();
        let report = bootstrap(&store, &registry(), &ids, 1).unwrap();
        assert!(report.reloaded);
        assert_eq!(report.store_count, 1);
        assert_eq!(report.final_count, report.registry_count);
        assert!(!store.contains_key("stale nama").unwrap());
        assert_eq!(ids.next_id(), "NI8");
    }

    #[test]
    fn matching_count_trusts_the_store() {
        let store = InMemoryCandidateStore::new();
        let ids = SequentialIdGenerator::default();
        bootstrap(&store, &registry(), &ids, 1).unwrap();
        store.store_sequence(12).unwrap();

        let fresh_ids = SequentialIdGenerator::default();
        let report = bootstrap(&store, &registry(), &fresh_ids, 1).unwrap();
        assert_eq!(report.loaded, 0);
        assert!(!report.reloaded);
        assert_eq!(report.seeded_sequence, 12);
        assert_eq!(fresh_ids.next_id(), "NI13");
    }

    #[test]
    fn trusted_store_without_sequence_scans_registry() {
        let store = InMemoryCandidateStore::new();
        write_batch(
            &store,
            vec![
                record("NI1", "Abies alba"),
                record("NI2", "Abies albus"),
                record("NI7", "Picea abies"),
            ],
        )
        .unwrap();
        let ids = SequentialIdGenerator::default();
        let report = bootstrap(&store, &registry(), &ids, 1).unwrap();
        assert_eq!(report.loaded, 0);
        assert_eq!(report.seeded_sequence, 7);
    }

    #[test]
    fn write_batch_replaces_same_id() {
        let store = InMemoryCandidateStore::new();
        write_batch(&store, vec![record("NI1", "Abies alba")]).unwrap();
        let mut edited = record("NI1", "Abies alba");
        edited.name.authorship = Some("Mill.".into());
        write_batch(&store, vec![edited, record("NI2", "Abies alba")]).unwrap();
        let group = store.get("abies alba").unwrap().unwrap();
        assert_eq!(group.len(), 2);
        let first = group.iter().find(|m| m.id == "NI1").unwrap();
        assert_eq!(first.name.authorship.as_deref(), Some("Mill."));
        assert_eq!(store.count().unwrap(), 2);
    }
}
