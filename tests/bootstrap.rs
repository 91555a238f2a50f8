use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tempfile::tempdir;

use names_index::registry::NameVisitor;
use names_index::{
    AuthorComparator, CandidateGroup, CandidateStore, FileCandidateStore, InMemoryCandidateStore,
    InMemoryNameRegistry, IndexName, MatchType, Name, NameIndex, NameIndexConfig, NameIndexError,
    NameRegistry, Rank, SequentialIdGenerator,
};

fn stored(id: &str, name: &str) -> IndexName {
    IndexName::new(id, 1, Name::new(name, Rank::Species).with_authorship("L."))
}

/// Registry wrapper counting full streams.
struct CountingRegistry {
    inner: InMemoryNameRegistry,
    full_streams: AtomicUsize,
}

impl NameRegistry for CountingRegistry {
    fn count_by_dataset(&self, dataset_key: i64) -> Result<usize, NameIndexError> {
        self.inner.count_by_dataset(dataset_key)
    }

    fn stream_by_dataset(
        &self,
        dataset_key: i64,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        self.full_streams.fetch_add(1, Ordering::SeqCst);
        self.inner.stream_by_dataset(dataset_key, visitor)
    }

    fn stream_since(
        &self,
        dataset_key: i64,
        since: DateTime<Utc>,
        visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        self.inner.stream_since(dataset_key, since, visitor)
    }

    fn insert(&self, name: &IndexName) -> Result<(), NameIndexError> {
        self.inner.insert(name)
    }

    fn delete_by_dataset(&self, dataset_key: i64) -> Result<usize, NameIndexError> {
        self.inner.delete_by_dataset(dataset_key)
    }
}

/// Registry whose database is unreachable.
struct DownRegistry;

impl NameRegistry for DownRegistry {
    fn count_by_dataset(&self, _dataset_key: i64) -> Result<usize, NameIndexError> {
        Err(NameIndexError::Registry {
            reason: "connection refused".into(),
        })
    }

    fn stream_by_dataset(
        &self,
        _dataset_key: i64,
        _visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        unreachable!("count fails first")
    }

    fn stream_since(
        &self,
        _dataset_key: i64,
        _since: DateTime<Utc>,
        _visitor: &mut NameVisitor<'_>,
    ) -> Result<(), NameIndexError> {
        unreachable!("count fails first")
    }

    fn insert(&self, _name: &IndexName) -> Result<(), NameIndexError> {
        unreachable!("count fails first")
    }

    fn delete_by_dataset(&self, _dataset_key: i64) -> Result<usize, NameIndexError> {
        unreachable!("count fails first")
    }
}

#[test]
fn count_mismatch_reloads_to_registry_count() {
    let registry = Arc::new(InMemoryNameRegistry::with_names([
        stored("NI1", "Abies alba"),
        stored("NI2", "Picea abies"),
    ]));
    let store = InMemoryCandidateStore::new();
    store
        .put(CandidateGroup::new("stale nama").upserted(stored("NI77", "Stale name")).0)
        .unwrap();

    let index = NameIndex::with_parts(
        NameIndexConfig::default(),
        Box::new(store),
        registry.clone(),
        Arc::new(AuthorComparator::default()),
        Arc::new(SequentialIdGenerator::default()),
    )
    .unwrap();

    assert!(index.load_report().reloaded);
    assert_eq!(index.size(), registry.count_by_dataset(1).unwrap());
    let stale = Name::new("Stale name", Rank::Species);
    assert!(index.get_group(&stale).unwrap().is_none());
}

#[test]
fn file_store_is_trusted_when_counts_agree() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(CountingRegistry {
        inner: InMemoryNameRegistry::with_names([
            stored("NI1", "Abies alba"),
            stored("NI2", "Picea abies"),
        ]),
        full_streams: AtomicUsize::new(0),
    });
    let config = NameIndexConfig::with_file_store(dir.path());

    let first = NameIndex::open(
        config.clone(),
        registry.clone(),
        Arc::new(AuthorComparator::default()),
    )
    .unwrap();
    assert_eq!(first.load_report().loaded, 2);
    let query = Name::new("Larix decidua", Rank::Species).with_authorship("Mill.");
    assert_eq!(
        first.match_name(&query, true, false).unwrap().match_type,
        MatchType::Inserted
    );
    first.close().unwrap();
    assert_eq!(registry.full_streams.load(Ordering::SeqCst), 1);

    let second = NameIndex::open(config, registry.clone(), Arc::new(AuthorComparator::default()))
        .unwrap();
    let report = second.load_report();
    assert_eq!(report.loaded, 0);
    assert!(!report.reloaded);
    assert_eq!(report.seeded_sequence, 3);
    assert_eq!(second.size(), 3);
    // Sequence came from the store, so no scan of the registry.
    assert_eq!(registry.full_streams.load(Ordering::SeqCst), 1);

    let found = second.match_name(&query, false, false).unwrap();
    assert_eq!(found.match_type, MatchType::Exact);
    assert_eq!(found.id(), Some("NI3"));
    let next = second.add(Name::new("Pinus nigra", Rank::Species)).unwrap();
    assert_eq!(next.id, "NI4");
    second.close().unwrap();
}

#[test]
fn rows_added_behind_the_store_force_reload_on_restart() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(InMemoryNameRegistry::with_names([stored("NI1", "Abies alba")]));
    let config = NameIndexConfig::with_file_store(dir.path());

    let index = NameIndex::open(
        config.clone(),
        registry.clone(),
        Arc::new(AuthorComparator::default()),
    )
    .unwrap();
    index.close().unwrap();

    registry.insert(&stored("NI5", "Picea abies")).unwrap();

    let reopened =
        NameIndex::open(config, registry, Arc::new(AuthorComparator::default())).unwrap();
    assert!(reopened.load_report().reloaded);
    assert_eq!(reopened.size(), 2);
    let next = reopened.add(Name::new("Pinus nigra", Rank::Species)).unwrap();
    assert_eq!(next.id, "NI6");
    reopened.close().unwrap();

    let raw = FileCandidateStore::open(dir.path()).unwrap();
    assert_eq!(raw.count().unwrap(), 3);
}

#[test]
fn reset_clears_the_file_store_for_the_next_open() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(InMemoryNameRegistry::with_names([
        stored("NI1", "Abies alba"),
        stored("NI2", "Picea abies"),
    ]));
    let config = NameIndexConfig::with_file_store(dir.path());

    let index = NameIndex::open(
        config.clone(),
        registry.clone(),
        Arc::new(AuthorComparator::default()),
    )
    .unwrap();
    index.reset().unwrap();
    assert!(index.all().unwrap().is_empty());
    index.close().unwrap();
    assert!(registry.is_empty());

    let reopened =
        NameIndex::open(config, registry, Arc::new(AuthorComparator::default())).unwrap();
    assert_eq!(reopened.size(), 0);
    assert!(!reopened.load_report().reloaded);
    let next = reopened.add(Name::new("Larix decidua", Rank::Species)).unwrap();
    assert_eq!(next.id, "NI1");
    reopened.close().unwrap();
}

#[test]
fn unreachable_registry_fails_open_as_unavailable() {
    let err = NameIndex::open(
        NameIndexConfig::default(),
        Arc::new(DownRegistry),
        Arc::new(AuthorComparator::default()),
    )
    .unwrap_err();
    assert!(err.is_unavailable());
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn invalid_config_is_rejected_before_touching_storage() {
    let config = NameIndexConfig {
        lock_stripes: 0,
        ..NameIndexConfig::default()
    };
    let err = NameIndex::open(
        config,
        Arc::new(DownRegistry),
        Arc::new(AuthorComparator::default()),
    )
    .unwrap_err();
    assert!(matches!(err, NameIndexError::Configuration(_)));
}
