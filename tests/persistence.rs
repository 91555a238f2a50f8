#![cfg(feature = "sqlite")]

use std::sync::Arc;

use chrono::Utc;
use tempfile::tempdir;

use names_index::{
    AuthorComparator, Authorship, MatchType, Name, NameIndex, NameIndexConfig, NameRegistry,
    NomCode, NomStatus, Origin, Rank, SqliteNameRegistry,
};

fn comparator() -> Arc<AuthorComparator> {
    Arc::new(AuthorComparator::default())
}

#[test]
fn inserted_names_survive_a_restart() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("registry").join("names.sqlite");
    let config = NameIndexConfig::with_file_store(dir.path());

    let registry = Arc::new(SqliteNameRegistry::open(&db).unwrap());
    let index = NameIndex::open(config.clone(), registry.clone(), comparator()).unwrap();

    let query = Name::new("Abies alba", Rank::Species)
        .with_combination_authorship(Authorship::new(["Mill."]).with_year("1768"))
        .with_code(NomCode::Botanical);
    let inserted = index.match_name(&query, true, false).unwrap();
    assert_eq!(inserted.match_type, MatchType::Inserted);
    let id = inserted.id().unwrap().to_string();
    assert_eq!(registry.count_by_dataset(1).unwrap(), 1);
    index.close().unwrap();

    let registry = Arc::new(SqliteNameRegistry::open(&db).unwrap());
    let reopened = NameIndex::open(config, registry, comparator()).unwrap();
    assert_eq!(reopened.size(), 1);
    assert!(!reopened.load_report().reloaded);

    let found = reopened.match_name(&query, false, false).unwrap();
    assert_eq!(found.match_type, MatchType::Exact);
    let record = found.name.expect("stored record");
    assert_eq!(record.id, id);
    assert_eq!(record.name.code, Some(NomCode::Botanical));
    assert_eq!(record.name.origin, Some(Origin::NameMatching));
    assert_eq!(record.name.nom_status, Some(NomStatus::Doubtful));
    assert_eq!(record.name.combination_authorship.authors, vec!["Mill.".to_string()]);
    assert_eq!(record.name.combination_authorship.year.as_deref(), Some("1768"));
    reopened.close().unwrap();
}

#[test]
fn memory_store_rebuilds_from_sqlite() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("names.sqlite");
    let registry = Arc::new(SqliteNameRegistry::open(&db).unwrap());

    let seeding = NameIndex::open(NameIndexConfig::default(), registry.clone(), comparator())
        .unwrap();
    for name in ["Abies alba", "Picea abies", "Pinus nigra"] {
        seeding
            .add(Name::new(name, Rank::Species).with_authorship("L."))
            .unwrap();
    }
    seeding.close().unwrap();

    let index = NameIndex::open(NameIndexConfig::default(), registry, comparator()).unwrap();
    assert_eq!(index.load_report().loaded, 3);
    assert_eq!(index.size(), 3);
    let next = index
        .match_name(&Name::new("Larix decidua", Rank::Species), true, false)
        .unwrap();
    assert_eq!(next.id(), Some("NI4"));
}

#[test]
fn load_since_catches_up_with_another_writer() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("names.sqlite");
    let registry = Arc::new(SqliteNameRegistry::open(&db).unwrap());

    let reader = NameIndex::open(NameIndexConfig::default(), registry.clone(), comparator())
        .unwrap();
    let checkpoint = Utc::now() - chrono::Duration::seconds(1);

    let writer = NameIndex::open(NameIndexConfig::default(), registry, comparator()).unwrap();
    let query = Name::new("Abies alba", Rank::Species).with_authorship("Mill.");
    let inserted = writer.match_name(&query, true, false).unwrap();
    assert_eq!(inserted.match_type, MatchType::Inserted);

    assert_eq!(reader.size(), 0);
    assert_eq!(reader.load_since(checkpoint).unwrap(), 1);
    assert_eq!(reader.size(), 1);
    let found = reader.match_name(&query, false, false).unwrap();
    assert_eq!(found.match_type, MatchType::Exact);
    assert_eq!(found.id(), inserted.id());
}
