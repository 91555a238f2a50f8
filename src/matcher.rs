//! The names index: match, insert-on-miss, and maintenance entry points.
//!
//! Reads go straight to the candidate store. Every group mutation (insert,
//! add, upsert) runs as read-group, build-next-group, put-group while holding
//! the striped lock for the group's key, so concurrent writers of one key
//! never lose each other's members.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace};

use crate::authorship::{AuthorshipComparator, Equality};
use crate::config::NameIndexConfig;
use crate::constants::scoring::{
    AUTHORSHIP_EQUAL, AUTHORSHIP_STRING_EQUAL, CANONICAL_EQUAL, EXACT_FULL_NAME,
};
use crate::data::{IndexName, Name, NameMatch};
use crate::errors::NameIndexError;
use crate::hash::stripe_for;
use crate::idgen::{IdGenerator, SequentialIdGenerator};
use crate::loader::{LoadReport, bootstrap};
use crate::normalizer::{normalize_compare, normalize_key};
use crate::registry::{NameRegistry, NameVisitor};
use crate::store::{CandidateGroup, IndexStore};
use crate::vocab::{MatchType, NomStatus, Origin, Rank};

/// Scientific name matching index shared by all import workers.
pub struct NameIndex {
    config: NameIndexConfig,
    store: Box<dyn IndexStore>,
    registry: Arc<dyn NameRegistry>,
    comparator: Arc<dyn AuthorshipComparator>,
    ids: Arc<dyn IdGenerator>,
    locks: Vec<Mutex<()>>,
    size: AtomicUsize,
    closed: AtomicBool,
    report: LoadReport,
}

impl fmt::Debug for NameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameIndex")
            .field("config", &self.config)
            .field("size", &self.size())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

/// Query forms computed once per match call.
struct QueryForms {
    label: String,
    authorship: String,
    canonical: String,
}

impl QueryForms {
    fn of(query: &Name) -> Self {
        Self {
            label: normalize_compare(&query.label()),
            authorship: normalize_compare(&query.authorship_complete()),
            canonical: normalize_compare(&query.scientific_name),
        }
    }
}

impl NameIndex {
    /// Opens the configured candidate store, bootstraps it from `registry`
    /// and returns a ready index.
    pub fn open(
        config: NameIndexConfig,
        registry: Arc<dyn NameRegistry>,
        comparator: Arc<dyn AuthorshipComparator>,
    ) -> Result<Self, NameIndexError> {
        let config = config.validated()?;
        let store = config.open_store()?;
        let ids: Arc<dyn IdGenerator> =
            Arc::new(SequentialIdGenerator::new(config.id_prefix.clone()));
        Self::with_parts(config, store, registry, comparator, ids)
    }

    /// Builds an index from explicit parts; used to inject stores or id generators.
    pub fn with_parts(
        config: NameIndexConfig,
        store: Box<dyn IndexStore>,
        registry: Arc<dyn NameRegistry>,
        comparator: Arc<dyn AuthorshipComparator>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, NameIndexError> {
        let config = config.validated()?;
        let report = bootstrap(store.as_ref(), registry.as_ref(), ids.as_ref(), config.dataset_key)?;
        let locks = (0..config.lock_stripes).map(|_| Mutex::new(())).collect();
        Ok(Self {
            size: AtomicUsize::new(report.final_count),
            config,
            store,
            registry,
            comparator,
            ids,
            locks,
            closed: AtomicBool::new(false),
            report,
        })
    }

    /// Validated configuration the index runs with.
    pub fn config(&self) -> &NameIndexConfig {
        &self.config
    }

    /// Bootstrap outcome from construction.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Matches `query` against the index.
    ///
    /// With `allow_insert`, a miss for an indexable name type inserts the
    /// query as a new index name and returns `INSERTED`. Ambiguous results are
    /// never inserted. With `verbose`, the other members of the candidate
    /// group are returned as alternatives.
    pub fn match_name(
        &self,
        query: &Name,
        allow_insert: bool,
        verbose: bool,
    ) -> Result<NameMatch, NameIndexError> {
        self.ensure_open()?;
        let key = normalize_key(&query.scientific_name);
        let forms = QueryForms::of(query);
        let group = self.store.get(&key)?;
        let result = self.resolve(query, &forms, group.as_ref(), verbose);
        debug!(key = %key, match_type = %result.match_type, "matched name");

        match result.match_type {
            MatchType::None if allow_insert => {
                if !query.name_type.is_indexable() {
                    debug!(key = %key, name_type = %query.name_type, "name type not indexable, not inserting");
                    return Ok(result);
                }
                if key.is_empty() {
                    debug!(name = %query.scientific_name, "empty lookup key, not inserting");
                    return Ok(result);
                }
                self.insert_on_miss(query, &key, &forms, verbose)
            }
            MatchType::Ambiguous if allow_insert => {
                debug!(
                    key = %key,
                    candidates = result.alternatives.len(),
                    "ambiguous match, not inserting"
                );
                Ok(result)
            }
            _ => Ok(result),
        }
    }

    /// Inserts `name` as a new index name without matching.
    pub fn add(&self, name: Name) -> Result<IndexName, NameIndexError> {
        self.ensure_open()?;
        let key = normalize_key(&name.scientific_name);
        let _guard = self.lock_key(&key)?;
        let group = self
            .store
            .get(&key)?
            .unwrap_or_else(|| CandidateGroup::new(key.clone()));
        self.insert_into(group, name)
    }

    /// Stores a record that already carries an id, replacing the member with
    /// the same id. Returns `true` when an earlier version was replaced.
    ///
    /// When the edited name normalizes to another key, the earlier version is
    /// removed from its old group. The store of record is not written; the
    /// record is assumed to come from it.
    pub fn upsert(&self, record: IndexName) -> Result<bool, NameIndexError> {
        self.ensure_open()?;
        let key = record.key();
        let (previous_key, _guards) = loop {
            let previous_key = self.store.key_of(&record.id)?;
            let guards = self.lock_keys(&key, previous_key.as_deref())?;
            // A concurrent upsert of the same id may have moved it meanwhile.
            if self.store.key_of(&record.id)? == previous_key {
                break (previous_key, guards);
            }
        };
        if let Some(sequence) = self.ids.sequence_of(&record.id) {
            self.ids.seed(sequence);
        }

        let mut moved = false;
        if let Some(old_key) = previous_key.as_deref().filter(|old| *old != key)
            && let Some(old_group) = self.store.get(old_key)?
        {
            let (next, removed) = old_group.without(&record.id);
            if removed {
                self.store.put(next)?;
                moved = true;
                debug!(id = %record.id, from = %old_key, to = %key, "index name moved to a new key");
            }
        }

        let group = self
            .store
            .get(&key)?
            .unwrap_or_else(|| CandidateGroup::new(key.clone()));
        let (next, replaced) = group.upserted(record);
        self.store.put(next)?;
        let replaced = replaced || moved;
        if !replaced {
            self.size.fetch_add(1, Ordering::AcqRel);
        }
        trace!(key = %key, replaced, "upserted index name");
        Ok(replaced)
    }

    /// Index name carrying `id`.
    pub fn get(&self, id: &str) -> Result<Option<IndexName>, NameIndexError> {
        self.ensure_open()?;
        self.store.get_by_id(id)
    }

    /// Visits every index name, group by group.
    pub fn for_each(&self, visitor: &mut NameVisitor<'_>) -> Result<(), NameIndexError> {
        self.ensure_open()?;
        self.store
            .for_each_group(&mut |group: CandidateGroup| -> Result<(), NameIndexError> {
                for member in group.into_members() {
                    visitor(member)?;
                }
                Ok(())
            })
    }

    /// Every index name, collected.
    pub fn all(&self) -> Result<Vec<IndexName>, NameIndexError> {
        let mut names = Vec::with_capacity(self.size());
        self.for_each(&mut |name: IndexName| -> Result<(), NameIndexError> {
            names.push(name);
            Ok(())
        })?;
        Ok(names)
    }

    /// Deletes every index name from the store of record and the candidate
    /// store and restarts the id sequence.
    ///
    /// Holds every key lock, so no insert interleaves with the reset.
    pub fn reset(&self) -> Result<(), NameIndexError> {
        self.ensure_open()?;
        let _guards = (0..self.locks.len())
            .map(|stripe| self.lock_stripe(stripe))
            .collect::<Result<Vec<_>, _>>()?;
        let deleted = self.registry.delete_by_dataset(self.config.dataset_key)?;
        self.store.clear()?;
        self.ids.reset();
        self.size.store(0, Ordering::Release);
        info!(dataset_key = self.config.dataset_key, deleted, "names index reset");
        Ok(())
    }

    /// Re-streams names created after `since` from the store of record.
    pub fn load_since(&self, since: DateTime<Utc>) -> Result<usize, NameIndexError> {
        self.ensure_open()?;
        let mut loaded = 0usize;
        self.registry.stream_since(
            self.config.dataset_key,
            since,
            &mut |record: IndexName| -> Result<(), NameIndexError> {
                self.upsert(record)?;
                loaded += 1;
                Ok(())
            },
        )?;
        self.store.store_sequence(self.ids.current())?;
        info!(since = %since, loaded, size = self.size(), "incremental load finished");
        Ok(loaded)
    }

    /// Candidate group `name` would be matched against.
    pub fn get_group(&self, name: &Name) -> Result<Option<CandidateGroup>, NameIndexError> {
        self.ensure_open()?;
        self.store.get(&normalize_key(&name.scientific_name))
    }

    /// Number of index names, maintained as a counter.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Liveness check that never mutates state.
    pub fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.store.is_open()
    }

    /// Closes the candidate store. Later calls fail with `StoreClosed`.
    pub fn close(&self) -> Result<(), NameIndexError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("names index already closed");
            return Ok(());
        }
        info!(size = self.size(), "closing names index");
        self.store.close()
    }

    fn ensure_open(&self) -> Result<(), NameIndexError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NameIndexError::StoreClosed);
        }
        Ok(())
    }

    fn lock_key(&self, key: &str) -> Result<MutexGuard<'_, ()>, NameIndexError> {
        self.lock_stripe(stripe_for(key, self.locks.len()))
    }

    fn lock_stripe(&self, stripe: usize) -> Result<MutexGuard<'_, ()>, NameIndexError> {
        self.locks[stripe]
            .lock()
            .map_err(|_| NameIndexError::LockPoisoned("key stripe"))
    }

    /// Locks the stripes of `key` and `other` in ascending stripe order.
    fn lock_keys(
        &self,
        key: &str,
        other: Option<&str>,
    ) -> Result<Vec<MutexGuard<'_, ()>>, NameIndexError> {
        let mut stripes = vec![stripe_for(key, self.locks.len())];
        if let Some(other) = other {
            stripes.push(stripe_for(other, self.locks.len()));
        }
        stripes.sort_unstable();
        stripes.dedup();
        stripes
            .into_iter()
            .map(|stripe| self.lock_stripe(stripe))
            .collect()
    }

    fn insert_on_miss(
        &self,
        query: &Name,
        key: &str,
        forms: &QueryForms,
        verbose: bool,
    ) -> Result<NameMatch, NameIndexError> {
        let _guard = self.lock_key(key)?;
        // Another writer may have inserted this name since the unlocked read.
        let group = self.store.get(key)?;
        let rechecked = self.resolve(query, forms, group.as_ref(), verbose);
        if rechecked.match_type != MatchType::None {
            debug!(key = %key, match_type = %rechecked.match_type, "concurrent insert won");
            return Ok(rechecked);
        }
        let group = group.unwrap_or_else(|| CandidateGroup::new(key.to_string()));
        let alternatives = if verbose {
            group.members().to_vec()
        } else {
            Vec::new()
        };

        let mut name = query.clone();
        name.origin = Some(Origin::NameMatching);
        name.nom_status = Some(NomStatus::Doubtful);
        name.published_in_id = None;
        name.published_in_page = None;
        let record = self.insert_into(group, name)?;
        let mut result = NameMatch::single(MatchType::Inserted, record);
        result.alternatives = alternatives;
        Ok(result)
    }

    /// Assigns an id and writes the record to the store of record, then to
    /// its group. The caller holds the key lock.
    fn insert_into(
        &self,
        group: CandidateGroup,
        name: Name,
    ) -> Result<IndexName, NameIndexError> {
        let record = IndexName::new(self.ids.next_id(), self.config.dataset_key, name);
        self.registry.insert(&record)?;
        let (next, _) = group.upserted(record.clone());
        self.store.put(next)?;
        self.store.store_sequence(self.ids.current())?;
        self.size.fetch_add(1, Ordering::AcqRel);
        debug!(id = %record.id, key = %record.key(), "inserted index name");
        Ok(record)
    }

    fn none_result(&self, group: Option<&CandidateGroup>, verbose: bool) -> NameMatch {
        let mut result = NameMatch::no_match();
        if verbose && let Some(group) = group {
            result.alternatives = group.members().to_vec();
        }
        result
    }

    /// Scores every member of `group` and keeps the top tier in one pass.
    fn resolve(
        &self,
        query: &Name,
        forms: &QueryForms,
        group: Option<&CandidateGroup>,
        verbose: bool,
    ) -> NameMatch {
        let Some(group) = group else {
            return NameMatch::no_match();
        };
        let mut best: Option<u8> = None;
        let mut matches: Vec<&IndexName> = Vec::new();
        for candidate in group {
            let Some(score) = self.score(query, forms, candidate) else {
                trace!(id = %candidate.id, "candidate gated out");
                continue;
            };
            trace!(id = %candidate.id, score, "scored candidate");
            match best {
                Some(top) if score < top => {}
                Some(top) if score == top => matches.push(candidate),
                _ => {
                    best = Some(score);
                    matches.clear();
                    matches.push(candidate);
                }
            }
        }

        match matches.len() {
            0 => self.none_result(Some(group), verbose),
            1 => {
                let chosen = matches[0];
                let match_type = if normalize_compare(&chosen.name.label()) == forms.label {
                    MatchType::Exact
                } else {
                    MatchType::Variant
                };
                let mut result = NameMatch::single(match_type, chosen.clone());
                if verbose {
                    result.alternatives = group
                        .iter()
                        .filter(|member| member.id != chosen.id)
                        .cloned()
                        .collect();
                }
                result
            }
            _ => NameMatch::ambiguous(matches.into_iter().cloned().collect()),
        }
    }

    /// `None` when the candidate fails the rank or code gate or the comparator
    /// finds the authorships different.
    fn score(&self, query: &Name, forms: &QueryForms, candidate: &IndexName) -> Option<u8> {
        let name = &candidate.name;
        if query.rank != Rank::Unranked && !query.rank.is_compatible_with(name.rank) {
            return None;
        }
        if let Some(code) = query.code
            && name.code.is_some_and(|candidate_code| candidate_code != code)
        {
            return None;
        }
        if normalize_compare(&name.label()) == forms.label {
            return Some(EXACT_FULL_NAME);
        }

        let equality = if query.has_authorship() {
            self.comparator.compare(query, name)
        } else {
            Equality::Unknown
        };
        if equality == Equality::Different {
            return None;
        }
        let mut score = 0;
        if normalize_compare(&name.authorship_complete()) == forms.authorship {
            score += AUTHORSHIP_STRING_EQUAL;
        } else if equality == Equality::Equal {
            score += AUTHORSHIP_EQUAL;
        }
        if normalize_compare(&name.scientific_name) == forms.canonical {
            score += CANONICAL_EQUAL;
        }
        Some(score)
    }
}
