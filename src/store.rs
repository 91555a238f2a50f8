use chrono::DateTime;
use simd_r_drive::storage_engine::DataStore;
use simd_r_drive::storage_engine::traits::{DataStoreReader, DataStoreWriter};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::constants::store::{
    BITCODE_PREFIX, DEFAULT_STORE_FILENAME, GROUP_PREFIX, GROUP_RECORD_VERSION, ID_PREFIX,
    KEY_SLOT_PREFIX, META_KEY, SEQUENCE_KEY, SEQUENCE_RECORD_VERSION, STORE_VERSION,
};
use crate::data::{DatasetKey, IndexId, IndexName, Name, NormalizedKey};
use crate::errors::NameIndexError;

/// Index names sharing one normalized key.
///
/// Groups are values: mutation produces the next group, which the caller
/// writes back while holding the key's lock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateGroup {
    key: NormalizedKey,
    members: Vec<IndexName>,
}

impl CandidateGroup {
    /// Empty group for `key`.
    pub fn new(key: impl Into<NormalizedKey>) -> Self {
        Self {
            key: key.into(),
            members: Vec::new(),
        }
    }

    /// Normalized key shared by every member.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[IndexName] {
        &self.members
    }

    /// Iterates members in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, IndexName> {
        self.members.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` when the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `true` when a member carries `id`.
    pub fn contains_id(&self, id: &str) -> bool {
        self.members.iter().any(|member| member.id == id)
    }

    /// Member carrying `id`.
    pub fn find(&self, id: &str) -> Option<&IndexName> {
        self.members.iter().find(|member| member.id == id)
    }

    /// Next version of this group with `name` appended, replacing any member
    /// that carries the same id. The flag reports whether a member was replaced.
    pub fn upserted(&self, name: IndexName) -> (CandidateGroup, bool) {
        let mut members: Vec<IndexName> = Vec::with_capacity(self.members.len() + 1);
        let mut replaced = false;
        for member in &self.members {
            if member.id == name.id {
                replaced = true;
            } else {
                members.push(member.clone());
            }
        }
        members.push(name);
        (
            CandidateGroup {
                key: self.key.clone(),
                members,
            },
            replaced,
        )
    }

    /// Next version of this group without the member carrying `id`. The flag
    /// reports whether a member was removed.
    pub fn without(&self, id: &str) -> (CandidateGroup, bool) {
        let members: Vec<IndexName> = self
            .members
            .iter()
            .filter(|member| member.id != id)
            .cloned()
            .collect();
        let removed = members.len() != self.members.len();
        (
            CandidateGroup {
                key: self.key.clone(),
                members,
            },
            removed,
        )
    }

    /// Consumes the group, returning its members.
    pub fn into_members(self) -> Vec<IndexName> {
        self.members
    }
}

impl<'a> IntoIterator for &'a CandidateGroup {
    type Item = &'a IndexName;
    type IntoIter = std::slice::Iter<'a, IndexName>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

/// Callback receiving each stored group. Returning an error stops the walk.
pub type GroupVisitor<'a> = dyn FnMut(CandidateGroup) -> Result<(), NameIndexError> + 'a;

/// Key to candidate group map backing the index.
///
/// Implementations guarantee read-your-writes for a key on one thread and
/// independence of writes to different keys. Read-modify-write of a single
/// group is serialized by the caller. Every `put` also records the group key
/// of each member id, so members can be found by id.
pub trait CandidateStore: Send + Sync {
    /// Total number of index names across all groups.
    fn count(&self) -> Result<usize, NameIndexError>;
    /// Group stored under `key`; empty groups read as `None`.
    fn get(&self, key: &str) -> Result<Option<CandidateGroup>, NameIndexError>;
    /// `true` when a non-empty group is stored under `key`.
    fn contains_key(&self, key: &str) -> Result<bool, NameIndexError>;
    /// Creates or replaces the group stored under `group.key()`.
    fn put(&self, group: CandidateGroup) -> Result<(), NameIndexError>;
    /// Key of the last group written with a member carrying `id`.
    ///
    /// The entry outlives the member's removal; [`CandidateStore::get_by_id`]
    /// checks membership.
    fn key_of(&self, id: &str) -> Result<Option<NormalizedKey>, NameIndexError>;
    /// Member carrying `id`, if its group still holds it.
    fn get_by_id(&self, id: &str) -> Result<Option<IndexName>, NameIndexError> {
        let Some(key) = self.key_of(id)? else {
            return Ok(None);
        };
        Ok(self
            .get(&key)?
            .and_then(|group| group.find(id).cloned()))
    }
    /// Visits every non-empty group.
    fn for_each_group(&self, visitor: &mut GroupVisitor<'_>) -> Result<(), NameIndexError>;
    /// Writes many groups at once; used by bulk loads.
    fn put_all(&self, groups: Vec<CandidateGroup>) -> Result<(), NameIndexError> {
        for group in groups {
            self.put(group)?;
        }
        Ok(())
    }
    /// Removes every group.
    fn clear(&self) -> Result<(), NameIndexError>;
    /// Releases resources. Later calls fail with `StoreClosed`.
    fn close(&self) -> Result<(), NameIndexError>;
    /// Liveness check; never mutates.
    fn is_open(&self) -> bool;
}

/// Persistence hook for the id generator high-water mark.
pub trait SequenceStateStore: Send + Sync {
    /// Stored high-water mark, if any.
    fn load_sequence(&self) -> Result<Option<u64>, NameIndexError>;
    /// Stores `value` unless a higher value is already stored.
    fn store_sequence(&self, value: u64) -> Result<(), NameIndexError>;
}

/// Backing store of a running index.
pub trait IndexStore: CandidateStore + SequenceStateStore {}

impl<T: CandidateStore + SequenceStateStore> IndexStore for T {}

/// In-memory candidate store; lost on restart and always rebuilt by the loader.
#[derive(Debug, Default)]
pub struct InMemoryCandidateStore {
    groups: RwLock<HashMap<NormalizedKey, CandidateGroup>>,
    keys_by_id: RwLock<HashMap<IndexId, NormalizedKey>>,
    sequence: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryCandidateStore {
    /// Empty open store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), NameIndexError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NameIndexError::StoreClosed);
        }
        Ok(())
    }
}

impl CandidateStore for InMemoryCandidateStore {
    fn count(&self) -> Result<usize, NameIndexError> {
        self.ensure_open()?;
        let groups = self
            .groups
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        Ok(groups.values().map(CandidateGroup::len).sum())
    }

    fn get(&self, key: &str) -> Result<Option<CandidateGroup>, NameIndexError> {
        self.ensure_open()?;
        let groups = self
            .groups
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        Ok(groups.get(key).cloned())
    }

    fn contains_key(&self, key: &str) -> Result<bool, NameIndexError> {
        self.ensure_open()?;
        let groups = self
            .groups
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        Ok(groups.get(key).is_some_and(|group| !group.is_empty()))
    }

    fn put(&self, group: CandidateGroup) -> Result<(), NameIndexError> {
        self.ensure_open()?;
        let mut groups = self
            .groups
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        let mut keys_by_id = self
            .keys_by_id
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("candidate id map"))?;
        for member in &group.members {
            keys_by_id.insert(member.id.clone(), group.key.clone());
        }
        if group.is_empty() {
            groups.remove(&group.key);
        } else {
            groups.insert(group.key.clone(), group);
        }
        Ok(())
    }

    fn key_of(&self, id: &str) -> Result<Option<NormalizedKey>, NameIndexError> {
        self.ensure_open()?;
        let keys_by_id = self
            .keys_by_id
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("candidate id map"))?;
        Ok(keys_by_id.get(id).cloned())
    }

    fn for_each_group(&self, visitor: &mut GroupVisitor<'_>) -> Result<(), NameIndexError> {
        self.ensure_open()?;
        // Visit a snapshot so the visitor may write back into the store.
        let snapshot: Vec<CandidateGroup> = self
            .groups
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?
            .values()
            .cloned()
            .collect();
        for group in snapshot {
            visitor(group)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), NameIndexError> {
        self.ensure_open()?;
        let mut groups = self
            .groups
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        groups.clear();
        self.keys_by_id
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("candidate id map"))?
            .clear();
        self.sequence.store(0, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<(), NameIndexError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

impl SequenceStateStore for InMemoryCandidateStore {
    fn load_sequence(&self) -> Result<Option<u64>, NameIndexError> {
        self.ensure_open()?;
        let value = self.sequence.load(Ordering::Acquire);
        Ok((value > 0).then_some(value))
    }

    fn store_sequence(&self, value: u64) -> Result<(), NameIndexError> {
        self.ensure_open()?;
        self.sequence.fetch_max(value, Ordering::AcqRel);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, bitcode::Encode, bitcode::Decode)]
/// Versioned metadata header stored in file-backed candidate stores.
struct StoreMeta {
    version: u8,
    count: u64,
    /// Number of distinct group keys ever written; one `key:<slot>` record each.
    keys: u64,
}

#[derive(Clone, Debug, bitcode::Encode, bitcode::Decode)]
struct PersistedIndexName {
    id: IndexId,
    dataset_key: DatasetKey,
    created_ms: i64,
    name: Name,
}

#[derive(Clone, Debug, bitcode::Encode, bitcode::Decode)]
struct PersistedGroup {
    key: NormalizedKey,
    members: Vec<PersistedIndexName>,
}

/// File-backed candidate store on a `simd-r-drive` data file.
///
/// Each group is one record under `grp:<key>`. A metadata record keeps the
/// member count so `count` never scans, and a sequence record keeps the id
/// generator high-water mark across restarts. Member ids map to their group
/// key under `id:<id>`, and every group key gets a numbered `key:<slot>`
/// record so groups can be enumerated.
pub struct FileCandidateStore {
    path: PathBuf,
    store: RwLock<Option<DataStore>>,
    meta: Mutex<StoreMeta>,
}

impl fmt::Debug for FileCandidateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCandidateStore")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

impl FileCandidateStore {
    /// Open (or create) a file-backed candidate store at `path`. A directory
    /// is resolved to the default store filename inside it.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, NameIndexError> {
        let path = coerce_store_path(path.into());
        ensure_parent_dir(&path)?;
        let store = DataStore::open(path.as_path()).map_err(map_store_err)?;
        let meta = load_or_init_meta(&store)?;
        debug!(path = %path.display(), count = meta.count, "opened candidate store");
        Ok(Self {
            path,
            store: RwLock::new(Some(store)),
            meta: Mutex::new(meta),
        })
    }

    /// Default store file path inside `dir`.
    pub fn default_path_in_dir<P: AsRef<Path>>(dir: P) -> PathBuf {
        dir.as_ref().join(DEFAULT_STORE_FILENAME)
    }

    /// Resolved data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_store<T>(
        &self,
        op: impl FnOnce(&DataStore) -> Result<T, NameIndexError>,
    ) -> Result<T, NameIndexError> {
        let guard = self
            .store
            .read()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        match guard.as_ref() {
            Some(store) => op(store),
            None => Err(NameIndexError::StoreClosed),
        }
    }

    fn lock_meta(&self) -> Result<std::sync::MutexGuard<'_, StoreMeta>, NameIndexError> {
        self.meta
            .lock()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store meta"))
    }

    /// Member count of the stored group, `None` when the key was never written.
    fn stored_len(store: &DataStore, key: &[u8]) -> Result<Option<usize>, NameIndexError> {
        Ok(read_bytes(store, key)?
            .map(|bytes| decode_group(&bytes))
            .transpose()?
            .map(|group| group.members.len()))
    }
}

impl CandidateStore for FileCandidateStore {
    fn count(&self) -> Result<usize, NameIndexError> {
        self.with_store(|_| Ok(self.lock_meta()?.count as usize))
    }

    fn get(&self, key: &str) -> Result<Option<CandidateGroup>, NameIndexError> {
        self.with_store(|store| {
            Ok(read_bytes(store, &group_key(key))?
                .map(|bytes| decode_group(&bytes).and_then(group_from_persisted))
                .transpose()?
                .filter(|group| !group.is_empty()))
        })
    }

    fn contains_key(&self, key: &str) -> Result<bool, NameIndexError> {
        Ok(self.get(key)?.is_some())
    }

    fn key_of(&self, id: &str) -> Result<Option<NormalizedKey>, NameIndexError> {
        self.with_store(|store| {
            read_bytes(store, &id_key(id))?
                .map(|bytes| decode_key_text(bytes, "id"))
                .transpose()
        })
    }

    fn for_each_group(&self, visitor: &mut GroupVisitor<'_>) -> Result<(), NameIndexError> {
        let slots = self.with_store(|_| Ok(self.lock_meta()?.keys))?;
        for slot in 0..slots {
            let key = self.with_store(|store| {
                read_bytes(store, &key_slot(slot))?
                    .map(|bytes| decode_key_text(bytes, "key slot"))
                    .transpose()
            })?;
            let Some(key) = key else {
                return Err(NameIndexError::store(format!("missing key slot {slot}")));
            };
            if let Some(group) = self.get(&key)? {
                visitor(group)?;
            }
        }
        Ok(())
    }

    fn put(&self, group: CandidateGroup) -> Result<(), NameIndexError> {
        self.put_all(vec![group])
    }

    fn put_all(&self, groups: Vec<CandidateGroup>) -> Result<(), NameIndexError> {
        if groups.is_empty() {
            return Ok(());
        }
        self.with_store(|store| {
            let mut meta = self.lock_meta()?;
            let mut count = meta.count as i64;
            let mut keys = meta.keys;
            let mut new_keys: HashSet<&str> = HashSet::new();
            let mut entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(groups.len() + 1);
            for group in &groups {
                let key = group_key(&group.key);
                match Self::stored_len(store, &key)? {
                    Some(len) => count -= len as i64,
                    None => {
                        if new_keys.insert(group.key.as_str()) {
                            entries.push((key_slot(keys), group.key.as_bytes().to_vec()));
                            keys += 1;
                        }
                    }
                }
                count += group.len() as i64;
                for member in &group.members {
                    entries.push((id_key(&member.id), group.key.as_bytes().to_vec()));
                }
                entries.push((key, encode_group(group)));
            }
            let next = StoreMeta {
                version: STORE_VERSION,
                count: count.max(0) as u64,
                keys,
            };
            entries.push((META_KEY.to_vec(), encode_store_meta(&next)));
            let entry_refs: Vec<(&[u8], &[u8])> = entries
                .iter()
                .map(|(key, value)| (key.as_slice(), value.as_slice()))
                .collect();
            store.batch_write(&entry_refs).map_err(map_store_err)?;
            *meta = next;
            Ok(())
        })
    }

    fn clear(&self) -> Result<(), NameIndexError> {
        let mut guard = self
            .store
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        if guard.is_none() {
            return Err(NameIndexError::StoreClosed);
        }
        // Drop the mapping before removing the file underneath it.
        guard.take();
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %err, "failed to remove candidate store file");
            return Err(map_store_err(err));
        }
        let store = DataStore::open(self.path.as_path()).map_err(map_store_err)?;
        let meta = load_or_init_meta(&store)?;
        *self.lock_meta()? = meta;
        *guard = Some(store);
        debug!(path = %self.path.display(), "cleared candidate store");
        Ok(())
    }

    fn close(&self) -> Result<(), NameIndexError> {
        let mut guard = self
            .store
            .write()
            .map_err(|_| NameIndexError::LockPoisoned("candidate store"))?;
        guard.take();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.store.read().map(|guard| guard.is_some()).unwrap_or(false)
    }
}

impl SequenceStateStore for FileCandidateStore {
    fn load_sequence(&self) -> Result<Option<u64>, NameIndexError> {
        self.with_store(|store| {
            read_bytes(store, SEQUENCE_KEY)?
                .map(|bytes| decode_sequence(&bytes))
                .transpose()
        })
    }

    fn store_sequence(&self, value: u64) -> Result<(), NameIndexError> {
        self.with_store(|store| {
            // Serializes concurrent high-water updates.
            let _meta = self.lock_meta()?;
            let current = read_bytes(store, SEQUENCE_KEY)?
                .map(|bytes| decode_sequence(&bytes))
                .transpose()?
                .unwrap_or(0);
            if value > current {
                write_bytes(store, SEQUENCE_KEY, &encode_sequence(value))?;
            }
            Ok(())
        })
    }
}

fn load_or_init_meta(store: &DataStore) -> Result<StoreMeta, NameIndexError> {
    match read_bytes(store, META_KEY)? {
        Some(bytes) => {
            let meta = decode_store_meta(&bytes)?;
            if meta.version != STORE_VERSION {
                return Err(NameIndexError::store(format!(
                    "candidate store version mismatch (expected {}, found {})",
                    STORE_VERSION, meta.version
                )));
            }
            Ok(meta)
        }
        None => {
            let meta = StoreMeta {
                version: STORE_VERSION,
                count: 0,
                keys: 0,
            };
            write_bytes(store, META_KEY, &encode_store_meta(&meta))?;
            Ok(meta)
        }
    }
}

fn group_key(key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(GROUP_PREFIX.len() + key.len());
    out.extend_from_slice(GROUP_PREFIX);
    out.extend_from_slice(key.as_bytes());
    out
}

fn id_key(id: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(ID_PREFIX.len() + id.len());
    out.extend_from_slice(ID_PREFIX);
    out.extend_from_slice(id.as_bytes());
    out
}

fn key_slot(slot: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(KEY_SLOT_PREFIX.len() + 8);
    out.extend_from_slice(KEY_SLOT_PREFIX);
    out.extend_from_slice(&slot.to_be_bytes());
    out
}

fn decode_key_text(bytes: Vec<u8>, record: &str) -> Result<NormalizedKey, NameIndexError> {
    String::from_utf8(bytes)
        .map_err(|err| NameIndexError::store(format!("corrupt {record} record: {err}")))
}

fn group_to_persisted(group: &CandidateGroup) -> PersistedGroup {
    PersistedGroup {
        key: group.key.clone(),
        members: group
            .members
            .iter()
            .map(|member| PersistedIndexName {
                id: member.id.clone(),
                dataset_key: member.dataset_key,
                created_ms: member.created.timestamp_millis(),
                name: member.name.clone(),
            })
            .collect(),
    }
}

fn group_from_persisted(group: PersistedGroup) -> Result<CandidateGroup, NameIndexError> {
    let members = group
        .members
        .into_iter()
        .map(|member| {
            let created = DateTime::from_timestamp_millis(member.created_ms).ok_or_else(|| {
                NameIndexError::store(format!(
                    "corrupt creation timestamp {} for {}",
                    member.created_ms, member.id
                ))
            })?;
            Ok(IndexName {
                id: member.id,
                dataset_key: member.dataset_key,
                created,
                name: member.name,
            })
        })
        .collect::<Result<Vec<_>, NameIndexError>>()?;
    Ok(CandidateGroup {
        key: group.key,
        members,
    })
}

fn encode_group(group: &CandidateGroup) -> Vec<u8> {
    let payload = encode_bitcode_payload(&bitcode::encode(&group_to_persisted(group)));
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(GROUP_RECORD_VERSION);
    buf.extend_from_slice(&payload);
    buf
}

fn decode_group(bytes: &[u8]) -> Result<PersistedGroup, NameIndexError> {
    if bytes.first().copied() != Some(GROUP_RECORD_VERSION) {
        return Err(NameIndexError::store("candidate group record version mismatch"));
    }
    let raw = decode_bitcode_payload(&bytes[1..])?;
    bitcode::decode(&raw)
        .map_err(|err| NameIndexError::store(format!("corrupt candidate group record: {err}")))
}

fn encode_sequence(value: u64) -> Vec<u8> {
    let payload = encode_bitcode_payload(&bitcode::encode(&value));
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(SEQUENCE_RECORD_VERSION);
    buf.extend_from_slice(&payload);
    buf
}

fn decode_sequence(bytes: &[u8]) -> Result<u64, NameIndexError> {
    if bytes.first().copied() != Some(SEQUENCE_RECORD_VERSION) {
        return Err(NameIndexError::store("sequence record version mismatch"));
    }
    let raw = decode_bitcode_payload(&bytes[1..])?;
    bitcode::decode(&raw)
        .map_err(|err| NameIndexError::store(format!("corrupt sequence record: {err}")))
}

fn encode_store_meta(meta: &StoreMeta) -> Vec<u8> {
    encode_bitcode_payload(&bitcode::encode(meta))
}

fn decode_store_meta(bytes: &[u8]) -> Result<StoreMeta, NameIndexError> {
    let raw = decode_bitcode_payload(bytes)?;
    bitcode::decode(&raw).map_err(|err| {
        NameIndexError::store(format!("failed to decode candidate store metadata: {err}"))
    })
}

fn encode_bitcode_payload(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + bytes.len());
    out.push(BITCODE_PREFIX);
    out.extend_from_slice(bytes);
    out
}

fn decode_bitcode_payload(bytes: &[u8]) -> Result<Vec<u8>, NameIndexError> {
    if bytes.first().copied() != Some(BITCODE_PREFIX) {
        return Err(NameIndexError::store(
            "bitcode payload missing expected prefix",
        ));
    }
    Ok(bytes[1..].to_vec())
}

fn read_bytes(store: &DataStore, key: &[u8]) -> Result<Option<Vec<u8>>, NameIndexError> {
    store
        .read(key)
        .map_err(map_store_err)?
        .map(|entry| Ok(entry.as_ref().to_vec()))
        .transpose()
}

fn write_bytes(store: &DataStore, key: &[u8], payload: &[u8]) -> Result<(), NameIndexError> {
    store.write(key, payload).map_err(map_store_err)?;
    Ok(())
}

fn coerce_store_path(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        return path.join(DEFAULT_STORE_FILENAME);
    }
    path
}

fn ensure_parent_dir(path: &Path) -> Result<(), NameIndexError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn map_store_err(err: io::Error) -> NameIndexError {
    NameIndexError::store(err.to_string())
}
