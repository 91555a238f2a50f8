/// Constants describing the names index itself.
pub mod index {
    use crate::types::DatasetKey;
    use crate::vocab::NameType;

    /// Dataset in the store of record that owns all index names.
    pub const NAMES_INDEX_DATASET_KEY: DatasetKey = 1;
    /// Prefix for generated index ids (`NI1`, `NI2`, ...).
    pub const DEFAULT_ID_PREFIX: &str = "NI";
    /// Default number of striped per-key locks guarding group mutation.
    pub const DEFAULT_LOCK_STRIPES: usize = 64;
    /// Names buffered per candidate store write during bulk loads.
    pub const LOAD_BATCH_SIZE: usize = 10_000;
    /// Name types eligible for insertion into the index.
    pub const INDEX_NAME_TYPES: [NameType; 4] = [
        NameType::Scientific,
        NameType::HybridFormula,
        NameType::Virus,
        NameType::Otu,
    ];
}

/// Constants used by the scoring tournament.
pub mod scoring {
    /// Score of a candidate whose full name with authorship equals the query's.
    pub const EXACT_FULL_NAME: u8 = 5;
    /// Bonus for identical folded authorship strings.
    pub const AUTHORSHIP_STRING_EQUAL: u8 = 2;
    /// Bonus for authorships the comparator classifies as equal.
    pub const AUTHORSHIP_EQUAL: u8 = 1;
    /// Bonus for identical folded canonical names without authorship.
    pub const CANONICAL_EQUAL: u8 = 1;
}

/// Constants used by the authorship comparator.
pub mod authorship {
    /// Minimum common surname prefix accepted as the same author.
    pub const MIN_COMMON_PREFIX: usize = 4;
    /// Jaro-Winkler similarity above which two surnames are the same author.
    pub const MIN_SURNAME_SIMILARITY: f64 = 0.9;
    /// Year difference still classified as equal.
    pub const YEAR_TOLERANCE: i32 = 1;
    /// Normalized author token used for "et al." that is ignored in comparisons.
    pub const ET_AL: &str = "al";
}

/// Constants used by the file-backed candidate store.
pub mod store {
    /// Key used for the store metadata record.
    pub const META_KEY: &[u8] = b"__meta__";
    /// Key used for the persisted id-generator high-water mark.
    pub const SEQUENCE_KEY: &[u8] = b"__seq__";
    /// Key prefix for candidate group records.
    pub const GROUP_PREFIX: &[u8] = b"grp:";
    /// Key prefix for member id to group key records.
    pub const ID_PREFIX: &[u8] = b"id:";
    /// Key prefix for numbered group key records used to enumerate groups.
    pub const KEY_SLOT_PREFIX: &[u8] = b"key:";
    /// Version tag for store metadata compatibility checks.
    pub const STORE_VERSION: u8 = 1;
    /// Version tag for persisted candidate group records.
    pub const GROUP_RECORD_VERSION: u8 = 1;
    /// Version tag for persisted sequence records.
    pub const SEQUENCE_RECORD_VERSION: u8 = 1;
    /// Prefix marker for bitcode-encoded payloads.
    pub const BITCODE_PREFIX: u8 = b'B';
    /// Default filename for persisted candidate stores.
    pub const DEFAULT_STORE_FILENAME: &str = "names_index.bin";
}

/// Constants used by the SQLite store of record.
#[cfg(feature = "sqlite")]
pub mod sqlite {
    /// Busy timeout applied to every connection.
    pub const BUSY_TIMEOUT_MS: u64 = 5_000;
    /// Negative cache size means KiB in SQLite.
    pub const CACHE_SIZE_KB: i64 = -16_000;
    /// Table holding index names.
    pub const NAMES_TABLE: &str = "names_index";
}
