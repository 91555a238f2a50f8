#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Author team parsing and authorship equality.
pub mod authorship;
/// Index configuration and store backend selection.
pub mod config;
/// Centralized constants used across the store, scoring, and defaults.
pub mod constants;
/// Name, index name, and match result types.
pub mod data;
mod hash;
/// Id generation for new index names.
pub mod idgen;
/// Startup population of the candidate store.
pub mod loader;
/// The names index and its scoring.
pub mod matcher;
/// Lookup-key and comparison normalization.
pub mod normalizer;
/// Store of record trait and implementations.
pub mod registry;
/// Candidate group stores.
pub mod store;
/// Shared type aliases.
pub mod types;
/// Closed nomenclatural vocabularies.
pub mod vocab;

mod errors;

pub use authorship::{AuthorComparator, AuthorshipComparator, Equality};
pub use config::{NameIndexConfig, StoreBackend};
pub use data::{Authorship, IndexName, Name, NameMatch};
pub use errors::NameIndexError;
pub use idgen::{IdGenerator, SequentialIdGenerator};
pub use loader::LoadReport;
pub use matcher::NameIndex;
pub use normalizer::{normalize_compare, normalize_key};
pub use registry::{InMemoryNameRegistry, NameRegistry};
#[cfg(feature = "sqlite")]
pub use registry::SqliteNameRegistry;
pub use store::{
    CandidateGroup, CandidateStore, FileCandidateStore, InMemoryCandidateStore, IndexStore,
    SequenceStateStore,
};
pub use types::{DatasetKey, IndexId, NormalizedKey};
pub use vocab::{MatchType, NameType, NomCode, NomStatus, Origin, Rank, UnknownVocabulary};
