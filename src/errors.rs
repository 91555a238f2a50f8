use std::io;

use thiserror::Error;

/// Error type for candidate store, store of record, and configuration failures.
///
/// Normalization and scoring never fail; only storage access surfaces here.
#[derive(Debug, Error)]
pub enum NameIndexError {
    /// Candidate store could not be read or written.
    #[error("candidate store is unavailable: {reason}")]
    StoreUnavailable {
        /// Underlying failure.
        reason: String,
    },
    /// Store of record could not be read or written.
    #[error("store of record failure: {reason}")]
    Registry {
        /// Underlying failure.
        reason: String,
    },
    /// Call made after `close`.
    #[error("candidate store has been closed")]
    StoreClosed,
    /// Rejected configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A lock holder panicked; names the lock.
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
    /// Filesystem failure outside the store engines.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl NameIndexError {
    /// Returns `true` when the index cannot serve requests until storage recovers.
    ///
    /// Callers at a service boundary map these to an unavailable response.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::Registry { .. } | Self::StoreClosed | Self::Io(_)
        )
    }

    pub(crate) fn store(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn registry(reason: impl Into<String>) -> Self {
        Self::Registry {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_unavailable() {
        assert!(NameIndexError::store("disk gone").is_unavailable());
        assert!(NameIndexError::registry("db down").is_unavailable());
        assert!(NameIndexError::StoreClosed.is_unavailable());
        assert!(NameIndexError::from(io::Error::other("boom")).is_unavailable());
        assert!(!NameIndexError::Configuration("bad".into()).is_unavailable());
        assert!(!NameIndexError::LockPoisoned("group").is_unavailable());
    }

    #[test]
    fn messages_carry_reason() {
        let err = NameIndexError::store("mmap failed");
        assert!(err.to_string().contains("mmap failed"));
        let err = NameIndexError::LockPoisoned("key stripe");
        assert_eq!(err.to_string(), "key stripe lock poisoned");
    }
}
