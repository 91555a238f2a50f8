use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::index::DEFAULT_ID_PREFIX;
use crate::types::IndexId;

/// Source of new index identities.
///
/// Ids are strictly increasing. The loader seeds the generator after bulk
/// loading so a fresh id never collides with a loaded one.
pub trait IdGenerator: Send + Sync {
    /// Next unused id.
    fn next_id(&self) -> IndexId;
    /// Raises the sequence so the next id is greater than `at_least`.
    fn seed(&self, at_least: u64);
    /// Restarts the sequence so the next id is the first one again.
    fn reset(&self);
    /// Sequence number encoded in `id`, if this generator could have produced it.
    fn sequence_of(&self, id: &str) -> Option<u64>;
    /// Last sequence number handed out or seeded.
    fn current(&self) -> u64;
}

/// `<prefix><n>` ids backed by an atomic counter.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Generator starting at `<prefix>1`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Prefix of every generated id.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> IndexId {
        let value = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        format!("{}{}", self.prefix, value)
    }

    fn seed(&self, at_least: u64) {
        self.counter.fetch_max(at_least, Ordering::AcqRel);
    }

    fn reset(&self) {
        self.counter.store(0, Ordering::Release);
    }

    fn sequence_of(&self, id: &str) -> Option<u64> {
        id.strip_prefix(self.prefix.as_str())?.parse().ok()
    }

    fn current(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn ids_increase_after_seed() {
        let generator = SequentialIdGenerator::default();
        assert_eq!(generator.next_id(), "NI1");
        generator.seed(41);
        assert_eq!(generator.next_id(), "NI42");
        generator.seed(10);
        assert_eq!(generator.next_id(), "NI43");
        assert_eq!(generator.current(), 43);
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let generator = SequentialIdGenerator::default();
        generator.seed(41);
        assert_eq!(generator.next_id(), "NI42");
        generator.reset();
        assert_eq!(generator.current(), 0);
        assert_eq!(generator.next_id(), "NI1");
    }

    #[test]
    fn sequence_of_parses_own_ids_only() {
        let generator = SequentialIdGenerator::new("X");
        assert_eq!(generator.sequence_of("X17"), Some(17));
        assert_eq!(generator.sequence_of("NI17"), None);
        assert_eq!(generator.sequence_of("Xabc"), None);
        assert_eq!(generator.prefix(), "X");
    }

    #[test]
    fn concurrent_ids_are_unique() {
        let generator = SequentialIdGenerator::default();
        let ids: Vec<IndexId> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..250).map(|_| generator.next_id()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });
        let unique: HashSet<&IndexId> = ids.iter().collect();
        assert_eq!(unique.len(), 2000);
        assert_eq!(generator.current(), 2000);
    }
}
