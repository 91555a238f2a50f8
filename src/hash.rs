use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seed mixed into key hashes used for lock striping.
const STRIPE_SEED: u64 = 0x6e61_6d65_735f_6964;

/// Hash of whatever `f` feeds the hasher.
pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Hash of `value` under `seed`.
pub fn stable_hash_str(seed: u64, value: &str) -> u64 {
    stable_hash_with(|hasher| {
        seed.hash(hasher);
        value.hash(hasher);
    })
}

/// Stripe index guarding `key` among `stripes` locks.
pub fn stripe_for(key: &str, stripes: usize) -> usize {
    if stripes <= 1 {
        return 0;
    }
    (stable_hash_str(STRIPE_SEED, key) % stripes as u64) as usize
}
