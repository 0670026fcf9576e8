use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Compute the seed for draw `index` of a cycle.
///
/// `seed = sha256( time_seconds_be || block_height_be || admin_bytes || index_be )`
///
/// The admin address is hashed as its raw bech32 string bytes. All inputs are
/// public while the block is built, so the outcome can be predicted by whoever
/// controls the block. Callers rely on the draw being reproducible from these
/// inputs alone.
pub fn draw_seed(time_seconds: u64, block_height: u64, admin: &str, index: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(time_seconds.to_be_bytes());
    hasher.update(block_height.to_be_bytes());
    hasher.update(admin.as_bytes());
    hasher.update(index.to_be_bytes());
    hasher.finalize().into()
}

/// Compute the seed for the monthly jackpot draw.
///
/// Same construction as [`draw_seed`] without the trailing index.
pub fn jackpot_seed(time_seconds: u64, block_height: u64, admin: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(time_seconds.to_be_bytes());
    hasher.update(block_height.to_be_bytes());
    hasher.update(admin.as_bytes());
    hasher.finalize().into()
}

/// Read the first 16 bytes of a seed as a big-endian u128.
pub fn seed_to_u128(seed: &[u8; 32]) -> u128 {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&seed[0..16]);
    u128::from_be_bytes(bytes)
}

/// Pick `count` distinct positions out of `[0, pool_size)`.
///
/// Sparse Fisher–Yates: draw `i` selects position `i + r % (pool_size - i)` of a
/// virtual array that starts as the identity, then swaps the chosen slot with
/// slot `i`. Only displaced slots are materialised, so the cost is
/// `O(count log count)` regardless of the pool size.
///
/// `count` is capped at `pool_size`. `seed_for(i)` supplies the seed of draw `i`.
pub fn draw_without_replacement<F>(pool_size: u64, count: u64, mut seed_for: F) -> Vec<u64>
where
    F: FnMut(u64) -> [u8; 32],
{
    let count = count.min(pool_size);
    let mut displaced: BTreeMap<u64, u64> = BTreeMap::new();
    let mut picked = Vec::with_capacity(count as usize);

    for i in 0..count {
        let remaining = (pool_size - i) as u128;
        let offset = (seed_to_u128(&seed_for(i)) % remaining) as u64;
        let j = i + offset;

        let at_j = displaced.get(&j).copied().unwrap_or(j);
        let at_i = displaced.get(&i).copied().unwrap_or(i);
        // Slot i is never read again; only j needs to remember what moved there.
        displaced.insert(j, at_i);
        displaced.remove(&i);

        picked.push(at_j);
    }

    picked
}

/// Return the tier a draw index belongs to, given per-tier winning counts.
///
/// Tiers are contiguous: tier 0 covers `[0, n0)`, tier 1 `[n0, n0 + n1)` and so
/// on. `None` when the index lies past the last tier.
pub fn tier_for_index(counts: &[u64], index: u64) -> Option<usize> {
    let mut upper = 0u64;
    for (tier, n) in counts.iter().enumerate() {
        upper = upper.saturating_add(*n);
        if index < upper {
            return Some(tier);
        }
    }
    None
}
