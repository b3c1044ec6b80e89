//! Static factorization table for common tensor dimensions.
//!
//! Powers of two up to 2^13 plus the sizes that keep showing up in model
//! shapes (image sides, hidden widths, head counts). Lookups never touch the
//! dynamic cache and never count against its capacity.

/// Curated dimensions worth warming a dynamic cache with.
///
/// Used by [`super::FactorizationCache::precompute`] callers that disable the
/// static table but still want the common sizes hot.
pub const COMMON_DIMENSIONS: [u64; 28] = [
    1, 2, 3, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 224, 299, 331, 448, 640, 768, 896,
    1280, 1920, 7, 14, 28, 56, 112,
];

/// Sorted by key so lookup is a binary search over a fixed-size table.
static TABLE: [(u64, &[u64]); 47] = [
    (2, &[2]),
    (3, &[3]),
    (4, &[2; 2]),
    (5, &[5]),
    (6, &[2, 3]),
    (7, &[7]),
    (8, &[2; 3]),
    (10, &[2, 5]),
    (12, &[2, 2, 3]),
    (14, &[2, 7]),
    (16, &[2; 4]),
    (24, &[2, 2, 2, 3]),
    (28, &[2, 2, 7]),
    (32, &[2; 5]),
    (48, &[2, 2, 2, 2, 3]),
    (56, &[2, 2, 2, 7]),
    (64, &[2; 6]),
    (96, &[2, 2, 2, 2, 2, 3]),
    (100, &[2, 2, 5, 5]),
    (112, &[2, 2, 2, 2, 7]),
    (128, &[2; 7]),
    (160, &[2, 2, 2, 2, 2, 5]),
    (192, &[2, 2, 2, 2, 2, 2, 3]),
    (224, &[2, 2, 2, 2, 2, 7]),
    (256, &[2; 8]),
    (299, &[13, 23]),
    (320, &[2, 2, 2, 2, 2, 2, 5]),
    (331, &[331]),
    (384, &[2, 2, 2, 2, 2, 2, 2, 3]),
    (448, &[2, 2, 2, 2, 2, 2, 7]),
    (512, &[2; 9]),
    (576, &[2, 2, 2, 2, 2, 2, 3, 3]),
    (640, &[2, 2, 2, 2, 2, 2, 2, 5]),
    (768, &[2, 2, 2, 2, 2, 2, 2, 2, 3]),
    (896, &[2, 2, 2, 2, 2, 2, 2, 7]),
    (1000, &[2, 2, 2, 5, 5, 5]),
    (1024, &[2; 10]),
    (1152, &[2, 2, 2, 2, 2, 2, 2, 3, 3]),
    (1280, &[2, 2, 2, 2, 2, 2, 2, 2, 5]),
    (1536, &[2, 2, 2, 2, 2, 2, 2, 2, 2, 3]),
    (1920, &[2, 2, 2, 2, 2, 2, 2, 3, 5]),
    (2048, &[2; 11]),
    (2560, &[2, 2, 2, 2, 2, 2, 2, 2, 2, 5]),
    (3072, &[2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 3]),
    (4096, &[2; 12]),
    (6144, &[2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 3]),
    (8192, &[2; 13]),
];

/// Look up `n` in the static table.
pub fn lookup(n: u64) -> Option<&'static [u64]> {
    TABLE
        .binary_search_by_key(&n, |&(k, _)| k)
        .ok()
        .map(|i| TABLE[i].1)
}

/// Number of entries in the static table.
pub fn len() -> usize {
    TABLE.len()
}
