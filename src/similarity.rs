//! Pairwise similarity between shape encodings.
//!
//! # Weighted metric
//!
//! ```text
//! category  0.4   same category
//! shape     0.3 × (positions with equal dimension) / rank        [equal rank only]
//! prime     0.2 × mean over positions of factor overlap          [equal rank only]
//! identity  0.1   same full signature
//! ```
//!
//! Factor overlap at one position is the multiset intersection size divided
//! by the longer factor list, or 1.0 when both lists are empty. The identity
//! term is what lifts identical shapes from 0.9 to exactly 1.0; it is zero for
//! every pair of distinct shapes.
//!
//! # Signature edit metric
//!
//! `1 − levenshtein(sig_a, sig_b) / max(len)`. Cheaper to reason about, and
//! agrees with the weighted metric that identical shapes score 1.0.

use alloc::vec::Vec;

use crate::signature::ShapeEncoding;

// Percentage points; identical shapes sum to exactly 100.
const CATEGORY_POINTS: f64 = 40.0;
const SHAPE_POINTS: f64 = 30.0;
const PRIME_POINTS: f64 = 20.0;
const IDENTITY_POINTS: f64 = 10.0;

/// Which similarity function a graph uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimilarityMetric {
    /// Category + shape + prime-structure + identity terms.
    #[default]
    Weighted,
    /// One minus normalized edit distance between signature strings.
    SignatureEdit,
}

impl SimilarityMetric {
    /// Score two encodings in [0, 1].
    pub fn score(&self, a: &ShapeEncoding, b: &ShapeEncoding) -> f64 {
        match self {
            Self::Weighted => similarity(a, b),
            Self::SignatureEdit => 1.0 - signature_distance(a, b),
        }
    }
}

/// Weighted similarity in [0, 1]. Symmetric; 1.0 for identical shapes.
pub fn similarity(a: &ShapeEncoding, b: &ShapeEncoding) -> f64 {
    let mut points = 0.0;
    if a.category() == b.category() {
        points += CATEGORY_POINTS;
    }

    let rank = a.rank();
    if rank == b.rank() && rank > 0 {
        let matches = a
            .shape()
            .iter()
            .zip(b.shape())
            .filter(|(x, y)| x == y)
            .count();
        points += SHAPE_POINTS * matches as f64 / rank as f64;

        let overlap: f64 = a
            .factors()
            .iter()
            .zip(b.factors())
            .map(|(fa, fb)| factor_overlap(fa, fb))
            .sum();
        points += PRIME_POINTS * overlap / rank as f64;
    }

    if a.signature() == b.signature() {
        points += IDENTITY_POINTS;
    }

    (points / 100.0).clamp(0.0, 1.0)
}

/// Similarity that treats a missing encoding as sharing nothing.
pub fn similarity_opt(a: Option<&ShapeEncoding>, b: Option<&ShapeEncoding>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => similarity(a, b),
        _ => 0.0,
    }
}

/// Fraction of shared prime factors between two ascending factor lists.
///
/// Multiset intersection over the longer list's length; 1.0 when both are
/// empty, 0.0 when exactly one is.
pub fn factor_overlap(a: &[u64], b: &[u64]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let (mut i, mut j, mut shared) = (0, 0, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            core::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
            core::cmp::Ordering::Less => i += 1,
            core::cmp::Ordering::Greater => j += 1,
        }
    }
    shared as f64 / longest as f64
}

/// Normalized edit distance between two full signatures, in [0, 1].
pub fn signature_distance(a: &ShapeEncoding, b: &ShapeEncoding) -> f64 {
    let (sa, sb) = (a.signature().as_bytes(), b.signature().as_bytes());
    let longest = sa.len().max(sb.len());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(sa, sb) as f64 / longest as f64
}

/// Two-row Levenshtein distance over bytes.
fn levenshtein(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = alloc::vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        core::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
