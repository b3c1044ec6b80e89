//! Shape categories and deterministic shape signatures.
//!
//! A [`ShapeEncoding`] is the immutable fingerprint of one tensor shape:
//! the shape itself, its per-dimension prime factors, a [`Category`] and a
//! signature string.
//!
//! ```text
//! [2, 3]      → matrix_p2:p3
//! [1, 12, 7]  → tensor_0:c2*2*3:p7
//! ```
//!
//! Per-dimension token for dimension `d` with factors `F`:
//! `"0"` when `F` is empty (d == 1), `"p{F[0]}"` when `|F| == 1`,
//! otherwise `"c" + join(F, "*")`.
//!
//! The signature is a pure function of the shape (and of any registered
//! grammar rules). It never depends on node ids or insertion order.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use tracing::warn;

use crate::error::{GestaltError, GestaltResult};
use crate::factor::FactorizationCache;

// ─── Category ────────────────────────────────────────────────────────────────

/// Coarse classification of a shape by rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Category {
    /// Rank 0.
    Scalar,
    /// Rank 1.
    Vector,
    /// Rank 2.
    Matrix,
    /// Rank 3 and above.
    Tensor,
}

impl Category {
    /// Default rank-based category.
    pub fn from_rank(rank: usize) -> Self {
        match rank {
            0 => Self::Scalar,
            1 => Self::Vector,
            2 => Self::Matrix,
            _ => Self::Tensor,
        }
    }

    /// Lowercase name used as the signature prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Vector => "vector",
            Self::Matrix => "matrix",
            Self::Tensor => "tensor",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Grammar rules ───────────────────────────────────────────────────────────

/// Caller-supplied classifier that can override the rank-based category.
///
/// Return `Some(category)` to claim the shape, `None` to pass. Rules are
/// consulted in registration order; the first claim wins.
pub trait GrammarRule: Send + Sync {
    /// Classify `shape`, or decline with `None`.
    fn classify(&self, shape: &[usize]) -> Option<Category>;
}

impl<F> GrammarRule for F
where
    F: Fn(&[usize]) -> Option<Category> + Send + Sync,
{
    fn classify(&self, shape: &[usize]) -> Option<Category> {
        self(shape)
    }
}

struct NamedRule {
    name: String,
    rule: Box<dyn GrammarRule>,
}

// ─── ShapeEncoding ───────────────────────────────────────────────────────────

/// Immutable fingerprint of a single shape.
///
/// With the `serde` feature, deserialization re-checks the encoding: the
/// shape must be valid, each factor list must be the ascending prime
/// factorization of its dimension, and the signature must match the
/// category and factors. The category itself is taken as given, since a
/// grammar rule may have assigned it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawEncoding")
)]
pub struct ShapeEncoding {
    shape: Vec<usize>,
    factors: Vec<Vec<u64>>,
    category: Category,
    signature: String,
}

impl ShapeEncoding {
    /// Dimension sizes, in order.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Prime factors per dimension, parallel to [`Self::shape`].
    pub fn factors(&self) -> &[Vec<u64>] {
        &self.factors
    }

    /// Category (rank-based unless a grammar rule claimed the shape).
    pub fn category(&self) -> Category {
        self.category
    }

    /// Full signature string, `category + "_" + join(tokens, ":")`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Per-dimension tokens, split back out of the signature.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        let body = self
            .signature
            .split_once('_')
            .map_or("", |(_, body)| body);
        body.split(':')
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawEncoding {
    shape: Vec<usize>,
    factors: Vec<Vec<u64>>,
    category: Category,
    signature: String,
}

#[cfg(feature = "serde")]
impl TryFrom<RawEncoding> for ShapeEncoding {
    type Error = GestaltError;

    fn try_from(raw: RawEncoding) -> GestaltResult<Self> {
        validate_shape(&raw.shape)?;
        if raw.factors.len() != raw.shape.len() {
            return Err(GestaltError::InvalidEncoding(format!(
                "{} factor lists for rank {}",
                raw.factors.len(),
                raw.shape.len()
            )));
        }
        for (index, (&d, f)) in raw.shape.iter().zip(&raw.factors).enumerate() {
            if !is_factorization_of(d as u64, f) {
                return Err(GestaltError::InvalidEncoding(format!(
                    "factors {f:?} do not factorize dimension {index} ({d})"
                )));
            }
        }
        let expected = render_signature(raw.category, &raw.factors);
        if raw.signature != expected {
            return Err(GestaltError::InvalidEncoding(format!(
                "signature {:?} should be {expected:?}",
                raw.signature
            )));
        }
        Ok(Self {
            shape: raw.shape,
            factors: raw.factors,
            category: raw.category,
            signature: raw.signature,
        })
    }
}

/// `factors` is ascending, all prime, and multiplies out to `n`.
#[cfg(feature = "serde")]
fn is_factorization_of(n: u64, factors: &[u64]) -> bool {
    let ascending = factors.windows(2).all(|w| w[0] <= w[1]);
    let primes = factors.iter().all(|&p| crate::math::is_prime(p));
    let product = factors
        .iter()
        .try_fold(1u64, |acc, &p| acc.checked_mul(p));
    ascending && primes && product == Some(n)
}

/// Token for one dimension given its prime factors.
pub fn dimension_token(factors: &[u64]) -> String {
    match factors {
        [] => "0".to_string(),
        [p] => format!("p{p}"),
        _ => {
            let mut s = String::from("c");
            for (i, p) in factors.iter().enumerate() {
                if i > 0 {
                    s.push('*');
                }
                s.push_str(&p.to_string());
            }
            s
        }
    }
}

/// `category + "_" + join(tokens, ":")` for a factorized shape.
fn render_signature(category: Category, factors: &[Vec<u64>]) -> String {
    let mut signature = String::from(category.as_str());
    signature.push('_');
    for (i, f) in factors.iter().enumerate() {
        if i > 0 {
            signature.push(':');
        }
        signature.push_str(&dimension_token(f));
    }
    signature
}

// ─── SignatureEncoder ────────────────────────────────────────────────────────

/// Turns shapes into [`ShapeEncoding`]s, memoizing factorizations.
pub struct SignatureEncoder {
    cache: FactorizationCache,
    rules: Vec<NamedRule>,
}

impl SignatureEncoder {
    /// Encoder with a default [`FactorizationCache`] and no grammar rules.
    pub fn new() -> Self {
        Self::with_cache(FactorizationCache::new())
    }

    /// Encoder that owns the supplied cache.
    pub fn with_cache(cache: FactorizationCache) -> Self {
        Self {
            cache,
            rules: Vec::new(),
        }
    }

    /// The underlying factorization cache.
    pub fn cache(&self) -> &FactorizationCache {
        &self.cache
    }

    /// Mutable access to the underlying factorization cache.
    pub fn cache_mut(&mut self) -> &mut FactorizationCache {
        &mut self.cache
    }

    /// Register a named category override.
    ///
    /// Fails with [`GestaltError::DuplicateRule`] if the name is taken.
    pub fn add_grammar_rule<R>(&mut self, name: &str, rule: R) -> GestaltResult<()>
    where
        R: GrammarRule + 'static,
    {
        if self.rules.iter().any(|r| r.name == name) {
            return Err(GestaltError::DuplicateRule(name.to_string()));
        }
        self.rules.push(NamedRule {
            name: name.to_string(),
            rule: Box::new(rule),
        });
        Ok(())
    }

    /// Remove a grammar rule by name. Returns `true` if it existed.
    pub fn remove_grammar_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.name != name);
        self.rules.len() != before
    }

    /// Names of registered grammar rules, in consultation order.
    pub fn grammar_rules(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    /// Category for `shape`: first claiming rule, else rank-based.
    pub fn categorize(&self, shape: &[usize]) -> Category {
        self.rules
            .iter()
            .find_map(|r| r.rule.classify(shape))
            .unwrap_or_else(|| Category::from_rank(shape.len()))
    }

    /// Encode `shape`, returning `None` for an empty shape or a zero dimension.
    pub fn encode(&mut self, shape: &[usize]) -> Option<ShapeEncoding> {
        match self.try_encode(shape) {
            Ok(enc) => Some(enc),
            Err(e) => {
                warn!(?shape, error = %e, "rejected shape");
                None
            }
        }
    }

    /// Strict variant of [`Self::encode`].
    pub fn try_encode(&mut self, shape: &[usize]) -> GestaltResult<ShapeEncoding> {
        validate_shape(shape)?;

        let factors: Vec<Vec<u64>> = shape
            .iter()
            .map(|&d| self.cache.factorize(d as u64))
            .collect();
        let category = self.categorize(shape);

        let signature = render_signature(category, &factors);

        Ok(ShapeEncoding {
            shape: shape.to_vec(),
            factors,
            category,
            signature,
        })
    }

    /// Encode a shape that arrived as signed integers (e.g. from Python).
    pub fn try_encode_signed(&mut self, shape: &[i64]) -> GestaltResult<ShapeEncoding> {
        let mut dims = Vec::with_capacity(shape.len());
        for (index, &value) in shape.iter().enumerate() {
            let d = usize::try_from(value)
                .map_err(|_| GestaltError::NegativeDimension { index, value })?;
            dims.push(d);
        }
        self.try_encode(&dims)
    }
}

impl Default for SignatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignatureEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureEncoder")
            .field("cache", &self.cache.stats())
            .field("rules", &self.rules.iter().map(|r| &r.name).collect::<Vec<_>>())
            .finish()
    }
}

fn validate_shape(shape: &[usize]) -> GestaltResult<()> {
    if shape.is_empty() {
        return Err(GestaltError::EmptyShape);
    }
    if let Some(index) = shape.iter().position(|&d| d == 0) {
        return Err(GestaltError::ZeroDimension { index });
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
