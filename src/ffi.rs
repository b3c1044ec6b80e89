//! Python FFI bindings via PyO3.
//!
//! Exposes one engine class keyed by string node ids. Integers arrive from
//! Python as signed values: negative inputs take the lenient path (empty
//! factor list, `None` encoding) instead of raising.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from gestalt_core import GestaltEngine
//!
//! engine = GestaltEngine()
//! print(engine.factorize(9240))            # [2, 2, 2, 3, 5, 7, 11]
//!
//! for node_id, shape in [("q", [64, 64]), ("k", [64, 64]), ("bias", [64])]:
//!     engine.register_shape(node_id, shape, activity=1.0)
//!
//! for cluster in engine.get_clusters():
//!     print(cluster.members, cluster.center, cluster.coherence)
//!
//! field = engine.synthesize_field({"q": 0.9, "k": 0.4})
//! print(field.total_energy, field.coherence, field.entropy)
//! ```

use std::collections::HashMap;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use tracing::warn;

use crate::cluster::Cluster;
use crate::config::{EngineConfig, GraphConfig};
use crate::engine::GestaltEngine;
use crate::error::GestaltError;
use crate::gestalt::GestaltField;
use crate::signature::{Category, GrammarRule, ShapeEncoding};

fn to_py_err(e: GestaltError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_category(name: &str) -> Option<Category> {
    match name {
        "scalar" => Some(Category::Scalar),
        "vector" => Some(Category::Vector),
        "matrix" => Some(Category::Matrix),
        "tensor" => Some(Category::Tensor),
        _ => None,
    }
}

// ── Grammar rules backed by Python callables ─────────────────────────────────

/// Calls `rule(shape) -> str | None` under the GIL.
///
/// A raised exception or an unknown category name declines the shape.
struct PyGrammarRule {
    name: String,
    callable: Py<PyAny>,
}

impl GrammarRule for PyGrammarRule {
    fn classify(&self, shape: &[usize]) -> Option<Category> {
        Python::with_gil(|py| {
            let result = match self.callable.call1(py, (shape.to_vec(),)) {
                Ok(result) => result,
                Err(e) => {
                    warn!(rule = %self.name, error = %e, "grammar rule raised");
                    return None;
                }
            };
            let label: Option<String> = result.extract(py).ok()?;
            let label = label?;
            let category = parse_category(&label);
            if category.is_none() {
                warn!(rule = %self.name, %label, "grammar rule returned unknown category");
            }
            category
        })
    }
}

// ── ShapeEncoding ─────────────────────────────────────────────────────────────

/// Immutable fingerprint of a tensor shape.
#[pyclass(name = "ShapeEncoding", frozen)]
#[derive(Clone)]
pub struct PyShapeEncoding {
    inner: ShapeEncoding,
}

#[pymethods]
impl PyShapeEncoding {
    /// Dimension sizes.
    #[getter]
    pub fn shape(&self) -> Vec<usize> {
        self.inner.shape().to_vec()
    }

    /// Prime factors per dimension.
    #[getter]
    pub fn factors(&self) -> Vec<Vec<u64>> {
        self.inner.factors().to_vec()
    }

    /// "scalar", "vector", "matrix" or "tensor".
    #[getter]
    pub fn category(&self) -> &'static str {
        self.inner.category().as_str()
    }

    /// Full signature string, e.g. "matrix_p2:p3".
    #[getter]
    pub fn signature(&self) -> String {
        self.inner.signature().to_string()
    }

    /// Number of dimensions.
    #[getter]
    pub fn rank(&self) -> usize {
        self.inner.rank()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!("ShapeEncoding({:?}, {:?})", self.inner.shape(), self.inner.signature())
    }

    /// Python equality comparison.
    pub fn __eq__(&self, other: &PyShapeEncoding) -> bool {
        self.inner == other.inner
    }
}

// ── Cluster ───────────────────────────────────────────────────────────────────

/// One connected component of strongly similar nodes.
#[pyclass(name = "Cluster", frozen)]
pub struct PyCluster {
    /// Member ids in insertion order.
    #[pyo3(get)]
    pub members: Vec<String>,
    /// Member with the highest total edge strength.
    #[pyo3(get)]
    pub center: String,
    /// Mean pairwise similarity.
    #[pyo3(get)]
    pub coherence: f64,
    /// Most frequent category name.
    #[pyo3(get)]
    pub dominant_category: &'static str,
}

impl From<Cluster<String>> for PyCluster {
    fn from(c: Cluster<String>) -> Self {
        Self {
            members: c.members,
            center: c.center,
            coherence: c.coherence,
            dominant_category: c.dominant_category.as_str(),
        }
    }
}

#[pymethods]
impl PyCluster {
    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "Cluster(size={}, center={:?}, coherence={:.3}, category={})",
            self.members.len(),
            self.center,
            self.coherence,
            self.dominant_category
        )
    }

    /// Number of members.
    pub fn __len__(&self) -> usize {
        self.members.len()
    }
}

// ── GestaltField ──────────────────────────────────────────────────────────────

/// Aggregate energy, coherence and entropy over a set of nodes.
#[pyclass(name = "GestaltField", frozen)]
pub struct PyGestaltField {
    /// `(node_id, shape, activity)` per encoded node.
    #[pyo3(get)]
    pub components: Vec<(String, Vec<usize>, f64)>,
    /// Activity-weighted complexity sum.
    #[pyo3(get)]
    pub total_energy: f64,
    /// exp(-variance) of activities.
    #[pyo3(get)]
    pub coherence: f64,
    /// Normalized signature entropy in [0, 1].
    #[pyo3(get)]
    pub entropy: f64,
    /// Signature entropy in nats.
    #[pyo3(get)]
    pub raw_entropy: f64,
}

impl From<GestaltField<String>> for PyGestaltField {
    fn from(f: GestaltField<String>) -> Self {
        Self {
            components: f
                .components
                .into_iter()
                .map(|c| (c.id, c.shape, c.activity))
                .collect(),
            total_energy: f.total_energy,
            coherence: f.coherence,
            entropy: f.entropy.normalized,
            raw_entropy: f.entropy.raw,
        }
    }
}

#[pymethods]
impl PyGestaltField {
    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "GestaltField(components={}, total_energy={:.3}, coherence={:.3}, entropy={:.3})",
            self.components.len(),
            self.total_energy,
            self.coherence,
            self.entropy
        )
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Signature engine: factorization cache, similarity graph, clustering.
///
/// Example::
///
///     engine = GestaltEngine(edge_threshold=0.3, cluster_threshold=0.7)
///     enc = engine.encode_shape([3, 224, 224], "conv_in")
///     print(enc.signature)   # tensor_p3:c2*2*2*2*2*7:c2*2*2*2*2*7
#[pyclass(name = "GestaltEngine")]
pub struct PyEngine {
    inner: GestaltEngine<String>,
}

#[pymethods]
impl PyEngine {
    /// Create an engine.
    ///
    /// Args:
    ///     cache_capacity:    max dynamically cached factorizations (default 1000)
    ///     edge_threshold:    min similarity for an edge (default 0.3)
    ///     cluster_threshold: min edge strength inside a cluster (default 0.7)
    #[new]
    #[pyo3(signature = (cache_capacity=1000, edge_threshold=0.3, cluster_threshold=0.7))]
    pub fn new(cache_capacity: usize, edge_threshold: f64, cluster_threshold: f64) -> PyResult<Self> {
        let mut config = EngineConfig {
            graph: GraphConfig {
                edge_threshold,
                cluster_threshold,
                ..GraphConfig::default()
            },
            ..EngineConfig::default()
        };
        config.cache.capacity = cache_capacity;
        let inner = GestaltEngine::try_new(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Prime factors of `n`, ascending. Empty for n <= 1 or negative n.
    pub fn factorize(&mut self, n: i64) -> Vec<u64> {
        self.inner.factorize_signed(n)
    }

    /// Factorize each value, preserving order.
    pub fn batch_factorize(&mut self, values: Vec<i64>) -> Vec<Vec<u64>> {
        self.inner.batch_factorize_signed(&values)
    }

    /// Encode a shape. Returns None for an empty shape or a zero/negative dimension.
    pub fn encode_shape(&mut self, shape: Vec<i64>, node_id: String) -> Option<PyShapeEncoding> {
        let dims = non_negative_dims(&shape, &node_id)?;
        self.inner
            .encode_shape(&dims, &node_id)
            .map(|inner| PyShapeEncoding { inner })
    }

    /// Similarity of two encodings in [0, 1].
    pub fn similarity(&self, a: &PyShapeEncoding, b: &PyShapeEncoding) -> f64 {
        self.inner.similarity(&a.inner, &b.inner)
    }

    /// Register a classifier `rule(shape: list[int]) -> str | None`.
    ///
    /// Raises ValueError if a rule with this name exists.
    pub fn add_grammar_rule(&mut self, name: String, rule: Py<PyAny>) -> PyResult<()> {
        let wrapped = PyGrammarRule {
            name: name.clone(),
            callable: rule,
        };
        self.inner
            .add_grammar_rule(&name, wrapped)
            .map_err(to_py_err)
    }

    /// Insert or re-encode a node.
    #[pyo3(signature = (node_id, encoding, activity=1.0))]
    pub fn upsert_node(&mut self, node_id: String, encoding: &PyShapeEncoding, activity: f64) {
        self.inner
            .upsert_node(node_id, encoding.inner.clone(), activity);
    }

    /// Encode and upsert in one step. Returns False if the shape is invalid.
    #[pyo3(signature = (node_id, shape, activity=1.0))]
    pub fn register_shape(&mut self, node_id: String, shape: Vec<i64>, activity: f64) -> bool {
        let Some(dims) = non_negative_dims(&shape, &node_id) else {
            return false;
        };
        self.inner.register_shape(node_id, &dims, activity).is_some()
    }

    /// Remove a node. Returns True if it existed.
    pub fn remove_node(&mut self, node_id: String) -> bool {
        self.inner.remove_node(&node_id).is_some()
    }

    /// Connected clusters of strongly similar nodes.
    pub fn get_clusters(&self) -> Vec<PyCluster> {
        self.inner
            .get_clusters()
            .into_iter()
            .map(PyCluster::from)
            .collect()
    }

    /// Field over the registered nodes named in `activity_map`.
    pub fn synthesize_field(&self, activity_map: HashMap<String, f64>) -> Option<PyGestaltField> {
        self.inner
            .synthesize_field(activity_map)
            .map(PyGestaltField::from)
    }

    /// Cache counters: size, capacity, hits, static_hits, misses.
    pub fn cache_stats(&self) -> HashMap<&'static str, u64> {
        let s = self.inner.cache_stats();
        HashMap::from([
            ("size", s.size as u64),
            ("capacity", s.capacity as u64),
            ("hits", s.hits),
            ("static_hits", s.static_hits),
            ("misses", s.misses),
        ])
    }

    /// Empty the dynamic factorization cache.
    pub fn clear_cache(&mut self) {
        self.inner.clear_cache();
    }

    /// Number of registered nodes.
    pub fn __len__(&self) -> usize {
        self.inner.graph().node_count()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "GestaltEngine(nodes={}, edges={})",
            self.inner.graph().node_count(),
            self.inner.graph().edge_count()
        )
    }
}

fn non_negative_dims(shape: &[i64], node_id: &str) -> Option<Vec<usize>> {
    let mut dims = Vec::with_capacity(shape.len());
    for (index, &value) in shape.iter().enumerate() {
        match usize::try_from(value) {
            Ok(d) => dims.push(d),
            Err(_) => {
                let e = GestaltError::NegativeDimension { index, value };
                warn!(node = node_id, ?shape, error = %e, "rejected shape");
                return None;
            }
        }
    }
    Some(dims)
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Cognitive signatures for tensor shapes.
#[pymodule]
pub fn gestalt_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyEngine>()?;
    m.add_class::<PyShapeEncoding>()?;
    m.add_class::<PyCluster>()?;
    m.add_class::<PyGestaltField>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
