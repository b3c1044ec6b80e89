//! # gestalt-core
//!
//! Cognitive signatures for tensor shapes: turn integer dimensions into
//! comparable symbolic fingerprints, score how alike two fingerprints are,
//! and keep an incrementally updated similarity graph that can be clustered
//! and summarised at any time.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! shape ─▶ FactorizationCache ─▶ SignatureEncoder ─▶ ShapeEncoding
//!                                                        │
//!                                       similarity ◀─────┤
//!                                                        ▼
//!                                              SimilarityGraph
//!                                                ├─▶ compute_clusters ─▶ Cluster
//!                                                └─▶ synthesize ─▶ GestaltField
//! ```
//!
//! A shape `[3, 224, 224]` factorizes per dimension into `[3]`,
//! `[2, 2, 2, 2, 2, 7]`, `[2, 2, 2, 2, 2, 7]` and encodes as
//! `tensor_p3:c2*2*2*2*2*7:c2*2*2*2*2*7`. Two identical shapes always score
//! exactly 1.0; a vector and a matrix share nothing.
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`factor`] | [`FactorizationCache`], [`LargeStrategy`] | Memoized prime factorization with static table and Pollard's rho |
//! | [`signature`] | [`SignatureEncoder`], [`ShapeEncoding`], [`Category`] | Shape → category + deterministic signature; grammar-rule overrides |
//! | [`similarity`] | [`SimilarityMetric`] | Weighted category/shape/prime/identity score in [0, 1] |
//! | [`graph`] | [`SimilarityGraph`], [`GraphNode`] | Incremental node arena with thresholded, canonical edges |
//! | [`cluster`] | [`Cluster`] | Connected components over strong edges, with center and coherence |
//! | [`gestalt`] | [`GestaltField`] | Field energy, activity coherence, signature entropy |
//! | [`engine`] | [`GestaltEngine`] | One-stop facade owning an encoder and a graph |
//! | `sync` | `SharedEngine` | `Arc<RwLock<_>>` handle (requires `std`) |
//! | [`config`] | [`EngineConfig`] | Validated parameters with documented defaults |
//! | [`error`] | [`GestaltError`] | Error taxonomy for the strict entry points |
//!
//! ## Quick start
//!
//! ```
//! use gestalt_core::GestaltEngine;
//!
//! let mut engine: GestaltEngine<&str> = GestaltEngine::new();
//! engine.register_shape("q_proj", &[64, 64], 1.0);
//! engine.register_shape("k_proj", &[64, 64], 0.5);
//! engine.register_shape("bias", &[64], 0.1);
//!
//! let clusters = engine.get_clusters();
//! assert_eq!(clusters.len(), 2);
//! assert_eq!(clusters[0].members, ["q_proj", "k_proj"]);
//!
//! let field = engine.synthesize_registered().unwrap();
//! assert!(field.coherence < 1.0);
//! ```
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` + `alloc` by default. Enable the `std` feature
//! for `SharedEngine` and the platform `ln`/`exp`. Enable the `serde`
//! feature for serialisable configs, encodings, clusters and fields. Enable
//! `python-ffi` to build the PyO3 extension module.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.
//! Cache hits and misses and individual edges log at `trace`, structural
//! changes at `debug`, and rejected input at `warn`.
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![cfg_attr(not(any(feature = "std", feature = "python-ffi", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

#[cfg(any(feature = "std", feature = "python-ffi"))]
extern crate std;

pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod factor;
pub mod gestalt;
pub mod graph;
mod math;
pub mod signature;
pub mod similarity;

#[cfg(feature = "std")]
pub mod sync;

#[cfg(feature = "python-ffi")]
pub mod ffi;

// ─── Re-exports ──────────────────────────────────────────────────────────────

pub use cluster::{compute_clusters, Cluster};
pub use config::{CacheConfig, EngineConfig, GraphConfig};
pub use engine::GestaltEngine;
pub use error::{GestaltError, GestaltResult};
pub use factor::{CacheStats, FactorizationCache, LargeStrategy, COMMON_DIMENSIONS};
pub use gestalt::{synthesize, FieldComponent, GestaltField, SignatureEntropy};
pub use graph::{GraphNode, NodeHandle, NodeId, SimilarityGraph};
pub use signature::{Category, GrammarRule, ShapeEncoding, SignatureEncoder};
pub use similarity::{similarity, SimilarityMetric};

#[cfg(feature = "std")]
pub use sync::SharedEngine;
