//! Error taxonomy for the signature engine.
//!
//! Most entry points are lenient: invalid shapes and negative integers yield
//! `None` or an empty result. The strict variants (`try_encode`,
//! `try_factorize_signed`, `insert_node`) report the same conditions as a
//! [`GestaltError`]. A full factorization cache is never an error.

use alloc::string::String;

use thiserror::Error;

/// Root error type for all engine failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GestaltError {
    /// A shape with no dimensions was passed to a strict encoder.
    #[error("invalid shape: shape must have at least one dimension")]
    EmptyShape,

    /// A dimension of size zero was passed to a strict encoder.
    #[error("invalid shape: dimension {index} is zero")]
    ZeroDimension {
        /// Position of the offending dimension.
        index: usize,
    },

    /// A negative dimension arrived through a foreign boundary.
    #[error("invalid shape: dimension {index} is negative ({value})")]
    NegativeDimension {
        /// Position of the offending dimension.
        index: usize,
        /// The value as received.
        value: i64,
    },

    /// A negative integer was passed to strict factorization.
    #[error("invalid input: cannot factorize negative integer {0}")]
    NegativeInput(i64),

    /// `insert_node` was called with an id that is already registered.
    #[error("node {0} is already registered")]
    DuplicateNode(String),

    /// The node id is not registered in the graph.
    #[error("node {0} is not registered")]
    NodeNotFound(String),

    /// A grammar rule with this name already exists.
    #[error("grammar rule {0:?} is already registered")]
    DuplicateRule(String),

    /// A serialized encoding disagrees with its own shape.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Configuration failed validation.
    #[error("config error: {0}")]
    Config(String),

    /// Internal bookkeeping disagrees with itself.
    #[error("corrupt internal state: {0}")]
    CorruptState(String),
}

/// Convenience alias used throughout the crate.
pub type GestaltResult<T> = Result<T, GestaltError>;
