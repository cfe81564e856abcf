//! cm_core — Core types, vote alphabet, named vote matrix, deterministic RNG.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`cm_algo`, `cm_io`, `cm_pipeline`).
//!
//! - Identifier newtypes: `ParticipantId`, `StatementId`
//! - Vote alphabet: AGREE / DISAGREE / PASS, plus the missing/invalid coercion
//! - `NamedMatrix`: participants × statements vote store with name-indexed
//!   access, batch upserts, and subset views
//! - Seedable RNG (ChaCha20) for clustering init and sampled PCA fits
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod ids;
pub mod matrix;
pub mod rng;
pub mod vote;

pub use ids::{ParticipantId, StatementId};
pub use matrix::NamedMatrix;
pub use rng::EngineRng;
pub use vote::{CoercedVote, Vote};

use thiserror::Error;

/// Minimal error set for core-domain validation.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CoreError {
    /// A row or column name was registered twice. Fatal per the engine's
    /// invariant policy; callers should abort rather than degrade.
    #[error("duplicate name in matrix registry: {0}")]
    DuplicateName(String),
    /// Shape mismatch when constructing a matrix from parts.
    #[error("matrix shape mismatch: data is {rows}x{cols}, registries are {name_rows}x{name_cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        name_rows: usize,
        name_cols: usize,
    },
}
