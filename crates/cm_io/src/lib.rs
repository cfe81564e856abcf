//! cm_io — delta parsing and result-document rendering.
//!
//! The engine is a library with no wire protocol of its own; this crate owns
//! its two boundaries:
//!
//! - **Input**: vote deltas (`{votes: [...], lastVoteTimestamp}`) and
//!   moderation deltas, deserialized leniently — malformed records are
//!   surfaced to the orchestrator for counting, never raised.
//! - **Output**: the `MathUpdate` record with two renderings of identical
//!   semantics: lowercase-hyphenated keys with integer-coerced ids
//!   ("Clojure-style"), and snake_case keys with decimal-encoded floats for
//!   the wide-column persistence path.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod clojure;
pub mod delta;
pub mod document;
pub mod dynamo;

pub use clojure::{parse_clojure_document, render_clojure};
pub use delta::{ModerationDelta, VoteDelta, VoteRecord, VoteToken};
pub use document::{
    ClusterDoc, CommentStatsDoc, ConsensusDoc, ConsensusEntryDoc, EntityStatsDoc, GroupVotesDoc,
    MathUpdate, ParticipantInfoDoc, PcaDoc, RepnessDoc, VoteCountsDoc, VoteStatsDoc,
};
pub use dynamo::render_dynamo;

/// Unified error for cm_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// JSON serialization/deserialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A document field had an unexpected shape.
    #[error("document error at {field}: {msg}")]
    Document { field: &'static str, msg: String },
}

pub type IoResult<T> = Result<T, IoError>;

impl IoError {
    pub(crate) fn document(field: &'static str, msg: impl Into<String>) -> Self {
        IoError::Document {
            field,
            msg: msg.into(),
        }
    }
}
