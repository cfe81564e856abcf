// crates/cm_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Pure numeric transformations over the vote matrix.
//!
//! Every function in this crate reads a matrix (or derived state) and returns
//! new derived state; nothing here mutates conversation state or performs
//! I/O. Determinism: all randomized procedures (k-means init, bootstrap,
//! sampled PCA) draw from an explicitly seeded `cm_core::EngineRng`.

use thiserror::Error;

pub mod clusters;
pub mod consensus;
pub mod pca;
pub mod repness;
pub mod stats;

pub use clusters::{cluster_projections, Cluster};
pub use consensus::{
    comment_priorities, group_aware_consensus, group_votes, votes_base, GroupVoteCounts,
    GroupVotes,
};
pub use pca::{PcaFit, DEFAULT_COMPONENTS};
pub use repness::{
    conversation_repness, participant_stats, CommentStats, ConsensusResult, ConsensusStatement,
    ParticipantInfo, RepfulFor, RepnessEntry, RepnessResult,
};

/// Numeric-stage failures. These degrade gracefully at the pipeline layer;
/// they are never fatal on their own.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AlgoError {
    /// An iterative procedure produced an unusable state (e.g. every k-means
    /// candidate collapsed).
    #[error("numeric failure in {stage}: {detail}")]
    NumericFailure {
        stage: &'static str,
        detail: String,
    },
}
