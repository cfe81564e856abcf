//! The in-memory result document.
//!
//! One record type carries everything a pipeline run produces; the two
//! renderings (`clojure`, `dynamo`) are serializer passes over it rather
//! than recursive key-renaming utilities. In-memory numbers are native
//! floats; decimal encoding happens only at the persistence rendering.

use std::collections::BTreeMap;

use cm_core::{ParticipantId, StatementId};

/// PCA block: center, components as rows, and per-statement extremity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PcaDoc {
    pub center: Vec<f64>,
    pub comps: Vec<Vec<f64>>,
    pub comment_extremity: Vec<f64>,
}

/// One opinion group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterDoc {
    pub id: usize,
    pub center: Vec<f64>,
    pub members: Vec<ParticipantId>,
}

/// Agree/disagree/observed counts for one statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteCountsDoc {
    pub agree: u64,
    pub disagree: u64,
    pub total: u64,
}

/// Per-group tallies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupVotesDoc {
    pub member_count: usize,
    pub votes: BTreeMap<StatementId, VoteCountsDoc>,
}

/// One (group, statement) representativeness record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RepnessDoc {
    pub gid: usize,
    pub tid: StatementId,
    pub n_agree: u64,
    pub n_disagree: u64,
    pub n_total: u64,
    pub n_success: u64,
    pub n_trials: u64,
    pub p_success: f64,
    pub p_test: f64,
    pub repness: f64,
    pub repness_test: f64,
    pub p_value: f64,
    /// "agree" or "disagree".
    pub repful_for: String,
}

/// A statement the whole conversation leans on significantly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConsensusEntryDoc {
    pub tid: StatementId,
    pub n_success: u64,
    pub n_trials: u64,
    pub p_success: f64,
    pub p_test: f64,
}

/// Aggregate stats per statement backing the consensus lists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommentStatsDoc {
    pub n_agree: u64,
    pub n_disagree: u64,
    pub n_total: u64,
    pub p_agree: f64,
    pub p_disagree: f64,
    pub z_agree: f64,
    pub z_disagree: f64,
}

/// Conversation-level consensus block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConsensusDoc {
    pub agree: Vec<ConsensusEntryDoc>,
    pub disagree: Vec<ConsensusEntryDoc>,
    pub comment_stats: BTreeMap<StatementId, CommentStatsDoc>,
}

/// Vote-count stats for one entity (statement or participant).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityStatsDoc {
    pub n_votes: u64,
    pub n_agree: u64,
    pub n_disagree: u64,
    pub agree_ratio: f64,
}

/// Aggregate and per-entity vote counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoteStatsDoc {
    pub n_votes: u64,
    pub n_agree: u64,
    pub n_disagree: u64,
    pub n_pass: u64,
    pub comment_stats: BTreeMap<StatementId, EntityStatsDoc>,
    pub participant_stats: BTreeMap<ParticipantId, EntityStatsDoc>,
}

/// Per-participant info for the reporting tier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticipantInfoDoc {
    pub n_agree: u64,
    pub n_disagree: u64,
    pub n_pass: u64,
    pub n_votes: u64,
    pub group: Option<usize>,
    pub group_correlations: BTreeMap<usize, f64>,
}

/// The complete result document of one pipeline run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MathUpdate {
    pub zid: String,
    pub last_vote_timestamp: i64,
    pub last_mod_timestamp: i64,
    pub participant_count: usize,
    pub comment_count: usize,
    /// Statement ids in rating-matrix column order.
    pub tids: Vec<StatementId>,
    pub user_vote_counts: BTreeMap<ParticipantId, u64>,
    /// Participants meeting the in-conversation vote threshold.
    pub in_conv: Vec<ParticipantId>,
    pub mod_in: Vec<StatementId>,
    pub mod_out: Vec<StatementId>,
    pub meta_tids: Vec<StatementId>,
    pub mod_out_ptpts: Vec<ParticipantId>,
    pub pca: PcaDoc,
    pub proj: BTreeMap<ParticipantId, Vec<f64>>,
    pub base_clusters: Vec<ClusterDoc>,
    pub group_clusters: Vec<ClusterDoc>,
    pub comment_repness: Vec<RepnessDoc>,
    pub votes_base: BTreeMap<StatementId, VoteCountsDoc>,
    pub group_votes: BTreeMap<usize, GroupVotesDoc>,
    pub group_aware_consensus: BTreeMap<StatementId, f64>,
    pub consensus: ConsensusDoc,
    pub comment_priorities: BTreeMap<StatementId, i64>,
    pub participant_info: BTreeMap<ParticipantId, ParticipantInfoDoc>,
    pub vote_stats: VoteStatsDoc,
    pub math_tick: i64,
}
