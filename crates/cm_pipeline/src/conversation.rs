//! Conversation state and the math pipeline driver.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use cm_algo::clusters::{cluster_projections, Cluster};
use cm_algo::consensus::{
    comment_priorities, group_aware_consensus, group_votes, votes_base, GroupVoteCounts,
    GroupVotes,
};
use cm_algo::pca::{self, PcaFit, DEFAULT_COMPONENTS};
use cm_algo::repness::{
    conversation_repness, participant_stats, ParticipantInfo, RepfulFor, RepnessEntry,
    RepnessResult,
};
use cm_algo::stats::z_sig_90;
use cm_algo::AlgoError;
use cm_core::{CoercedVote, EngineRng, NamedMatrix, ParticipantId, StatementId, Vote};
use cm_io::{
    render_clojure, render_dynamo, ClusterDoc, CommentStatsDoc, ConsensusDoc, ConsensusEntryDoc,
    EntityStatsDoc, GroupVotesDoc, MathUpdate, ModerationDelta, ParticipantInfoDoc, PcaDoc,
    RepnessDoc, VoteCountsDoc, VoteDelta, VoteStatsDoc,
};
use ndarray::Array2;
use serde_json::Value;
use tracing::{info, warn};

/// Conversations larger than this are fit on a uniform sample of this size
/// and every participant is projected against the sampled fit.
pub const SMALL_CONVERSATION_THRESHOLD: usize = 1000;
/// A participant is "in conversation" once they voted on at least
/// `min(IN_CONV_VOTE_FLOOR, comment_count)` statements.
pub const IN_CONV_VOTE_FLOOR: u64 = 7;

// Fixed seeds for the engine's RNG streams. Determinism of a recompute
// depends only on these and the rating matrix.
const PCA_SEED: u64 = 11;
const SAMPLE_SEED: u64 = 13;
const CLUSTER_SEED: u64 = 42;

/// Counters from one `update_votes` call. Malformed records are counted and
/// skipped, never raised.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VoteIngestStats {
    pub accepted: usize,
    pub invalid: usize,
    pub missing: usize,
}

/// Compact view of a conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub last_updated: i64,
    pub participant_count: usize,
    pub comment_count: usize,
    pub vote_count: u64,
    pub group_count: usize,
}

/// All state for one conversation. Mutating calls are expected to be
/// serialized by the caller; the engine takes no locks.
#[derive(Clone, Debug)]
pub struct Conversation {
    conversation_id: String,
    last_updated: i64,

    raw_matrix: NamedMatrix,
    rating_matrix: NamedMatrix,
    participant_count: usize,
    comment_count: usize,

    excluded_statements: BTreeSet<StatementId>,
    featured_statements: BTreeSet<StatementId>,
    meta_statements: BTreeSet<StatementId>,
    excluded_participants: BTreeSet<ParticipantId>,

    pca: PcaFit,
    proj: BTreeMap<ParticipantId, Vec<f64>>,
    base_clusters: Vec<Cluster>,
    group_clusters: Vec<Cluster>,
    repness: RepnessResult,
    participant_info: BTreeMap<ParticipantId, ParticipantInfo>,
    vote_stats: VoteStatsDoc,
    group_votes: BTreeMap<usize, GroupVotes>,
    group_aware_consensus: BTreeMap<StatementId, f64>,
    comment_priorities: BTreeMap<StatementId, i64>,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Version tag attached to each rendered document; downstream uses it only
/// as a range key alongside the conversation id.
fn math_tick_now() -> i64 {
    let secs = now_millis() / 1000;
    25_000 + (secs % 10_000)
}

/// Fail-soft stage runner: on a numeric failure the stage logs and yields
/// its empty-input fallback so later stages still see the canonical shape.
fn run_stage<T>(name: &'static str, fallback: T, f: impl FnOnce() -> Result<T, AlgoError>) -> T {
    match f() {
        Ok(v) => v,
        Err(e) => {
            warn!(stage = name, error = %e, "stage degraded to empty state");
            fallback
        }
    }
}

impl Conversation {
    /// Create an empty conversation stamped with the current time.
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self::with_last_updated(conversation_id, now_millis())
    }

    /// Create an empty conversation with an explicit timestamp
    /// (millisecond epoch).
    pub fn with_last_updated(conversation_id: impl Into<String>, last_updated: i64) -> Self {
        Conversation {
            conversation_id: conversation_id.into(),
            last_updated,
            raw_matrix: NamedMatrix::new(),
            rating_matrix: NamedMatrix::new(),
            participant_count: 0,
            comment_count: 0,
            excluded_statements: BTreeSet::new(),
            featured_statements: BTreeSet::new(),
            meta_statements: BTreeSet::new(),
            excluded_participants: BTreeSet::new(),
            pca: PcaFit::degenerate(ndarray::Array1::zeros(0), DEFAULT_COMPONENTS),
            proj: BTreeMap::new(),
            base_clusters: Vec::new(),
            group_clusters: Vec::new(),
            repness: RepnessResult::default(),
            participant_info: BTreeMap::new(),
            vote_stats: VoteStatsDoc::default(),
            group_votes: BTreeMap::new(),
            group_aware_consensus: BTreeMap::new(),
            comment_priorities: BTreeMap::new(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn last_updated(&self) -> i64 {
        self.last_updated
    }

    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    pub fn comment_count(&self) -> usize {
        self.comment_count
    }

    pub fn raw_matrix(&self) -> &NamedMatrix {
        &self.raw_matrix
    }

    pub fn rating_matrix(&self) -> &NamedMatrix {
        &self.rating_matrix
    }

    pub fn pca(&self) -> &PcaFit {
        &self.pca
    }

    pub fn projection(&self) -> &BTreeMap<ParticipantId, Vec<f64>> {
        &self.proj
    }

    pub fn group_clusters(&self) -> &[Cluster] {
        &self.group_clusters
    }

    pub fn repness(&self) -> &RepnessResult {
        &self.repness
    }

    pub fn participant_info(&self) -> &BTreeMap<ParticipantId, ParticipantInfo> {
        &self.participant_info
    }

    pub fn vote_stats(&self) -> &VoteStatsDoc {
        &self.vote_stats
    }

    pub fn group_aware_consensus(&self) -> &BTreeMap<StatementId, f64> {
        &self.group_aware_consensus
    }

    pub fn comment_priorities(&self) -> &BTreeMap<StatementId, i64> {
        &self.comment_priorities
    }

    pub fn excluded_statements(&self) -> &BTreeSet<StatementId> {
        &self.excluded_statements
    }

    pub fn excluded_participants(&self) -> &BTreeSet<ParticipantId> {
        &self.excluded_participants
    }

    /// Apply a vote delta. Records with a missing id or an unknown vote
    /// token are counted and skipped; accepted triples are upserted in one
    /// batch. Runs the full pipeline when `recompute` is set.
    pub fn update_votes(&mut self, delta: &VoteDelta, recompute: bool) -> VoteIngestStats {
        let mut stats = VoteIngestStats::default();
        let mut triples: Vec<(ParticipantId, StatementId, Vote)> = Vec::new();
        for record in &delta.votes {
            let (Some(pid), Some(tid)) = (record.participant(), record.statement()) else {
                stats.invalid += 1;
                continue;
            };
            let coerced = record
                .vote
                .as_ref()
                .map(|v| v.coerce())
                .unwrap_or(CoercedVote::Missing);
            match coerced {
                CoercedVote::Vote(vote) => {
                    triples.push((pid, tid, vote));
                    stats.accepted += 1;
                }
                CoercedVote::Missing => stats.missing += 1,
                CoercedVote::Invalid => stats.invalid += 1,
            }
        }
        info!(
            conversation = %self.conversation_id,
            accepted = stats.accepted,
            invalid = stats.invalid,
            missing = stats.missing,
            "vote delta processed"
        );

        if !triples.is_empty() {
            self.raw_matrix.batch_update(&triples);
        }
        if let Some(ts) = delta.last_vote_timestamp {
            self.last_updated = self.last_updated.max(ts);
        }
        self.participant_count = self.raw_matrix.nrows();
        self.comment_count = self.raw_matrix.ncols();
        self.apply_moderation();
        self.compute_vote_stats();
        if recompute {
            self.recompute();
        }
        stats
    }

    /// Apply a moderation delta. A field present in the delta replaces the
    /// corresponding set (present-but-empty clears it); absent fields are
    /// untouched.
    pub fn update_moderation(&mut self, delta: &ModerationDelta, recompute: bool) {
        if let Some(tids) = ModerationDelta::statements(&delta.mod_out_tids) {
            self.excluded_statements = tids.into_iter().collect();
        }
        if let Some(tids) = ModerationDelta::statements(&delta.mod_in_tids) {
            self.featured_statements = tids.into_iter().collect();
        }
        if let Some(tids) = ModerationDelta::statements(&delta.meta_tids) {
            self.meta_statements = tids.into_iter().collect();
        }
        if let Some(pids) = ModerationDelta::participants(&delta.mod_out_ptpts) {
            self.excluded_participants = pids.into_iter().collect();
        }
        self.apply_moderation();
        self.compute_vote_stats();
        if recompute {
            self.recompute();
        }
    }

    /// Re-derive the rating matrix from the raw matrix and the moderation
    /// sets.
    fn apply_moderation(&mut self) {
        let rows: Vec<ParticipantId> = self
            .raw_matrix
            .rownames()
            .iter()
            .filter(|p| !self.excluded_participants.contains(*p))
            .cloned()
            .collect();
        let cols: Vec<StatementId> = self
            .raw_matrix
            .colnames()
            .iter()
            .filter(|t| !self.excluded_statements.contains(*t))
            .cloned()
            .collect();
        self.rating_matrix = self.raw_matrix.rowname_subset(&rows).colname_subset(&cols);
    }

    fn compute_vote_stats(&mut self) {
        let dense = self.rating_matrix.dense();
        let (p, n) = dense.dim();
        let mut stats = VoteStatsDoc::default();
        for (j, tid) in self.rating_matrix.colnames().iter().enumerate() {
            let mut entity = EntityStatsDoc::default();
            for i in 0..p {
                let x = dense[[i, j]];
                if x.is_nan() {
                    continue;
                }
                entity.n_votes += 1;
                if x > 0.0 {
                    entity.n_agree += 1;
                } else if x < 0.0 {
                    entity.n_disagree += 1;
                }
            }
            entity.agree_ratio = entity.n_agree as f64 / (entity.n_votes.max(1)) as f64;
            stats.comment_stats.insert(tid.clone(), entity);
        }
        for (i, pid) in self.rating_matrix.rownames().iter().enumerate() {
            let mut entity = EntityStatsDoc::default();
            for j in 0..n {
                let x = dense[[i, j]];
                if x.is_nan() {
                    continue;
                }
                entity.n_votes += 1;
                if x > 0.0 {
                    entity.n_agree += 1;
                } else if x < 0.0 {
                    entity.n_disagree += 1;
                } else {
                    stats.n_pass += 1;
                }
            }
            entity.agree_ratio = entity.n_agree as f64 / (entity.n_votes.max(1)) as f64;
            stats.n_votes += entity.n_votes;
            stats.n_agree += entity.n_agree;
            stats.n_disagree += entity.n_disagree;
            stats.participant_stats.insert(pid.clone(), entity);
        }
        self.vote_stats = stats;
    }

    /// Run the full pipeline: PCA → clustering → repness → consensus &
    /// priority. Derived state is fully recomputed from the rating matrix;
    /// nothing is read-modified-written.
    pub fn recompute(&mut self) {
        let dense = self.rating_matrix.dense();
        let n_cols = dense.ncols();

        // Stage: PCA + projection (optionally fit on a sample).
        let (fit, points) = self.project_stage(&dense);
        self.pca = fit;
        self.proj = self
            .rating_matrix
            .rownames()
            .iter()
            .zip(points.iter())
            .map(|(pid, xy)| (pid.clone(), xy.clone()))
            .collect();

        // Stage: clustering over the projection.
        let ids = self.rating_matrix.rownames().to_vec();
        let flat: Vec<f64> = points.iter().flatten().copied().collect();
        let clusters = run_stage("clusters", Vec::new(), || {
            let matrix = Array2::from_shape_vec((ids.len(), DEFAULT_COMPONENTS), flat)
                .map_err(|e| AlgoError::NumericFailure {
                    stage: "clusters",
                    detail: e.to_string(),
                })?;
            cluster_projections(&ids, matrix.view(), CLUSTER_SEED)
        });
        self.base_clusters = clusters.clone();
        self.group_clusters = clusters;

        // Stage: representativeness + participant info.
        self.repness = run_stage("repness", RepnessResult::default(), || {
            Ok(conversation_repness(&self.rating_matrix, &self.group_clusters))
        });
        self.participant_info = run_stage("participant_info", BTreeMap::new(), || {
            Ok(participant_stats(&self.rating_matrix, &self.group_clusters))
        });

        // Stage: consensus & priority.
        self.group_votes = group_votes(&self.rating_matrix, &self.group_clusters);
        self.group_aware_consensus = group_aware_consensus(&self.group_votes);
        let base = votes_base(&self.rating_matrix);
        let extremity: BTreeMap<StatementId, f64> = self
            .rating_matrix
            .colnames()
            .iter()
            .enumerate()
            .map(|(j, tid)| {
                (
                    tid.clone(),
                    self.pca.comment_extremity.get(j).copied().unwrap_or(0.0),
                )
            })
            .collect();
        let meta: HashSet<StatementId> = self.meta_statements.iter().cloned().collect();
        self.comment_priorities = comment_priorities(&base, &extremity, &meta);

        info!(
            conversation = %self.conversation_id,
            participants = self.rating_matrix.nrows(),
            statements = n_cols,
            groups = self.group_clusters.len(),
            "pipeline recomputed"
        );
    }

    /// PCA fit plus one projection point per rating-matrix row. Large
    /// conversations fit on a uniform sample and project everyone against
    /// the sampled fit; the output schema is identical either way.
    fn project_stage(&self, dense: &Array2<f64>) -> (PcaFit, Vec<Vec<f64>>) {
        let p = dense.nrows();
        let fit = if p > SMALL_CONVERSATION_THRESHOLD {
            let mut sample_rng = EngineRng::from_seed_u64(SAMPLE_SEED);
            let mut rows = sample_rng.sample_indices(p, SMALL_CONVERSATION_THRESHOLD);
            rows.sort_unstable();
            let mut sampled = Array2::zeros((rows.len(), dense.ncols()));
            for (si, &ri) in rows.iter().enumerate() {
                sampled.row_mut(si).assign(&dense.row(ri));
            }
            info!(sampled = rows.len(), total = p, "sparsity-aware PCA fit");
            pca::fit(
                sampled.view(),
                DEFAULT_COMPONENTS,
                &mut EngineRng::from_seed_u64(PCA_SEED),
            )
        } else {
            pca::fit(
                dense.view(),
                DEFAULT_COMPONENTS,
                &mut EngineRng::from_seed_u64(PCA_SEED),
            )
        };
        let points = pca::project_rows(&fit, dense.view())
            .into_iter()
            .map(|p| p.to_vec())
            .collect();
        (fit, points)
    }

    fn user_vote_counts(&self) -> BTreeMap<ParticipantId, u64> {
        self.vote_stats
            .participant_stats
            .iter()
            .map(|(pid, s)| (pid.clone(), s.n_votes))
            .collect()
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            conversation_id: self.conversation_id.clone(),
            last_updated: self.last_updated,
            participant_count: self.participant_count,
            comment_count: self.comment_count,
            vote_count: self.vote_stats.n_votes,
            group_count: self.group_clusters.len(),
        }
    }

    /// Assemble the full result document. Stamped with a fresh `math_tick`.
    pub fn full_data(&self) -> MathUpdate {
        let user_vote_counts = self.user_vote_counts();
        let floor = IN_CONV_VOTE_FLOOR.min(self.comment_count as u64);
        let in_conv: Vec<ParticipantId> = self
            .rating_matrix
            .rownames()
            .iter()
            .filter(|pid| {
                user_vote_counts
                    .get(*pid)
                    .is_some_and(|&count| count >= floor)
            })
            .cloned()
            .collect();

        let cluster_doc = |c: &Cluster| ClusterDoc {
            id: c.id,
            center: c.center.clone(),
            members: c.members.clone(),
        };
        let repness_doc = |e: &RepnessEntry| RepnessDoc {
            gid: e.gid,
            tid: e.tid.clone(),
            n_agree: e.n_agree,
            n_disagree: e.n_disagree,
            n_total: e.n_total,
            n_success: e.n_success,
            n_trials: e.n_trials,
            p_success: e.p_success,
            p_test: e.p_test,
            repness: e.repness,
            repness_test: e.repness_test,
            p_value: e.p_value,
            repful_for: e.repful_for.as_str().to_string(),
        };
        let consensus_doc = |e: &cm_algo::repness::ConsensusStatement| ConsensusEntryDoc {
            tid: e.tid.clone(),
            n_success: e.n_success,
            n_trials: e.n_trials,
            p_success: e.p_success,
            p_test: e.p_test,
        };

        MathUpdate {
            zid: self.conversation_id.clone(),
            last_vote_timestamp: self.last_updated,
            last_mod_timestamp: self.last_updated,
            participant_count: self.participant_count,
            comment_count: self.comment_count,
            tids: self.rating_matrix.colnames().to_vec(),
            user_vote_counts,
            in_conv,
            mod_in: self.featured_statements.iter().cloned().collect(),
            mod_out: self.excluded_statements.iter().cloned().collect(),
            meta_tids: self.meta_statements.iter().cloned().collect(),
            mod_out_ptpts: self.excluded_participants.iter().cloned().collect(),
            pca: PcaDoc {
                center: self.pca.center.to_vec(),
                comps: self
                    .pca
                    .components
                    .rows()
                    .into_iter()
                    .map(|r| r.to_vec())
                    .collect(),
                comment_extremity: self.pca.comment_extremity.to_vec(),
            },
            proj: self.proj.clone(),
            base_clusters: self.base_clusters.iter().map(cluster_doc).collect(),
            group_clusters: self.group_clusters.iter().map(cluster_doc).collect(),
            comment_repness: self
                .repness
                .comment_repness
                .iter()
                .map(repness_doc)
                .collect(),
            votes_base: votes_base(&self.rating_matrix)
                .into_iter()
                .map(|(tid, c)| {
                    (
                        tid,
                        VoteCountsDoc {
                            agree: c.agree,
                            disagree: c.disagree,
                            total: c.total,
                        },
                    )
                })
                .collect(),
            group_votes: self
                .group_votes
                .iter()
                .map(|(gid, gv)| {
                    (
                        *gid,
                        GroupVotesDoc {
                            member_count: gv.member_count,
                            votes: gv
                                .votes
                                .iter()
                                .map(|(tid, c)| {
                                    (
                                        tid.clone(),
                                        VoteCountsDoc {
                                            agree: c.agree,
                                            disagree: c.disagree,
                                            total: c.total,
                                        },
                                    )
                                })
                                .collect(),
                        },
                    )
                })
                .collect(),
            group_aware_consensus: self.group_aware_consensus.clone(),
            consensus: ConsensusDoc {
                agree: self.repness.consensus.agree.iter().map(consensus_doc).collect(),
                disagree: self
                    .repness
                    .consensus
                    .disagree
                    .iter()
                    .map(consensus_doc)
                    .collect(),
                comment_stats: self
                    .repness
                    .consensus
                    .comment_stats
                    .iter()
                    .map(|(tid, s)| {
                        (
                            tid.clone(),
                            CommentStatsDoc {
                                n_agree: s.n_agree,
                                n_disagree: s.n_disagree,
                                n_total: s.n_total,
                                p_agree: s.p_agree,
                                p_disagree: s.p_disagree,
                                z_agree: s.z_agree,
                                z_disagree: s.z_disagree,
                            },
                        )
                    })
                    .collect(),
            },
            comment_priorities: self.comment_priorities.clone(),
            participant_info: self
                .participant_info
                .iter()
                .map(|(pid, info)| {
                    (
                        pid.clone(),
                        ParticipantInfoDoc {
                            n_agree: info.n_agree,
                            n_disagree: info.n_disagree,
                            n_pass: info.n_pass,
                            n_votes: info.n_votes,
                            group: info.group,
                            group_correlations: info.group_correlations.clone(),
                        },
                    )
                })
                .collect(),
            vote_stats: self.vote_stats.clone(),
            math_tick: math_tick_now(),
        }
    }

    /// Clojure-style rendering of the result document.
    pub fn to_dict(&self) -> Value {
        render_clojure(&self.full_data())
    }

    /// Snake_case rendering for the persistence path.
    pub fn to_dynamo_dict(&self) -> Value {
        render_dynamo(&self.full_data())
    }

    /// Restore a conversation from a previously rendered document. The vote
    /// matrices are not part of the document, so the restored conversation
    /// carries derived state only.
    pub fn from_dict(doc: &MathUpdate) -> Conversation {
        let mut conv = Conversation::with_last_updated(doc.zid.clone(), doc.last_vote_timestamp);
        conv.participant_count = doc.participant_count;
        conv.comment_count = doc.comment_count;
        conv.excluded_statements = doc.mod_out.iter().cloned().collect();
        conv.featured_statements = doc.mod_in.iter().cloned().collect();
        conv.meta_statements = doc.meta_tids.iter().cloned().collect();
        conv.excluded_participants = doc.mod_out_ptpts.iter().cloned().collect();

        let n = doc.pca.center.len();
        let k = doc.pca.comps.len().max(DEFAULT_COMPONENTS);
        let rectangular = doc.pca.comps.iter().all(|row| row.len() == n);
        let components = if rectangular && !doc.pca.comps.is_empty() {
            let flat: Vec<f64> = doc.pca.comps.iter().flatten().copied().collect();
            Array2::from_shape_vec((doc.pca.comps.len(), n), flat)
                .unwrap_or_else(|_| Array2::zeros((k, n)))
        } else {
            Array2::zeros((k, n))
        };
        conv.pca = PcaFit {
            center: ndarray::Array1::from_vec(doc.pca.center.clone()),
            components,
            comment_extremity: ndarray::Array1::from_vec(doc.pca.comment_extremity.clone()),
        };
        conv.proj = doc.proj.clone();

        let cluster_from = |c: &ClusterDoc| Cluster {
            id: c.id,
            center: c.center.clone(),
            members: c.members.clone(),
        };
        conv.base_clusters = doc.base_clusters.iter().map(cluster_from).collect();
        conv.group_clusters = doc.group_clusters.iter().map(cluster_from).collect();

        conv.repness.comment_repness = doc
            .comment_repness
            .iter()
            .map(|r| RepnessEntry {
                gid: r.gid,
                tid: r.tid.clone(),
                n_agree: r.n_agree,
                n_disagree: r.n_disagree,
                n_total: r.n_total,
                n_success: r.n_success,
                n_trials: r.n_trials,
                p_success: r.p_success,
                p_test: r.p_test,
                repness: r.repness,
                repness_test: r.repness_test,
                p_value: r.p_value,
                repful_for: if r.repful_for == "disagree" {
                    RepfulFor::Disagree
                } else {
                    RepfulFor::Agree
                },
                significant: r.repness > 1.0 && z_sig_90(r.repness_test),
            })
            .collect();

        conv.participant_info = doc
            .participant_info
            .iter()
            .map(|(pid, info)| {
                (
                    pid.clone(),
                    ParticipantInfo {
                        n_agree: info.n_agree,
                        n_disagree: info.n_disagree,
                        n_pass: info.n_pass,
                        n_votes: info.n_votes,
                        group: info.group,
                        group_correlations: info.group_correlations.clone(),
                    },
                )
            })
            .collect();

        conv.group_votes = doc
            .group_votes
            .iter()
            .map(|(gid, gv)| {
                (
                    *gid,
                    GroupVotes {
                        member_count: gv.member_count,
                        votes: gv
                            .votes
                            .iter()
                            .map(|(tid, c)| {
                                (
                                    tid.clone(),
                                    GroupVoteCounts {
                                        agree: c.agree,
                                        disagree: c.disagree,
                                        total: c.total,
                                    },
                                )
                            })
                            .collect(),
                    },
                )
            })
            .collect();
        conv.group_aware_consensus = doc.group_aware_consensus.clone();
        conv.comment_priorities = doc.comment_priorities.clone();
        conv.vote_stats = doc.vote_stats.clone();
        conv
    }
}
