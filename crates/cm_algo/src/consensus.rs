//! Group vote tallies, group-aware consensus, and per-statement priority.
//!
//! Group-aware consensus multiplies Laplace-smoothed agree probabilities
//! across groups, so it rewards statements every group agrees with. Priority
//! combines engagement, extremity, and the meta flag into the score the
//! routing tier uses to pick the next statement to show.

use std::collections::{BTreeMap, HashMap, HashSet};

use cm_core::{NamedMatrix, ParticipantId, StatementId};

use crate::clusters::Cluster;

/// Fixed priority for meta statements (squared in the output).
pub const META_PRIORITY: f64 = 7.0;
/// Statements with fewer observed votes than this keep the new-statement
/// floor.
pub const PRIORITY_VOTE_FLOOR: u64 = 7;
/// The new-statement floor itself: `META_PRIORITY²`.
pub const NEW_STATEMENT_PRIORITY: i64 = 49;

/// Agree / disagree / observed counts for one statement.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GroupVoteCounts {
    pub agree: u64,
    pub disagree: u64,
    /// Observed votes: agree + disagree + pass.
    pub total: u64,
}

/// Per-group tallies across all statements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupVotes {
    pub member_count: usize,
    pub votes: BTreeMap<StatementId, GroupVoteCounts>,
}

fn counts_for_rows(matrix: &NamedMatrix, rows: &[usize]) -> BTreeMap<StatementId, GroupVoteCounts> {
    let dense = matrix.dense();
    let mut out = BTreeMap::new();
    for (j, tid) in matrix.colnames().iter().enumerate() {
        let mut counts = GroupVoteCounts::default();
        for &i in rows {
            let x = dense[[i, j]];
            if x.is_nan() {
                continue;
            }
            counts.total += 1;
            if x > 0.0 {
                counts.agree += 1;
            } else if x < 0.0 {
                counts.disagree += 1;
            }
        }
        out.insert(tid.clone(), counts);
    }
    out
}

/// Conversation-wide tallies per statement.
pub fn votes_base(matrix: &NamedMatrix) -> BTreeMap<StatementId, GroupVoteCounts> {
    let rows: Vec<usize> = (0..matrix.nrows()).collect();
    counts_for_rows(matrix, &rows)
}

/// Per-group tallies per statement.
pub fn group_votes(matrix: &NamedMatrix, groups: &[Cluster]) -> BTreeMap<usize, GroupVotes> {
    let row_index: HashMap<&ParticipantId, usize> = matrix
        .rownames()
        .iter()
        .enumerate()
        .map(|(i, pid)| (pid, i))
        .collect();
    let mut out = BTreeMap::new();
    for group in groups {
        let rows: Vec<usize> = group
            .members
            .iter()
            .filter_map(|m| row_index.get(m).copied())
            .collect();
        if rows.is_empty() {
            continue;
        }
        out.insert(
            group.id,
            GroupVotes {
                member_count: rows.len(),
                votes: counts_for_rows(matrix, &rows),
            },
        );
    }
    out
}

/// Product across groups of smoothed agree probabilities, per statement.
/// Groups with no observed votes on a statement do not contribute;
/// statements with no group-level data at all are omitted.
pub fn group_aware_consensus(
    group_votes: &BTreeMap<usize, GroupVotes>,
) -> BTreeMap<StatementId, f64> {
    let mut out: BTreeMap<StatementId, f64> = BTreeMap::new();
    for gv in group_votes.values() {
        for (tid, counts) in &gv.votes {
            if counts.total == 0 {
                continue;
            }
            let prob = (counts.agree as f64 + 1.0) / (counts.total as f64 + 2.0);
            *out.entry(tid.clone()).or_insert(1.0) *= prob;
        }
    }
    out
}

/// Engagement-weighted importance of one statement.
///
/// `importance = (1 − (P+1)/(S+2)) · (E + 1) · (A+1)/(S+2)`
pub fn importance_metric(agrees: u64, passes: u64, seen: u64, extremity: f64) -> f64 {
    let s = seen as f64 + 2.0;
    let p = (passes as f64 + 1.0) / s;
    let a = (agrees as f64 + 1.0) / s;
    (1.0 - p) * (extremity + 1.0) * a
}

/// Squared priority for one statement. Meta statements pin to
/// `META_PRIORITY²`; otherwise importance is scaled so new statements bubble
/// up while votes accumulate.
pub fn priority_metric(
    is_meta: bool,
    agrees: u64,
    passes: u64,
    seen: u64,
    extremity: f64,
) -> f64 {
    if is_meta {
        return META_PRIORITY * META_PRIORITY;
    }
    let importance = importance_metric(agrees, passes, seen, extremity);
    let scaling = 1.0 + 8.0 * (2.0_f64).powf(-(seen as f64) / 5.0);
    (importance * scaling).powi(2)
}

/// Integer-rounded priority per statement. Statements still under the vote
/// floor receive the fixed new-statement value.
pub fn comment_priorities(
    votes_base: &BTreeMap<StatementId, GroupVoteCounts>,
    extremity: &BTreeMap<StatementId, f64>,
    meta_tids: &HashSet<StatementId>,
) -> BTreeMap<StatementId, i64> {
    let mut out = BTreeMap::new();
    for (tid, counts) in votes_base {
        let priority = if counts.total < PRIORITY_VOTE_FLOOR {
            NEW_STATEMENT_PRIORITY
        } else {
            let passes = counts.total - (counts.agree + counts.disagree);
            let e = extremity.get(tid).copied().unwrap_or(0.0);
            priority_metric(
                meta_tids.contains(tid),
                counts.agree,
                passes,
                counts.total,
                e,
            )
            .round() as i64
        };
        out.insert(tid.clone(), priority);
    }
    out
}
