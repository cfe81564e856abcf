//! Per-(group, statement) representativeness, conversation-level consensus,
//! and participant statistics.
//!
//! Representativeness compares a group's Laplace-smoothed agree (or
//! disagree) rate against the complement of all other groups combined. One
//! record is produced per (group, statement) with in-group data; the top
//! ranked significant records per group feed the visual layer.

use std::collections::{BTreeMap, HashMap};

use cm_core::{NamedMatrix, ParticipantId, StatementId};
use rayon::prelude::*;
use tracing::debug;

use crate::clusters::Cluster;
use crate::stats::{p_value, prop_test, two_prop_test, z_sig_90, z_sig_95};

/// How many representative statements per group are kept for the visual
/// layer.
pub const TOP_REPRESENTATIVE: usize = 5;

/// Group-correlation gates: a group needs this many members, and this many
/// commonly voted statements, before a Pearson r is meaningful.
const CORR_MIN_MEMBERS: usize = 3;
const CORR_MIN_STATEMENTS: usize = 3;

/// Which side of a statement a group is representative for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RepfulFor {
    Agree,
    Disagree,
}

impl RepfulFor {
    pub fn as_str(self) -> &'static str {
        match self {
            RepfulFor::Agree => "agree",
            RepfulFor::Disagree => "disagree",
        }
    }
}

/// One (group, statement) representativeness record.
#[derive(Clone, Debug, PartialEq)]
pub struct RepnessEntry {
    pub gid: usize,
    pub tid: StatementId,
    /// Raw counts within the group.
    pub n_agree: u64,
    pub n_disagree: u64,
    pub n_total: u64,
    /// Successes/trials for the emitted side.
    pub n_success: u64,
    pub n_trials: u64,
    /// Smoothed in-group success rate for the emitted side.
    pub p_success: f64,
    /// One-sample z of the in-group rate (H0: p = 0.5).
    pub p_test: f64,
    /// Smoothed ratio of the group rate to the complement's.
    pub repness: f64,
    /// Two-proportion z of group vs complement.
    pub repness_test: f64,
    /// Two-sided p for `repness_test`.
    pub p_value: f64,
    pub repful_for: RepfulFor,
    /// Passed the 90% gate with repness > 1: eligible for the
    /// representative subset.
    pub significant: bool,
}

impl RepnessEntry {
    /// Ranking metric within a group.
    pub fn rank_metric(&self) -> f64 {
        (self.repness - 1.0).abs() * self.repness_test.abs()
    }
}

/// A statement the whole conversation significantly agrees (or disagrees)
/// with.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusStatement {
    pub tid: StatementId,
    pub n_success: u64,
    pub n_trials: u64,
    pub p_success: f64,
    pub p_test: f64,
}

/// Per-statement aggregate stats backing the consensus pass.
#[derive(Clone, Debug, PartialEq)]
pub struct CommentStats {
    pub n_agree: u64,
    pub n_disagree: u64,
    pub n_total: u64,
    pub p_agree: f64,
    pub p_disagree: f64,
    pub z_agree: f64,
    pub z_disagree: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConsensusResult {
    pub agree: Vec<ConsensusStatement>,
    pub disagree: Vec<ConsensusStatement>,
    pub comment_stats: BTreeMap<StatementId, CommentStats>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RepnessResult {
    /// One record per (group, statement) with in-group data, group-major in
    /// statement order.
    pub comment_repness: Vec<RepnessEntry>,
    /// Top-ranked significant records per group, for the visual layer.
    pub representative: BTreeMap<usize, Vec<RepnessEntry>>,
    pub consensus: ConsensusResult,
}

/// Per-statement (agree, disagree, observed) counts for a set of row
/// indices.
fn column_counts(matrix: &NamedMatrix, rows: &[usize]) -> Vec<(u64, u64, u64)> {
    let dense = matrix.dense();
    let mut out = vec![(0u64, 0u64, 0u64); matrix.ncols()];
    for &i in rows {
        for j in 0..matrix.ncols() {
            let x = dense[[i, j]];
            if x.is_nan() {
                continue;
            }
            let slot = &mut out[j];
            slot.2 += 1;
            if x > 0.0 {
                slot.0 += 1;
            } else if x < 0.0 {
                slot.1 += 1;
            }
        }
    }
    out
}

fn smoothed(successes: u64, trials: u64) -> f64 {
    (successes as f64 + 1.0) / (trials as f64 + 2.0)
}

/// Build the candidate entry for one side of one (group, statement) cell.
fn side_entry(
    gid: usize,
    tid: &StatementId,
    side: RepfulFor,
    in_counts: (u64, u64, u64),
    out_counts: (u64, u64, u64),
) -> RepnessEntry {
    let (a_in, d_in, s_in) = in_counts;
    let (a_out, d_out, s_out) = out_counts;
    let (succ_in, succ_out) = match side {
        RepfulFor::Agree => (a_in, a_out),
        RepfulFor::Disagree => (d_in, d_out),
    };
    let repness = smoothed(succ_in, s_in) / smoothed(succ_out, s_out);
    let repness_test = two_prop_test(succ_in, s_in, succ_out, s_out);
    let p_test = prop_test(succ_in, s_in);
    RepnessEntry {
        gid,
        tid: tid.clone(),
        n_agree: a_in,
        n_disagree: d_in,
        n_total: s_in,
        n_success: succ_in,
        n_trials: s_in,
        p_success: smoothed(succ_in, s_in),
        p_test,
        repness,
        repness_test,
        p_value: p_value(repness_test),
        repful_for: side,
        significant: repness > 1.0 && z_sig_90(repness_test),
    }
}

/// Representativeness over the filtered matrix and the current groups.
/// A pure function: no state machine, no caches.
pub fn conversation_repness(matrix: &NamedMatrix, groups: &[Cluster]) -> RepnessResult {
    let mut result = RepnessResult {
        consensus: conversation_consensus(matrix),
        ..Default::default()
    };
    if groups.is_empty() || matrix.ncols() == 0 {
        return result;
    }

    let row_index: HashMap<&ParticipantId, usize> = matrix
        .rownames()
        .iter()
        .enumerate()
        .map(|(i, pid)| (pid, i))
        .collect();

    // Counts per group, plus pooled counts across all grouped participants.
    let mut group_counts: BTreeMap<usize, Vec<(u64, u64, u64)>> = BTreeMap::new();
    let mut pooled = vec![(0u64, 0u64, 0u64); matrix.ncols()];
    for group in groups {
        let rows: Vec<usize> = group
            .members
            .iter()
            .filter_map(|m| row_index.get(m).copied())
            .collect();
        let counts = column_counts(matrix, &rows);
        for (p, c) in pooled.iter_mut().zip(&counts) {
            p.0 += c.0;
            p.1 += c.1;
            p.2 += c.2;
        }
        group_counts.insert(group.id, counts);
    }

    for (gid, counts) in &group_counts {
        for (j, tid) in matrix.colnames().iter().enumerate() {
            let in_counts = counts[j];
            if in_counts.2 == 0 {
                continue; // no in-group data for this statement
            }
            let out_counts = (
                pooled[j].0 - in_counts.0,
                pooled[j].1 - in_counts.1,
                pooled[j].2 - in_counts.2,
            );
            let agree = side_entry(*gid, tid, RepfulFor::Agree, in_counts, out_counts);
            let disagree = side_entry(*gid, tid, RepfulFor::Disagree, in_counts, out_counts);
            let chosen = match (agree.significant, disagree.significant) {
                (true, false) => agree,
                (false, true) => disagree,
                // Both or neither: the stronger side wins.
                _ => {
                    if agree.rank_metric() >= disagree.rank_metric() {
                        agree
                    } else {
                        disagree
                    }
                }
            };
            result.comment_repness.push(chosen);
        }
    }

    for gid in group_counts.keys() {
        let mut ranked: Vec<RepnessEntry> = result
            .comment_repness
            .iter()
            .filter(|e| e.gid == *gid && e.significant)
            .cloned()
            .collect();
        ranked.sort_by(|a, b| {
            b.rank_metric()
                .partial_cmp(&a.rank_metric())
                .unwrap_or(core::cmp::Ordering::Equal)
        });
        ranked.truncate(TOP_REPRESENTATIVE);
        result.representative.insert(*gid, ranked);
    }

    debug!(
        records = result.comment_repness.len(),
        groups = groups.len(),
        "repness computed"
    );
    result
}

/// Conversation-level consensus: statements whose agree (or disagree)
/// proportion is significantly above 0.5 at the 95% gate.
fn conversation_consensus(matrix: &NamedMatrix) -> ConsensusResult {
    let all_rows: Vec<usize> = (0..matrix.nrows()).collect();
    let counts = column_counts(matrix, &all_rows);
    let mut out = ConsensusResult::default();
    for (j, tid) in matrix.colnames().iter().enumerate() {
        let (na, nd, ns) = counts[j];
        let z_agree = prop_test(na, ns);
        let z_disagree = prop_test(nd, ns);
        out.comment_stats.insert(
            tid.clone(),
            CommentStats {
                n_agree: na,
                n_disagree: nd,
                n_total: ns,
                p_agree: smoothed(na, ns),
                p_disagree: smoothed(nd, ns),
                z_agree,
                z_disagree,
            },
        );
        if ns == 0 {
            continue;
        }
        if z_agree > 0.0 && z_sig_95(z_agree) {
            out.agree.push(ConsensusStatement {
                tid: tid.clone(),
                n_success: na,
                n_trials: ns,
                p_success: smoothed(na, ns),
                p_test: z_agree,
            });
        }
        if z_disagree > 0.0 && z_sig_95(z_disagree) {
            out.disagree.push(ConsensusStatement {
                tid: tid.clone(),
                n_success: nd,
                n_trials: ns,
                p_success: smoothed(nd, ns),
                p_test: z_disagree,
            });
        }
    }
    out.agree.sort_by(|a, b| {
        b.p_test
            .partial_cmp(&a.p_test)
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    out.disagree.sort_by(|a, b| {
        b.p_test
            .partial_cmp(&a.p_test)
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    out
}

/// Per-participant vote counts, group membership, and Pearson correlation
/// against each group's mean vote vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticipantInfo {
    pub n_agree: u64,
    pub n_disagree: u64,
    pub n_pass: u64,
    pub n_votes: u64,
    pub group: Option<usize>,
    pub group_correlations: BTreeMap<usize, f64>,
}

/// Participant statistics over the filtered matrix. Participants with no
/// agree/disagree votes are omitted, matching the behaviour the rest of the
/// reporting tier expects.
pub fn participant_stats(
    matrix: &NamedMatrix,
    groups: &[Cluster],
) -> BTreeMap<ParticipantId, ParticipantInfo> {
    if groups.is_empty() || matrix.nrows() == 0 {
        return BTreeMap::new();
    }
    let dense = matrix.dense();
    let (p, n) = dense.dim();

    // MISSING → 0 for correlation work; raw cells drive the counts.
    let filled: Vec<Vec<f64>> = (0..p)
        .map(|i| {
            (0..n)
                .map(|j| {
                    let x = dense[[i, j]];
                    if x.is_nan() {
                        0.0
                    } else {
                        x
                    }
                })
                .collect()
        })
        .collect();

    let row_index: HashMap<&ParticipantId, usize> = matrix
        .rownames()
        .iter()
        .enumerate()
        .map(|(i, pid)| (pid, i))
        .collect();
    let mut membership: HashMap<usize, usize> = HashMap::new();
    for group in groups {
        for m in &group.members {
            if let Some(&i) = row_index.get(m) {
                membership.insert(i, group.id);
            }
        }
    }

    // Per-group mean vote vectors and the statements each group has voted
    // on widely enough to correlate against.
    struct GroupProfile {
        gid: usize,
        mean: Vec<f64>,
        valid: Vec<bool>,
        usable: bool,
    }
    let profiles: Vec<GroupProfile> = groups
        .iter()
        .map(|group| {
            let rows: Vec<usize> = group
                .members
                .iter()
                .filter_map(|m| row_index.get(m).copied())
                .collect();
            let mut mean = vec![0.0; n];
            let mut nonzero = vec![0usize; n];
            for &i in &rows {
                for j in 0..n {
                    mean[j] += filled[i][j];
                    if filled[i][j] != 0.0 {
                        nonzero[j] += 1;
                    }
                }
            }
            if !rows.is_empty() {
                for m in mean.iter_mut() {
                    *m /= rows.len() as f64;
                }
            }
            let valid: Vec<bool> = nonzero.iter().map(|&c| c >= CORR_MIN_STATEMENTS).collect();
            let usable = rows.len() >= CORR_MIN_MEMBERS
                && valid.iter().filter(|&&v| v).count() >= CORR_MIN_STATEMENTS;
            GroupProfile {
                gid: group.id,
                mean,
                valid,
                usable,
            }
        })
        .collect();

    let rownames = matrix.rownames();
    let entries: Vec<(ParticipantId, ParticipantInfo)> = (0..p)
        .into_par_iter()
        .filter_map(|i| {
            let mut n_agree = 0u64;
            let mut n_disagree = 0u64;
            let mut n_pass = 0u64;
            for j in 0..n {
                let x = dense[[i, j]];
                if x.is_nan() {
                    continue;
                }
                if x > 0.0 {
                    n_agree += 1;
                } else if x < 0.0 {
                    n_disagree += 1;
                } else {
                    n_pass += 1;
                }
            }
            let n_votes = n_agree + n_disagree;
            if n_votes == 0 {
                return None;
            }
            let mut correlations = BTreeMap::new();
            for profile in &profiles {
                let r = if profile.usable {
                    pearson_on_mask(&filled[i], &profile.mean, &profile.valid)
                } else {
                    0.0
                };
                correlations.insert(profile.gid, r);
            }
            Some((
                rownames[i].clone(),
                ParticipantInfo {
                    n_agree,
                    n_disagree,
                    n_pass,
                    n_votes,
                    group: membership.get(&i).copied(),
                    group_correlations: correlations,
                },
            ))
        })
        .collect();

    entries.into_iter().collect()
}

/// Pearson r restricted to masked positions; 0.0 when either side is
/// constant or the correlation is undefined.
fn pearson_on_mask(xs: &[f64], ys: &[f64], mask: &[bool]) -> f64 {
    let pairs: Vec<(f64, f64)> = mask
        .iter()
        .enumerate()
        .filter(|(_, &m)| m)
        .map(|(j, _)| (xs[j], ys[j]))
        .collect();
    let k = pairs.len();
    if k < 2 {
        return 0.0;
    }
    let kf = k as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / kf;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / kf;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }
    let r = sxy / (sxx * syy).sqrt();
    if r.is_nan() {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::Vote;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    fn sid(s: &str) -> StatementId {
        StatementId::new(s)
    }

    /// P1–P3 agree on T1/T2 and disagree on T3; P4–P6 mirror them.
    fn polarized() -> (NamedMatrix, Vec<Cluster>) {
        let mut m = NamedMatrix::new();
        let mut triples = Vec::new();
        for p in 1..=3 {
            triples.push((pid(&p.to_string()), sid("t1"), Vote::Agree));
            triples.push((pid(&p.to_string()), sid("t2"), Vote::Agree));
            triples.push((pid(&p.to_string()), sid("t3"), Vote::Disagree));
        }
        for p in 4..=6 {
            triples.push((pid(&p.to_string()), sid("t1"), Vote::Disagree));
            triples.push((pid(&p.to_string()), sid("t2"), Vote::Disagree));
            triples.push((pid(&p.to_string()), sid("t3"), Vote::Agree));
        }
        m.batch_update(&triples);
        let groups = vec![
            Cluster {
                id: 0,
                center: vec![1.0, 0.0],
                members: vec![pid("1"), pid("2"), pid("3")],
            },
            Cluster {
                id: 1,
                center: vec![-1.0, 0.0],
                members: vec![pid("4"), pid("5"), pid("6")],
            },
        ];
        (m, groups)
    }

    #[test]
    fn polarized_statements_are_representative() {
        let (m, groups) = polarized();
        let result = conversation_repness(&m, &groups);
        // One record per (group, statement) with data.
        assert_eq!(result.comment_repness.len(), 6);

        let find = |gid: usize, tid: &str| {
            result
                .comment_repness
                .iter()
                .find(|e| e.gid == gid && e.tid == sid(tid))
                .expect("record exists")
        };
        assert_eq!(find(0, "t1").repful_for, RepfulFor::Agree);
        assert!(find(0, "t1").significant);
        assert_eq!(find(0, "t2").repful_for, RepfulFor::Agree);
        assert_eq!(find(0, "t3").repful_for, RepfulFor::Disagree);
        assert_eq!(find(1, "t1").repful_for, RepfulFor::Disagree);
        assert_eq!(find(1, "t3").repful_for, RepfulFor::Agree);
        // Smoothed ratio: (4/5)/(1/5) = 4.
        assert!((find(0, "t1").repness - 4.0).abs() < 1e-12);
        // Every significant record passes the 90% gate.
        for e in &result.comment_repness {
            if e.significant {
                assert!(e.repness_test.abs() > 1.2816);
            }
        }
    }

    #[test]
    fn representative_subset_is_ranked_and_capped() {
        let (m, groups) = polarized();
        let result = conversation_repness(&m, &groups);
        for entries in result.representative.values() {
            assert!(entries.len() <= TOP_REPRESENTATIVE);
            for pair in entries.windows(2) {
                assert!(pair[0].rank_metric() >= pair[1].rank_metric());
            }
            for e in entries {
                assert!(e.significant);
            }
        }
    }

    #[test]
    fn unanimous_statement_reaches_consensus() {
        let mut m = NamedMatrix::new();
        let mut triples = Vec::new();
        for p in 0..10 {
            triples.push((pid(&format!("p{p}")), sid("t1"), Vote::Agree));
            // A second statement so the conversation is two-dimensional.
            triples.push((
                pid(&format!("p{p}")),
                sid("t2"),
                if p % 2 == 0 { Vote::Agree } else { Vote::Disagree },
            ));
        }
        m.batch_update(&triples);
        let result = conversation_repness(&m, &[]);
        assert_eq!(result.comment_repness.len(), 0);
        let agreed: Vec<_> = result.consensus.agree.iter().map(|c| &c.tid).collect();
        assert_eq!(agreed, vec![&sid("t1")]);
        assert!(result.consensus.agree[0].p_test > 1.6449);
        // Split statement stays out of both lists.
        assert!(result.consensus.disagree.is_empty());
        assert_eq!(result.consensus.comment_stats.len(), 2);
    }

    #[test]
    fn participant_stats_counts_and_groups() {
        let (m, groups) = polarized();
        let info = participant_stats(&m, &groups);
        assert_eq!(info.len(), 6);
        let p1 = &info[&pid("1")];
        assert_eq!(p1.n_agree, 2);
        assert_eq!(p1.n_disagree, 1);
        assert_eq!(p1.n_pass, 0);
        assert_eq!(p1.n_votes, 3);
        assert_eq!(p1.group, Some(0));
        // Perfectly aligned with own group, anti-aligned with the other.
        assert!((p1.group_correlations[&0] - 1.0).abs() < 1e-9);
        assert!((p1.group_correlations[&1] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn small_groups_do_not_correlate() {
        let (m, _) = polarized();
        let tiny_groups = vec![
            Cluster {
                id: 0,
                center: vec![0.0, 0.0],
                members: vec![pid("1"), pid("2")],
            },
            Cluster {
                id: 1,
                center: vec![0.0, 0.0],
                members: vec![pid("3"), pid("4"), pid("5"), pid("6")],
            },
        ];
        let info = participant_stats(&m, &tiny_groups);
        // Group 0 has two members: below the correlation gate.
        assert_eq!(info[&pid("1")].group_correlations[&0], 0.0);
    }
}
