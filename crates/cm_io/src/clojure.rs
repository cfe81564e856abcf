//! The "Clojure-style" rendering: lowercase-hyphenated keys, ids coerced to
//! integers where they parse (`math_tick` deliberately keeps its
//! underscore). `parse_clojure_document` inverts the rendering for
//! round-trip restoration.

use std::collections::BTreeMap;

use cm_core::{ParticipantId, StatementId};
use serde_json::{json, Map, Value};

use crate::document::{
    ClusterDoc, CommentStatsDoc, ConsensusDoc, ConsensusEntryDoc, EntityStatsDoc, GroupVotesDoc,
    MathUpdate, ParticipantInfoDoc, PcaDoc, RepnessDoc, VoteCountsDoc, VoteStatsDoc,
};
use crate::{IoError, IoResult};

/// Ids render as JSON integers where the raw form parses as one.
fn id_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(raw),
    }
}

fn id_array<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Value {
    Value::Array(ids.into_iter().map(id_value).collect())
}

fn counts_value(c: &VoteCountsDoc) -> Value {
    json!({"A": c.agree, "D": c.disagree, "S": c.total})
}

fn cluster_value(c: &ClusterDoc) -> Value {
    json!({
        "id": c.id,
        "center": &c.center,
        "members": id_array(c.members.iter().map(|m| m.as_str())),
    })
}

fn consensus_entry_value(e: &ConsensusEntryDoc) -> Value {
    json!({
        "tid": id_value(e.tid.as_str()),
        "n-success": e.n_success,
        "n-trials": e.n_trials,
        "p-success": e.p_success,
        "p-test": e.p_test,
    })
}

fn repness_value(r: &RepnessDoc) -> Value {
    json!({
        "gid": r.gid,
        "tid": id_value(r.tid.as_str()),
        "n-agree": r.n_agree,
        "n-disagree": r.n_disagree,
        "n-total": r.n_total,
        "n-success": r.n_success,
        "n-trials": r.n_trials,
        "p-success": r.p_success,
        "p-test": r.p_test,
        "repness": r.repness,
        "repness-test": r.repness_test,
        "p-value": r.p_value,
        "repful-for": r.repful_for.as_str(),
    })
}

fn entity_stats_value(s: &EntityStatsDoc) -> Value {
    json!({
        "n-votes": s.n_votes,
        "n-agree": s.n_agree,
        "n-disagree": s.n_disagree,
        "agree-ratio": s.agree_ratio,
    })
}

/// Render the document with hyphenated keys.
pub fn render_clojure(doc: &MathUpdate) -> Value {
    let mut root = Map::new();
    root.insert("zid".into(), id_value(&doc.zid));
    root.insert("lastVoteTimestamp".into(), json!(doc.last_vote_timestamp));
    root.insert("lastModTimestamp".into(), json!(doc.last_mod_timestamp));
    root.insert("n".into(), json!(doc.participant_count));
    root.insert("n-cmts".into(), json!(doc.comment_count));
    root.insert(
        "tids".into(),
        id_array(doc.tids.iter().map(|t| t.as_str())),
    );
    root.insert(
        "user-vote-counts".into(),
        Value::Object(
            doc.user_vote_counts
                .iter()
                .map(|(pid, n)| (pid.as_str().to_string(), json!(n)))
                .collect(),
        ),
    );
    root.insert(
        "in-conv".into(),
        id_array(doc.in_conv.iter().map(|p| p.as_str())),
    );
    root.insert(
        "mod-in".into(),
        id_array(doc.mod_in.iter().map(|t| t.as_str())),
    );
    root.insert(
        "mod-out".into(),
        id_array(doc.mod_out.iter().map(|t| t.as_str())),
    );
    root.insert(
        "meta-tids".into(),
        id_array(doc.meta_tids.iter().map(|t| t.as_str())),
    );
    root.insert(
        "mod-out-ptpts".into(),
        id_array(doc.mod_out_ptpts.iter().map(|p| p.as_str())),
    );
    root.insert(
        "pca".into(),
        json!({
            "center": &doc.pca.center,
            "comps": &doc.pca.comps,
            "comment-extremity": &doc.pca.comment_extremity,
        }),
    );
    root.insert(
        "proj".into(),
        Value::Object(
            doc.proj
                .iter()
                .map(|(pid, xy)| (pid.as_str().to_string(), json!(xy)))
                .collect(),
        ),
    );
    root.insert(
        "base-clusters".into(),
        Value::Array(doc.base_clusters.iter().map(cluster_value).collect()),
    );
    root.insert(
        "group-clusters".into(),
        Value::Array(doc.group_clusters.iter().map(cluster_value).collect()),
    );
    root.insert(
        "repness".into(),
        json!({
            "comment-repness":
                Value::Array(doc.comment_repness.iter().map(repness_value).collect()),
        }),
    );
    root.insert(
        "votes-base".into(),
        Value::Object(
            doc.votes_base
                .iter()
                .map(|(tid, c)| (tid.as_str().to_string(), counts_value(c)))
                .collect(),
        ),
    );
    root.insert(
        "group-votes".into(),
        Value::Object(
            doc.group_votes
                .iter()
                .map(|(gid, gv)| {
                    (
                        gid.to_string(),
                        json!({
                            "n-members": gv.member_count,
                            "votes": Value::Object(
                                gv.votes
                                    .iter()
                                    .map(|(tid, c)| (tid.as_str().to_string(), counts_value(c)))
                                    .collect(),
                            ),
                        }),
                    )
                })
                .collect(),
        ),
    );
    // Always present, always empty in this engine.
    root.insert("subgroup-votes".into(), json!({}));
    root.insert("subgroup-repness".into(), json!({}));
    root.insert(
        "group-aware-consensus".into(),
        Value::Object(
            doc.group_aware_consensus
                .iter()
                .map(|(tid, x)| (tid.as_str().to_string(), json!(x)))
                .collect(),
        ),
    );
    root.insert(
        "consensus".into(),
        json!({
            "agree": Value::Array(doc.consensus.agree.iter().map(consensus_entry_value).collect()),
            "disagree":
                Value::Array(doc.consensus.disagree.iter().map(consensus_entry_value).collect()),
            "comment-stats": Value::Object(
                doc.consensus
                    .comment_stats
                    .iter()
                    .map(|(tid, s)| {
                        (
                            tid.as_str().to_string(),
                            json!({
                                "na": s.n_agree,
                                "nd": s.n_disagree,
                                "ns": s.n_total,
                                "pa": s.p_agree,
                                "pd": s.p_disagree,
                                "pat": s.z_agree,
                                "pdt": s.z_disagree,
                            }),
                        )
                    })
                    .collect(),
            ),
        }),
    );
    root.insert(
        "comment-priorities".into(),
        Value::Object(
            doc.comment_priorities
                .iter()
                .map(|(tid, p)| (tid.as_str().to_string(), json!(p)))
                .collect(),
        ),
    );
    root.insert(
        "participant-info".into(),
        Value::Object(
            doc.participant_info
                .iter()
                .map(|(pid, info)| {
                    (
                        pid.as_str().to_string(),
                        json!({
                            "n-agree": info.n_agree,
                            "n-disagree": info.n_disagree,
                            "n-pass": info.n_pass,
                            "n-votes": info.n_votes,
                            "group": info.group,
                            "group-correlations": Value::Object(
                                info.group_correlations
                                    .iter()
                                    .map(|(gid, r)| (gid.to_string(), json!(r)))
                                    .collect(),
                            ),
                        }),
                    )
                })
                .collect(),
        ),
    );
    root.insert(
        "vote-stats".into(),
        json!({
            "n-votes": doc.vote_stats.n_votes,
            "n-agree": doc.vote_stats.n_agree,
            "n-disagree": doc.vote_stats.n_disagree,
            "n-pass": doc.vote_stats.n_pass,
            "comment-stats": Value::Object(
                doc.vote_stats
                    .comment_stats
                    .iter()
                    .map(|(tid, s)| (tid.as_str().to_string(), entity_stats_value(s)))
                    .collect(),
            ),
            "participant-stats": Value::Object(
                doc.vote_stats
                    .participant_stats
                    .iter()
                    .map(|(pid, s)| (pid.as_str().to_string(), entity_stats_value(s)))
                    .collect(),
            ),
        }),
    );
    root.insert("math_tick".into(), json!(doc.math_tick));
    Value::Object(root)
}

/* ---------------- parsing (round-trip restoration) ---------------- */

fn field<'a>(v: &'a Value, key: &'static str) -> IoResult<&'a Value> {
    v.get(key)
        .ok_or_else(|| IoError::document(key, "missing field"))
}

fn id_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_i64(v: &Value, key: &'static str) -> IoResult<i64> {
    v.as_i64()
        .ok_or_else(|| IoError::document(key, "expected integer"))
}

fn as_u64(v: &Value, key: &'static str) -> IoResult<u64> {
    v.as_u64()
        .ok_or_else(|| IoError::document(key, "expected unsigned integer"))
}

fn as_f64(v: &Value, key: &'static str) -> IoResult<f64> {
    v.as_f64()
        .ok_or_else(|| IoError::document(key, "expected number"))
}

fn f64_vec(v: &Value, key: &'static str) -> IoResult<Vec<f64>> {
    v.as_array()
        .ok_or_else(|| IoError::document(key, "expected array"))?
        .iter()
        .map(|x| as_f64(x, key))
        .collect()
}

fn statement_vec(v: &Value, key: &'static str) -> IoResult<Vec<StatementId>> {
    Ok(v.as_array()
        .ok_or_else(|| IoError::document(key, "expected array"))?
        .iter()
        .map(|x| StatementId::new(id_string(x)))
        .collect())
}

fn participant_vec(v: &Value, key: &'static str) -> IoResult<Vec<ParticipantId>> {
    Ok(v.as_array()
        .ok_or_else(|| IoError::document(key, "expected array"))?
        .iter()
        .map(|x| ParticipantId::new(id_string(x)))
        .collect())
}

fn counts_from(v: &Value) -> IoResult<VoteCountsDoc> {
    Ok(VoteCountsDoc {
        agree: as_u64(field(v, "A")?, "A")?,
        disagree: as_u64(field(v, "D")?, "D")?,
        total: as_u64(field(v, "S")?, "S")?,
    })
}

fn cluster_from(v: &Value) -> IoResult<ClusterDoc> {
    Ok(ClusterDoc {
        id: as_u64(field(v, "id")?, "id")? as usize,
        center: f64_vec(field(v, "center")?, "center")?,
        members: participant_vec(field(v, "members")?, "members")?,
    })
}

fn consensus_entry_from(v: &Value) -> IoResult<ConsensusEntryDoc> {
    Ok(ConsensusEntryDoc {
        tid: StatementId::new(id_string(field(v, "tid")?)),
        n_success: as_u64(field(v, "n-success")?, "n-success")?,
        n_trials: as_u64(field(v, "n-trials")?, "n-trials")?,
        p_success: as_f64(field(v, "p-success")?, "p-success")?,
        p_test: as_f64(field(v, "p-test")?, "p-test")?,
    })
}

fn entity_stats_from(v: &Value) -> IoResult<EntityStatsDoc> {
    Ok(EntityStatsDoc {
        n_votes: as_u64(field(v, "n-votes")?, "n-votes")?,
        n_agree: as_u64(field(v, "n-agree")?, "n-agree")?,
        n_disagree: as_u64(field(v, "n-disagree")?, "n-disagree")?,
        agree_ratio: as_f64(field(v, "agree-ratio")?, "agree-ratio")?,
    })
}

/// Parse a Clojure-style document back into the in-memory record.
pub fn parse_clojure_document(v: &Value) -> IoResult<MathUpdate> {
    let mut doc = MathUpdate {
        zid: id_string(field(v, "zid")?),
        last_vote_timestamp: as_i64(field(v, "lastVoteTimestamp")?, "lastVoteTimestamp")?,
        last_mod_timestamp: as_i64(field(v, "lastModTimestamp")?, "lastModTimestamp")?,
        participant_count: as_u64(field(v, "n")?, "n")? as usize,
        comment_count: as_u64(field(v, "n-cmts")?, "n-cmts")? as usize,
        tids: statement_vec(field(v, "tids")?, "tids")?,
        in_conv: participant_vec(field(v, "in-conv")?, "in-conv")?,
        mod_in: statement_vec(field(v, "mod-in")?, "mod-in")?,
        mod_out: statement_vec(field(v, "mod-out")?, "mod-out")?,
        meta_tids: statement_vec(field(v, "meta-tids")?, "meta-tids")?,
        mod_out_ptpts: participant_vec(field(v, "mod-out-ptpts")?, "mod-out-ptpts")?,
        math_tick: as_i64(field(v, "math_tick")?, "math_tick")?,
        ..Default::default()
    };

    let pca = field(v, "pca")?;
    doc.pca = PcaDoc {
        center: f64_vec(field(pca, "center")?, "pca.center")?,
        comps: field(pca, "comps")?
            .as_array()
            .ok_or_else(|| IoError::document("pca.comps", "expected array"))?
            .iter()
            .map(|row| f64_vec(row, "pca.comps"))
            .collect::<IoResult<_>>()?,
        comment_extremity: f64_vec(field(pca, "comment-extremity")?, "pca.comment-extremity")?,
    };

    if let Some(obj) = field(v, "user-vote-counts")?.as_object() {
        doc.user_vote_counts = obj
            .iter()
            .map(|(k, x)| Ok((ParticipantId::new(k.clone()), as_u64(x, "user-vote-counts")?)))
            .collect::<IoResult<_>>()?;
    }

    if let Some(obj) = field(v, "proj")?.as_object() {
        doc.proj = obj
            .iter()
            .map(|(k, x)| Ok((ParticipantId::new(k.clone()), f64_vec(x, "proj")?)))
            .collect::<IoResult<_>>()?;
    }

    doc.base_clusters = field(v, "base-clusters")?
        .as_array()
        .ok_or_else(|| IoError::document("base-clusters", "expected array"))?
        .iter()
        .map(cluster_from)
        .collect::<IoResult<_>>()?;
    doc.group_clusters = field(v, "group-clusters")?
        .as_array()
        .ok_or_else(|| IoError::document("group-clusters", "expected array"))?
        .iter()
        .map(cluster_from)
        .collect::<IoResult<_>>()?;

    doc.comment_repness = field(field(v, "repness")?, "comment-repness")?
        .as_array()
        .ok_or_else(|| IoError::document("repness", "expected array"))?
        .iter()
        .map(|r| {
            Ok(RepnessDoc {
                gid: as_u64(field(r, "gid")?, "gid")? as usize,
                tid: StatementId::new(id_string(field(r, "tid")?)),
                n_agree: as_u64(field(r, "n-agree")?, "n-agree")?,
                n_disagree: as_u64(field(r, "n-disagree")?, "n-disagree")?,
                n_total: as_u64(field(r, "n-total")?, "n-total")?,
                n_success: as_u64(field(r, "n-success")?, "n-success")?,
                n_trials: as_u64(field(r, "n-trials")?, "n-trials")?,
                p_success: as_f64(field(r, "p-success")?, "p-success")?,
                p_test: as_f64(field(r, "p-test")?, "p-test")?,
                repness: as_f64(field(r, "repness")?, "repness")?,
                repness_test: as_f64(field(r, "repness-test")?, "repness-test")?,
                p_value: as_f64(field(r, "p-value")?, "p-value")?,
                repful_for: field(r, "repful-for")?
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect::<IoResult<_>>()?;

    if let Some(obj) = field(v, "votes-base")?.as_object() {
        doc.votes_base = obj
            .iter()
            .map(|(k, x)| Ok((StatementId::new(k.clone()), counts_from(x)?)))
            .collect::<IoResult<_>>()?;
    }

    if let Some(obj) = field(v, "group-votes")?.as_object() {
        doc.group_votes = obj
            .iter()
            .map(|(k, gv)| {
                let gid = k
                    .parse::<usize>()
                    .map_err(|_| IoError::document("group-votes", "non-numeric group id"))?;
                let votes = field(gv, "votes")?
                    .as_object()
                    .ok_or_else(|| IoError::document("group-votes", "expected object"))?
                    .iter()
                    .map(|(tid, c)| Ok((StatementId::new(tid.clone()), counts_from(c)?)))
                    .collect::<IoResult<_>>()?;
                Ok((
                    gid,
                    GroupVotesDoc {
                        member_count: as_u64(field(gv, "n-members")?, "n-members")? as usize,
                        votes,
                    },
                ))
            })
            .collect::<IoResult<_>>()?;
    }

    if let Some(obj) = field(v, "group-aware-consensus")?.as_object() {
        doc.group_aware_consensus = obj
            .iter()
            .map(|(k, x)| Ok((StatementId::new(k.clone()), as_f64(x, "group-aware-consensus")?)))
            .collect::<IoResult<_>>()?;
    }

    let consensus = field(v, "consensus")?;
    doc.consensus = ConsensusDoc {
        agree: field(consensus, "agree")?
            .as_array()
            .ok_or_else(|| IoError::document("consensus.agree", "expected array"))?
            .iter()
            .map(consensus_entry_from)
            .collect::<IoResult<_>>()?,
        disagree: field(consensus, "disagree")?
            .as_array()
            .ok_or_else(|| IoError::document("consensus.disagree", "expected array"))?
            .iter()
            .map(consensus_entry_from)
            .collect::<IoResult<_>>()?,
        comment_stats: field(consensus, "comment-stats")?
            .as_object()
            .ok_or_else(|| IoError::document("consensus.comment-stats", "expected object"))?
            .iter()
            .map(|(k, s)| {
                Ok((
                    StatementId::new(k.clone()),
                    CommentStatsDoc {
                        n_agree: as_u64(field(s, "na")?, "na")?,
                        n_disagree: as_u64(field(s, "nd")?, "nd")?,
                        n_total: as_u64(field(s, "ns")?, "ns")?,
                        p_agree: as_f64(field(s, "pa")?, "pa")?,
                        p_disagree: as_f64(field(s, "pd")?, "pd")?,
                        z_agree: as_f64(field(s, "pat")?, "pat")?,
                        z_disagree: as_f64(field(s, "pdt")?, "pdt")?,
                    },
                ))
            })
            .collect::<IoResult<_>>()?,
    };

    if let Some(obj) = field(v, "comment-priorities")?.as_object() {
        doc.comment_priorities = obj
            .iter()
            .map(|(k, x)| Ok((StatementId::new(k.clone()), as_i64(x, "comment-priorities")?)))
            .collect::<IoResult<_>>()?;
    }

    if let Some(obj) = field(v, "participant-info")?.as_object() {
        doc.participant_info = obj
            .iter()
            .map(|(k, info)| {
                let correlations: BTreeMap<usize, f64> = field(info, "group-correlations")?
                    .as_object()
                    .ok_or_else(|| IoError::document("group-correlations", "expected object"))?
                    .iter()
                    .map(|(gid, r)| {
                        Ok((
                            gid.parse::<usize>().map_err(|_| {
                                IoError::document("group-correlations", "non-numeric group id")
                            })?,
                            as_f64(r, "group-correlations")?,
                        ))
                    })
                    .collect::<IoResult<_>>()?;
                Ok((
                    ParticipantId::new(k.clone()),
                    ParticipantInfoDoc {
                        n_agree: as_u64(field(info, "n-agree")?, "n-agree")?,
                        n_disagree: as_u64(field(info, "n-disagree")?, "n-disagree")?,
                        n_pass: as_u64(field(info, "n-pass")?, "n-pass")?,
                        n_votes: as_u64(field(info, "n-votes")?, "n-votes")?,
                        group: field(info, "group")?.as_u64().map(|g| g as usize),
                        group_correlations: correlations,
                    },
                ))
            })
            .collect::<IoResult<_>>()?;
    }

    let vs = field(v, "vote-stats")?;
    doc.vote_stats = VoteStatsDoc {
        n_votes: as_u64(field(vs, "n-votes")?, "n-votes")?,
        n_agree: as_u64(field(vs, "n-agree")?, "n-agree")?,
        n_disagree: as_u64(field(vs, "n-disagree")?, "n-disagree")?,
        n_pass: as_u64(field(vs, "n-pass")?, "n-pass")?,
        comment_stats: field(vs, "comment-stats")?
            .as_object()
            .ok_or_else(|| IoError::document("vote-stats", "expected object"))?
            .iter()
            .map(|(k, s)| Ok((StatementId::new(k.clone()), entity_stats_from(s)?)))
            .collect::<IoResult<_>>()?,
        participant_stats: field(vs, "participant-stats")?
            .as_object()
            .ok_or_else(|| IoError::document("vote-stats", "expected object"))?
            .iter()
            .map(|(k, s)| Ok((ParticipantId::new(k.clone()), entity_stats_from(s)?)))
            .collect::<IoResult<_>>()?,
    };

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::*;

    fn sample_doc() -> MathUpdate {
        let t1 = StatementId::new("1");
        let p1 = ParticipantId::new("10");
        let mut doc = MathUpdate {
            zid: "99".to_string(),
            last_vote_timestamp: 1_700_000_000_000,
            last_mod_timestamp: 1_700_000_000_000,
            participant_count: 1,
            comment_count: 1,
            tids: vec![t1.clone()],
            in_conv: vec![p1.clone()],
            math_tick: 25_123,
            ..Default::default()
        };
        doc.user_vote_counts.insert(p1.clone(), 1);
        doc.pca = PcaDoc {
            center: vec![0.5],
            comps: vec![vec![0.25], vec![0.0]],
            comment_extremity: vec![0.25],
        };
        doc.proj.insert(p1.clone(), vec![0.125, -0.5]);
        doc.group_clusters.push(ClusterDoc {
            id: 0,
            center: vec![0.125, -0.5],
            members: vec![p1.clone()],
        });
        doc.base_clusters = doc.group_clusters.clone();
        doc.comment_repness.push(RepnessDoc {
            gid: 0,
            tid: t1.clone(),
            n_agree: 1,
            n_disagree: 0,
            n_total: 1,
            n_success: 1,
            n_trials: 1,
            p_success: 2.0 / 3.0,
            p_test: 0.5,
            repness: 2.0,
            repness_test: 1.5,
            p_value: 0.13,
            repful_for: "agree".to_string(),
        });
        doc.votes_base.insert(
            t1.clone(),
            VoteCountsDoc {
                agree: 1,
                disagree: 0,
                total: 1,
            },
        );
        doc.group_aware_consensus.insert(t1.clone(), 0.16);
        doc.comment_priorities.insert(t1.clone(), 49);
        doc.participant_info.insert(
            p1.clone(),
            ParticipantInfoDoc {
                n_agree: 1,
                n_disagree: 0,
                n_pass: 0,
                n_votes: 1,
                group: Some(0),
                group_correlations: [(0, 1.0)].into_iter().collect(),
            },
        );
        doc.vote_stats.n_votes = 1;
        doc.vote_stats.n_agree = 1;
        doc.vote_stats.comment_stats.insert(
            t1.clone(),
            EntityStatsDoc {
                n_votes: 1,
                n_agree: 1,
                n_disagree: 0,
                agree_ratio: 1.0,
            },
        );
        doc
    }

    #[test]
    fn keys_are_hyphenated_and_ids_coerced() {
        let v = render_clojure(&sample_doc());
        assert_eq!(v["zid"], json!(99));
        assert_eq!(v["n-cmts"], json!(1));
        assert_eq!(v["tids"], json!([1]));
        assert_eq!(v["in-conv"], json!([10]));
        // math_tick deliberately keeps its underscore.
        assert!(v.get("math_tick").is_some());
        assert!(v.get("math-tick").is_none());
        // Subgroup structures are always present but empty.
        assert_eq!(v["subgroup-votes"], json!({}));
        assert_eq!(v["subgroup-repness"], json!({}));
        assert_eq!(v["votes-base"]["1"], json!({"A": 1, "D": 0, "S": 1}));
    }

    #[test]
    fn round_trip_restores_every_field() {
        let doc = sample_doc();
        let rendered = render_clojure(&doc);
        let restored = parse_clojure_document(&rendered).unwrap();
        assert_eq!(doc, restored);
    }
}
