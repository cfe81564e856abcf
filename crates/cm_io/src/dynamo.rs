//! The snake_case rendering for the wide-column persistence path.
//!
//! Same semantics as the Clojure-style rendering with renamed keys, and
//! every float is emitted as a decimal string (the store rejects binary
//! floats; its adapter parses these into its arbitrary-precision number
//! type). Rows are keyed downstream by (`zid`, `math_tick`); the engine's
//! responsibility ends at this document.

use serde_json::{json, Map, Value};

use crate::document::{ClusterDoc, ConsensusEntryDoc, MathUpdate, VoteCountsDoc};

/// Encode a float as a decimal string. Non-finite values (which the
/// pipeline never produces) degrade to null rather than poisoning a row.
fn decimal(x: f64) -> Value {
    if !x.is_finite() {
        return Value::Null;
    }
    Value::String(format!("{x}"))
}

fn decimal_vec(xs: &[f64]) -> Value {
    Value::Array(xs.iter().map(|&x| decimal(x)).collect())
}

fn id_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(raw),
    }
}

fn counts_value(c: &VoteCountsDoc) -> Value {
    json!({"agree": c.agree, "disagree": c.disagree, "total": c.total})
}

fn cluster_value(c: &ClusterDoc) -> Value {
    json!({
        "id": c.id,
        "center": decimal_vec(&c.center),
        "members": Value::Array(c.members.iter().map(|m| id_value(m.as_str())).collect()),
    })
}

fn consensus_entry_value(e: &ConsensusEntryDoc) -> Value {
    json!({
        "tid": id_value(e.tid.as_str()),
        "n_success": e.n_success,
        "n_trials": e.n_trials,
        "p_success": decimal(e.p_success),
        "p_test": decimal(e.p_test),
    })
}

/// Render the document with snake_case keys and decimal floats.
pub fn render_dynamo(doc: &MathUpdate) -> Value {
    let mut root = Map::new();
    root.insert("zid".into(), id_value(&doc.zid));
    root.insert("last_updated".into(), json!(doc.last_vote_timestamp));
    root.insert("last_vote_timestamp".into(), json!(doc.last_vote_timestamp));
    root.insert("last_mod_timestamp".into(), json!(doc.last_mod_timestamp));
    root.insert("participant_count".into(), json!(doc.participant_count));
    root.insert("comment_count".into(), json!(doc.comment_count));
    root.insert("group_count".into(), json!(doc.group_clusters.len()));
    root.insert(
        "comment_ids".into(),
        Value::Array(doc.tids.iter().map(|t| id_value(t.as_str())).collect()),
    );
    root.insert(
        "moderated_out".into(),
        Value::Array(doc.mod_out.iter().map(|t| id_value(t.as_str())).collect()),
    );
    root.insert(
        "moderated_in".into(),
        Value::Array(doc.mod_in.iter().map(|t| id_value(t.as_str())).collect()),
    );
    root.insert(
        "meta_comments".into(),
        Value::Array(doc.meta_tids.iter().map(|t| id_value(t.as_str())).collect()),
    );
    root.insert(
        "user_vote_counts".into(),
        Value::Object(
            doc.user_vote_counts
                .iter()
                .map(|(pid, n)| (pid.as_str().to_string(), json!(n)))
                .collect(),
        ),
    );
    root.insert(
        "included_participants".into(),
        Value::Array(doc.in_conv.iter().map(|p| id_value(p.as_str())).collect()),
    );
    root.insert(
        "votes_base".into(),
        Value::Object(
            doc.votes_base
                .iter()
                .map(|(tid, c)| (tid.as_str().to_string(), counts_value(c)))
                .collect(),
        ),
    );
    root.insert(
        "group_votes".into(),
        Value::Object(
            doc.group_votes
                .iter()
                .map(|(gid, gv)| {
                    (
                        gid.to_string(),
                        json!({
                            "member_count": gv.member_count,
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
    root.insert("subgroup_votes".into(), json!({}));
    root.insert("subgroup_repness".into(), json!({}));
    root.insert(
        "group_consensus".into(),
        Value::Object(
            doc.group_aware_consensus
                .iter()
                .map(|(tid, &x)| (tid.as_str().to_string(), decimal(x)))
                .collect(),
        ),
    );
    root.insert(
        "base_clusters".into(),
        Value::Array(doc.base_clusters.iter().map(cluster_value).collect()),
    );
    root.insert(
        "group_clusters".into(),
        Value::Array(doc.group_clusters.iter().map(cluster_value).collect()),
    );
    root.insert(
        "pca".into(),
        json!({
            "center": decimal_vec(&doc.pca.center),
            "components": Value::Array(doc.pca.comps.iter().map(|row| decimal_vec(row)).collect()),
        }),
    );
    root.insert(
        "consensus".into(),
        json!({
            "agree": Value::Array(doc.consensus.agree.iter().map(consensus_entry_value).collect()),
            "disagree":
                Value::Array(doc.consensus.disagree.iter().map(consensus_entry_value).collect()),
            "comment_stats": Value::Object(
                doc.consensus
                    .comment_stats
                    .iter()
                    .map(|(tid, s)| {
                        (
                            tid.as_str().to_string(),
                            json!({
                                "n_agree": s.n_agree,
                                "n_disagree": s.n_disagree,
                                "n_total": s.n_total,
                                "p_agree": decimal(s.p_agree),
                                "p_disagree": decimal(s.p_disagree),
                                "z_agree": decimal(s.z_agree),
                                "z_disagree": decimal(s.z_disagree),
                            }),
                        )
                    })
                    .collect(),
            ),
        }),
    );
    root.insert(
        "comment_priorities".into(),
        Value::Object(
            doc.comment_priorities
                .iter()
                .map(|(tid, p)| (tid.as_str().to_string(), json!(p)))
                .collect(),
        ),
    );
    root.insert(
        "repness".into(),
        json!({
            "comment_repness": Value::Array(
                doc.comment_repness
                    .iter()
                    .map(|r| {
                        json!({
                            "group_id": r.gid,
                            "comment_id": id_value(r.tid.as_str()),
                            "repness": decimal(r.repness),
                        })
                    })
                    .collect(),
            ),
        }),
    );
    root.insert("math_tick".into(), json!(doc.math_tick));
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::StatementId;

    #[test]
    fn floats_render_as_decimal_strings() {
        assert_eq!(decimal(0.16), json!("0.16"));
        assert_eq!(decimal(2.0), json!("2"));
        assert_eq!(decimal(f64::NAN), Value::Null);
    }

    #[test]
    fn snake_keys_and_required_blocks() {
        let mut doc = MathUpdate {
            zid: "7".to_string(),
            math_tick: 25_042,
            ..Default::default()
        };
        doc.group_aware_consensus
            .insert(StatementId::new("3"), 0.16);
        doc.pca.center = vec![0.5];
        doc.pca.comps = vec![vec![0.25], vec![0.0]];
        let v = render_dynamo(&doc);
        assert_eq!(v["zid"], json!(7));
        assert_eq!(v["group_count"], json!(0));
        assert_eq!(v["group_consensus"]["3"], json!("0.16"));
        assert_eq!(v["pca"]["components"][0][0], json!("0.25"));
        assert!(v.get("subgroup_votes").is_some());
        assert!(v.get("comment_ids").is_some());
        assert_eq!(v["math_tick"], json!(25_042));
    }
}
