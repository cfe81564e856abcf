//! End-to-end scenarios over the full pipeline: tiny polarized
//! conversations, unanimity, moderation, degenerate inputs, determinism,
//! and document round-trips.

use cm_core::{ParticipantId, StatementId};
use cm_io::{parse_clojure_document, ModerationDelta, VoteDelta};
use cm_pipeline::Conversation;
use serde_json::json;

const TS: i64 = 2_000_000_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sid(s: &str) -> StatementId {
    StatementId::new(s)
}

fn pid(s: &str) -> ParticipantId {
    ParticipantId::new(s)
}

fn vote_delta(votes: Vec<(&str, &str, &str)>) -> VoteDelta {
    let records: Vec<_> = votes
        .into_iter()
        .map(|(p, t, v)| json!({"pid": p, "tid": t, "vote": v}))
        .collect();
    serde_json::from_value(json!({"votes": records, "lastVoteTimestamp": TS})).unwrap()
}

/// P1–P3 agree on T1/T2 and disagree on T3; P4–P6 mirror them.
fn tiny_balanced_votes() -> Vec<(&'static str, &'static str, &'static str)> {
    let mut votes = Vec::new();
    for p in ["1", "2", "3"] {
        votes.push((p, "1", "agree"));
        votes.push((p, "2", "agree"));
        votes.push((p, "3", "disagree"));
    }
    for p in ["4", "5", "6"] {
        votes.push((p, "1", "disagree"));
        votes.push((p, "2", "disagree"));
        votes.push((p, "3", "agree"));
    }
    votes
}

fn tiny_balanced() -> Conversation {
    init_tracing();
    let mut conv = Conversation::with_last_updated("100", TS);
    conv.update_votes(&vote_delta(tiny_balanced_votes()), true);
    conv
}

#[test]
fn scenario_tiny_balanced_conversation() {
    let conv = tiny_balanced();

    // Two groups of three; the group holding P1 gets id 0.
    assert_eq!(conv.group_clusters().len(), 2);
    assert_eq!(conv.group_clusters()[0].members.len(), 3);
    assert_eq!(conv.group_clusters()[1].members.len(), 3);
    assert!(conv.group_clusters()[0].members.contains(&pid("1")));
    assert!(conv.group_clusters()[1].members.contains(&pid("4")));

    // Repness: one record per (group, statement), the expected sides, all
    // significant.
    let repness = &conv.repness().comment_repness;
    assert_eq!(repness.len(), 6);
    let find = |gid: usize, tid: &str| {
        repness
            .iter()
            .find(|e| e.gid == gid && e.tid == sid(tid))
            .expect("repness record")
    };
    for (gid, tid, side) in [
        (0, "1", "agree"),
        (0, "2", "agree"),
        (0, "3", "disagree"),
        (1, "1", "disagree"),
        (1, "2", "disagree"),
        (1, "3", "agree"),
    ] {
        let entry = find(gid, tid);
        assert_eq!(entry.repful_for.as_str(), side);
        assert!(entry.significant);
        assert!(entry.repness_test.abs() > 1.2816);
        assert!(entry.repness > 1.0);
    }

    // Group-aware consensus: ((3+1)/(3+2)) * ((0+1)/(3+2)) = 0.16.
    let consensus = conv.group_aware_consensus();
    for tid in ["1", "2", "3"] {
        let x = consensus[&sid(tid)];
        assert!((x - 0.16).abs() < 1e-12);
        assert!(x > 0.0 && x < 1.0);
    }

    // Six observed votes per statement: under the vote floor, so every
    // priority pins to 49.
    for tid in ["1", "2", "3"] {
        assert_eq!(conv.comment_priorities()[&sid(tid)], 49);
    }
}

#[test]
fn universal_invariants_hold_for_the_tiny_conversation() {
    let conv = tiny_balanced();
    let doc = conv.full_data();

    assert_eq!(conv.raw_matrix().nrows(), doc.participant_count);
    assert_eq!(conv.raw_matrix().ncols(), doc.comment_count);

    // Groups partition the rating-matrix participants.
    let mut seen: Vec<ParticipantId> = Vec::new();
    for cluster in conv.group_clusters() {
        for m in &cluster.members {
            assert!(conv.rating_matrix().rownames().contains(m));
            assert!(!seen.contains(m), "participant in two groups");
            seen.push(m.clone());
        }
    }
    assert_eq!(seen.len(), conv.rating_matrix().nrows());
    assert!((2..=5).contains(&conv.group_clusters().len()));

    // In-conv: everyone voted on all three statements.
    assert_eq!(doc.in_conv.len(), 6);
    for counts in doc.votes_base.values() {
        assert_eq!(counts.total, 6);
    }
}

#[test]
fn scenario_unanimous_agreement() {
    let mut conv = Conversation::with_last_updated("101", TS);
    let votes: Vec<_> = (0..10).map(|p| (format!("{p}"), "1")).collect();
    let records: Vec<_> = votes
        .iter()
        .map(|(p, t)| json!({"pid": p, "tid": t, "vote": "agree"}))
        .collect();
    conv.update_votes(
        &serde_json::from_value(json!({"votes": records, "lastVoteTimestamp": TS})).unwrap(),
        true,
    );

    // The whole conversation significantly agrees with T1.
    let agree = &conv.repness().consensus.agree;
    assert_eq!(agree.len(), 1);
    assert_eq!(agree[0].tid, sid("1"));
    assert!(agree[0].p_test > 1.6449);

    // Ten unanimous votes, zero extremity (single-statement PCA is
    // degenerate): priority = ((11/12)² · (1 + 8·2⁻²))² rounded.
    let expected = (((11.0 / 12.0) * (11.0 / 12.0)) * 3.0_f64).powi(2).round() as i64;
    assert_eq!(conv.comment_priorities()[&sid("1")], expected);
    assert!(conv.comment_priorities()[&sid("1")] >= 0);
}

#[test]
fn scenario_single_participant_single_statement() {
    let mut conv = Conversation::with_last_updated("102", TS);
    conv.update_votes(&vote_delta(vec![("1", "1", "agree")]), true);

    let doc = conv.full_data();
    // Center is the observed column mean of the single agree vote.
    assert_eq!(doc.pca.center, vec![1.0]);
    // Components: a 2×1 zero matrix under the degenerate-input policy.
    assert_eq!(doc.pca.comps, vec![vec![0.0], vec![0.0]]);
    assert!(doc.group_clusters.is_empty());
    assert!(doc.comment_repness.is_empty());
    // Document is still fully formed.
    let rendered = conv.to_dict();
    assert!(rendered.get("group-clusters").is_some());
    assert!(rendered.get("math_tick").is_some());
}

#[test]
fn scenario_moderation_removes_a_statement() {
    let mut conv = tiny_balanced();
    let before = conv.full_data();
    assert!(before.tids.contains(&sid("1")));

    let delta: ModerationDelta = serde_json::from_value(json!({"mod_out_tids": ["1"]})).unwrap();
    conv.update_moderation(&delta, true);

    let after = conv.full_data();
    assert!(!after.tids.contains(&sid("1")));
    assert!(!after.votes_base.contains_key(&sid("1")));
    assert!(!after.group_aware_consensus.contains_key(&sid("1")));
    for gv in after.group_votes.values() {
        assert!(!gv.votes.contains_key(&sid("1")));
    }
    for entry in &after.comment_repness {
        assert_ne!(entry.tid, sid("1"));
    }
    assert!(after.mod_out.contains(&sid("1")));
    // The raw matrix keeps the moderated statement.
    assert!(conv.raw_matrix().colnames().contains(&sid("1")));
}

#[test]
fn scenario_pass_heavy_statement() {
    let mut conv = Conversation::with_last_updated("103", TS);
    let records: Vec<_> = (0..20)
        .map(|p| json!({"pid": format!("{p}"), "tid": "1", "vote": "pass"}))
        .collect();
    conv.update_votes(
        &serde_json::from_value(json!({"votes": records, "lastVoteTimestamp": TS})).unwrap(),
        true,
    );

    let doc = conv.full_data();
    let counts = doc.votes_base[&sid("1")];
    assert_eq!(counts.agree, 0);
    assert_eq!(counts.disagree, 0);
    assert_eq!(counts.total, 20);

    // Importance stays a small positive number; the rounded priority is
    // bounded well under the new-statement floor.
    let importance = cm_algo::consensus::importance_metric(0, 20, 20, 0.0);
    assert!(importance > 0.0 && importance < 0.1);
    let priority = doc.comment_priorities[&sid("1")];
    assert!(priority >= 0);
    assert!(priority < 49);
}

#[test]
fn scenario_reproducible_under_reorder() {
    let original = tiny_balanced();

    let mut shuffled_votes = tiny_balanced_votes();
    shuffled_votes.reverse();
    let mut reordered = Conversation::with_last_updated("100", TS);
    reordered.update_votes(&vote_delta(shuffled_votes), true);

    let a = original.full_data();
    let b = reordered.full_data();

    // Integer-valued state matches exactly.
    assert_eq!(a.votes_base, b.votes_base);
    assert_eq!(a.user_vote_counts, b.user_vote_counts);
    assert_eq!(a.comment_priorities, b.comment_priorities);
    let mut tids_a = a.tids.clone();
    let mut tids_b = b.tids.clone();
    tids_a.sort();
    tids_b.sort();
    assert_eq!(tids_a, tids_b);

    // Float-valued state matches to numeric noise.
    for (tid, x) in &a.group_aware_consensus {
        assert!((x - b.group_aware_consensus[tid]).abs() < 1e-9);
    }

    // Groups match as member sets, modulo cluster-id permutation.
    let member_sets = |conv: &Conversation| {
        let mut sets: Vec<Vec<ParticipantId>> = conv
            .group_clusters()
            .iter()
            .map(|c| {
                let mut m = c.members.clone();
                m.sort();
                m
            })
            .collect();
        sets.sort();
        sets
    };
    assert_eq!(member_sets(&original), member_sets(&reordered));
}

#[test]
fn applying_the_same_delta_twice_is_idempotent() {
    let mut once = Conversation::with_last_updated("104", TS);
    once.update_votes(&vote_delta(tiny_balanced_votes()), true);

    let mut twice = Conversation::with_last_updated("104", TS);
    twice.update_votes(&vote_delta(tiny_balanced_votes()), true);
    twice.update_votes(&vote_delta(tiny_balanced_votes()), true);

    let mut a = once.full_data();
    let mut b = twice.full_data();
    a.math_tick = 0;
    b.math_tick = 0;
    assert_eq!(a, b);
}

#[test]
fn recompute_is_deterministic_on_unchanged_state() {
    let mut conv = tiny_balanced();
    let first = conv.full_data();
    conv.recompute();
    let second = conv.full_data();

    assert_eq!(first.pca.center, second.pca.center);
    assert_eq!(first.pca.comment_extremity, second.pca.comment_extremity);
    assert_eq!(first.group_aware_consensus, second.group_aware_consensus);
    assert_eq!(first.comment_priorities, second.comment_priorities);
    // Member sets are equal (ids happen to be stable here too).
    assert_eq!(first.group_clusters, second.group_clusters);
}

#[test]
fn zero_data_conversation_produces_a_complete_document() {
    let mut conv = Conversation::with_last_updated("105", TS);
    conv.update_votes(
        &serde_json::from_value(json!({"votes": [], "lastVoteTimestamp": TS})).unwrap(),
        true,
    );
    let rendered = conv.to_dict();
    assert_eq!(rendered["n"], json!(0));
    assert_eq!(rendered["n-cmts"], json!(0));
    assert_eq!(rendered["tids"], json!([]));
    assert_eq!(rendered["group-clusters"], json!([]));
    assert_eq!(rendered["repness"]["comment-repness"], json!([]));
    assert!(rendered["math_tick"].as_i64().unwrap() >= 25_000);
}

#[test]
fn statement_with_no_observed_votes_is_omitted_from_consensus() {
    let mut conv = Conversation::with_last_updated("106", TS);
    conv.update_votes(
        &vote_delta(vec![("1", "1", "agree"), ("1", "2", "agree"), ("2", "1", "disagree")]),
        false,
    );
    // P1 was the only voter on T2; excluding P1 leaves T2 observed by nobody.
    let delta: ModerationDelta = serde_json::from_value(json!({"mod_out_ptpts": ["1"]})).unwrap();
    conv.update_moderation(&delta, true);

    let doc = conv.full_data();
    let t2 = doc.votes_base[&sid("2")];
    assert_eq!((t2.agree, t2.disagree, t2.total), (0, 0, 0));
    assert!(!doc.group_aware_consensus.contains_key(&sid("2")));
}

#[test]
fn document_round_trip_restores_derived_state() {
    let conv = tiny_balanced();
    let rendered = conv.to_dict();
    let parsed = parse_clojure_document(&rendered).unwrap();
    let restored = Conversation::from_dict(&parsed);

    assert_eq!(restored.conversation_id(), conv.conversation_id());
    assert_eq!(restored.last_updated(), conv.last_updated());
    assert_eq!(restored.participant_count(), conv.participant_count());
    assert_eq!(restored.comment_count(), conv.comment_count());
    assert_eq!(restored.excluded_statements(), conv.excluded_statements());
    assert_eq!(
        restored.excluded_participants(),
        conv.excluded_participants()
    );

    // PCA and projection survive within tight tolerance.
    assert_eq!(restored.pca().center.len(), conv.pca().center.len());
    for (a, b) in restored.pca().center.iter().zip(conv.pca().center.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
    for (pid, xy) in conv.projection() {
        let back = &restored.projection()[pid];
        for (a, b) in xy.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    assert_eq!(restored.group_clusters(), conv.group_clusters());
    assert_eq!(
        restored.repness().comment_repness,
        conv.repness().comment_repness
    );
    assert_eq!(restored.participant_info(), conv.participant_info());
}

#[test]
fn both_renderings_carry_the_same_semantics() {
    let conv = tiny_balanced();
    let clj = conv.to_dict();
    let dyn_doc = conv.to_dynamo_dict();

    assert_eq!(clj["zid"], dyn_doc["zid"]);
    assert_eq!(clj["n"], dyn_doc["participant_count"]);
    assert_eq!(clj["n-cmts"], dyn_doc["comment_count"]);
    assert_eq!(
        clj["votes-base"]["1"]["A"],
        dyn_doc["votes_base"]["1"]["agree"]
    );
    assert_eq!(
        clj["group-votes"]["0"]["n-members"],
        dyn_doc["group_votes"]["0"]["member_count"]
    );
    // Decimal-string rendering parses back to the same value.
    let clj_consensus = clj["group-aware-consensus"]["1"].as_f64().unwrap();
    let dyn_consensus: f64 = dyn_doc["group_consensus"]["1"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((clj_consensus - dyn_consensus).abs() < 1e-12);
}
