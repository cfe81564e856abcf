//! Property tests for the named vote matrix.

use cm_core::{NamedMatrix, ParticipantId, StatementId, Vote};
use proptest::prelude::*;

fn vote_strategy() -> impl Strategy<Value = Vote> {
    prop_oneof![
        Just(Vote::Agree),
        Just(Vote::Disagree),
        Just(Vote::Pass),
    ]
}

fn triples_strategy() -> impl Strategy<Value = Vec<(ParticipantId, StatementId, Vote)>> {
    proptest::collection::vec(
        (0u8..20, 0u8..12, vote_strategy()).prop_map(|(p, t, v)| {
            (
                ParticipantId::new(format!("p{p}")),
                StatementId::new(format!("t{t}")),
                v,
            )
        }),
        0..200,
    )
}

proptest! {
    #[test]
    fn registries_stay_duplicate_free_and_shape_consistent(triples in triples_strategy()) {
        let mut m = NamedMatrix::new();
        m.batch_update(&triples);

        let rows = m.rownames().to_vec();
        let mut dedup_rows = rows.clone();
        dedup_rows.sort();
        dedup_rows.dedup();
        prop_assert_eq!(dedup_rows.len(), rows.len());

        let cols = m.colnames().to_vec();
        let mut dedup_cols = cols.clone();
        dedup_cols.sort();
        dedup_cols.dedup();
        prop_assert_eq!(dedup_cols.len(), cols.len());

        let dense = m.dense();
        prop_assert_eq!(dense.nrows(), rows.len());
        prop_assert_eq!(dense.ncols(), cols.len());
    }

    #[test]
    fn last_write_wins_and_nothing_is_deleted(triples in triples_strategy()) {
        let mut m = NamedMatrix::new();
        m.batch_update(&triples);
        let rows_before = m.nrows();
        let cols_before = m.ncols();

        // Re-applying any suffix only overwrites; key-sets never shrink.
        let suffix: Vec<_> = triples.iter().rev().take(10).cloned().collect();
        m.batch_update(&suffix);
        prop_assert!(m.nrows() >= rows_before);
        prop_assert!(m.ncols() >= cols_before);
        prop_assert_eq!(m.nrows(), rows_before);
        prop_assert_eq!(m.ncols(), cols_before);

        // The final value of every cell is the last write for that key pair.
        for (pid, tid, _) in &triples {
            let last = triples
                .iter()
                .rev()
                .find(|(p, t, _)| p == pid && t == tid)
                .map(|(_, _, v)| *v);
            let suffix_last = suffix
                .iter()
                .rev()
                .find(|(p, t, _)| p == pid && t == tid)
                .map(|(_, _, v)| *v);
            prop_assert_eq!(m.get(pid, tid), suffix_last.or(last));
        }
    }

    #[test]
    fn subset_views_preserve_cells(triples in triples_strategy()) {
        let mut m = NamedMatrix::new();
        m.batch_update(&triples);
        let keep_rows: Vec<ParticipantId> =
            m.rownames().iter().rev().cloned().collect();
        let sub = m.rowname_subset(&keep_rows);
        prop_assert_eq!(sub.nrows(), m.nrows());
        for pid in m.rownames() {
            for tid in m.colnames() {
                prop_assert_eq!(sub.get(pid, tid), m.get(pid, tid));
            }
        }
    }
}
