//! Named sparse vote matrix.
//!
//! Semantic type: mapping `(ParticipantId, StatementId) → Vote`, with both
//! key-sets exposed as ordered sequences (insertion order of first
//! appearance). Storage is dense `f64` per row with NaN for MISSING; the two
//! registries are an ordered list plus a hash lookup into it, so row/column
//! access by name is O(1).
//!
//! A batch update never deletes rows or columns; it only grows the registries
//! and overwrites cells. Vote-alphabet validation happens upstream in the
//! orchestrator; the matrix stores whatever cells it is handed.

use std::collections::HashMap;
use std::hash::Hash;

use ndarray::{Array1, Array2};

use crate::ids::{ParticipantId, StatementId};
use crate::vote::Vote;
use crate::CoreError;

/// Ordered name registry: insertion-ordered names with O(1) index lookup.
#[derive(Clone, Debug)]
struct Registry<T: Clone + Eq + Hash> {
    names: Vec<T>,
    index: HashMap<T, usize>,
}

impl<T: Clone + Eq + Hash> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> Registry<T> {
    fn new() -> Self {
        Self {
            names: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.names.len()
    }

    fn index_of(&self, name: &T) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Index of `name`, registering it at the end if unseen.
    fn intern(&mut self, name: &T) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.clone());
        self.index.insert(name.clone(), i);
        i
    }

    /// Strict insert used when rebuilding from parts; duplicates are fatal.
    fn push_unique(&mut self, name: T) -> Result<usize, ()> {
        if self.index.contains_key(&name) {
            return Err(());
        }
        let i = self.names.len();
        self.index.insert(name.clone(), i);
        self.names.push(name);
        Ok(i)
    }
}

/// Participants × statements vote store with name-indexed access.
#[derive(Clone, Debug, Default)]
pub struct NamedMatrix {
    rows: Registry<ParticipantId>,
    cols: Registry<StatementId>,
    /// One dense row per participant, `data[i].len() == cols.len()`,
    /// NaN = MISSING.
    data: Vec<Vec<f64>>,
}

impl NamedMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a matrix from a dense block and explicit registries.
    /// Duplicate names breach the registry invariant and are fatal.
    pub fn from_parts(
        data: Array2<f64>,
        rownames: Vec<ParticipantId>,
        colnames: Vec<StatementId>,
    ) -> Result<Self, CoreError> {
        if data.nrows() != rownames.len() || data.ncols() != colnames.len() {
            return Err(CoreError::ShapeMismatch {
                rows: data.nrows(),
                cols: data.ncols(),
                name_rows: rownames.len(),
                name_cols: colnames.len(),
            });
        }
        let mut rows = Registry::new();
        for r in rownames {
            let display = r.to_string();
            rows.push_unique(r)
                .map_err(|_| CoreError::DuplicateName(display))?;
        }
        let mut cols = Registry::new();
        for c in colnames {
            let display = c.to_string();
            cols.push_unique(c)
                .map_err(|_| CoreError::DuplicateName(display))?;
        }
        let block = data
            .outer_iter()
            .map(|row| row.to_vec())
            .collect::<Vec<_>>();
        Ok(Self {
            rows,
            cols,
            data: block,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.cols.len()
    }

    /// Ordered participant names (insertion order of first appearance).
    pub fn rownames(&self) -> &[ParticipantId] {
        &self.rows.names
    }

    /// Ordered statement names (insertion order of first appearance).
    pub fn colnames(&self) -> &[StatementId] {
        &self.cols.names
    }

    pub fn row_index(&self, pid: &ParticipantId) -> Option<usize> {
        self.rows.index_of(pid)
    }

    pub fn col_index(&self, sid: &StatementId) -> Option<usize> {
        self.cols.index_of(sid)
    }

    /// Observed vote at (pid, sid); None when either name is unknown or the
    /// cell is MISSING.
    pub fn get(&self, pid: &ParticipantId, sid: &StatementId) -> Option<Vote> {
        let i = self.rows.index_of(pid)?;
        let j = self.cols.index_of(sid)?;
        Vote::from_cell(self.data[i][j])
    }

    /// Insert or overwrite cells. New participants/statements are appended to
    /// the respective ordered key-set; untouched cells remain MISSING.
    pub fn batch_update(&mut self, triples: &[(ParticipantId, StatementId, Vote)]) {
        for (pid, sid, vote) in triples {
            let j = self.cols.intern(sid);
            if j >= self.width() {
                self.grow_cols(self.cols.len());
            }
            let i = self.rows.intern(pid);
            if i >= self.data.len() {
                self.grow_rows(self.rows.len());
            }
            self.data[i][j] = vote.as_f64();
        }
    }

    fn width(&self) -> usize {
        self.data.first().map(Vec::len).unwrap_or(self.cols.len())
    }

    fn grow_cols(&mut self, new_width: usize) {
        for row in &mut self.data {
            row.resize(new_width, f64::NAN);
        }
    }

    fn grow_rows(&mut self, new_height: usize) {
        let w = self.cols.len();
        while self.data.len() < new_height {
            self.data.push(vec![f64::NAN; w]);
        }
        // Earlier rows may predate the latest column growth.
        self.grow_cols(w);
    }

    /// Copy restricted to the given ordered row names; absent names are
    /// dropped silently and the given order is preserved.
    pub fn rowname_subset(&self, names: &[ParticipantId]) -> NamedMatrix {
        let mut rows = Registry::new();
        let mut data = Vec::new();
        for name in names {
            if let Some(i) = self.rows.index_of(name) {
                if rows.push_unique(name.clone()).is_ok() {
                    let mut row = self.data[i].clone();
                    row.resize(self.cols.len(), f64::NAN);
                    data.push(row);
                }
            }
        }
        NamedMatrix {
            rows,
            cols: self.cols.clone(),
            data,
        }
    }

    /// Copy restricted to the given ordered column names; absent names are
    /// dropped silently and the given order is preserved.
    pub fn colname_subset(&self, names: &[StatementId]) -> NamedMatrix {
        let mut cols = Registry::new();
        let mut keep = Vec::new();
        for name in names {
            if let Some(j) = self.cols.index_of(name) {
                if cols.push_unique(name.clone()).is_ok() {
                    keep.push(j);
                }
            }
        }
        let data = self
            .data
            .iter()
            .map(|row| {
                keep.iter()
                    .map(|&j| row.get(j).copied().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        NamedMatrix {
            rows: self.rows.clone(),
            cols,
            data,
        }
    }

    /// Dense vector for one participant, MISSING as NaN.
    pub fn row_by_name(&self, pid: &ParticipantId) -> Option<Array1<f64>> {
        let i = self.rows.index_of(pid)?;
        let mut row = self.data[i].clone();
        row.resize(self.cols.len(), f64::NAN);
        Some(Array1::from_vec(row))
    }

    /// Dense vector for one statement, MISSING as NaN.
    pub fn col_by_name(&self, sid: &StatementId) -> Option<Array1<f64>> {
        let j = self.cols.index_of(sid)?;
        Some(Array1::from_iter(self.data.iter().map(|row| {
            row.get(j).copied().unwrap_or(f64::NAN)
        })))
    }

    /// Materialize the full numeric matrix, MISSING → NaN. Shape is exactly
    /// |rows| × |cols|.
    pub fn dense(&self) -> Array2<f64> {
        let (n, m) = (self.rows.len(), self.cols.len());
        let mut out = Array2::from_elem((n, m), f64::NAN);
        for (i, row) in self.data.iter().enumerate() {
            for (j, &x) in row.iter().enumerate().take(m) {
                out[[i, j]] = x;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    fn sid(s: &str) -> StatementId {
        StatementId::new(s)
    }

    fn tiny() -> NamedMatrix {
        let mut m = NamedMatrix::new();
        m.batch_update(&[
            (pid("p1"), sid("t1"), Vote::Agree),
            (pid("p1"), sid("t2"), Vote::Disagree),
            (pid("p2"), sid("t1"), Vote::Pass),
        ]);
        m
    }

    #[test]
    fn insertion_order_is_preserved() {
        let m = tiny();
        assert_eq!(m.rownames(), &[pid("p1"), pid("p2")]);
        assert_eq!(m.colnames(), &[sid("t1"), sid("t2")]);
    }

    #[test]
    fn dense_shape_and_missing() {
        let m = tiny();
        let d = m.dense();
        assert_eq!(d.dim(), (2, 2));
        assert_eq!(d[[0, 0]], 1.0);
        assert_eq!(d[[0, 1]], -1.0);
        assert_eq!(d[[1, 0]], 0.0);
        assert!(d[[1, 1]].is_nan());
    }

    #[test]
    fn batch_update_overwrites_and_grows() {
        let mut m = tiny();
        m.batch_update(&[
            (pid("p1"), sid("t1"), Vote::Disagree),
            (pid("p3"), sid("t3"), Vote::Agree),
        ]);
        assert_eq!(m.get(&pid("p1"), &sid("t1")), Some(Vote::Disagree));
        assert_eq!(m.get(&pid("p3"), &sid("t3")), Some(Vote::Agree));
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 3);
        // Old rows gained a MISSING cell for the new column.
        assert_eq!(m.get(&pid("p2"), &sid("t3")), None);
    }

    #[test]
    fn subsets_preserve_given_order_and_drop_absent() {
        let m = tiny();
        let s = m.rowname_subset(&[pid("p2"), pid("zz"), pid("p1")]);
        assert_eq!(s.rownames(), &[pid("p2"), pid("p1")]);
        assert_eq!(s.get(&pid("p2"), &sid("t1")), Some(Vote::Pass));

        let c = m.colname_subset(&[sid("t2")]);
        assert_eq!(c.colnames(), &[sid("t2")]);
        assert_eq!(c.dense().dim(), (2, 1));
    }

    #[test]
    fn from_parts_rejects_duplicates() {
        let data = Array2::from_elem((2, 1), 1.0);
        let err = NamedMatrix::from_parts(data, vec![pid("a"), pid("a")], vec![sid("t")]);
        assert!(matches!(err, Err(CoreError::DuplicateName(_))));
    }

    #[test]
    fn row_and_col_views() {
        let m = tiny();
        let r = m.row_by_name(&pid("p2")).unwrap();
        assert_eq!(r[0], 0.0);
        assert!(r[1].is_nan());
        let c = m.col_by_name(&sid("t2")).unwrap();
        assert_eq!(c[0], -1.0);
        assert!(c[1].is_nan());
    }
}
