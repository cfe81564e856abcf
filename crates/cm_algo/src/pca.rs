//! Principal-component projection of participants.
//!
//! Fits the top-k right singular vectors of the mean-centered rating matrix
//! (MISSING → 0, column means over observed entries) by deflated power
//! iteration, so no external linear-algebra backend is needed. Sign of the
//! components is not fixed; consumers must rely only on pairwise geometry.

use cm_core::EngineRng;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Default projection dimensionality.
pub const DEFAULT_COMPONENTS: usize = 2;

const MAX_POWER_ITERS: usize = 200;
const CONVERGENCE_TOL: f64 = 1e-10;
const NORM_FLOOR: f64 = 1e-12;

/// Fitted PCA state.
#[derive(Clone, Debug, PartialEq)]
pub struct PcaFit {
    /// Column means over observed entries (length N).
    pub center: Array1<f64>,
    /// Top-k right singular vectors as rows (k × N). Rows are zero when the
    /// centered matrix is degenerate.
    pub components: Array2<f64>,
    /// Euclidean norm of each component column: how much a statement spreads
    /// participants across the principal directions (length N).
    pub comment_extremity: Array1<f64>,
}

impl PcaFit {
    /// A fit with the given center and all-zero components, used for
    /// degenerate inputs.
    pub fn degenerate(center: Array1<f64>, k: usize) -> Self {
        let n = center.len();
        PcaFit {
            center,
            components: Array2::zeros((k, n)),
            comment_extremity: Array1::zeros(n),
        }
    }

    /// Project one participant row (MISSING → 0) into component space.
    pub fn project(&self, row: ArrayView1<'_, f64>) -> Array1<f64> {
        let filled = Array1::from_iter(
            row.iter()
                .zip(self.center.iter())
                .map(|(&x, &c)| if x.is_nan() { 0.0 } else { x } - c),
        );
        self.components.dot(&filled)
    }
}

/// Column means over observed (non-NaN) entries; empty columns center at 0.
fn observed_column_means(matrix: ArrayView2<'_, f64>) -> Array1<f64> {
    let n = matrix.ncols();
    let mut means = Array1::zeros(n);
    for (j, col) in matrix.columns().into_iter().enumerate() {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &x in col.iter() {
            if !x.is_nan() {
                sum += x;
                count += 1;
            }
        }
        if count > 0 {
            means[j] = sum / count as f64;
        }
    }
    means
}

/// Fit the top-k components of the rating matrix (NaN = MISSING).
///
/// Degenerate inputs (fewer than 2 rows or columns, or a centered matrix of
/// negligible norm) produce zero components with the true column means as
/// the center.
pub fn fit(matrix: ArrayView2<'_, f64>, k: usize, rng: &mut EngineRng) -> PcaFit {
    let (p, n) = matrix.dim();
    let center = observed_column_means(matrix);
    if p < 2 || n < 2 {
        return PcaFit::degenerate(center, k);
    }

    // MISSING → 0, then subtract the center.
    let mut x = Array2::zeros((p, n));
    for ((i, j), &v) in matrix.indexed_iter() {
        x[[i, j]] = if v.is_nan() { 0.0 } else { v } - center[j];
    }

    let mut components = Array2::zeros((k, n));
    let mut found = 0usize;
    for _ in 0..k {
        match power_iterate(&x, &components, found, rng) {
            Some(v) => {
                components.row_mut(found).assign(&v);
                found += 1;
            }
            // Remaining spectrum is numerically zero; lower rows stay zero.
            None => break,
        }
    }

    let mut extremity = Array1::zeros(n);
    for j in 0..n {
        let mut sq = 0.0;
        for c in 0..k {
            sq += components[[c, j]] * components[[c, j]];
        }
        extremity[j] = sq.sqrt();
    }

    PcaFit {
        center,
        components,
        comment_extremity: extremity,
    }
}

/// Project every row of the matrix; returns one point per row.
pub fn project_rows(fit: &PcaFit, matrix: ArrayView2<'_, f64>) -> Vec<Array1<f64>> {
    matrix.rows().into_iter().map(|r| fit.project(r)).collect()
}

/// One deflated power-iteration pass: the dominant right singular vector of
/// `x` orthogonal to the `found` rows already in `components`.
fn power_iterate(
    x: &Array2<f64>,
    components: &Array2<f64>,
    found: usize,
    rng: &mut EngineRng,
) -> Option<Array1<f64>> {
    let n = x.ncols();
    let mut v = Array1::from_iter((0..n).map(|_| rng.next_f64() - 0.5));
    orthogonalize(&mut v, components, found);
    if !normalize(&mut v) {
        return None;
    }

    for _ in 0..MAX_POWER_ITERS {
        let u = x.dot(&v);
        let mut w = x.t().dot(&u);
        orthogonalize(&mut w, components, found);
        if !normalize(&mut w) {
            return None;
        }
        let alignment = v.dot(&w).abs();
        v = w;
        if 1.0 - alignment < CONVERGENCE_TOL {
            break;
        }
    }
    Some(v)
}

fn orthogonalize(v: &mut Array1<f64>, components: &Array2<f64>, found: usize) {
    for c in 0..found {
        let row = components.row(c);
        let proj = v.dot(&row);
        for (vi, &ri) in v.iter_mut().zip(row.iter()) {
            *vi -= proj * ri;
        }
    }
}

fn normalize(v: &mut Array1<f64>) -> bool {
    let norm = v.dot(&*v).sqrt();
    if norm < NORM_FLOOR {
        return false;
    }
    v.mapv_inplace(|x| x / norm);
    true
}
