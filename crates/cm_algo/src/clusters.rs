//! k-means clustering of participant projections with automatic selection
//! of k.
//!
//! Candidates k ∈ {2..5} (capped by the participant count) are each fit with
//! k-means++ and scored by mean silhouette; the best score wins and ties go
//! to the lower k. Clusters smaller than `MIN_CLUSTER_SIZE` trigger a re-run
//! with k−1 when the conversation is large enough to sustain the rule.
//! Cluster ids are assigned by decreasing member count (earliest member row
//! breaks ties), which keeps identities stable across recomputations of the
//! same projection.

use cm_core::{EngineRng, ParticipantId};
use ndarray::ArrayView2;
use tracing::debug;

use crate::AlgoError;

pub const K_MIN: usize = 2;
pub const K_MAX: usize = 5;
/// Smallest viable cluster; below this the candidate k is reduced.
pub const MIN_CLUSTER_SIZE: usize = 3;

const MAX_ITERS: usize = 100;
const SHIFT_EPS: f64 = 1e-9;

/// One opinion group: stable id, centroid in projection space, members in
/// matrix row order.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub id: usize,
    pub center: Vec<f64>,
    pub members: Vec<ParticipantId>,
}

/// Cluster the projection matrix (one row per participant, in the same order
/// as `ids`). Fewer than `K_MIN` participants yield no clusters.
pub fn cluster_projections(
    ids: &[ParticipantId],
    points: ArrayView2<'_, f64>,
    seed: u64,
) -> Result<Vec<Cluster>, AlgoError> {
    let p = points.nrows();
    if ids.len() != p {
        return Err(AlgoError::NumericFailure {
            stage: "clusters",
            detail: format!("{} ids for {} projection rows", ids.len(), p),
        });
    }
    if p < K_MIN {
        return Ok(Vec::new());
    }

    let k_cap = K_MAX.min(p);
    let mut best: Option<(usize, f64, Vec<usize>)> = None;
    for k in K_MIN..=k_cap {
        let mut rng = EngineRng::from_seed_u64(seed.wrapping_add(k as u64));
        let assign = kmeans(points, k, &mut rng);
        let score = mean_silhouette(points, &assign);
        debug!(k, score, "k-means candidate scored");
        let better = match &best {
            Some((_, best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((k, score, assign));
        }
    }

    let (mut k, _, mut assign) = best.ok_or_else(|| AlgoError::NumericFailure {
        stage: "clusters",
        detail: "no k-means candidate produced a partition".to_string(),
    })?;

    // Re-run with k−1 while an undersized cluster exists, but only when the
    // conversation can sustain two clusters of the minimum size at all.
    if p >= 2 * MIN_CLUSTER_SIZE {
        while k > K_MIN && smallest_cluster(&assign, k) < MIN_CLUSTER_SIZE {
            k -= 1;
            let mut rng = EngineRng::from_seed_u64(seed.wrapping_add(k as u64));
            assign = kmeans(points, k, &mut rng);
        }
    }

    Ok(build_clusters(ids, points, &assign, k))
}

/// Lloyd iterations with k-means++ seeding. Returns the assignment vector;
/// convergence is reached when assignments stop changing or every centroid
/// moves less than `SHIFT_EPS`.
fn kmeans(points: ArrayView2<'_, f64>, k: usize, rng: &mut EngineRng) -> Vec<usize> {
    let p = points.nrows();
    let dim = points.ncols();
    let mut centers = init_plus_plus(points, k, rng);
    let mut assign = vec![0usize; p];

    for _ in 0..MAX_ITERS {
        let mut changed = false;
        for i in 0..p {
            let c = nearest_center(points, i, &centers);
            if assign[i] != c {
                assign[i] = c;
                changed = true;
            }
        }

        let mut shift: f64 = 0.0;
        for (c, center) in centers.iter_mut().enumerate() {
            let mut sum = vec![0.0; dim];
            let mut count = 0usize;
            for i in 0..p {
                if assign[i] == c {
                    for (s, &x) in sum.iter_mut().zip(points.row(i).iter()) {
                        *s += x;
                    }
                    count += 1;
                }
            }
            if count > 0 {
                let mut moved = 0.0;
                for (d, s) in center.iter_mut().zip(sum) {
                    let new = s / count as f64;
                    moved += (*d - new) * (*d - new);
                    *d = new;
                }
                shift = shift.max(moved.sqrt());
            }
        }

        if !changed || shift < SHIFT_EPS {
            break;
        }
    }
    assign
}

fn init_plus_plus(points: ArrayView2<'_, f64>, k: usize, rng: &mut EngineRng) -> Vec<Vec<f64>> {
    let p = points.nrows();
    let first = rng.gen_range(p as u64).unwrap_or(0) as usize;
    let mut centers = vec![points.row(first).to_vec()];
    let mut dist2 = vec![0.0f64; p];
    for i in 0..p {
        dist2[i] = sq_dist(points, i, &centers[0]);
    }
    while centers.len() < k {
        let pick = rng.pick_weighted(&dist2).unwrap_or(0);
        let center = points.row(pick).to_vec();
        for i in 0..p {
            dist2[i] = dist2[i].min(sq_dist(points, i, &center));
        }
        centers.push(center);
    }
    centers
}

fn sq_dist(points: ArrayView2<'_, f64>, i: usize, center: &[f64]) -> f64 {
    points
        .row(i)
        .iter()
        .zip(center)
        .map(|(&a, &b)| (a - b) * (a - b))
        .sum()
}

fn nearest_center(points: ArrayView2<'_, f64>, i: usize, centers: &[Vec<f64>]) -> usize {
    let mut best = 0usize;
    let mut best_d = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = sq_dist(points, i, center);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

fn smallest_cluster(assign: &[usize], k: usize) -> usize {
    let mut sizes = vec![0usize; k];
    for &c in assign {
        sizes[c] += 1;
    }
    sizes.into_iter().filter(|&s| s > 0).min().unwrap_or(0)
}

/// Mean silhouette over all points. Singleton clusters score 0 for their
/// point; k < 2 effective clusters scores 0 overall.
fn mean_silhouette(points: ArrayView2<'_, f64>, assign: &[usize]) -> f64 {
    let p = points.nrows();
    if p == 0 {
        return 0.0;
    }
    let k = assign.iter().copied().max().map(|m| m + 1).unwrap_or(0);
    let mut sizes = vec![0usize; k];
    for &c in assign {
        sizes[c] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..p {
        let own = assign[i];
        if sizes[own] <= 1 {
            continue; // silhouette of a singleton is 0
        }
        let here = points.row(i).to_vec();
        let mut sums = vec![0.0f64; k];
        for j in 0..p {
            if i == j {
                continue;
            }
            let d = sq_dist(points, j, &here).sqrt();
            sums[assign[j]] += d;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let mut b = f64::INFINITY;
        for c in 0..k {
            if c != own && sizes[c] > 0 {
                b = b.min(sums[c] / sizes[c] as f64);
            }
        }
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / p as f64
}

/// Materialize ordered clusters from an assignment: drop empties, sort by
/// decreasing size (earliest member row breaks ties), re-id from 0, and
/// recompute centers from final membership.
fn build_clusters(
    ids: &[ParticipantId],
    points: ArrayView2<'_, f64>,
    assign: &[usize],
    k: usize,
) -> Vec<Cluster> {
    let dim = points.ncols();
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &c) in assign.iter().enumerate() {
        buckets[c].push(i);
    }
    buckets.retain(|b| !b.is_empty());
    buckets.sort_by_key(|b| (usize::MAX - b.len(), b[0]));

    buckets
        .into_iter()
        .enumerate()
        .map(|(id, rows)| {
            let mut center = vec![0.0; dim];
            for &i in &rows {
                for (d, &x) in center.iter_mut().zip(points.row(i).iter()) {
                    *d += x;
                }
            }
            for d in center.iter_mut() {
                *d /= rows.len() as f64;
            }
            Cluster {
                id,
                center,
                members: rows.into_iter().map(|i| ids[i].clone()).collect(),
            }
        })
        .collect()
}
