//! Statistics kernel: proportion z-tests with Laplace smoothing, the two
//! significance gates used throughout the engine, and the descriptive
//! utilities exercised by the test-suite.
//!
//! The hot path is `prop_test` / `two_prop_test` / the `z_sig_*` gates; the
//! rest (confidence intervals, binomial and Fisher tests, entropy, Gini) are
//! supporting utilities.

use cm_core::EngineRng;
use statrs::distribution::{
    Beta, Binomial, ContinuousCDF, Discrete, Hypergeometric, Normal, StudentsT,
};

/// 90% two-sided significance threshold on |z|.
pub const Z_90: f64 = 1.2816;
/// 95% two-sided significance threshold on |z|.
pub const Z_95: f64 = 1.6449;

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("unit normal parameters are valid")
}

/// One-sample z for H0: p = 0.5, with Laplace smoothing.
///
/// p̂ = (a+1)/(n+2), SE = sqrt(p̂(1−p̂)/(n+2)). Finite for all inputs,
/// including n = 0.
pub fn prop_test(successes: u64, trials: u64) -> f64 {
    let n = trials as f64;
    let p_hat = (successes as f64 + 1.0) / (n + 2.0);
    let se = (p_hat * (1.0 - p_hat) / (n + 2.0)).sqrt();
    (p_hat - 0.5) / se
}

/// Two-sample z comparing Laplace-smoothed proportions under a
/// pooled-variance approximation.
pub fn two_prop_test(succ_in: u64, n_in: u64, succ_out: u64, n_out: u64) -> f64 {
    let n1 = n_in as f64 + 2.0;
    let n2 = n_out as f64 + 2.0;
    let p1 = (succ_in as f64 + 1.0) / n1;
    let p2 = (succ_out as f64 + 1.0) / n2;
    let pooled = (succ_in as f64 + succ_out as f64 + 2.0) / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();
    (p1 - p2) / se
}

/// |z| exceeds the 90% gate.
pub fn z_sig_90(z: f64) -> bool {
    z.abs() > Z_90
}

/// |z| exceeds the 95% gate.
pub fn z_sig_95(z: f64) -> bool {
    z.abs() > Z_95
}

/// Two-sided normal p-value for a z-score.
pub fn p_value(z: f64) -> f64 {
    2.0 * (1.0 - std_normal().cdf(z.abs()))
}

/// Weighted population standard deviation. With `None` weights this matches
/// the unweighted population stddev.
pub fn weighted_stddev(values: &[f64], weights: Option<&[f64]>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let uniform = vec![1.0; values.len()];
    let w = weights.unwrap_or(&uniform);
    let total: f64 = w.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mean: f64 = values.iter().zip(w).map(|(x, wi)| x * wi).sum::<f64>() / total;
    let var: f64 = values
        .iter()
        .zip(w)
        .map(|(x, wi)| wi * (x - mean).powi(2))
        .sum::<f64>()
        / total;
    var.sqrt()
}

/// 95% confidence interval for the mean, Student's t on n−1 degrees of
/// freedom. Degenerate inputs collapse to (mean, mean).
pub fn ci_95(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n < 2 {
        let m = values.first().copied().unwrap_or(0.0);
        return (m, m);
    }
    let nf = n as f64;
    let mean: f64 = values.iter().sum::<f64>() / nf;
    let var: f64 = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    let stderr = (var / nf).sqrt();
    let t = match StudentsT::new(0.0, 1.0, nf - 1.0) {
        Ok(dist) => dist.inverse_cdf(0.975),
        Err(_) => return (mean, mean),
    };
    (mean - t * stderr, mean + t * stderr)
}

/// Bayesian 95% credible interval for a proportion, Beta(a+1, n−a+1)
/// posterior under a uniform prior.
pub fn bayesian_ci_95(successes: u64, trials: u64) -> (f64, f64) {
    let a = successes as f64 + 1.0;
    let b = (trials - successes.min(trials)) as f64 + 1.0;
    match Beta::new(a, b) {
        Ok(dist) => (dist.inverse_cdf(0.025), dist.inverse_cdf(0.975)),
        Err(_) => (0.0, 1.0),
    }
}

/// Percentile bootstrap 95% CI for an arbitrary statistic.
pub fn bootstrap_ci_95<F>(values: &[f64], statistic: F, resamples: usize, rng: &mut EngineRng) -> (f64, f64)
where
    F: Fn(&[f64]) -> f64,
{
    if values.is_empty() || resamples == 0 {
        return (0.0, 0.0);
    }
    let n = values.len();
    let mut stats = Vec::with_capacity(resamples);
    let mut resample = vec![0.0; n];
    for _ in 0..resamples {
        for slot in resample.iter_mut() {
            let i = rng.gen_range(n as u64).unwrap_or(0) as usize;
            *slot = values[i];
        }
        stats.push(statistic(&resample));
    }
    stats.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    let lo = ((resamples as f64) * 0.025).floor() as usize;
    let hi = (((resamples as f64) * 0.975).ceil() as usize).min(resamples - 1);
    (stats[lo.min(resamples - 1)], stats[hi])
}

/// Two-sided exact binomial test: total probability of outcomes no more
/// likely than the observed count.
pub fn binomial_test(successes: u64, trials: u64, p: f64) -> f64 {
    if trials == 0 {
        return 1.0;
    }
    let dist = match Binomial::new(p, trials) {
        Ok(d) => d,
        Err(_) => return 1.0,
    };
    let observed = dist.pmf(successes.min(trials));
    let cutoff = observed * (1.0 + 1e-7);
    let total: f64 = (0..=trials)
        .map(|k| dist.pmf(k))
        .filter(|&pk| pk <= cutoff)
        .sum();
    total.min(1.0)
}

/// Fisher's exact test (two-sided) on a 2×2 table. Returns
/// `(odds_ratio, p_value)`; the odds ratio is infinite when the off-diagonal
/// product is zero.
pub fn fisher_exact_test(table: [[u64; 2]; 2]) -> (f64, f64) {
    let [[a, b], [c, d]] = table;
    let odds = {
        let num = (a * d) as f64;
        let den = (b * c) as f64;
        if den == 0.0 {
            f64::INFINITY
        } else {
            num / den
        }
    };
    let population = a + b + c + d;
    if population == 0 {
        return (odds, 1.0);
    }
    let successes = a + b;
    let draws = a + c;
    let dist = match Hypergeometric::new(population, successes, draws) {
        Ok(h) => h,
        Err(_) => return (odds, 1.0),
    };
    let observed = dist.pmf(a);
    let cutoff = observed * (1.0 + 1e-7);
    let k_min = draws.saturating_sub(population - successes);
    let k_max = draws.min(successes);
    let p: f64 = (k_min..=k_max)
        .map(|k| dist.pmf(k))
        .filter(|&pk| pk <= cutoff)
        .sum();
    (odds, p.min(1.0))
}

/// Shannon entropy in bits of a probability vector (zero entries ignored).
pub fn shannon_entropy(probs: &[f64]) -> f64 {
    -probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.log2())
        .sum::<f64>()
}

/// Gini coefficient of a non-negative sample.
pub fn gini_coefficient(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    let nf = n as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (2.0 * (i as f64 + 1.0) - nf - 1.0) * x)
        .sum();
    weighted / (nf * total)
}
