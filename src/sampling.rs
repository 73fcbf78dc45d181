//! Seeded sampling primitives and the seed derivation plan.
//!
//! Two kinds of randomness flow through the generator:
//! - the dataset's own `StdRng` (contexts, importance weights, Gumbel keys, rewards);
//! - short-lived generators seeded from a [`SeedPlan`] derivation (per-dimension
//!   category draws, action sampling, reward-function coefficients).
//!
//! Both are deterministic given the base seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, Gumbel, StandardNormal};

use crate::error::{Error, Result};
use crate::tensor::Matrix;

/// Named seed derivations for every step that reseeds.
///
/// The derivations are fixed for reproducibility across versions of the
/// generator; changing any of them changes every dataset generated from a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeedPlan {
    base: u64,
}

impl SeedPlan {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    /// The instance seed.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Per-action representative category draw for dimension `d`: `base + d`.
    pub fn action_context(&self, d: usize) -> u64 {
        self.base.wrapping_add(d as u64)
    }

    /// Reward-function evaluation for dimension `d`: `base + d`.
    pub fn reward_function(&self, d: usize) -> u64 {
        self.base.wrapping_add(d as u64)
    }

    /// Behavior-policy function evaluation: `base`.
    pub fn behavior_policy(&self) -> u64 {
        self.base
    }

    /// Batched action draw from `pi_b`: `base`, reused on every batch.
    pub fn action_sampling(&self) -> u64 {
        self.base
    }

    /// Realized embedding draw for dimension `d`: the literal `d`.
    ///
    /// Independent of the base seed.
    pub fn embedding_realization(&self, d: usize) -> u64 {
        d as u64
    }
}

/// Draw one index per row of `probs` by inverse-CDF with a single uniform per row.
///
/// A fresh generator is seeded with `seed`, so the same uniforms are reused for
/// every call with the same seed. Rows are expected to be probability vectors;
/// if rounding leaves the CDF below the uniform, the last index with positive
/// mass is returned (never a zero-probability index unless the row is all zero).
pub fn sample_action_fast(probs: &Matrix<f64>, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(probs.rows());
    for row in probs.row_iter() {
        let u: f64 = rng.random();
        out.push(inverse_cdf(row, u));
    }
    out
}

fn inverse_cdf(p: &[f64], u: f64) -> usize {
    let mut cdf = 0.0;
    for (i, &pi) in p.iter().enumerate() {
        cdf += pi;
        if cdf > u {
            return i;
        }
    }
    // Numerical fallback.
    p.iter().rposition(|&x| x > 0.0).unwrap_or(0)
}

/// Uniformly random `k`-subset of `0..n` via Gumbel-max top-k.
///
/// Each index gets an independent standard Gumbel key; the indices of the `k`
/// largest keys are returned in descending key order.
pub fn gumbel_top_k<R: Rng + ?Sized>(rng: &mut R, n: usize, k: usize) -> Result<Vec<usize>> {
    let gumbel = Gumbel::new(0.0, 1.0).map_err(|e| Error::Distribution(e.to_string()))?;
    let keys: Vec<f64> = (0..n).map(|_| gumbel.sample(rng)).collect();
    let mut idx: Vec<usize> = (0..n).collect();
    // Ties are measure-zero; break them by index for a total order.
    idx.sort_by(|&a, &b| keys[b].total_cmp(&keys[a]).then(a.cmp(&b)));
    idx.truncate(k.min(n));
    Ok(idx)
}

/// One Dirichlet draw via normalized `Gamma(alpha_i, 1)` variates.
///
/// Empty `alpha` yields an empty vector. If every gamma variate underflows to
/// zero (possible for tiny concentrations), the uniform distribution is returned.
pub fn dirichlet<R: Rng + ?Sized>(rng: &mut R, alpha: &[f64]) -> Result<Vec<f64>> {
    let mut draws = Vec::with_capacity(alpha.len());
    for &a in alpha {
        let g = Gamma::new(a, 1.0).map_err(|e| Error::Distribution(e.to_string()))?;
        draws.push(g.sample(rng));
    }
    let total: f64 = draws.iter().sum();
    if alpha.is_empty() {
        return Ok(draws);
    }
    if total <= 0.0 || !total.is_finite() {
        let n = alpha.len() as f64;
        return Ok(vec![1.0 / n; alpha.len()]);
    }
    for v in draws.iter_mut() {
        *v /= total;
    }
    Ok(draws)
}

/// `rows x cols` matrix of `Normal(0, std)` draws, filled row-major.
pub fn normal_matrix<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize, std: f64) -> Matrix<f64> {
    Matrix::from_fn(rows, cols, |_, _| {
        let z: f64 = StandardNormal.sample(rng);
        std * z
    })
}
