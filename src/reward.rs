//! Pluggable expected-reward and behavior-policy functions.
//!
//! Both contracts take a context matrix `(n_rounds x dim_context)`, an
//! action-context matrix `(n_items x dim_item)` and a seed, and return an
//! `(n_rounds x n_items)` matrix. The generator evaluates the reward function
//! once per embedding dimension with that dimension's latent category
//! parameters as the action context.
//!
//! Closures with the matching signature implement both traits.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::alloc::sigmoid;
use crate::tensor::{dot, Matrix};

/// Expected reward of every (round, item) pair.
///
/// For binary rewards the output must lie in `[0, 1]`.
pub trait RewardFunction {
    fn expected_reward(&self, context: &Matrix<f64>, action_context: &Matrix<f64>, seed: u64)
        -> Matrix<f64>;
}

/// Behavior-policy logits of every (round, action) pair.
pub trait BehaviorPolicyFunction {
    fn logits(&self, context: &Matrix<f64>, action_context: &Matrix<f64>, seed: u64) -> Matrix<f64>;
}

impl<F> RewardFunction for F
where
    F: Fn(&Matrix<f64>, &Matrix<f64>, u64) -> Matrix<f64>,
{
    fn expected_reward(
        &self,
        context: &Matrix<f64>,
        action_context: &Matrix<f64>,
        seed: u64,
    ) -> Matrix<f64> {
        self(context, action_context, seed)
    }
}

impl<F> BehaviorPolicyFunction for F
where
    F: Fn(&Matrix<f64>, &Matrix<f64>, u64) -> Matrix<f64>,
{
    fn logits(&self, context: &Matrix<f64>, action_context: &Matrix<f64>, seed: u64) -> Matrix<f64> {
        self(context, action_context, seed)
    }
}

/// Degree-1 linear score with random coefficients, z-scored over the whole output.
///
/// A degree-1 simplification: there are no polynomial feature expansions and
/// no rescaling by degree after z-scoring, so the reward signal is weaker than
/// a degree-3 polynomial model would give.
///
/// `s(x, a) = x·c_x + e_a·c_a + x^T C e_a`, coefficients iid `Uniform(-1, 1)`
/// drawn from a generator seeded with `seed`.
fn linear_scores(context: &Matrix<f64>, action_context: &Matrix<f64>, seed: u64) -> Matrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dx = context.cols();
    let de = action_context.cols();
    let context_coef: Vec<f64> = (0..dx).map(|_| rng.random_range(-1.0..1.0)).collect();
    let action_coef: Vec<f64> = (0..de).map(|_| rng.random_range(-1.0..1.0)).collect();
    let cross: Matrix<f64> = Matrix::from_fn(dx, de, |_, _| rng.random_range(-1.0..1.0));

    let context_values: Vec<f64> = context.row_iter().map(|x| dot(x, &context_coef)).collect();
    let action_values: Vec<f64> = action_context
        .row_iter()
        .map(|e| dot(e, &action_coef))
        .collect();
    // x^T C, one row per round.
    let projected: Matrix<f64> = Matrix::from_fn(context.rows(), de, |i, k| {
        (0..dx).map(|j| context.get(i, j) * cross.get(j, k)).sum::<f64>()
    });

    let raw = Matrix::from_fn(context.rows(), action_context.rows(), |i, a| {
        context_values[i] + action_values[a] + dot(projected.row(i), action_context.row(a))
    });
    z_score(raw)
}

fn z_score(m: Matrix<f64>) -> Matrix<f64> {
    let mean = m.mean();
    let n = m.as_slice().len().max(1) as f64;
    let var = m.as_slice().iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    let (rows, cols) = m.shape();
    let data = m
        .into_vec()
        .into_iter()
        .map(|v| {
            if std > 0.0 && std.is_finite() {
                (v - mean) / std
            } else {
                v - mean
            }
        })
        .collect();
    Matrix::from_vec(rows, cols, data).unwrap_or_else(|| Matrix::zeros(rows, cols))
}

/// Sigmoid of the degree-1 linear score; default for binary rewards.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticReward;

impl RewardFunction for LogisticReward {
    fn expected_reward(
        &self,
        context: &Matrix<f64>,
        action_context: &Matrix<f64>,
        seed: u64,
    ) -> Matrix<f64> {
        let s = linear_scores(context, action_context, seed);
        let (rows, cols) = s.shape();
        Matrix::from_fn(rows, cols, |i, j| sigmoid(s.get(i, j)))
    }
}

/// The degree-1 linear score itself; default for continuous rewards.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearReward;

impl RewardFunction for LinearReward {
    fn expected_reward(
        &self,
        context: &Matrix<f64>,
        action_context: &Matrix<f64>,
        seed: u64,
    ) -> Matrix<f64> {
        linear_scores(context, action_context, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Matrix<f64> {
        Matrix::from_fn(50, 3, |i, j| ((i * 7 + j * 3) % 11) as f64 / 5.0 - 1.0)
    }

    fn items() -> Matrix<f64> {
        Matrix::from_fn(4, 2, |a, k| (a as f64 - 1.5) * if k == 0 { 1.0 } else { -0.5 })
    }

    #[test]
    fn logistic_is_a_probability() {
        let q = LogisticReward.expected_reward(&ctx(), &items(), 1);
        assert_eq!(q.shape(), (50, 4));
        assert!(q.as_slice().iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn linear_is_z_scored() {
        let q = LinearReward.expected_reward(&ctx(), &items(), 2);
        assert!(q.mean().abs() < 1e-9);
        let var = q.as_slice().iter().map(|v| v * v).sum::<f64>() / q.as_slice().len() as f64;
        assert!((var - 1.0).abs() < 1e-9);
    }

    #[test]
    fn seed_controls_coefficients() {
        let a = LinearReward.expected_reward(&ctx(), &items(), 5);
        let b = LinearReward.expected_reward(&ctx(), &items(), 5);
        let c = LinearReward.expected_reward(&ctx(), &items(), 6);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn constant_output_is_centered_not_nan() {
        let one = Matrix::from_fn(1, 1, |_, _| 0.3);
        let q = LinearReward.expected_reward(&one, &Matrix::from_fn(1, 1, |_, _| 1.0), 0);
        assert_eq!(q.as_slice(), &[0.0]);
    }

    #[test]
    fn closures_implement_the_contracts() {
        let f = |x: &Matrix<f64>, e: &Matrix<f64>, _seed: u64| -> Matrix<f64> {
            Matrix::zeros(x.rows(), e.rows())
        };
        let q = RewardFunction::expected_reward(&f, &ctx(), &items(), 0);
        assert_eq!(q.shape(), (50, 4));
        let l = BehaviorPolicyFunction::logits(&f, &ctx(), &items(), 0);
        assert_eq!(l.shape(), (50, 4));
    }
}
