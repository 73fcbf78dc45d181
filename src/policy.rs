//! Behavior policy and action sampling.
//!
//! For a batch of rounds this stage draws contexts and dimension-importance
//! weights, evaluates the expected reward of every category value
//! (`q_x_e`), projects it onto actions through `p(e|a)`, turns the aggregated
//! per-action reward (or supplied logits) into the behavior policy `pi_b`, and
//! samples one action per round.
//!
//! With deficient support, each round independently keeps a uniformly random
//! subset of `n_actions - n_deficient_actions` actions (Gumbel-max top-k); the
//! others get probability exactly zero.

use rand::Rng;
use tracing::trace;

use crate::alloc::{softmax, softmax_restricted};
use crate::config::{DimLayout, EmbedDatasetConfig};
use crate::embed::EmbeddingModel;
use crate::error::{Error, Result};
use crate::reward::{BehaviorPolicyFunction, RewardFunction};
use crate::sampling::{dirichlet, gumbel_top_k, normal_matrix, sample_action_fast, SeedPlan};
use crate::tensor::{Matrix, Tensor3};

/// Everything stage two hands to the realizer.
#[derive(Debug, Clone)]
pub struct BehaviorDraw {
    /// `(n_rounds, dim_context)`.
    pub context: Matrix<f64>,
    /// Importance of each internal dimension; zero on irrelevant ones, sums to 1
    /// over the relevant ones.
    pub importance: Vec<f64>,
    /// `(n_rounds, n_cat_per_dim, internal_dims)`.
    pub q_x_e: Tensor3<f64>,
    /// Importance-weighted per-action expected reward, `(n_rounds, n_actions)`.
    pub expected_reward: Matrix<f64>,
    /// `(n_rounds, n_actions)`; every row is a distribution.
    pub pi_b: Matrix<f64>,
    pub action: Vec<usize>,
}

/// Read-only inputs shared by every batch.
pub struct PolicyInputs<'a> {
    pub cfg: &'a EmbedDatasetConfig,
    pub model: &'a EmbeddingModel,
    pub seeds: SeedPlan,
    pub reward_fn: &'a dyn RewardFunction,
    pub behavior_fn: Option<&'a dyn BehaviorPolicyFunction>,
    /// Action context handed to `behavior_fn` (one-hot, `n_actions x n_actions`).
    pub policy_action_context: &'a Matrix<f64>,
}

/// Run the whole stage. Draw order on `rng`: contexts, Dirichlet concentrations,
/// Dirichlet weights, then (deficient support only) Gumbel keys.
pub fn sample_behavior<R: Rng + ?Sized>(
    rng: &mut R,
    n_rounds: usize,
    inputs: &PolicyInputs<'_>,
) -> Result<BehaviorDraw> {
    let cfg = inputs.cfg;
    let layout = cfg.layout();

    let context = normal_matrix(rng, n_rounds, cfg.dim_context, 1.0);
    let importance = sample_importance(rng, &layout)?;

    let (q_x_e, expected_reward) = expected_rewards(&context, &importance, inputs)?;

    let logits = match inputs.behavior_fn {
        None => expected_reward.clone(),
        Some(f) => {
            let l = f.logits(
                &context,
                inputs.policy_action_context,
                inputs.seeds.behavior_policy(),
            );
            if l.shape() != (n_rounds, cfg.n_actions) {
                return Err(Error::ShapeMismatch {
                    what: "behavior policy function",
                    expected: (n_rounds, cfg.n_actions),
                    got: l.shape(),
                });
            }
            l
        }
    };

    let pi_b = behavior_policy(rng, &logits, cfg)?;
    let action = sample_action_fast(&pi_b, inputs.seeds.action_sampling());
    trace!(n_rounds, "sampled behavior actions");

    Ok(BehaviorDraw {
        context,
        importance,
        q_x_e,
        expected_reward,
        pi_b,
        action,
    })
}

/// Dirichlet importance over the relevant dimensions, zero elsewhere.
///
/// Concentrations are themselves `Uniform(0, 1)` draws, so the weights differ
/// from batch to batch.
pub fn sample_importance<R: Rng + ?Sized>(rng: &mut R, layout: &DimLayout) -> Result<Vec<f64>> {
    let mut importance = vec![0.0; layout.internal()];
    let alpha: Vec<f64> = (0..layout.n_relevant())
        // Gamma needs a strictly positive shape; `random` can return exactly 0.
        .map(|_| rng.random::<f64>().max(f64::MIN_POSITIVE))
        .collect();
    let w = dirichlet(rng, &alpha)?;
    importance[layout.irrelevant_end()..].copy_from_slice(&w);
    Ok(importance)
}

/// `q_x_e` for every internal dimension and its importance-weighted projection
/// onto actions: `q_x_a = sum_d w_d * q_x_e[:, :, d] @ p_e_a[:, :, d]^T`.
fn expected_rewards(
    context: &Matrix<f64>,
    importance: &[f64],
    inputs: &PolicyInputs<'_>,
) -> Result<(Tensor3<f64>, Matrix<f64>)> {
    let cfg = inputs.cfg;
    let n_rounds = context.rows();
    let n_dim = cfg.layout().internal();
    let k = cfg.n_cat_per_dim;

    let mut q_x_e = Tensor3::zeros(n_rounds, k, n_dim);
    let mut q_x_a = Matrix::zeros(n_rounds, cfg.n_actions);
    for (d, &w) in importance.iter().enumerate().take(n_dim) {
        let q = inputs.reward_fn.expected_reward(
            context,
            &inputs.model.latent_dim(d),
            inputs.seeds.reward_function(d),
        );
        if q.shape() != (n_rounds, k) {
            return Err(Error::ShapeMismatch {
                what: "reward function",
                expected: (n_rounds, k),
                got: q.shape(),
            });
        }
        for i in 0..n_rounds {
            for c in 0..k {
                q_x_e.set(i, c, d, q.get(i, c));
            }
        }
        let projected = q
            .matmul_transposed(&inputs.model.p_e_a_dim(d))
            .ok_or_else(|| Error::ShapeMismatch {
                what: "p_e_a projection",
                expected: (cfg.n_actions, k),
                got: inputs.model.p_e_a_dim(d).shape(),
            })?;
        for i in 0..n_rounds {
            let row = q_x_a.row_mut(i);
            for (acc, &v) in row.iter_mut().zip(projected.row(i)) {
                *acc += w * v;
            }
        }
    }
    Ok((q_x_e, q_x_a))
}

/// `softmax(beta * logits)` per round, optionally restricted to a random support.
///
/// Every scaled logit that can receive mass must be finite; otherwise
/// [`Error::NonFiniteLogits`] is returned.
pub fn behavior_policy<R: Rng + ?Sized>(
    rng: &mut R,
    logits: &Matrix<f64>,
    cfg: &EmbedDatasetConfig,
) -> Result<Matrix<f64>> {
    let (n_rounds, n_actions) = logits.shape();
    let mut pi_b = Matrix::zeros(n_rounds, n_actions);
    if cfg.n_deficient_actions > 0 {
        let n_supported = cfg.n_supported_actions();
        for i in 0..n_rounds {
            let support = gumbel_top_k(rng, n_actions, n_supported)?;
            check_scaled_logits(i, logits.row(i), support.iter().copied(), cfg.beta)?;
            let p = softmax_restricted(logits.row(i), &support, cfg.beta);
            pi_b.row_mut(i).copy_from_slice(&p);
        }
    } else {
        for i in 0..n_rounds {
            check_scaled_logits(i, logits.row(i), 0..n_actions, cfg.beta)?;
            let p = softmax(logits.row(i), cfg.beta);
            pi_b.row_mut(i).copy_from_slice(&p);
        }
    }
    Ok(pi_b)
}

fn check_scaled_logits(
    round: usize,
    row: &[f64],
    actions: impl IntoIterator<Item = usize>,
    beta: f64,
) -> Result<()> {
    for action in actions {
        let value = beta * row[action];
        if !value.is_finite() {
            return Err(Error::NonFiniteLogits {
                round,
                action,
                value,
            });
        }
    }
    Ok(())
}
