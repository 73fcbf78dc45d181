//! Embedding and reward realization.
//!
//! Given the sampled actions, draw one category per embedding dimension from
//! `p(e|a)`, marginalize `q_x_e` over dimensions with the batch's importance
//! weights to get the factual expected reward, and draw the observed reward.

use rand::Rng;
use rand_distr::{Binomial, Distribution, Normal};

use crate::config::EmbedDatasetConfig;
use crate::embed::EmbeddingModel;
use crate::error::{Error, Result};
use crate::policy::BehaviorDraw;
use crate::sampling::{sample_action_fast, SeedPlan};
use crate::tensor::Matrix;
use crate::RewardType;

const PROB_TOL: f64 = 1e-12;

/// Output of the realization stage (internal layout).
#[derive(Debug, Clone)]
pub struct Realization {
    /// `(n_rounds, internal_dims)` category indices.
    pub action_embed: Matrix<usize>,
    /// `sum_d w_d * q_x_e[i, e_id, d]`.
    pub expected_reward_factual: Vec<f64>,
    pub reward: Vec<f64>,
}

/// Observed-reward distribution, chosen once per batch.
#[derive(Debug, Clone, Copy)]
pub enum RewardSampler {
    /// `Binomial(1, q)`.
    Bernoulli,
    /// `Normal(q, std)`.
    Gaussian { std: f64 },
}

impl RewardSampler {
    pub fn for_config(cfg: &EmbedDatasetConfig) -> Self {
        match cfg.reward_type {
            RewardType::Binary => RewardSampler::Bernoulli,
            RewardType::Continuous => RewardSampler::Gaussian {
                std: cfg.reward_std,
            },
        }
    }

    /// One reward per expectation, in order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, expected: &[f64]) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(expected.len());
        match *self {
            RewardSampler::Bernoulli => {
                for (round, &q) in expected.iter().enumerate() {
                    // Weighted sums of probabilities can overshoot by rounding only.
                    if !(-PROB_TOL..=1.0 + PROB_TOL).contains(&q) {
                        return Err(Error::InvalidProbability { round, value: q });
                    }
                    let b = Binomial::new(1, q.clamp(0.0, 1.0)).map_err(|e| Error::Distribution(e.to_string()))?;
                    out.push(b.sample(rng) as f64);
                }
            }
            RewardSampler::Gaussian { std } => {
                for &q in expected {
                    let n = Normal::new(q, std).map_err(|e| Error::Distribution(e.to_string()))?;
                    out.push(n.sample(rng));
                }
            }
        }
        Ok(out)
    }
}

/// Realize embeddings and rewards for a behavior draw.
///
/// Embedding draws use a fresh generator per dimension seeded by
/// [`SeedPlan::embedding_realization`]; rewards are drawn from `rng`.
pub fn realize<R: Rng + ?Sized>(
    rng: &mut R,
    draw: &BehaviorDraw,
    model: &EmbeddingModel,
    cfg: &EmbedDatasetConfig,
    seeds: &SeedPlan,
) -> Result<Realization> {
    let n_rounds = draw.action.len();
    let n_dim = cfg.layout().internal();
    let k = cfg.n_cat_per_dim;

    let mut action_embed = Matrix::zeros(n_rounds, n_dim);
    for d in 0..n_dim {
        let probs = Matrix::from_fn(n_rounds, k, |i, c| model.p_e_a.get(draw.action[i], c, d));
        let cats = sample_action_fast(&probs, seeds.embedding_realization(d));
        for (i, c) in cats.into_iter().enumerate() {
            action_embed.set(i, d, c);
        }
    }

    let expected_reward_factual: Vec<f64> = (0..n_rounds)
        .map(|i| {
            draw.importance
                .iter()
                .enumerate()
                .map(|(d, &w)| w * draw.q_x_e.get(i, action_embed.get(i, d), d))
                .sum::<f64>()
        })
        .collect();

    let reward = RewardSampler::for_config(cfg).sample(rng, &expected_reward_factual)?;

    Ok(Realization {
        action_embed,
        expected_reward_factual,
        reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn bernoulli_rewards_are_binary() {
        let mut rng = StdRng::seed_from_u64(0);
        let q = vec![0.0, 1.0, 0.3, 0.7, 0.5];
        let r = RewardSampler::Bernoulli.sample(&mut rng, &q).unwrap();
        assert_eq!(r[0], 0.0);
        assert_eq!(r[1], 1.0);
        assert!(r.iter().all(|&x| x == 0.0 || x == 1.0));
    }

    #[test]
    fn bernoulli_rejects_out_of_range_expectation() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = RewardSampler::Bernoulli
            .sample(&mut rng, &[0.5, 1.2])
            .unwrap_err();
        assert_eq!(err, Error::InvalidProbability { round: 1, value: 1.2 });
    }

    #[test]
    fn gaussian_mean_tracks_expectation() {
        let mut rng = StdRng::seed_from_u64(1);
        let q = vec![2.5; 20_000];
        let r = RewardSampler::Gaussian { std: 1.0 }.sample(&mut rng, &q).unwrap();
        let mean = r.iter().sum::<f64>() / r.len() as f64;
        assert!((mean - 2.5).abs() < 0.05, "mean={mean}");
    }

    #[test]
    fn sampler_follows_reward_type() {
        let cfg = EmbedDatasetConfig {
            reward_type: RewardType::Continuous,
            reward_std: 0.5,
            ..EmbedDatasetConfig::default()
        };
        assert!(matches!(
            RewardSampler::for_config(&cfg),
            RewardSampler::Gaussian { std } if std == 0.5
        ));
        assert!(matches!(
            RewardSampler::for_config(&EmbedDatasetConfig::default()),
            RewardSampler::Bernoulli
        ));
    }
}
