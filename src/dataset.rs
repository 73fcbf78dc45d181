//! The synthetic dataset: owns the configuration, the embedding model and the
//! generator, and produces batches of logged feedback.

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::config::{DimLayout, EmbedDatasetConfig};
use crate::embed::EmbeddingModel;
use crate::error::{check_usize, Error, Result};
use crate::feedback::BanditFeedback;
use crate::policy::{sample_behavior, PolicyInputs};
use crate::realize::realize;
use crate::reward::{BehaviorPolicyFunction, LinearReward, LogisticReward, RewardFunction};
use crate::sampling::SeedPlan;
use crate::tensor::{Matrix, Tensor3};
use crate::RewardType;

type BoxedReward = Box<dyn RewardFunction + Send + Sync>;
type BoxedPolicy = Box<dyn BehaviorPolicyFunction + Send + Sync>;

/// Synthetic logged bandit data with action embeddings.
///
/// Construction validates the config and draws the embedding model once.
/// Each call to [`obtain_batch_bandit_feedback`](Self::obtain_batch_bandit_feedback)
/// resamples contexts, importance weights, actions, embeddings and rewards from
/// the same fixed model, which is what repeated-dataset confidence intervals
/// need.
///
/// # Example
///
/// ```rust
/// use embedlog::{EmbedDatasetConfig, SyntheticEmbedDataset};
///
/// let mut ds = SyntheticEmbedDataset::new(EmbedDatasetConfig {
///     n_actions: 10,
///     dim_context: 5,
///     beta: 5.0,
///     n_cat_per_dim: 10,
///     n_cat_dim: 3,
///     ..EmbedDatasetConfig::default()
/// })
/// .unwrap();
/// let fb = ds.obtain_batch_bandit_feedback(1_000).unwrap();
/// assert_eq!(fb.action_embed.shape(), (1_000, 3));
/// assert_eq!(fb.pi_b.shape(), (1_000, 10, 1));
/// ```
pub struct SyntheticEmbedDataset {
    cfg: EmbedDatasetConfig,
    seeds: SeedPlan,
    rng: StdRng,
    model: EmbeddingModel,
    reward_fn: BoxedReward,
    behavior_fn: Option<BoxedPolicy>,
    one_hot_actions: Matrix<f64>,
}

impl SyntheticEmbedDataset {
    /// Validate `cfg` and draw the embedding model.
    ///
    /// The reward function defaults to [`LogisticReward`] for binary rewards and
    /// [`LinearReward`] for continuous ones.
    pub fn new(cfg: EmbedDatasetConfig) -> Result<Self> {
        cfg.validate()?;
        let seeds = SeedPlan::new(cfg.seed);
        let mut rng = StdRng::seed_from_u64(seeds.base());
        let model = EmbeddingModel::build(&cfg, &mut rng, &seeds);
        let reward_fn: BoxedReward = match cfg.reward_type {
            RewardType::Binary => Box::new(LogisticReward),
            RewardType::Continuous => Box::new(LinearReward),
        };
        debug!(
            dataset = %cfg.dataset_name,
            seed = cfg.seed,
            n_actions = cfg.n_actions,
            n_deficient_actions = cfg.n_deficient_actions,
            reward_type = ?cfg.reward_type,
            "constructed synthetic embedding dataset"
        );
        Ok(Self {
            one_hot_actions: Matrix::identity(cfg.n_actions),
            cfg,
            seeds,
            rng,
            model,
            reward_fn,
            behavior_fn: None,
        })
    }

    /// Replace the expected-reward function.
    ///
    /// For binary rewards it must return values in `[0, 1]`; otherwise batch
    /// generation fails with [`Error::InvalidProbability`].
    pub fn with_reward_function<F>(mut self, f: F) -> Self
    where
        F: RewardFunction + Send + Sync + 'static,
    {
        self.reward_fn = Box::new(f);
        self
    }

    /// Use `f` for behavior-policy logits instead of the aggregated expected reward.
    ///
    /// `f` receives the one-hot action context (`n_actions x n_actions`) and the
    /// base seed; its logits are still scaled by `beta`.
    pub fn with_behavior_policy<F>(mut self, f: F) -> Self
    where
        F: BehaviorPolicyFunction + Send + Sync + 'static,
    {
        self.behavior_fn = Some(Box::new(f));
        self
    }

    pub fn config(&self) -> &EmbedDatasetConfig {
        &self.cfg
    }

    pub fn dataset_name(&self) -> &str {
        &self.cfg.dataset_name
    }

    pub fn layout(&self) -> DimLayout {
        self.cfg.layout()
    }

    pub fn seeds(&self) -> SeedPlan {
        self.seeds
    }

    /// The fixed embedding model (internal layout, reserved slot included).
    pub fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    /// `(internal_dims, n_cat_per_dim, latent_param_mat_dim)`.
    pub fn latent_cat_param(&self) -> &Tensor3<f64> {
        &self.model.latent_cat_param
    }

    /// Full `p(e|a)` in the internal layout.
    pub fn p_e_a(&self) -> &Tensor3<f64> {
        &self.model.p_e_a
    }

    pub fn len_list(&self) -> usize {
        1
    }

    /// Draw `n_rounds` rounds of logged feedback.
    pub fn obtain_batch_bandit_feedback(&mut self, n_rounds: usize) -> Result<BanditFeedback> {
        check_usize("n_rounds", n_rounds, 1, None)?;

        let inputs = PolicyInputs {
            cfg: &self.cfg,
            model: &self.model,
            seeds: self.seeds,
            reward_fn: &*self.reward_fn,
            behavior_fn: self.behavior_fn.as_deref().map(|f| f as &dyn BehaviorPolicyFunction),
            policy_action_context: &self.one_hot_actions,
        };
        let draw = sample_behavior(&mut self.rng, n_rounds, &inputs)?;
        let realized = realize(&mut self.rng, &draw, &self.model, &self.cfg, &self.seeds)?;

        let observed = self.cfg.layout().unobserved_end();
        let pscore: Vec<f64> = draw
            .action
            .iter()
            .enumerate()
            .map(|(i, &a)| draw.pi_b.get(i, a))
            .collect();
        debug!(
            n_rounds,
            deficient_support = self.cfg.n_deficient_actions > 0,
            mean_pscore = pscore.iter().sum::<f64>() / n_rounds as f64,
            mean_reward = realized.reward.iter().sum::<f64>() / n_rounds as f64,
            "obtained batch bandit feedback"
        );

        let pi_b = Tensor3::from_fn(n_rounds, self.cfg.n_actions, 1, |i, a, _| draw.pi_b.get(i, a));
        Ok(BanditFeedback {
            n_rounds,
            n_actions: self.cfg.n_actions,
            action_context: self.model.observed_action_context(),
            action_embed: realized.action_embed.columns_from(observed),
            context: draw.context,
            action: draw.action,
            position: None,
            reward: realized.reward,
            expected_reward: draw.expected_reward,
            q_x_e: draw.q_x_e.last_from(observed),
            p_e_a: self.model.p_e_a.last_from(observed),
            pi_b,
            pscore,
        })
    }

    /// Ground-truth value of an evaluation policy.
    ///
    /// `expected_reward` is `(n_rounds, n_actions)` and `action_dist` is
    /// `(n_rounds, n_actions, len_list)`; only slot 0 is used. Returns the mean
    /// over rounds of the `action_dist`-weighted average expected reward.
    pub fn calc_ground_truth_policy_value(
        &self,
        expected_reward: &Matrix<f64>,
        action_dist: &Tensor3<f64>,
    ) -> Result<f64> {
        let (n, a, slots) = action_dist.shape();
        if expected_reward.shape() != (n, a) {
            return Err(Error::ShapeMismatch {
                what: "action_dist",
                expected: expected_reward.shape(),
                got: (n, a),
            });
        }
        if slots == 0 {
            return Err(Error::ShapeMismatch {
                what: "action_dist (n_actions, len_list)",
                expected: (a, 1),
                got: (a, 0),
            });
        }
        if n == 0 {
            return Err(Error::ShapeMismatch {
                what: "expected_reward",
                expected: (1, a),
                got: (0, a),
            });
        }
        let mut total = 0.0;
        for i in 0..n {
            let w = action_dist.slab_first(i).column(0);
            let wsum: f64 = w.iter().sum();
            if !(wsum > 0.0 && wsum.is_finite()) {
                return Err(Error::NotASimplex {
                    what: format!("action_dist[{i}, :, 0]"),
                    sum: wsum,
                    tol: 0.0,
                });
            }
            let v: f64 = w
                .iter()
                .zip(expected_reward.row(i))
                .map(|(wi, qi)| wi * qi)
                .sum();
            total += v / wsum;
        }
        Ok(total / n as f64)
    }
}

impl fmt::Debug for SyntheticEmbedDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticEmbedDataset")
            .field("cfg", &self.cfg)
            .field("layout", &self.cfg.layout())
            .field("custom_behavior_policy", &self.behavior_fn.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> EmbedDatasetConfig {
        EmbedDatasetConfig {
            n_actions: 5,
            dim_context: 3,
            n_cat_per_dim: 4,
            n_cat_dim: 3,
            beta: 2.0,
            seed: 7,
            ..EmbedDatasetConfig::default()
        }
    }

    #[test]
    fn rejects_zero_rounds() {
        let mut ds = SyntheticEmbedDataset::new(small()).unwrap();
        match ds.obtain_batch_bandit_feedback(0) {
            Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, "n_rounds"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_config_fails_construction() {
        let cfg = EmbedDatasetConfig {
            n_deficient_actions: 5,
            ..small()
        };
        assert!(SyntheticEmbedDataset::new(cfg).is_err());
    }

    #[test]
    fn output_strips_reserved_and_unobserved_dims() {
        let cfg = EmbedDatasetConfig {
            n_unobserved_cat_dim: 1,
            ..small()
        };
        let mut ds = SyntheticEmbedDataset::new(cfg).unwrap();
        let fb = ds.obtain_batch_bandit_feedback(50).unwrap();
        assert_eq!(fb.action_context.shape(), (5, 3));
        assert_eq!(fb.action_embed.shape(), (50, 2));
        assert_eq!(fb.q_x_e.shape(), (50, 4, 2));
        assert_eq!(fb.p_e_a.shape(), (5, 4, 2));
        assert_eq!(ds.p_e_a().shape(), (5, 4, 4));
        assert_eq!(ds.latent_cat_param().shape(), (4, 4, 5));
        // Observed p_e_a is the tail of the internal tensor.
        assert_eq!(fb.p_e_a.get(2, 1, 0), ds.p_e_a().get(2, 1, 2));
    }

    #[test]
    fn all_dims_unobserved_leaves_empty_embedding() {
        let cfg = EmbedDatasetConfig {
            n_unobserved_cat_dim: 3,
            ..small()
        };
        let mut ds = SyntheticEmbedDataset::new(cfg).unwrap();
        let fb = ds.obtain_batch_bandit_feedback(10).unwrap();
        assert_eq!(fb.action_embed.shape(), (10, 0));
        assert_eq!(fb.p_e_a.shape(), (5, 4, 0));
        fb.validate(1e-9).unwrap();
    }

    #[test]
    fn custom_behavior_policy_drives_pi_b() {
        // Logits favour action 0 overwhelmingly.
        let favour_first = |x: &Matrix<f64>, e: &Matrix<f64>, _seed: u64| -> Matrix<f64> {
            Matrix::from_fn(x.rows(), e.rows(), |_, a| if a == 0 { 50.0 } else { 0.0 })
        };
        let mut ds = SyntheticEmbedDataset::new(EmbedDatasetConfig { beta: 1.0, ..small() })
            .unwrap()
            .with_behavior_policy(favour_first);
        let fb = ds.obtain_batch_bandit_feedback(100).unwrap();
        assert!(fb.action.iter().all(|&a| a == 0));
        assert!(fb.pscore.iter().all(|&p| p > 0.999));
    }

    #[test]
    fn behavior_policy_sees_one_hot_actions() {
        let check = |x: &Matrix<f64>, e: &Matrix<f64>, _seed: u64| -> Matrix<f64> {
            assert_eq!(e, &Matrix::identity(5));
            Matrix::zeros(x.rows(), e.rows())
        };
        let mut ds = SyntheticEmbedDataset::new(small()).unwrap().with_behavior_policy(check);
        ds.obtain_batch_bandit_feedback(3).unwrap();
    }

    #[test]
    fn out_of_range_binary_reward_function_errors() {
        let too_big = |x: &Matrix<f64>, e: &Matrix<f64>, _seed: u64| -> Matrix<f64> {
            Matrix::from_fn(x.rows(), e.rows(), |_, _| 2.0)
        };
        let mut ds = SyntheticEmbedDataset::new(small())
            .unwrap()
            .with_reward_function(too_big);
        assert!(matches!(
            ds.obtain_batch_bandit_feedback(10),
            Err(Error::InvalidProbability { .. })
        ));
    }

    #[test]
    fn ground_truth_of_behavior_policy() {
        let mut ds = SyntheticEmbedDataset::new(small()).unwrap();
        let fb = ds.obtain_batch_bandit_feedback(200).unwrap();
        let v = ds
            .calc_ground_truth_policy_value(&fb.expected_reward, &fb.pi_b)
            .unwrap();
        let manual: f64 = (0..200)
            .map(|i| {
                (0..5)
                    .map(|a| fb.pi_b.get(i, a, 0) * fb.expected_reward.get(i, a))
                    .sum::<f64>()
            })
            .sum::<f64>()
            / 200.0;
        assert!((v - manual).abs() < 1e-9);
    }

    #[test]
    fn ground_truth_rejects_bad_shapes() {
        let ds = SyntheticEmbedDataset::new(small()).unwrap();
        let q = Matrix::zeros(4, 5);
        assert!(ds
            .calc_ground_truth_policy_value(&q, &Tensor3::zeros(4, 3, 1))
            .is_err());
        assert!(ds
            .calc_ground_truth_policy_value(&q, &Tensor3::zeros(4, 5, 1))
            .is_err());
    }

    #[test]
    fn debug_does_not_dump_tensors() {
        let ds = SyntheticEmbedDataset::new(small()).unwrap();
        let s = format!("{ds:?}");
        assert!(s.contains("SyntheticEmbedDataset"));
        assert!(!s.contains("latent_cat_param"));
    }
}
