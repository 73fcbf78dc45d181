//! Dataset configuration and the embedding-dimension layout.

use crate::error::{check_f64, check_usize, FloatBound, Result};
use crate::RewardType;

/// Configuration for [`SyntheticEmbedDataset`](crate::SyntheticEmbedDataset).
///
/// Immutable once the dataset is constructed. All fields are checked by
/// [`EmbedDatasetConfig::validate`] before anything is sampled.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmbedDatasetConfig {
    /// Number of actions (must be >= 2).
    pub n_actions: usize,
    /// Context vector dimension (must be >= 1).
    pub dim_context: usize,
    /// Binary (Bernoulli) or continuous (Gaussian) rewards.
    pub reward_type: RewardType,
    /// Reward noise standard deviation; used for continuous rewards (must be > 0).
    pub reward_std: f64,
    /// Inverse temperature of the behavior policy.
    ///
    /// Large positive values give a near-deterministic, near-optimal policy; `0`
    /// gives the uniform policy; negative values give a sub-optimal one.
    pub beta: f64,
    /// Number of categories per embedding dimension (must be >= 1).
    pub n_cat_per_dim: usize,
    /// Dimension of each category's latent reward parameter (must be >= 1).
    pub latent_param_mat_dim: usize,
    /// Number of embedding (category) dimensions (must be >= 1).
    pub n_cat_dim: usize,
    /// Std of the logits behind `p(e|a)`. Larger is closer to deterministic (must be >= 0).
    pub p_e_a_param_std: f64,
    /// Leading dimensions hidden from the logged embedding (`0..=n_cat_dim`).
    pub n_unobserved_cat_dim: usize,
    /// Leading dimensions with zero reward importance (`0..=n_cat_dim`).
    pub n_irrelevant_cat_dim: usize,
    /// Actions given zero probability in each round (`0..n_actions`).
    pub n_deficient_actions: usize,
    /// Base seed for every random draw.
    pub seed: u64,
    /// Label carried in logs and `Debug` output.
    pub dataset_name: String,
}

impl Default for EmbedDatasetConfig {
    fn default() -> Self {
        Self {
            n_actions: 10,
            dim_context: 1,
            reward_type: RewardType::Binary,
            reward_std: 1.0,
            beta: 0.0,
            n_cat_per_dim: 10,
            latent_param_mat_dim: 5,
            n_cat_dim: 3,
            p_e_a_param_std: 1.0,
            n_unobserved_cat_dim: 0,
            n_irrelevant_cat_dim: 0,
            n_deficient_actions: 0,
            seed: 12345,
            dataset_name: "synthetic_bandit_dataset_with_action_embed".to_string(),
        }
    }
}

impl EmbedDatasetConfig {
    /// Check every parameter, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        check_usize("n_actions", self.n_actions, 2, None)?;
        check_usize("dim_context", self.dim_context, 1, None)?;
        check_f64("reward_std", self.reward_std, FloatBound::GreaterThan(0.0))?;
        check_f64("beta", self.beta, FloatBound::Finite)?;
        check_usize(
            "n_deficient_actions",
            self.n_deficient_actions,
            0,
            Some(self.n_actions - 1),
        )?;
        check_usize("n_cat_per_dim", self.n_cat_per_dim, 1, None)?;
        check_usize("latent_param_mat_dim", self.latent_param_mat_dim, 1, None)?;
        check_usize("n_cat_dim", self.n_cat_dim, 1, None)?;
        check_f64(
            "p_e_a_param_std",
            self.p_e_a_param_std,
            FloatBound::AtLeast(0.0),
        )?;
        check_usize(
            "n_unobserved_cat_dim",
            self.n_unobserved_cat_dim,
            0,
            Some(self.n_cat_dim),
        )?;
        check_usize(
            "n_irrelevant_cat_dim",
            self.n_irrelevant_cat_dim,
            0,
            Some(self.n_cat_dim),
        )?;
        Ok(())
    }

    /// Internal dimension layout for this config.
    pub fn layout(&self) -> DimLayout {
        DimLayout {
            n_cat_dim: self.n_cat_dim,
            n_unobserved_cat_dim: self.n_unobserved_cat_dim,
            n_irrelevant_cat_dim: self.n_irrelevant_cat_dim,
        }
    }

    /// Number of actions with positive probability in every round.
    pub fn n_supported_actions(&self) -> usize {
        self.n_actions - self.n_deficient_actions
    }
}

/// Layout of the internal embedding-dimension axis.
///
/// Internally there are `n_cat_dim + 1` dimensions. Slot `0` is reserved: it is
/// sampled like every other dimension (so draws line up with the reference
/// layout), always counts as both unobserved and irrelevant, and never appears in
/// any output. User dimension `u` lives at internal index `u + 1`.
///
/// ```text
/// internal: [ 0 | 1 .. n_cat_dim ]
///             ^ reserved
/// irrelevant: 0 .. irrelevant_end()      (zero importance)
/// observed:   unobserved_end() .. internal()
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimLayout {
    n_cat_dim: usize,
    n_unobserved_cat_dim: usize,
    n_irrelevant_cat_dim: usize,
}

impl DimLayout {
    /// Reserved internal slot.
    pub const RESERVED: usize = 0;

    /// User-visible dimension count.
    pub fn user(&self) -> usize {
        self.n_cat_dim
    }

    /// Internal dimension count (`user + 1`).
    pub fn internal(&self) -> usize {
        self.n_cat_dim + 1
    }

    /// First internal index that is logged in `action_embed`, `q_x_e`, `p_e_a`.
    pub fn unobserved_end(&self) -> usize {
        self.n_unobserved_cat_dim + 1
    }

    /// First internal index with nonzero reward importance.
    pub fn irrelevant_end(&self) -> usize {
        self.n_irrelevant_cat_dim + 1
    }

    /// Number of internal dimensions that receive Dirichlet importance.
    pub fn n_relevant(&self) -> usize {
        self.internal() - self.irrelevant_end()
    }

    /// Number of dimensions exposed in the logged embedding.
    pub fn n_observed(&self) -> usize {
        self.internal() - self.unobserved_end()
    }

    /// Internal index of user dimension `u`.
    pub fn internal_index(&self, u: usize) -> usize {
        u + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn default_config_is_valid() {
        EmbedDatasetConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_each_bad_parameter() {
        let base = EmbedDatasetConfig::default();
        let cases: Vec<(&str, EmbedDatasetConfig)> = vec![
            ("n_actions", EmbedDatasetConfig { n_actions: 1, ..base.clone() }),
            ("dim_context", EmbedDatasetConfig { dim_context: 0, ..base.clone() }),
            ("reward_std", EmbedDatasetConfig { reward_std: 0.0, ..base.clone() }),
            ("beta", EmbedDatasetConfig { beta: f64::NAN, ..base.clone() }),
            ("n_deficient_actions", EmbedDatasetConfig { n_deficient_actions: 10, ..base.clone() }),
            ("n_cat_per_dim", EmbedDatasetConfig { n_cat_per_dim: 0, ..base.clone() }),
            ("latent_param_mat_dim", EmbedDatasetConfig { latent_param_mat_dim: 0, ..base.clone() }),
            ("n_cat_dim", EmbedDatasetConfig { n_cat_dim: 0, ..base.clone() }),
            ("p_e_a_param_std", EmbedDatasetConfig { p_e_a_param_std: -0.1, ..base.clone() }),
            ("n_unobserved_cat_dim", EmbedDatasetConfig { n_unobserved_cat_dim: 4, ..base.clone() }),
            ("n_irrelevant_cat_dim", EmbedDatasetConfig { n_irrelevant_cat_dim: 4, ..base.clone() }),
        ];
        for (expected, cfg) in cases {
            match cfg.validate() {
                Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn boundary_values_are_accepted() {
        let cfg = EmbedDatasetConfig {
            n_actions: 2,
            n_deficient_actions: 1,
            n_unobserved_cat_dim: 3,
            n_irrelevant_cat_dim: 3,
            p_e_a_param_std: 0.0,
            beta: -100.0,
            ..EmbedDatasetConfig::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.n_supported_actions(), 1);
    }

    #[test]
    fn layout_reserves_slot_zero() {
        let cfg = EmbedDatasetConfig {
            n_cat_dim: 4,
            n_unobserved_cat_dim: 1,
            n_irrelevant_cat_dim: 2,
            ..EmbedDatasetConfig::default()
        };
        let l = cfg.layout();
        assert_eq!(l.user(), 4);
        assert_eq!(l.internal(), 5);
        assert_eq!(l.unobserved_end(), 2);
        assert_eq!(l.irrelevant_end(), 3);
        assert_eq!(l.n_relevant(), 2);
        assert_eq!(l.n_observed(), 3);
        assert_eq!(l.internal_index(0), 1);
        assert_eq!(DimLayout::RESERVED, 0);
    }
}
