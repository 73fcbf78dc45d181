//! `embedlog`: seeded synthetic logged-bandit data with categorical action embeddings.
//!
//! Off-policy estimators that exploit action embeddings need logged data where
//! actions are described by a few categorical features, and where the reward
//! depends on the action only through those features. This crate generates
//! that data.
//!
//! A dataset is built once from an [`EmbedDatasetConfig`]:
//! - each action gets one categorical value per embedding dimension;
//! - each action gets a distribution `p(e|a)` over categories per dimension
//!   (a softmax of iid `Normal(0, p_e_a_param_std)` logits);
//! - each category gets iid `Normal(0, 1)` latent parameters;
//! - a reward function scores every category value against the context.
//!
//! Every call to [`SyntheticEmbedDataset::obtain_batch_bandit_feedback`] then
//! draws contexts, per-batch dimension-importance weights, the behavior policy
//! `pi_b`, actions, realized embeddings and rewards, and returns a
//! [`BanditFeedback`] bundle.
//!
//! **Goals:**
//! - **Deterministic**: same config (seed included) and same call sequence give
//!   bit-identical batches.
//! - **Pluggable**: reward and behavior-policy functions are traits, and plain
//!   closures implement them.
//! - **Support deficiency**: `n_deficient_actions > 0` zeros out a random subset
//!   of actions per round.
//!
//! **Embedding dimensions:**
//! - Dimensions are indexed internally with a reserved slot 0 that never carries
//!   reward signal and is never exposed.
//! - The first `n_unobserved_cat_dim` user dimensions influence reward but are
//!   stripped from the output.
//! - The first `n_irrelevant_cat_dim` user dimensions get zero importance.
//!
//! **Non-goals:**
//! - Not an estimator library (no IPW/DR/MIPW here).
//! - Not a real-data loader; single-slot feedback only.
//!
//! # Example
//!
//! ```rust
//! use embedlog::{EmbedDatasetConfig, RewardType, SyntheticEmbedDataset};
//!
//! let cfg = EmbedDatasetConfig {
//!     n_actions: 4,
//!     n_cat_dim: 2,
//!     n_cat_per_dim: 3,
//!     reward_type: RewardType::Binary,
//!     seed: 42,
//!     ..EmbedDatasetConfig::default()
//! };
//! let mut ds = SyntheticEmbedDataset::new(cfg).unwrap();
//! let fb = ds.obtain_batch_bandit_feedback(100).unwrap();
//! fb.validate(1e-9).unwrap();
//! assert!(fb.reward.iter().all(|&r| r == 0.0 || r == 1.0));
//! ```

#![forbid(unsafe_code)]

pub mod alloc;
pub mod sampling;
pub mod tensor;

mod config;
pub use config::*;

mod dataset;
pub use dataset::*;

mod embed;
pub use embed::*;

mod error;
pub use error::*;

mod feedback;
pub use feedback::*;

mod policy;
pub use policy::{behavior_policy, sample_behavior, sample_importance, BehaviorDraw, PolicyInputs};

mod realize;
pub use realize::{realize, Realization, RewardSampler};

mod reward;
pub use reward::*;

pub use sampling::SeedPlan;
pub use tensor::{Matrix, Tensor3};

/// Kind of observed reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RewardType {
    /// Bernoulli rewards; expected rewards are probabilities.
    #[default]
    Binary,
    /// Gaussian rewards around the expected reward with `reward_std`.
    Continuous,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::Binary => "binary",
            RewardType::Continuous => "continuous",
        }
    }
}

impl std::fmt::Display for RewardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RewardType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary" => Ok(RewardType::Binary),
            "continuous" => Ok(RewardType::Continuous),
            other => Err(Error::InvalidParameter {
                name: "reward_type",
                expected: "one of",
                bound: "{binary, continuous}".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
