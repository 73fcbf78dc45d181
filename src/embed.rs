//! Embedding model: latent category parameters and `p(e|a)`.
//!
//! Built once per dataset and never mutated. Every tensor here uses the
//! internal dimension layout (see [`DimLayout`]), including the reserved slot.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::alloc::softmax;
use crate::config::{DimLayout, EmbedDatasetConfig};
use crate::sampling::{sample_action_fast, SeedPlan};
use crate::tensor::{Matrix, Tensor3};

/// Fixed probabilistic structure relating actions, embeddings and rewards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmbeddingModel {
    /// `(internal_dims, n_cat_per_dim, latent_param_mat_dim)`, iid `N(0, 1)`.
    pub latent_cat_param: Tensor3<f64>,
    /// `(n_actions, n_cat_per_dim, internal_dims)`; each `[a, :, d]` is a distribution.
    pub p_e_a: Tensor3<f64>,
    /// `(n_actions, internal_dims)`: one representative category per action and dimension.
    pub action_context: Matrix<usize>,
}

impl EmbeddingModel {
    /// Draw the model.
    ///
    /// Draw order: latent parameters, then `p(e|a)` logits, both from `rng`;
    /// the representative categories use a fresh generator per dimension seeded
    /// by [`SeedPlan::action_context`].
    pub fn build<R: Rng + ?Sized>(cfg: &EmbedDatasetConfig, rng: &mut R, seeds: &SeedPlan) -> Self {
        let layout = cfg.layout();
        let n_dim = layout.internal();
        let k = cfg.n_cat_per_dim;

        let latent_cat_param: Tensor3<f64> =
            Tensor3::from_fn(n_dim, k, cfg.latent_param_mat_dim, |_, _, _| {
                StandardNormal.sample(rng)
            });

        let std = cfg.p_e_a_param_std;
        let logits: Tensor3<f64> = Tensor3::from_fn(cfg.n_actions, k, n_dim, |_, _, _| {
            let z: f64 = StandardNormal.sample(rng);
            std * z
        });
        let p_e_a = softmax_over_categories(&logits);

        let mut action_context = Matrix::zeros(cfg.n_actions, n_dim);
        for d in 0..n_dim {
            let cats = sample_action_fast(&p_e_a.slab_last(d), seeds.action_context(d));
            for (a, c) in cats.into_iter().enumerate() {
                action_context.set(a, d, c);
            }
        }

        debug!(
            n_actions = cfg.n_actions,
            n_cat_per_dim = k,
            internal_dims = n_dim,
            observed_dims = layout.n_observed(),
            relevant_dims = layout.n_relevant(),
            "built embedding model"
        );

        Self {
            latent_cat_param,
            p_e_a,
            action_context,
        }
    }

    /// `p(e|a)` slab for internal dimension `d`: `(n_actions x n_cat_per_dim)`.
    pub fn p_e_a_dim(&self, d: usize) -> Matrix<f64> {
        self.p_e_a.slab_last(d)
    }

    /// Latent parameters of every category of internal dimension `d`:
    /// `(n_cat_per_dim x latent_param_mat_dim)`.
    pub fn latent_dim(&self, d: usize) -> Matrix<f64> {
        self.latent_cat_param.slab_first(d)
    }

    /// Representative categories without the reserved slot.
    pub fn observed_action_context(&self) -> Matrix<usize> {
        self.action_context.columns_from(DimLayout::RESERVED + 1)
    }
}

fn softmax_over_categories(logits: &Tensor3<f64>) -> Tensor3<f64> {
    let (n_actions, k, n_dim) = logits.shape();
    let mut out = Tensor3::zeros(n_actions, k, n_dim);
    for a in 0..n_actions {
        for d in 0..n_dim {
            let p = softmax(&logits.fibre(a, d), 1.0);
            for (c, pc) in p.into_iter().enumerate() {
                out.set(a, c, d, pc);
            }
        }
    }
    out
}
