//! Logged bandit feedback bundle.

use crate::error::{check_simplex, Error, Result};
use crate::tensor::{Matrix, Tensor3};

/// One batch of synthetic logged bandit data.
///
/// Dimension-indexed fields only contain observed embedding dimensions; the
/// reserved slot and unobserved dimensions are stripped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BanditFeedback {
    pub n_rounds: usize,
    pub n_actions: usize,
    /// `(n_actions, n_cat_dim)`: representative category of each action per dimension.
    pub action_context: Matrix<usize>,
    /// `(n_rounds, n_observed_dims)`: realized categories.
    pub action_embed: Matrix<usize>,
    /// `(n_rounds, dim_context)`.
    pub context: Matrix<f64>,
    pub action: Vec<usize>,
    /// Always `None`: synthetic data has a single slot.
    pub position: Option<Vec<usize>>,
    pub reward: Vec<f64>,
    /// `(n_rounds, n_actions)` importance-weighted expected reward.
    pub expected_reward: Matrix<f64>,
    /// `(n_rounds, n_cat_per_dim, n_observed_dims)`.
    pub q_x_e: Tensor3<f64>,
    /// `(n_actions, n_cat_per_dim, n_observed_dims)`.
    pub p_e_a: Tensor3<f64>,
    /// `(n_rounds, n_actions, 1)`.
    pub pi_b: Tensor3<f64>,
    /// `pi_b[i, action[i], 0]`.
    pub pscore: Vec<f64>,
}

/// Borrowed view of one logged round.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedRound<'a> {
    pub round: usize,
    pub context: &'a [f64],
    pub action: usize,
    pub action_embed: &'a [usize],
    pub reward: f64,
    pub pscore: f64,
    /// Behavior-policy probability of every action.
    pub action_probs: Vec<f64>,
    pub expected_reward: &'a [f64],
}

impl BanditFeedback {
    /// Number of recommendation slots per round.
    pub fn len_list(&self) -> usize {
        1
    }

    /// Behavior-policy distribution of round `i` as a vector.
    pub fn action_probs(&self, i: usize) -> Vec<f64> {
        self.pi_b.slab_first(i).column(0)
    }

    /// View of round `i`, or `None` if out of range.
    pub fn round(&self, i: usize) -> Option<LoggedRound<'_>> {
        if i >= self.n_rounds {
            return None;
        }
        Some(LoggedRound {
            round: i,
            context: self.context.row(i),
            action: self.action[i],
            action_embed: self.action_embed.row(i),
            reward: self.reward[i],
            pscore: self.pscore[i],
            action_probs: self.action_probs(i),
            expected_reward: self.expected_reward.row(i),
        })
    }

    pub fn rounds(&self) -> impl Iterator<Item = LoggedRound<'_>> {
        (0..self.n_rounds).filter_map(move |i| self.round(i))
    }

    /// Check the probabilistic invariants of the bundle.
    ///
    /// - every `pi_b` row is a distribution;
    /// - every `p_e_a[a, :, d]` is a distribution;
    /// - `pscore[i] == pi_b[i, action[i]]` and the logged action has positive mass;
    /// - per-round vectors have length `n_rounds`.
    pub fn validate(&self, tol: f64) -> Result<()> {
        let n = self.n_rounds;
        for (what, len) in [
            ("action", self.action.len()),
            ("reward", self.reward.len()),
            ("pscore", self.pscore.len()),
            ("context", self.context.rows()),
            ("action_embed", self.action_embed.rows()),
        ] {
            if len != n {
                return Err(Error::ShapeMismatch {
                    what,
                    expected: (n, 0),
                    got: (len, 0),
                });
            }
        }
        if self.pi_b.shape() != (n, self.n_actions, 1) {
            let (a, b, _) = self.pi_b.shape();
            return Err(Error::ShapeMismatch {
                what: "pi_b",
                expected: (n, self.n_actions),
                got: (a, b),
            });
        }

        for i in 0..n {
            let p = self.action_probs(i);
            check_simplex(|| format!("pi_b[{i}]"), &p, tol)?;
            let a = self.action[i];
            let pa = p.get(a).copied().unwrap_or(0.0);
            if pa <= 0.0 || (pa - self.pscore[i]).abs() > tol {
                return Err(Error::PscoreMismatch {
                    round: i,
                    pscore: self.pscore[i],
                    prob: pa,
                });
            }
        }

        let (n_actions, _, n_dims) = self.p_e_a.shape();
        for a in 0..n_actions {
            for d in 0..n_dims {
                check_simplex(|| format!("p_e_a[{a}, :, {d}]"), &self.p_e_a.fibre(a, d), tol)?;
            }
        }
        Ok(())
    }
}
