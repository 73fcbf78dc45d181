//! Error type and scalar parameter checks.

use thiserror::Error;

/// Errors surfaced by dataset construction and batch generation.
///
/// Every failure is a configuration or contract error; nothing here is
/// transient and nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A scalar parameter failed its type/range check.
    #[error("`{name}` must be {expected} {bound}, got {value}")]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
        bound: String,
        value: String,
    },

    /// A pluggable function output or bundle field has the wrong shape.
    #[error("{what} has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// A binary-reward expectation left `[0, 1]`.
    #[error("expected reward {value} at round {round} is not a Bernoulli probability")]
    InvalidProbability { round: usize, value: f64 },

    /// A probability vector failed the simplex check.
    #[error("{what} is not a probability simplex (sum={sum}, tol={tol})")]
    NotASimplex {
        what: String,
        sum: f64,
        tol: f64,
    },

    /// `beta * logit` is NaN or infinite, so the behavior policy is undefined.
    #[error("scaled behavior-policy logit {value} at round {round}, action {action} is not finite")]
    NonFiniteLogits { round: usize, action: usize, value: f64 },

    /// A logged propensity disagrees with the policy it was drawn from.
    #[error("pscore {pscore} at round {round} does not match the logged action's probability {prob}")]
    PscoreMismatch { round: usize, pscore: f64, prob: f64 },

    /// Parameters rejected by a `rand_distr` constructor.
    #[error("distribution parameters rejected: {0}")]
    Distribution(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check an integer parameter against an inclusive `[min, max]` range.
pub fn check_usize(name: &'static str, value: usize, min: usize, max: Option<usize>) -> Result<()> {
    let ok = value >= min && max.map(|m| value <= m).unwrap_or(true);
    if ok {
        return Ok(());
    }
    let bound = match max {
        Some(m) => format!("in [{min}, {m}]"),
        None => format!(">= {min}"),
    };
    Err(Error::InvalidParameter {
        name,
        expected: "an integer",
        bound,
        value: value.to_string(),
    })
}

/// Lower bound for a float check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatBound {
    /// Any finite value.
    Finite,
    /// `>= x`.
    AtLeast(f64),
    /// `> x`.
    GreaterThan(f64),
}

/// Check a float parameter: always finite, plus the given lower bound.
pub fn check_f64(name: &'static str, value: f64, bound: FloatBound) -> Result<()> {
    let ok = value.is_finite()
        && match bound {
            FloatBound::Finite => true,
            FloatBound::AtLeast(m) => value >= m,
            FloatBound::GreaterThan(m) => value > m,
        };
    if ok {
        return Ok(());
    }
    let bound = match bound {
        FloatBound::Finite => "(finite)".to_string(),
        FloatBound::AtLeast(m) => format!(">= {m}"),
        FloatBound::GreaterThan(m) => format!("> {m}"),
    };
    Err(Error::InvalidParameter {
        name,
        expected: "a finite float",
        bound,
        value: value.to_string(),
    })
}

/// Validate that `p` is a probability vector within `tol`.
pub fn check_simplex(what: impl FnOnce() -> String, p: &[f64], tol: f64) -> Result<()> {
    let sum: f64 = p.iter().sum();
    let entries_ok = p.iter().all(|&x| x.is_finite() && x >= -tol && x <= 1.0 + tol);
    if !p.is_empty() && entries_ok && (sum - 1.0).abs() <= tol {
        return Ok(());
    }
    Err(Error::NotASimplex {
        what: what(),
        sum,
        tol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usize_bounds() {
        assert!(check_usize("n_actions", 2, 2, None).is_ok());
        assert!(check_usize("n_unobserved_cat_dim", 3, 0, Some(3)).is_ok());
        let err = check_usize("n_actions", 1, 2, None).unwrap_err();
        assert_eq!(err.to_string(), "`n_actions` must be an integer >= 2, got 1");
        let err = check_usize("n_irrelevant_cat_dim", 4, 0, Some(3)).unwrap_err();
        assert!(err.to_string().contains("in [0, 3]"));
    }

    #[test]
    fn float_bounds() {
        assert!(check_f64("beta", -7.5, FloatBound::Finite).is_ok());
        assert!(check_f64("beta", f64::NAN, FloatBound::Finite).is_err());
        assert!(check_f64("p_e_a_param_std", 0.0, FloatBound::AtLeast(0.0)).is_ok());
        assert!(check_f64("reward_std", 0.0, FloatBound::GreaterThan(0.0)).is_err());
        match check_f64("reward_std", f64::INFINITY, FloatBound::GreaterThan(0.0)) {
            Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, "reward_std"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn simplex_check() {
        assert!(check_simplex(|| "p".into(), &[0.25, 0.75], 1e-9).is_ok());
        assert!(check_simplex(|| "p".into(), &[0.5, 0.6], 1e-9).is_err());
        assert!(check_simplex(|| "p".into(), &[1.5, -0.5], 1e-9).is_err());
        assert!(check_simplex(|| "p".into(), &[], 1e-9).is_err());
    }
}
