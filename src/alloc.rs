//! Allocation helpers (logits -> probabilities).
//!
//! Deterministic utilities for turning logits into a probability distribution
//! in a numerically stable way.

/// Stable softmax of `beta * logits`.
///
/// - `beta` is an inverse temperature: `0` gives the uniform distribution, large
///   positive values approach argmax, negative values favour low logits.
/// - Uses the max-trick on the scaled logits.
/// - Returns a distribution that sums to 1 (or empty if input is empty).
pub fn softmax(logits: &[f64], beta: f64) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }
    let scaled: Vec<f64> = logits.iter().map(|&x| beta * x).collect();
    let max_score = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut out: Vec<f64> = Vec::with_capacity(scaled.len());
    let mut denom = 0.0;
    for &v in &scaled {
        let x = (v - max_score).exp();
        denom += x;
        out.push(x);
    }
    if denom <= 0.0 || !denom.is_finite() {
        // Degenerate fallback: uniform.
        let n = logits.len() as f64;
        return vec![1.0 / n; logits.len()];
    }
    for v in out.iter_mut() {
        *v /= denom;
    }
    out
}

/// Softmax of `beta * logits` restricted to `support`.
///
/// Indices outside `support` get probability exactly `0.0`; the supported
/// entries are a softmax over the supported logits only. An empty support
/// returns all zeros.
pub fn softmax_restricted(logits: &[f64], support: &[usize], beta: f64) -> Vec<f64> {
    let mut out = vec![0.0; logits.len()];
    if support.is_empty() {
        return out;
    }
    let sub: Vec<f64> = support.iter().map(|&a| logits[a]).collect();
    let p = softmax(&sub, beta);
    for (&a, &pa) in support.iter().zip(p.iter()) {
        out[a] = pa;
    }
    out
}

/// Logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[0.0, 1.0, -2.0], 1.0);
        let s: f64 = p.iter().sum();
        assert!((s - 1.0).abs() < 1e-9, "sum={}", s);
        assert!(p[1] > p[0] && p[0] > p[2]);
    }

    #[test]
    fn zero_beta_is_uniform() {
        let p = softmax(&[3.0, -1.0, 10.0, 0.5], 0.0);
        for v in p {
            assert!((v - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn negative_beta_prefers_low_logits() {
        let p = softmax(&[0.1, 0.9], -5.0);
        assert!(p[0] > p[1]);
    }

    #[test]
    fn restricted_softmax_zeroes_unsupported() {
        let p = softmax_restricted(&[1.0, 2.0, 3.0, 4.0], &[3, 1], 1.0);
        assert_eq!(p[0], 0.0);
        assert_eq!(p[2], 0.0);
        assert!((p[1] + p[3] - 1.0).abs() < 1e-12);
        assert!(p[3] > p[1]);
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn softmax_is_a_distribution(
            logits in proptest::collection::vec(-1.0e6f64..1.0e6f64, 1..20),
            beta in prop_oneof![Just(0.0), -50.0f64..50.0],
        ) {
            let p = softmax(&logits, beta);

            // Deterministic.
            let p2 = softmax(&logits, beta);
            prop_assert_eq!(&p, &p2);

            prop_assert_eq!(p.len(), logits.len());
            let sum: f64 = p.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9, "sum={}", sum);
            for &v in &p {
                prop_assert!(v.is_finite());
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
