//! Functional interface for stateless neural network operations.
//!
//! These mirror the module-based layers for use inside custom forward
//! passes: attention applies [`softmax`] to its score tensor, the
//! feed-forward block applies [`relu`] between its two projections.

use crate::tensor::Tensor;

/// `ReLU` activation: max(0, x)
#[must_use]
pub fn relu(x: &Tensor) -> Tensor {
    let data: Vec<f32> = x.data().iter().map(|&v| v.max(0.0)).collect();
    Tensor::new(&data, x.shape())
}

/// Softmax on a 1D slice of f32 values.
///
/// Equation: softmax(x)\_i = exp(x\_i - max) / sum\_j exp(x\_j - max)
///
/// Subtracting the row maximum keeps the exponentials bounded, so a large
/// negative mask fill (-1e9) produces a near-zero weight instead of NaN.
#[must_use]
pub fn softmax_1d(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.iter().map(|&x| x / sum).collect()
}

/// Softmax along the last dimension of an ND tensor.
///
/// Each row over the last axis sums to 1. Internally uses [`softmax_1d`]
/// per row.
#[must_use]
pub fn softmax(x: &Tensor) -> Tensor {
    let shape = x.shape();
    let last_dim = shape[shape.len() - 1];
    let batch_size: usize = shape[..shape.len() - 1].iter().product();

    let mut output = Vec::with_capacity(x.numel());
    for b in 0..batch_size {
        let start = b * last_dim;
        let row = &x.data()[start..start + last_dim];
        output.extend(softmax_1d(row));
    }

    Tensor::new(&output, shape)
}

/// Inverted dropout with an explicit training flag.
///
/// During training each element is zeroed with probability `p` and the
/// survivors are rescaled by `1/(1-p)`; in inference mode this is the
/// identity. Uses a thread-local RNG; for a seeded stream use
/// [`crate::nn::Dropout`].
#[must_use]
pub fn dropout(x: &Tensor, p: f32, training: bool) -> Tensor {
    if !training || p == 0.0 {
        return x.clone();
    }

    use rand::Rng;
    let mut rng = rand::thread_rng();
    let scale = 1.0 / (1.0 - p);

    let data: Vec<f32> = x
        .data()
        .iter()
        .map(|&v| if rng.gen::<f32>() < p { 0.0 } else { v * scale })
        .collect();

    Tensor::new(&data, x.shape())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_relu() {
        let x = Tensor::new(&[-1.0, 0.0, 2.5], &[3]);
        assert_eq!(relu(&x).data(), &[0.0, 0.0, 2.5]);
    }

    #[test]
    fn test_softmax_1d_sums_to_one() {
        let probs = softmax_1d(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        // Monotone in the logits
        assert!(probs[0] < probs[1] && probs[1] < probs[2]);
    }

    #[test]
    fn test_softmax_1d_stable_for_large_logits() {
        let probs = softmax_1d(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_softmax_1d_large_negative_fill() {
        let probs = softmax_1d(&[0.0, -1e9, 0.0]);
        assert!(probs[1] < 1e-6, "Masked logit should get ~0 weight");
        assert!((probs[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_softmax_nd_rows() {
        let x = Tensor::new(&[1.0, 1.0, 0.0, 2.0], &[2, 2]);
        let s = softmax(&x);
        assert_eq!(s.shape(), &[2, 2]);
        for row in 0..2 {
            let sum: f32 = s.data()[row * 2..(row + 1) * 2].iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        assert!((s.data()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_dropout_identity_in_inference() {
        let x = Tensor::ones(&[10, 10]);
        let y = dropout(&x, 0.5, false);
        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn test_dropout_zero_rate_identity() {
        let x = Tensor::ones(&[10]);
        let y = dropout(&x, 0.0, true);
        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn test_dropout_scales_survivors() {
        let x = Tensor::ones(&[1000]);
        let y = dropout(&x, 0.5, true);
        for &v in y.data() {
            assert!(v == 0.0 || (v - 2.0).abs() < 1e-6);
        }
        let zeros = y.data().iter().filter(|&&v| v == 0.0).count();
        assert!(zeros > 300 && zeros < 700, "Unexpected drop count {zeros}");
    }

    proptest! {
        #[test]
        fn prop_softmax_rows_sum_to_one(
            logits in prop::collection::vec(-50.0f32..50.0, 2..16)
        ) {
            let probs = softmax_1d(&logits);
            let sum: f32 = probs.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-5);
            prop_assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }
}
