//! Dropout regularization.
//!
//! # Reference
//!
//! - Srivastava, N., et al. (2014). Dropout: A simple way to prevent neural
//!   networks from overfitting. JMLR.

use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Dropout regularization layer.
///
/// The training/inference decision is an explicit argument to
/// [`Dropout::forward`], never module state: with `training = true` each
/// element is zeroed with probability `p` and survivors are rescaled by
/// `1/(1-p)` (inverted dropout); with `training = false` the input passes
/// through unchanged.
///
/// The random stream is owned by the layer and can be seeded with
/// [`Dropout::with_seed`] for reproducible runs.
pub struct Dropout {
    /// Probability of element being zeroed
    p: f32,

    /// Random number generator (Mutex for thread safety)
    rng: Mutex<StdRng>,
}

impl Dropout {
    /// Create a new Dropout layer.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not in [0, 1). Callers going through
    /// [`crate::nn::EncoderConfig`] get this as a validation error first.
    pub fn new(p: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "Dropout probability must be in [0, 1), got {p}",
        );

        Self {
            p,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a new Dropout layer with a specific seed for reproducibility.
    pub fn with_seed(p: f32, seed: u64) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "Dropout probability must be in [0, 1), got {p}",
        );

        Self {
            p,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Get the dropout probability.
    pub fn probability(&self) -> f32 {
        self.p
    }

    /// Forward pass with an explicit training flag.
    pub fn forward(&self, input: &Tensor, training: bool) -> Tensor {
        if !training || self.p == 0.0 {
            return input.clone();
        }

        let mut rng = self.rng.lock().expect("Dropout RNG lock poisoned");
        let scale = 1.0 / (1.0 - self.p);

        let data: Vec<f32> = input
            .data()
            .iter()
            .map(|&x| {
                if rng.gen::<f32>() < self.p {
                    0.0
                } else {
                    x * scale
                }
            })
            .collect();

        Tensor::new(&data, input.shape())
    }
}

impl std::fmt::Debug for Dropout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dropout")
            .field("p", &self.p)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_is_identity() {
        let dropout = Dropout::new(0.5);
        let x = Tensor::ones(&[10, 10]);
        let y = dropout.forward(&x, false);

        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn test_zero_rate_is_identity_even_in_training() {
        let dropout = Dropout::new(0.0);
        let x = Tensor::ones(&[10]);
        let y = dropout.forward(&x, true);

        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn test_training_zeroes_and_rescales() {
        let dropout = Dropout::with_seed(0.5, 42);
        let x = Tensor::ones(&[2000]);
        let y = dropout.forward(&x, true);

        for &v in y.data() {
            assert!(v == 0.0 || (v - 2.0).abs() < 1e-6, "Unexpected value {v}");
        }

        let zeros = y.data().iter().filter(|&&v| v == 0.0).count();
        assert!(
            zeros > 800 && zeros < 1200,
            "Drop count {zeros} far from p=0.5"
        );
    }

    #[test]
    fn test_seeded_streams_are_reproducible() {
        let d1 = Dropout::with_seed(0.3, 7);
        let d2 = Dropout::with_seed(0.3, 7);
        let x = Tensor::ones(&[100]);

        assert_eq!(d1.forward(&x, true).data(), d2.forward(&x, true).data());
    }

    #[test]
    #[should_panic(expected = "must be in [0, 1)")]
    fn test_invalid_probability_panics() {
        let _ = Dropout::new(1.0);
    }
}
