//! Layer normalization with a scalar affine correction.
//!
//! # References
//!
//! - Ba, J. L., Kiros, J. R., & Hinton, G. E. (2016). Layer normalization.
//!   arXiv:1607.06450.

use super::init::{constant, zeros};
use super::module::Module;
use crate::tensor::Tensor;

/// Layer Normalization over the last axis, with a single learned scale
/// (`alpha`) and shift (`bias`) shared by every feature:
///
/// ```text
/// y = alpha * (x - mean) / (std + eps) + bias
/// ```
///
/// `std` is the biased standard deviation over the last axis. Two details
/// differ from the canonical formulation and are pinned by tests: the
/// affine parameters are scalars rather than per-feature vectors of width
/// `d_model`, and `eps` is added to the standard deviation, not the
/// variance.
///
/// # Shape
///
/// - Input: `(*, d)` for any trailing width `d`
/// - Output: same as input
#[derive(Debug)]
pub struct LayerNorm {
    /// Learnable scalar scale, shape [1]
    alpha: Tensor,
    /// Learnable scalar shift, shape [1]
    bias: Tensor,
    /// Small constant for numerical stability
    eps: f32,
}

impl LayerNorm {
    /// Create a new `LayerNorm` with alpha = 1, bias = 0 and the default
    /// epsilon of 1e-6.
    #[must_use]
    pub fn new() -> Self {
        Self::with_eps(1e-6)
    }

    /// Create `LayerNorm` with a custom epsilon.
    #[must_use]
    pub fn with_eps(eps: f32) -> Self {
        Self {
            alpha: constant(&[1], 1.0),
            bias: zeros(&[1]),
            eps,
        }
    }

    /// Get the epsilon constant.
    #[must_use]
    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// Normalize without the affine step (used by tests to check the
    /// mean/variance contract directly).
    #[must_use]
    pub fn normalize(&self, input: &Tensor) -> Tensor {
        self.forward_impl(input, false)
    }

    fn forward_impl(&self, input: &Tensor, affine: bool) -> Tensor {
        let shape = input.shape();
        assert!(
            !shape.is_empty(),
            "LayerNorm expects at least a 1D input"
        );
        let norm_size = shape[shape.len() - 1];
        let batch_dims: usize = shape[..shape.len() - 1].iter().product();

        let alpha = self.alpha.data()[0];
        let bias = self.bias.data()[0];

        let input_data = input.data();
        let mut output_data = vec![0.0; input_data.len()];

        for b in 0..batch_dims {
            let offset = b * norm_size;
            let slice = &input_data[offset..offset + norm_size];

            let mean: f32 = slice.iter().sum::<f32>() / norm_size as f32;

            // Biased standard deviation over the feature axis
            let var: f32 =
                slice.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / norm_size as f32;
            let std = var.sqrt();

            let denom_inv = 1.0 / (std + self.eps);
            for i in 0..norm_size {
                let normalized = (slice[i] - mean) * denom_inv;
                output_data[offset + i] = if affine {
                    alpha * normalized + bias
                } else {
                    normalized
                };
            }
        }

        Tensor::new(&output_data, shape)
    }
}

impl Default for LayerNorm {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for LayerNorm {
    fn forward(&self, input: &Tensor) -> Tensor {
        self.forward_impl(input, true)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.alpha, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.alpha, &mut self.bias]
    }
}

#[cfg(test)]
#[path = "tests_layernorm_contract.rs"]
mod tests_layernorm_contract;
