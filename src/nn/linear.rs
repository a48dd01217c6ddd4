//! Fully connected (linear) layer.
//!
//! Implements the transformation y = xW^T + b. Used four times inside
//! multi-head attention (query, key, value, output) and twice inside the
//! feed-forward block.

use super::init::{xavier_uniform, zeros};
use super::module::Module;
use crate::tensor::Tensor;

/// Fully connected layer: y = xW^T + b
///
/// # Shape
///
/// - Input: `(*, in_features)` where `*` means any number of batch dimensions
/// - Output: `(*, out_features)`
pub struct Linear {
    /// Weight matrix, shape: [out_features, in_features]
    weight: Tensor,

    /// Cached transposed weight [in_features, out_features].
    /// Computed once when weight is set, avoids a transpose every forward.
    weight_t: Tensor,

    /// Bias vector, shape: [out_features]
    bias: Tensor,

    /// Number of input features
    in_features: usize,

    /// Number of output features
    out_features: usize,
}

impl Linear {
    /// Create a new Linear layer with Xavier initialization.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self::with_seed(in_features, out_features, None)
    }

    /// Create a Linear layer with a specific random seed.
    pub fn with_seed(in_features: usize, out_features: usize, seed: Option<u64>) -> Self {
        let weight = xavier_uniform(&[out_features, in_features], in_features, out_features, seed);
        let weight_t = weight.transpose();
        let bias = zeros(&[out_features]);

        Self {
            weight,
            weight_t,
            bias,
            in_features,
            out_features,
        }
    }

    /// Get the input feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get the output feature dimension.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Set weight tensor from external data.
    ///
    /// Recomputes the cached transposed weight.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not `[out_features, in_features]`.
    pub fn set_weight(&mut self, weight: Tensor) {
        assert_eq!(
            weight.shape(),
            &[self.out_features, self.in_features],
            "Linear weight must be [out_features, in_features]"
        );
        self.weight_t = weight.transpose();
        self.weight = weight;
    }

    /// Set bias tensor from external data.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not `[out_features]`.
    pub fn set_bias(&mut self, bias: Tensor) {
        assert_eq!(
            bias.shape(),
            &[self.out_features],
            "Linear bias must be [out_features]"
        );
        self.bias = bias;
    }

    /// Get reference to weight tensor.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Get reference to bias tensor.
    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    /// Recompute the cached transposed weight after parameters were
    /// modified through [`Module::parameters_mut`].
    pub fn refresh_cache(&mut self) {
        self.weight_t = self.weight.transpose();
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Tensor {
        // y = x @ W^T + b
        // Input: [*, in_features]; batch dimensions are flattened for the
        // 2D product and restored afterwards.
        let input_shape = input.shape();
        let ndim = input_shape.len();

        let (reshaped, batch_shape) = if ndim > 2 {
            let batch_size: usize = input_shape[..ndim - 1].iter().product();
            let in_features = input_shape[ndim - 1];
            let batch_shape: Vec<usize> = input_shape[..ndim - 1].to_vec();

            (input.view(&[batch_size, in_features]), Some(batch_shape))
        } else {
            (input.clone(), None)
        };

        let output = reshaped.matmul(&self.weight_t).broadcast_add(&self.bias);

        match batch_shape {
            Some(mut shape) => {
                shape.push(self.out_features);
                output.view(&shape)
            }
            None => output,
        }
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }
}

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("in_features", &self.in_features)
            .field("out_features", &self.out_features)
            .finish_non_exhaustive()
    }
}
