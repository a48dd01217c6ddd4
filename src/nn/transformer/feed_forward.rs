//! Position-wise feed-forward network.

use crate::nn::functional::relu;
use crate::nn::{Dropout, Linear, Module};
use crate::tensor::Tensor;

/// Two-layer feed-forward block applied independently at every position
/// (Vaswani et al., 2017, section 3.3):
///
/// ```text
/// FFN(x) = Linear2(Dropout(ReLU(Linear1(x))))
/// ```
///
/// # Shape
///
/// - Input: `[batch, seq_len, d_model]`
/// - Output: same as input
#[derive(Debug)]
pub struct FeedForwardBlock {
    /// Expansion: d_model -> d_ff
    linear1: Linear,
    /// Contraction: d_ff -> d_model
    linear2: Linear,
    dropout: Dropout,
}

impl FeedForwardBlock {
    /// Create a new feed-forward block.
    #[must_use]
    pub fn new(d_model: usize, d_ff: usize, dropout_rate: f32) -> Self {
        Self {
            linear1: Linear::new(d_model, d_ff),
            linear2: Linear::new(d_ff, d_model),
            dropout: Dropout::new(dropout_rate),
        }
    }

    /// Create a block with deterministic initialization.
    #[must_use]
    pub fn with_seed(d_model: usize, d_ff: usize, dropout_rate: f32, seed: u64) -> Self {
        Self {
            linear1: Linear::with_seed(d_model, d_ff, Some(seed)),
            linear2: Linear::with_seed(d_ff, d_model, Some(seed.wrapping_add(1))),
            dropout: Dropout::with_seed(dropout_rate, seed.wrapping_add(2)),
        }
    }

    /// Forward pass with an explicit training flag for the inner dropout.
    #[must_use]
    pub fn forward(&self, input: &Tensor, training: bool) -> Tensor {
        let hidden = relu(&self.linear1.forward(input));
        self.linear2.forward(&self.dropout.forward(&hidden, training))
    }

    /// Mutable access to the two projections, in (expand, contract) order.
    pub fn projections_mut(&mut self) -> (&mut Linear, &mut Linear) {
        (&mut self.linear1, &mut self.linear2)
    }

    /// References to all learnable parameters.
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.linear1.parameters();
        params.extend(self.linear2.parameters());
        params
    }

    /// Mutable references to all learnable parameters.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.linear1.parameters_mut();
        params.extend(self.linear2.parameters_mut());
        params
    }
}
