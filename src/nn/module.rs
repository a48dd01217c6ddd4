//! The `Module` trait: interface for pure tensor-to-tensor layers.

use crate::tensor::Tensor;

/// Interface for layers whose forward pass is a pure function of one
/// input tensor: linear projections and layer normalization.
///
/// Layers that additionally need a `training` flag or an attention mask
/// (dropout, attention, the encoder itself) expose inherent `forward`
/// methods with those explicit arguments instead.
pub trait Module {
    /// Forward pass.
    fn forward(&self, input: &Tensor) -> Tensor;

    /// All learnable parameter tensors of this layer.
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Mutable access to the parameter tensors (for loading or perturbing
    /// weights).
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
