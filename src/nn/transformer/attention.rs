//! Multi-head scaled dot-product attention.

use crate::error::{AtenderError, Result};
use crate::nn::functional::softmax;
use crate::nn::{Dropout, Linear, Module};
use crate::tensor::Tensor;

/// Additive fill for masked score positions. Large enough that softmax
/// assigns the position a weight indistinguishable from zero, small enough
/// to stay finite in f32.
const MASK_FILL: f32 = -1e9;

/// Multi-head attention (Vaswani et al., 2017, section 3.2.2).
///
/// Projects queries, keys and values into `num_heads` subspaces of
/// dimension `d_k = d_model / num_heads`, runs scaled dot-product
/// attention in each head independently, then concatenates and projects
/// back to `d_model`.
///
/// # Shape
///
/// - query: `[batch, q_len, d_model]`
/// - key, value: `[batch, kv_len, d_model]`
/// - output: `[batch, q_len, d_model]` plus attention weights
///   `[batch, num_heads, q_len, kv_len]`
#[derive(Debug)]
pub struct MultiHeadAttention {
    d_model: usize,
    num_heads: usize,
    /// Per-head dimension: d_model / num_heads
    d_k: usize,

    w_q: Linear,
    w_k: Linear,
    w_v: Linear,
    w_o: Linear,

    dropout: Dropout,
}

impl MultiHeadAttention {
    /// Create a new multi-head attention block.
    ///
    /// # Errors
    ///
    /// Returns [`AtenderError::InvalidConfig`] if `d_model` or `num_heads`
    /// is zero or `num_heads` does not divide `d_model`.
    pub fn new(d_model: usize, num_heads: usize, dropout_rate: f32) -> Result<Self> {
        Self::build(d_model, num_heads, dropout_rate, None)
    }

    /// Create a block with deterministic weight initialization and a
    /// seeded dropout stream.
    pub fn with_seed(
        d_model: usize,
        num_heads: usize,
        dropout_rate: f32,
        seed: u64,
    ) -> Result<Self> {
        Self::build(d_model, num_heads, dropout_rate, Some(seed))
    }

    fn build(
        d_model: usize,
        num_heads: usize,
        dropout_rate: f32,
        seed: Option<u64>,
    ) -> Result<Self> {
        if d_model == 0 {
            return Err(AtenderError::non_positive("d_model", d_model));
        }
        if num_heads == 0 {
            return Err(AtenderError::non_positive("num_heads", num_heads));
        }
        if d_model % num_heads != 0 {
            return Err(AtenderError::InvalidConfig {
                param: "d_model".to_string(),
                value: d_model.to_string(),
                constraint: format!("divisible by num_heads ({num_heads})"),
            });
        }

        // Distinct streams per projection so the four matrices differ even
        // under a fixed seed.
        let proj_seed = |offset: u64| seed.map(|s| s.wrapping_add(offset));
        let dropout = match seed {
            Some(s) => Dropout::with_seed(dropout_rate, s.wrapping_add(4)),
            None => Dropout::new(dropout_rate),
        };

        Ok(Self {
            d_model,
            num_heads,
            d_k: d_model / num_heads,
            w_q: Linear::with_seed(d_model, d_model, proj_seed(0)),
            w_k: Linear::with_seed(d_model, d_model, proj_seed(1)),
            w_v: Linear::with_seed(d_model, d_model, proj_seed(2)),
            w_o: Linear::with_seed(d_model, d_model, proj_seed(3)),
            dropout,
        })
    }

    /// Get the number of attention heads.
    #[must_use]
    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    /// Get the per-head dimension.
    #[must_use]
    pub fn d_k(&self) -> usize {
        self.d_k
    }

    /// Mutable access to the four projection layers, in (q, k, v, o)
    /// order, for loading external weights.
    pub fn projections_mut(&mut self) -> (&mut Linear, &mut Linear, &mut Linear, &mut Linear) {
        (&mut self.w_q, &mut self.w_k, &mut self.w_v, &mut self.w_o)
    }

    /// Full attention forward pass.
    ///
    /// Returns the attended output and the attention weights after
    /// dropout, shaped `[batch, num_heads, q_len, kv_len]`. With
    /// `training = false` the weights are exactly the softmax output and
    /// each row sums to 1.
    ///
    /// # Errors
    ///
    /// - [`AtenderError::ShapeMismatch`] if any input is not 3D with
    ///   trailing `d_model`, batch sizes differ, or key and value sequence
    ///   lengths differ.
    /// - [`AtenderError::MaskShapeMismatch`] if a supplied mask cannot
    ///   broadcast to the score shape.
    pub fn forward(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        mask: Option<&Tensor>,
        training: bool,
    ) -> Result<(Tensor, Tensor)> {
        self.validate_input("query", query)?;
        self.validate_input("key", key)?;
        self.validate_input("value", value)?;

        let batch = query.shape()[0];
        if key.shape()[0] != batch || value.shape()[0] != batch {
            return Err(AtenderError::ShapeMismatch {
                expected: format!("batch size {batch} for query, key and value"),
                actual: format!(
                    "key batch {}, value batch {}",
                    key.shape()[0],
                    value.shape()[0]
                ),
            });
        }
        if key.shape()[1] != value.shape()[1] {
            return Err(AtenderError::ShapeMismatch {
                expected: format!("key and value seq_len {}", key.shape()[1]),
                actual: format!("value seq_len {}", value.shape()[1]),
            });
        }

        let q = reshape_for_attention(&self.w_q.forward(query), self.num_heads, self.d_k);
        let k = reshape_for_attention(&self.w_k.forward(key), self.num_heads, self.d_k);
        let v = reshape_for_attention(&self.w_v.forward(value), self.num_heads, self.d_k);

        let (attended, weights) =
            scaled_dot_product_attention(&q, &k, &v, mask, &self.dropout, training)?;

        let concat = reshape_from_attention(&attended, self.d_model);
        Ok((self.w_o.forward(&concat), weights))
    }

    fn validate_input(&self, name: &str, input: &Tensor) -> Result<()> {
        let shape = input.shape();
        if shape.len() != 3 || shape[2] != self.d_model {
            return Err(AtenderError::ShapeMismatch {
                expected: format!("{name} of shape [batch, seq_len, {}]", self.d_model),
                actual: format!("{shape:?}"),
            });
        }
        Ok(())
    }

    /// References to all learnable parameters (four projections).
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        [&self.w_q, &self.w_k, &self.w_v, &self.w_o]
            .iter()
            .flat_map(|l| l.parameters())
            .collect()
    }

    /// Mutable references to all learnable parameters.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.w_q.parameters_mut();
        params.extend(self.w_k.parameters_mut());
        params.extend(self.w_v.parameters_mut());
        params.extend(self.w_o.parameters_mut());
        params
    }
}

/// Scaled dot-product attention over per-head tensors:
///
/// ```text
/// Attention(Q, K, V) = softmax(Q K^T / sqrt(d_k)) V
/// ```
///
/// Masked positions (mask value 0) are filled with a large negative
/// constant before the softmax. Dropout is applied to the weights, and the
/// post-dropout weights are what multiplies V and what is returned.
///
/// # Shape
///
/// - q: `[batch, heads, q_len, d_k]`
/// - k, v: `[batch, heads, kv_len, d_k]`
/// - output: `([batch, heads, q_len, d_k], [batch, heads, q_len, kv_len])`
pub fn scaled_dot_product_attention(
    q: &Tensor,
    k: &Tensor,
    v: &Tensor,
    mask: Option<&Tensor>,
    dropout: &Dropout,
    training: bool,
) -> Result<(Tensor, Tensor)> {
    let d_k = q.shape()[q.ndim() - 1];
    let scale = 1.0 / (d_k as f32).sqrt();

    let mut scores = q.matmul_batched(&k.transpose_last_two()).mul_scalar(scale);

    if let Some(mask) = mask {
        scores = masked_fill(&scores, mask)?;
    }

    let weights = dropout.forward(&softmax(&scores), training);
    Ok((weights.matmul_batched(v), weights))
}

/// Fill positions where `mask` is zero with [`MASK_FILL`].
///
/// The mask may have rank 2 to 4; its shape is left-padded with 1s to rank
/// 4 and each dimension must then be 1 or equal the corresponding score
/// dimension (numpy-style broadcasting).
///
/// # Errors
///
/// Returns [`AtenderError::MaskShapeMismatch`] if the padded shape cannot
/// broadcast to the score shape.
fn masked_fill(scores: &Tensor, mask: &Tensor) -> Result<Tensor> {
    let scores_shape = scores.shape();
    let mask_shape = mask.shape();

    let mismatch = || AtenderError::MaskShapeMismatch {
        mask_shape: mask_shape.to_vec(),
        scores_shape: scores_shape.to_vec(),
    };

    if mask_shape.len() < 2 || mask_shape.len() > 4 {
        return Err(mismatch());
    }

    // Left-pad to rank 4, e.g. [q, k] -> [1, 1, q, k]
    let mut padded = [1usize; 4];
    padded[4 - mask_shape.len()..].copy_from_slice(mask_shape);

    for (m, s) in padded.iter().zip(scores_shape) {
        if *m != 1 && m != s {
            return Err(mismatch());
        }
    }

    let (b, h, q_len, k_len) = (
        scores_shape[0],
        scores_shape[1],
        scores_shape[2],
        scores_shape[3],
    );
    // Stride 0 on broadcast (size 1) dimensions repeats the mask value
    let strides = [
        if padded[0] == 1 { 0 } else { padded[1] * padded[2] * padded[3] },
        if padded[1] == 1 { 0 } else { padded[2] * padded[3] },
        if padded[2] == 1 { 0 } else { padded[3] },
        if padded[3] == 1 { 0 } else { 1 },
    ];

    let mask_data = mask.data();
    let mut data = scores.data().to_vec();
    let mut idx = 0;
    for bi in 0..b {
        for hi in 0..h {
            for qi in 0..q_len {
                for ki in 0..k_len {
                    let m = mask_data
                        [bi * strides[0] + hi * strides[1] + qi * strides[2] + ki * strides[3]];
                    if m == 0.0 {
                        data[idx] = MASK_FILL;
                    }
                    idx += 1;
                }
            }
        }
    }

    Ok(Tensor::new(&data, scores_shape))
}

/// Split the model dimension into heads and reorder for per-head matmuls:
/// `[batch, seq, d_model]` -> `[batch, heads, seq, d_k]`.
#[must_use]
pub fn reshape_for_attention(x: &Tensor, num_heads: usize, d_k: usize) -> Tensor {
    let shape = x.shape();
    let (batch, seq_len) = (shape[0], shape[1]);
    let d_model = num_heads * d_k;

    let mut output = vec![0.0; x.numel()];
    for b in 0..batch {
        for s in 0..seq_len {
            for h in 0..num_heads {
                for d in 0..d_k {
                    let src = b * seq_len * d_model + s * d_model + h * d_k + d;
                    let dst = b * num_heads * seq_len * d_k + h * seq_len * d_k + s * d_k + d;
                    output[dst] = x.data()[src];
                }
            }
        }
    }

    Tensor::new(&output, &[batch, num_heads, seq_len, d_k])
}

/// Inverse of [`reshape_for_attention`]: concatenate the heads back into
/// the model dimension, `[batch, heads, seq, d_k]` -> `[batch, seq, d_model]`.
#[must_use]
pub fn reshape_from_attention(x: &Tensor, d_model: usize) -> Tensor {
    let shape = x.shape();
    let (batch, num_heads, seq_len, d_k) = (shape[0], shape[1], shape[2], shape[3]);

    let mut output = vec![0.0; x.numel()];
    for b in 0..batch {
        for h in 0..num_heads {
            for s in 0..seq_len {
                for d in 0..d_k {
                    let src = b * num_heads * seq_len * d_k + h * seq_len * d_k + s * d_k + d;
                    let dst = b * seq_len * d_model + s * d_model + h * d_k + d;
                    output[dst] = x.data()[src];
                }
            }
        }
    }

    Tensor::new(&output, &[batch, seq_len, d_model])
}

#[cfg(test)]
#[path = "tests_attention_contract.rs"]
mod tests_attention_contract;
