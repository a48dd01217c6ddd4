//! Sinusoidal positional encoding.

use crate::error::{AtenderError, Result};
use crate::nn::Dropout;
use crate::tensor::Tensor;
use std::sync::Arc;

/// Compute the sinusoidal positional encoding table.
///
/// Each position gets a unique pattern across `d_model` dimensions:
///
/// ```text
/// PE(pos, 2i)   = sin(pos / 10000^(2i / d_model))
/// PE(pos, 2i+1) = cos(pos / 10000^(2i / d_model))
/// ```
///
/// Adjacent dimension pairs share an angular frequency; the wavelengths
/// form a geometric progression from 2*pi up to 10000*2*pi, so each
/// position gets a distinct encoding and relative offsets are expressible
/// as linear functions of it.
///
/// Returns a tensor of shape `[max_len, d_model]`.
#[must_use]
pub fn compute_positional_encoding(d_model: usize, max_len: usize) -> Tensor {
    let mut pe = vec![0.0; max_len * d_model];

    for pos in 0..max_len {
        for i in 0..d_model / 2 {
            let angle = pos as f32 / 10000_f32.powf(2.0 * i as f32 / d_model as f32);
            pe[pos * d_model + 2 * i] = angle.sin();
            pe[pos * d_model + 2 * i + 1] = angle.cos();
        }
    }

    Tensor::new(&pe, &[max_len, d_model])
}

/// Adds position information to a batch of embeddings.
///
/// The table is computed once at construction and shared behind an [`Arc`];
/// the forward pass adds the first `seq_len` rows to every sequence in the
/// batch, then applies dropout.
///
/// # Shape
///
/// - Input: `[batch, seq_len, d_model]` with `seq_len <= max_seq_len`
/// - Output: same as input
#[derive(Debug)]
pub struct PositionalEncoder {
    d_model: usize,
    max_seq_len: usize,
    /// Precomputed encoding table, shape [max_seq_len, d_model]
    table: Arc<Tensor>,
    dropout: Dropout,
}

impl PositionalEncoder {
    /// Create an encoder covering sequences up to `max_seq_len`.
    #[must_use]
    pub fn new(d_model: usize, max_seq_len: usize, dropout_rate: f32) -> Self {
        Self {
            d_model,
            max_seq_len,
            table: Arc::new(compute_positional_encoding(d_model, max_seq_len)),
            dropout: Dropout::new(dropout_rate),
        }
    }

    /// Create an encoder with a seeded dropout stream.
    #[must_use]
    pub fn with_seed(d_model: usize, max_seq_len: usize, dropout_rate: f32, seed: u64) -> Self {
        Self {
            d_model,
            max_seq_len,
            table: Arc::new(compute_positional_encoding(d_model, max_seq_len)),
            dropout: Dropout::with_seed(dropout_rate, seed),
        }
    }

    /// Get the maximum supported sequence length.
    #[must_use]
    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    /// Shared handle to the precomputed table.
    #[must_use]
    pub fn table(&self) -> Arc<Tensor> {
        Arc::clone(&self.table)
    }

    /// Add positional encodings to `input` and apply dropout.
    ///
    /// # Errors
    ///
    /// Returns [`AtenderError::ShapeMismatch`] if the input is not 3D with
    /// trailing dimension `d_model`, or if `seq_len` exceeds the table
    /// capacity.
    pub fn forward(&self, input: &Tensor, training: bool) -> Result<Tensor> {
        let shape = input.shape();
        if shape.len() != 3 || shape[2] != self.d_model {
            return Err(AtenderError::ShapeMismatch {
                expected: format!("[batch, seq_len, {}]", self.d_model),
                actual: format!("{shape:?}"),
            });
        }

        let (batch, seq_len) = (shape[0], shape[1]);
        if seq_len > self.max_seq_len {
            return Err(AtenderError::ShapeMismatch {
                expected: format!("seq_len <= {}", self.max_seq_len),
                actual: format!("seq_len {seq_len}"),
            });
        }

        let table = self.table.data();
        let row_len = seq_len * self.d_model;
        let mut data = input.data().to_vec();
        for b in 0..batch {
            let offset = b * row_len;
            for (x, pe) in data[offset..offset + row_len].iter_mut().zip(&table[..row_len]) {
                *x += pe;
            }
        }

        Ok(self.dropout.forward(&Tensor::new(&data, shape), training))
    }
}

#[cfg(test)]
#[path = "tests_position_contract.rs"]
mod tests_position_contract;
