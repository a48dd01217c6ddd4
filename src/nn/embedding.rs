//! Token embedding lookup.

use super::init::normal;
use crate::error::{AtenderError, Result};
use crate::tensor::Tensor;

/// Learned token embedding table with the transformer's `sqrt(d_model)`
/// output scaling (Vaswani et al., 2017, section 3.4).
///
/// The forward pass is fallible: token ids are validated against
/// `vocab_size` before any lookup, and the id batch must be rectangular.
///
/// # Shape
///
/// - Input: `batch` slices of `seq_len` token ids each
/// - Output: `[batch, seq_len, d_model]`
#[derive(Debug)]
pub struct TokenEmbedding {
    /// Embedding table, shape: [vocab_size, d_model]
    weight: Tensor,
    vocab_size: usize,
    d_model: usize,
}

impl TokenEmbedding {
    /// Create a new embedding table initialized from N(0, 1).
    #[must_use]
    pub fn new(vocab_size: usize, d_model: usize) -> Self {
        Self::with_seed(vocab_size, d_model, None)
    }

    /// Create an embedding table with a specific random seed.
    #[must_use]
    pub fn with_seed(vocab_size: usize, d_model: usize, seed: Option<u64>) -> Self {
        Self {
            weight: normal(&[vocab_size, d_model], 0.0, 1.0, seed),
            vocab_size,
            d_model,
        }
    }

    /// Get the vocabulary size.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Get the embedding dimension.
    #[must_use]
    pub fn d_model(&self) -> usize {
        self.d_model
    }

    /// Get reference to the embedding table.
    #[must_use]
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Set the embedding table from external data.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not `[vocab_size, d_model]`.
    pub fn set_weight(&mut self, weight: Tensor) {
        assert_eq!(
            weight.shape(),
            &[self.vocab_size, self.d_model],
            "Embedding weight must be [vocab_size, d_model]"
        );
        self.weight = weight;
    }

    /// Look up each token id and scale the result by `sqrt(d_model)`.
    ///
    /// # Errors
    ///
    /// - [`AtenderError::ShapeMismatch`] if the batch is not rectangular
    ///   (sequences of differing lengths) or empty.
    /// - [`AtenderError::TokenOutOfRange`] for any id >= `vocab_size`. The
    ///   whole batch is validated before the output is built, so the error
    ///   names the first offending id.
    pub fn forward(&self, token_ids: &[Vec<usize>]) -> Result<Tensor> {
        let batch = token_ids.len();
        if batch == 0 {
            return Err(AtenderError::ShapeMismatch {
                expected: "at least one sequence".to_string(),
                actual: "empty batch".to_string(),
            });
        }

        let seq_len = token_ids[0].len();
        if seq_len == 0 {
            return Err(AtenderError::ShapeMismatch {
                expected: "non-empty sequences".to_string(),
                actual: "sequence of length 0".to_string(),
            });
        }
        for seq in token_ids {
            if seq.len() != seq_len {
                return Err(AtenderError::ShapeMismatch {
                    expected: format!("all sequences of length {seq_len}"),
                    actual: format!("sequence of length {}", seq.len()),
                });
            }
            for &id in seq {
                if id >= self.vocab_size {
                    return Err(AtenderError::TokenOutOfRange {
                        id,
                        vocab_size: self.vocab_size,
                    });
                }
            }
        }

        let scale = (self.d_model as f32).sqrt();
        let table = self.weight.data();
        let mut output = Vec::with_capacity(batch * seq_len * self.d_model);

        for seq in token_ids {
            for &id in seq {
                let row = &table[id * self.d_model..(id + 1) * self.d_model];
                output.extend(row.iter().map(|&v| v * scale));
            }
        }

        Ok(Tensor::new(&output, &[batch, seq_len, self.d_model]))
    }

    /// References to the learnable parameters (the table itself).
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight]
    }

    /// Mutable references to the learnable parameters.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_shape() {
        let emb = TokenEmbedding::with_seed(10, 8, Some(42));
        let out = emb.forward(&[vec![0, 1, 2], vec![3, 4, 5]]).unwrap();
        assert_eq!(out.shape(), &[2, 3, 8]);
    }

    #[test]
    fn test_lookup_is_scaled_table_row() {
        let mut emb = TokenEmbedding::with_seed(3, 4, Some(42));
        emb.set_weight(Tensor::new(
            &[
                1.0, 2.0, 3.0, 4.0, //
                5.0, 6.0, 7.0, 8.0, //
                9.0, 10.0, 11.0, 12.0,
            ],
            &[3, 4],
        ));

        let out = emb.forward(&[vec![1]]).unwrap();
        let scale = 4.0_f32.sqrt();
        assert_eq!(out.data(), &[5.0 * scale, 6.0 * scale, 7.0 * scale, 8.0 * scale]);
    }

    #[test]
    fn test_same_token_same_row() {
        let emb = TokenEmbedding::with_seed(10, 16, Some(7));
        let out = emb.forward(&[vec![4, 4]]).unwrap();
        assert_eq!(out.data()[..16], out.data()[16..32]);
    }

    #[test]
    fn test_out_of_range_token() {
        let emb = TokenEmbedding::with_seed(5, 8, Some(42));
        let err = emb.forward(&[vec![0, 5]]).unwrap_err();
        assert!(matches!(
            err,
            AtenderError::TokenOutOfRange { id: 5, vocab_size: 5 }
        ));
    }

    #[test]
    fn test_ragged_batch_rejected() {
        let emb = TokenEmbedding::with_seed(5, 8, Some(42));
        let err = emb.forward(&[vec![0, 1], vec![2]]).unwrap_err();
        assert!(matches!(err, AtenderError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_batch_rejected() {
        let emb = TokenEmbedding::with_seed(5, 8, Some(42));
        assert!(emb.forward(&[]).is_err());
        assert!(emb.forward(&[vec![]]).is_err());
    }

    #[test]
    #[should_panic(expected = "Embedding weight must be")]
    fn test_set_weight_bad_shape_panics() {
        let mut emb = TokenEmbedding::new(5, 8);
        emb.set_weight(Tensor::zeros(&[5, 4]));
    }
}
