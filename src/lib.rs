//! Atender: transformer encoder forward pass in pure Rust.
//!
//! Atender maps a batch of token-id sequences to a batch of dense
//! contextualized vectors: embedding lookup with `sqrt(d_model)` scaling,
//! sinusoidal positional encoding, a stack of pre-norm encoder layers
//! (multi-head self-attention + position-wise feed-forward), and a final
//! layer normalization.
//!
//! # Quick Start
//!
//! ```
//! use atender::prelude::*;
//!
//! let config = EncoderConfig {
//!     d_model: 32,
//!     vocab_size: 10,
//!     max_seq_len: 16,
//!     num_heads: 4,
//!     d_ff: 64,
//!     num_layers: 2,
//!     dropout_rate: 0.0,
//!     layer_norm_eps: 1e-6,
//! };
//!
//! let encoder = TransformerEncoder::with_seed(config, 42).unwrap();
//! let tokens = vec![vec![0, 1, 2, 3]];
//! let output = encoder.forward(&tokens, None, false).unwrap();
//! assert_eq!(output.shape(), &[1, 4, 32]);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`tensor`]: Dense f32 tensor with the shape bookkeeping the encoder needs
//! - [`nn`]: Layers (linear, layer norm, dropout, embedding) and the
//!   transformer encoder itself
//! - [`error`]: Error taxonomy for configuration and input validation
//!
//! # References
//!
//! - Vaswani, A., et al. (2017). Attention is all you need. `NeurIPS`.

pub mod error;
pub mod nn;
pub mod prelude;
pub mod primitives;
pub mod tensor;

pub use error::{AtenderError, Result};
pub use primitives::{Matrix, Vector};
pub use tensor::Tensor;
