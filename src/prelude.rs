//! Convenience re-exports for typical use.
//!
//! ```
//! use atender::prelude::*;
//!
//! let mut config = EncoderConfig::new(100, 32);
//! config.d_model = 16;
//! config.num_heads = 2;
//! config.d_ff = 32;
//! config.num_layers = 1;
//! let encoder = TransformerEncoder::with_seed(config, 0).unwrap();
//! assert!(encoder.num_parameters() > 0);
//! ```

pub use crate::error::{AtenderError, Result};
pub use crate::nn::{
    Dropout, EncoderConfig, FeedForwardBlock, LayerNorm, Linear, Module, MultiHeadAttention,
    PositionalEncoder, TokenEmbedding, TransformerEncoder,
};
pub use crate::tensor::Tensor;
