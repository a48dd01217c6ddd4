//! Transformer encoder components.
//!
//! The pipeline runs in three stages:
//!
//! 1. [`crate::nn::TokenEmbedding`] looks up and scales token vectors
//! 2. [`PositionalEncoder`] injects order information
//! 3. [`EncoderStack`] applies `num_layers` rounds of self-attention and
//!    feed-forward processing under pre-norm residual connections
//!
//! [`TransformerEncoder`] is the assembled pipeline; the individual
//! blocks are exported for callers composing their own architectures.
//!
//! # References
//!
//! - Vaswani, A., et al. (2017). Attention is all you need. `NeurIPS`.

mod attention;
mod config;
mod encoder;
mod feed_forward;
mod positional;

pub use attention::{
    reshape_for_attention, reshape_from_attention, scaled_dot_product_attention,
    MultiHeadAttention,
};
pub use config::EncoderConfig;
pub use encoder::{EncoderLayer, EncoderStack, ResidualSublayer, Sublayer, TransformerEncoder};
pub use feed_forward::FeedForwardBlock;
pub use positional::{compute_positional_encoding, PositionalEncoder};
