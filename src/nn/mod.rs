//! Neural network building blocks for the encoder.
//!
//! # Architecture
//!
//! The module is organized around the [`Module`] trait, which defines the
//! interface for pure tensor-to-tensor layers:
//!
//! - **Layers**: [`Linear`], [`LayerNorm`]
//! - **Lookup**: [`TokenEmbedding`]
//! - **Regularization**: [`Dropout`]
//! - **Transformer**: [`MultiHeadAttention`], [`FeedForwardBlock`],
//!   [`ResidualSublayer`], [`EncoderLayer`], [`EncoderStack`],
//!   [`TransformerEncoder`], [`PositionalEncoder`]
//!
//! Components that touch dropout or an attention mask take explicit
//! `training: bool` / `mask: Option<&Tensor>` arguments on their inherent
//! `forward` methods instead of carrying an ambient mode flag, so a fixed
//! set of weights can always be evaluated deterministically.
//!
//! # References
//!
//! - Vaswani, A., et al. (2017). Attention is all you need. `NeurIPS`.
//! - Srivastava, N., et al. (2014). Dropout: A simple way to prevent neural
//!   networks from overfitting. JMLR.

mod dropout;
mod embedding;
pub mod functional;
pub mod init;
mod linear;
mod module;
mod normalization;
pub mod transformer;

pub use dropout::Dropout;
pub use embedding::TokenEmbedding;
pub use functional as F;
pub use linear::Linear;
pub use module::Module;
pub use normalization::LayerNorm;
pub use transformer::{
    EncoderConfig, EncoderLayer, EncoderStack, FeedForwardBlock, MultiHeadAttention,
    PositionalEncoder, ResidualSublayer, Sublayer, TransformerEncoder,
};
