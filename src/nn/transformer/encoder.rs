//! Encoder layers, the layer stack, and the full encoder front-to-back.

use crate::error::Result;
use crate::nn::{Dropout, LayerNorm, Module, TokenEmbedding};
use crate::tensor::Tensor;

use super::attention::MultiHeadAttention;
use super::config::EncoderConfig;
use super::feed_forward::FeedForwardBlock;
use super::positional::PositionalEncoder;

/// The two kinds of sublayer an encoder layer wraps in a residual
/// connection. Both variants share the `x + Dropout(f(LayerNorm(x)))`
/// wiring in [`ResidualSublayer::forward`]; only the inner function
/// differs.
#[derive(Debug)]
pub enum Sublayer {
    /// Self-attention: query, key and value are all the normalized input.
    SelfAttention(MultiHeadAttention),
    /// Position-wise feed-forward network.
    FeedForward(FeedForwardBlock),
}

impl Sublayer {
    /// Apply the wrapped transformation. The mask is only consulted by the
    /// self-attention variant.
    pub fn apply(&self, input: &Tensor, mask: Option<&Tensor>, training: bool) -> Result<Tensor> {
        match self {
            Sublayer::SelfAttention(attention) => {
                let (output, _weights) = attention.forward(input, input, input, mask, training)?;
                Ok(output)
            }
            Sublayer::FeedForward(ffn) => Ok(ffn.forward(input, training)),
        }
    }

    /// References to the wrapped block's parameters.
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        match self {
            Sublayer::SelfAttention(attention) => attention.parameters(),
            Sublayer::FeedForward(ffn) => ffn.parameters(),
        }
    }

    /// Mutable references to the wrapped block's parameters.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match self {
            Sublayer::SelfAttention(attention) => attention.parameters_mut(),
            Sublayer::FeedForward(ffn) => ffn.parameters_mut(),
        }
    }
}

/// Pre-norm residual wrapper:
///
/// ```text
/// output = x + Dropout(sublayer(LayerNorm(x)))
/// ```
///
/// Normalization happens before the sublayer, not after the addition, so
/// the residual path itself is an identity.
#[derive(Debug)]
pub struct ResidualSublayer {
    norm: LayerNorm,
    dropout: Dropout,
}

impl ResidualSublayer {
    /// Create a residual wrapper.
    #[must_use]
    pub fn new(dropout_rate: f32, eps: f32) -> Self {
        Self {
            norm: LayerNorm::with_eps(eps),
            dropout: Dropout::new(dropout_rate),
        }
    }

    /// Create a wrapper with a seeded dropout stream.
    #[must_use]
    pub fn with_seed(dropout_rate: f32, eps: f32, seed: u64) -> Self {
        Self {
            norm: LayerNorm::with_eps(eps),
            dropout: Dropout::with_seed(dropout_rate, seed),
        }
    }

    /// Run `sublayer` inside the residual connection.
    pub fn forward(
        &self,
        input: &Tensor,
        sublayer: &Sublayer,
        mask: Option<&Tensor>,
        training: bool,
    ) -> Result<Tensor> {
        let normalized = self.norm.forward(input);
        let transformed = sublayer.apply(&normalized, mask, training)?;
        Ok(input.add(&self.dropout.forward(&transformed, training)))
    }

    /// References to the norm's parameters.
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        self.norm.parameters()
    }

    /// Mutable references to the norm's parameters.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.norm.parameters_mut()
    }
}

/// One encoder layer: self-attention then feed-forward, each inside its
/// own pre-norm residual connection.
#[derive(Debug)]
pub struct EncoderLayer {
    attention: Sublayer,
    feed_forward: Sublayer,
    residual1: ResidualSublayer,
    residual2: ResidualSublayer,
}

impl EncoderLayer {
    /// Create a layer from a validated config.
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        Ok(Self {
            attention: Sublayer::SelfAttention(MultiHeadAttention::new(
                config.d_model,
                config.num_heads,
                config.dropout_rate,
            )?),
            feed_forward: Sublayer::FeedForward(FeedForwardBlock::new(
                config.d_model,
                config.d_ff,
                config.dropout_rate,
            )),
            residual1: ResidualSublayer::new(config.dropout_rate, config.layer_norm_eps),
            residual2: ResidualSublayer::new(config.dropout_rate, config.layer_norm_eps),
        })
    }

    /// Create a layer with deterministic initialization.
    pub fn with_seed(config: &EncoderConfig, seed: u64) -> Result<Self> {
        Ok(Self {
            attention: Sublayer::SelfAttention(MultiHeadAttention::with_seed(
                config.d_model,
                config.num_heads,
                config.dropout_rate,
                seed,
            )?),
            feed_forward: Sublayer::FeedForward(FeedForwardBlock::with_seed(
                config.d_model,
                config.d_ff,
                config.dropout_rate,
                seed.wrapping_add(10),
            )),
            residual1: ResidualSublayer::with_seed(
                config.dropout_rate,
                config.layer_norm_eps,
                seed.wrapping_add(20),
            ),
            residual2: ResidualSublayer::with_seed(
                config.dropout_rate,
                config.layer_norm_eps,
                seed.wrapping_add(21),
            ),
        })
    }

    /// Forward pass through both sublayers.
    ///
    /// # Errors
    ///
    /// Propagates shape and mask errors from the attention sublayer.
    pub fn forward(
        &self,
        input: &Tensor,
        mask: Option<&Tensor>,
        training: bool,
    ) -> Result<Tensor> {
        let attended = self
            .residual1
            .forward(input, &self.attention, mask, training)?;
        self.residual2
            .forward(&attended, &self.feed_forward, None, training)
    }

    /// References to all learnable parameters in this layer.
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.residual1.parameters();
        params.extend(self.attention.parameters());
        params.extend(self.residual2.parameters());
        params.extend(self.feed_forward.parameters());
        params
    }

    /// Mutable references to all learnable parameters in this layer.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.residual1.parameters_mut();
        params.extend(self.attention.parameters_mut());
        params.extend(self.residual2.parameters_mut());
        params.extend(self.feed_forward.parameters_mut());
        params
    }

    /// The self-attention block, for weight loading.
    pub fn attention_mut(&mut self) -> &mut Sublayer {
        &mut self.attention
    }

    /// The feed-forward block, for weight loading.
    pub fn feed_forward_mut(&mut self) -> &mut Sublayer {
        &mut self.feed_forward
    }
}

/// N stacked encoder layers followed by a final layer normalization.
///
/// The final norm is required under pre-norm wiring: without it the last
/// layer's residual output is never normalized.
#[derive(Debug)]
pub struct EncoderStack {
    layers: Vec<EncoderLayer>,
    norm: LayerNorm,
}

impl EncoderStack {
    /// Create a stack of `config.num_layers` layers.
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        let layers = (0..config.num_layers)
            .map(|_| EncoderLayer::new(config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            layers,
            norm: LayerNorm::with_eps(config.layer_norm_eps),
        })
    }

    /// Create a stack with deterministic initialization; each layer gets
    /// its own derived seed.
    pub fn with_seed(config: &EncoderConfig, seed: u64) -> Result<Self> {
        let layers = (0..config.num_layers)
            .map(|i| EncoderLayer::with_seed(config, seed.wrapping_add(100 * i as u64)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            layers,
            norm: LayerNorm::with_eps(config.layer_norm_eps),
        })
    }

    /// Number of layers in the stack.
    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Thread the input through every layer, then apply the final norm.
    pub fn forward(
        &self,
        input: &Tensor,
        mask: Option<&Tensor>,
        training: bool,
    ) -> Result<Tensor> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x, mask, training)?;
        }
        Ok(self.norm.forward(&x))
    }

    /// References to every parameter in the stack.
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params: Vec<&Tensor> = self.layers.iter().flat_map(EncoderLayer::parameters).collect();
        params.extend(self.norm.parameters());
        params
    }

    /// Mutable references to every parameter in the stack.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params: Vec<&mut Tensor> = self
            .layers
            .iter_mut()
            .flat_map(EncoderLayer::parameters_mut)
            .collect();
        params.extend(self.norm.parameters_mut());
        params
    }

    /// Mutable access to the individual layers, for weight loading.
    pub fn layers_mut(&mut self) -> &mut [EncoderLayer] {
        &mut self.layers
    }
}

/// The full encoder: token embedding, positional encoding, and the layer
/// stack, driven as one pipeline.
///
/// # Examples
///
/// ```
/// use atender::nn::{EncoderConfig, TransformerEncoder};
///
/// let mut config = EncoderConfig::new(100, 64);
/// config.d_model = 32;
/// config.num_heads = 4;
/// config.d_ff = 64;
/// config.num_layers = 2;
/// config.dropout_rate = 0.0;
///
/// let encoder = TransformerEncoder::with_seed(config, 42).unwrap();
/// let output = encoder.forward(&[vec![1, 2, 3, 4]], None, false).unwrap();
/// assert_eq!(output.shape(), &[1, 4, 32]);
/// ```
#[derive(Debug)]
pub struct TransformerEncoder {
    config: EncoderConfig,
    embedding: TokenEmbedding,
    positional: PositionalEncoder,
    stack: EncoderStack,
}

impl TransformerEncoder {
    /// Build an encoder from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AtenderError::InvalidConfig`] if the config
    /// fails validation; no component is constructed in that case.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            embedding: TokenEmbedding::new(config.vocab_size, config.d_model),
            positional: PositionalEncoder::new(
                config.d_model,
                config.max_seq_len,
                config.dropout_rate,
            ),
            stack: EncoderStack::new(&config)?,
            config,
        })
    }

    /// Build an encoder with deterministic initialization; two encoders
    /// with the same config and seed hold identical weights.
    pub fn with_seed(config: EncoderConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            embedding: TokenEmbedding::with_seed(
                config.vocab_size,
                config.d_model,
                Some(seed),
            ),
            positional: PositionalEncoder::with_seed(
                config.d_model,
                config.max_seq_len,
                config.dropout_rate,
                seed.wrapping_add(1),
            ),
            stack: EncoderStack::with_seed(&config, seed.wrapping_add(2))?,
            config,
        })
    }

    /// The configuration this encoder was built from.
    #[must_use]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode a batch of token id sequences.
    ///
    /// The pipeline is embedding (scaled by `sqrt(d_model)`), positional
    /// encoding, then the layer stack. With `training = false` and a fixed
    /// set of weights the output is fully deterministic.
    ///
    /// # Errors
    ///
    /// - [`crate::error::AtenderError::TokenOutOfRange`] for ids >=
    ///   `vocab_size`.
    /// - [`crate::error::AtenderError::ShapeMismatch`] for ragged batches
    ///   or sequences longer than `max_seq_len`.
    /// - [`crate::error::AtenderError::MaskShapeMismatch`] if the mask
    ///   cannot broadcast to the attention scores.
    pub fn forward(
        &self,
        token_ids: &[Vec<usize>],
        mask: Option<&Tensor>,
        training: bool,
    ) -> Result<Tensor> {
        let embedded = self.embedding.forward(token_ids)?;
        let positioned = self.positional.forward(&embedded, training)?;
        self.stack.forward(&positioned, mask, training)
    }

    /// References to every learnable parameter in the encoder.
    #[must_use]
    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.embedding.parameters();
        params.extend(self.stack.parameters());
        params
    }

    /// Mutable references to every learnable parameter.
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.embedding.parameters_mut();
        params.extend(self.stack.parameters_mut());
        params
    }

    /// Total number of scalar parameters.
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }

    /// Mutable access to the embedding table, for weight loading.
    pub fn embedding_mut(&mut self) -> &mut TokenEmbedding {
        &mut self.embedding
    }

    /// Mutable access to the layer stack, for weight loading.
    pub fn stack_mut(&mut self) -> &mut EncoderStack {
        &mut self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> EncoderConfig {
        let mut config = EncoderConfig::new(50, 16);
        config.d_model = 16;
        config.num_heads = 4;
        config.d_ff = 32;
        config.num_layers = 2;
        config.dropout_rate = 0.0;
        config
    }

    #[test]
    fn test_residual_keeps_identity_path() {
        // Zero out the feed-forward contraction so the sublayer output is
        // exactly zero; the residual must then return the input unchanged.
        let mut ffn = FeedForwardBlock::with_seed(8, 16, 0.0, 1);
        {
            let (_, l2) = ffn.projections_mut();
            l2.set_weight(Tensor::zeros(&[8, 16]));
            l2.set_bias(Tensor::zeros(&[8]));
        }
        let sublayer = Sublayer::FeedForward(ffn);
        let residual = ResidualSublayer::new(0.0, 1e-6);

        let x = Tensor::new(
            &(0..16).map(|i| (i as f32 * 0.2).sin()).collect::<Vec<_>>(),
            &[1, 2, 8],
        );
        let y = residual.forward(&x, &sublayer, None, false).unwrap();
        assert_eq!(y.data(), x.data());
    }

    #[test]
    fn test_layer_preserves_shape() {
        let config = small_config();
        let layer = EncoderLayer::with_seed(&config, 42).unwrap();
        let x = Tensor::ones(&[2, 5, 16]);
        let y = layer.forward(&x, None, false).unwrap();
        assert_eq!(y.shape(), &[2, 5, 16]);
    }

    #[test]
    fn test_stack_builds_requested_layer_count() {
        let stack = EncoderStack::with_seed(&small_config(), 42).unwrap();
        assert_eq!(stack.num_layers(), 2);
    }

    #[test]
    fn test_stack_layers_differ_under_one_seed() {
        let stack = EncoderStack::with_seed(&small_config(), 42).unwrap();
        let x = Tensor::ones(&[1, 4, 16]);

        let y0 = stack.layers[0].forward(&x, None, false).unwrap();
        let y1 = stack.layers[1].forward(&x, None, false).unwrap();
        assert_ne!(y0.data(), y1.data(), "Layers share weights");
    }

    #[test]
    fn test_encoder_forward_shape() {
        let encoder = TransformerEncoder::with_seed(small_config(), 42).unwrap();
        let out = encoder
            .forward(&[vec![1, 2, 3], vec![4, 5, 6]], None, false)
            .unwrap();
        assert_eq!(out.shape(), &[2, 3, 16]);
    }

    #[test]
    fn test_encoder_rejects_invalid_config() {
        let mut config = small_config();
        config.d_model = 15;
        assert!(TransformerEncoder::new(config).is_err());
    }

    #[test]
    fn test_encoder_propagates_token_error() {
        let encoder = TransformerEncoder::with_seed(small_config(), 42).unwrap();
        assert!(encoder.forward(&[vec![0, 50]], None, false).is_err());
    }

    #[test]
    fn test_seeded_encoders_are_identical() {
        let e1 = TransformerEncoder::with_seed(small_config(), 7).unwrap();
        let e2 = TransformerEncoder::with_seed(small_config(), 7).unwrap();

        let out1 = e1.forward(&[vec![1, 2, 3]], None, false).unwrap();
        let out2 = e2.forward(&[vec![1, 2, 3]], None, false).unwrap();
        assert_eq!(out1.data(), out2.data());
    }

    #[test]
    fn test_every_layer_changes_the_representation() {
        // Perturbing any single layer's weights must change the final
        // output; a layer that doesn't is dead weight in the stack.
        let config = small_config();
        let tokens = [vec![1, 2, 3, 4]];

        let reference = TransformerEncoder::with_seed(config.clone(), 9)
            .unwrap()
            .forward(&tokens, None, false)
            .unwrap();

        for perturb in 0..config.num_layers {
            let mut encoder = TransformerEncoder::with_seed(config.clone(), 9).unwrap();
            {
                let layer = &mut encoder.stack_mut().layers_mut()[perturb];
                for p in layer.parameters_mut() {
                    for v in p.data_mut() {
                        *v += 0.1;
                    }
                }
            }
            let out = encoder.forward(&tokens, None, false).unwrap();
            assert_ne!(
                out.data(),
                reference.data(),
                "Layer {perturb} has no effect on the output"
            );
        }
    }

    #[test]
    fn test_parameter_count_scales_with_layers() {
        let one = {
            let mut c = small_config();
            c.num_layers = 1;
            TransformerEncoder::with_seed(c, 1).unwrap().num_parameters()
        };
        let two = TransformerEncoder::with_seed(small_config(), 1)
            .unwrap()
            .num_parameters();

        let embedding = 50 * 16;
        let final_norm = 2;
        let per_layer = (two - embedding - final_norm) / 2;
        assert_eq!(one, embedding + final_norm + per_layer);
    }
}
