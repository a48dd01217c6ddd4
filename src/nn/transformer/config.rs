//! Encoder hyperparameter configuration.

use crate::error::{AtenderError, Result};
use serde::{Deserialize, Serialize};

/// Hyperparameters for [`super::TransformerEncoder`].
///
/// Validation happens once, at encoder construction, so every layer built
/// from an accepted config can assume the constraints hold.
///
/// # Examples
///
/// ```
/// use atender::nn::EncoderConfig;
///
/// let config = EncoderConfig::new(5000, 128);
/// assert_eq!(config.d_model, 512);
/// assert_eq!(config.d_k(), 64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Model (embedding) dimension
    pub d_model: usize,
    /// Vocabulary size for the token embedding
    pub vocab_size: usize,
    /// Maximum sequence length the positional table covers
    pub max_seq_len: usize,
    /// Number of attention heads; must divide `d_model`
    pub num_heads: usize,
    /// Hidden dimension of the feed-forward block
    pub d_ff: usize,
    /// Number of stacked encoder layers
    pub num_layers: usize,
    /// Dropout probability, in [0, 1)
    pub dropout_rate: f32,
    /// Epsilon added to the standard deviation in layer normalization
    pub layer_norm_eps: f32,
}

impl EncoderConfig {
    /// Create a config with the base-model defaults from Vaswani et al.
    /// (2017): `d_model` 512, 8 heads, `d_ff` 2048, 6 layers, dropout 0.1.
    #[must_use]
    pub fn new(vocab_size: usize, max_seq_len: usize) -> Self {
        Self {
            d_model: 512,
            vocab_size,
            max_seq_len,
            num_heads: 8,
            d_ff: 2048,
            num_layers: 6,
            dropout_rate: 0.1,
            layer_norm_eps: 1e-6,
        }
    }

    /// Per-head dimension: `d_model / num_heads`.
    #[must_use]
    pub fn d_k(&self) -> usize {
        self.d_model / self.num_heads
    }

    /// Check every constructor constraint.
    ///
    /// # Errors
    ///
    /// Returns [`AtenderError::InvalidConfig`] naming the first violated
    /// constraint: all dimension fields must be positive, `num_heads` must
    /// divide `d_model`, `dropout_rate` must lie in [0, 1) and
    /// `layer_norm_eps` must be positive.
    pub fn validate(&self) -> Result<()> {
        for (param, value) in [
            ("d_model", self.d_model),
            ("vocab_size", self.vocab_size),
            ("max_seq_len", self.max_seq_len),
            ("num_heads", self.num_heads),
            ("d_ff", self.d_ff),
            ("num_layers", self.num_layers),
        ] {
            if value == 0 {
                return Err(AtenderError::non_positive(param, value));
            }
        }

        if self.d_model % self.num_heads != 0 {
            return Err(AtenderError::InvalidConfig {
                param: "d_model".to_string(),
                value: self.d_model.to_string(),
                constraint: format!("divisible by num_heads ({})", self.num_heads),
            });
        }

        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(AtenderError::InvalidConfig {
                param: "dropout_rate".to_string(),
                value: self.dropout_rate.to_string(),
                constraint: "in [0, 1)".to_string(),
            });
        }

        if self.layer_norm_eps <= 0.0 {
            return Err(AtenderError::InvalidConfig {
                param: "layer_norm_eps".to_string(),
                value: self.layer_norm_eps.to_string(),
                constraint: "> 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_defaults_validate() {
        let config = EncoderConfig::new(32000, 512);
        assert!(config.validate().is_ok());
        assert_eq!(config.d_k(), 64);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut config = EncoderConfig::new(100, 64);
        config.num_layers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("num_layers"));
    }

    #[test]
    fn test_indivisible_heads_rejected() {
        let mut config = EncoderConfig::new(100, 64);
        config.d_model = 30;
        config.num_heads = 8;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("divisible by num_heads"));
    }

    #[test]
    fn test_dropout_rate_bounds() {
        let mut config = EncoderConfig::new(100, 64);
        config.dropout_rate = 1.0;
        assert!(config.validate().is_err());

        config.dropout_rate = -0.1;
        assert!(config.validate().is_err());

        config.dropout_rate = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_eps_rejected() {
        let mut config = EncoderConfig::new(100, 64);
        config.layer_norm_eps = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("layer_norm_eps"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = EncoderConfig::new(5000, 128);
        let json = serde_json::to_string(&config).unwrap();
        let back: EncoderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
