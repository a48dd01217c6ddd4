//! Error types for Atender operations.
//!
//! All failures are detected eagerly at the boundary of the component that
//! first observes them; no partial output is ever returned.

use std::fmt;

/// Main error type for Atender operations.
///
/// # Examples
///
/// ```
/// use atender::error::AtenderError;
///
/// let err = AtenderError::ShapeMismatch {
///     expected: "[batch, seq, 512]".to_string(),
///     actual: "[batch, seq, 256]".to_string(),
/// };
/// assert!(err.to_string().contains("shape mismatch"));
/// ```
#[derive(Debug)]
pub enum AtenderError {
    /// Construction-time configuration violates a constraint.
    InvalidConfig {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// A token id falls outside `[0, vocab_size)`.
    TokenOutOfRange {
        /// Offending token id
        id: usize,
        /// Configured vocabulary size
        vocab_size: usize,
    },

    /// An input tensor's rank or dimensions don't match what a component
    /// expects, or a sequence exceeds the positional table capacity.
    ShapeMismatch {
        /// Expected shape description
        expected: String,
        /// Actual shape found
        actual: String,
    },

    /// A supplied attention mask cannot broadcast to the score shape.
    MaskShapeMismatch {
        /// Shape of the supplied mask
        mask_shape: Vec<usize>,
        /// Attention score shape the mask must broadcast to
        scores_shape: Vec<usize>,
    },
}

impl fmt::Display for AtenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtenderError::InvalidConfig {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid configuration: {param} = {value}, expected {constraint}"
                )
            }
            AtenderError::TokenOutOfRange { id, vocab_size } => {
                write!(
                    f,
                    "Token id {id} out of range for vocabulary of size {vocab_size}"
                )
            }
            AtenderError::ShapeMismatch { expected, actual } => {
                write!(f, "Tensor shape mismatch: expected {expected}, got {actual}")
            }
            AtenderError::MaskShapeMismatch {
                mask_shape,
                scores_shape,
            } => {
                write!(
                    f,
                    "Mask shape {mask_shape:?} cannot broadcast to attention scores {scores_shape:?}"
                )
            }
        }
    }
}

impl std::error::Error for AtenderError {}

#[allow(clippy::cmp_owned)]
impl PartialEq<&str> for AtenderError {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl AtenderError {
    /// Create a shape mismatch error from two concrete shapes.
    #[must_use]
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    /// Create a configuration error for a positive-integer constraint.
    #[must_use]
    pub fn non_positive(param: &str, value: usize) -> Self {
        Self::InvalidConfig {
            param: param.to_string(),
            value: value.to_string(),
            constraint: "> 0".to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, AtenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = AtenderError::InvalidConfig {
            param: "d_model".to_string(),
            value: "30".to_string(),
            constraint: "divisible by num_heads (8)".to_string(),
        };
        assert!(err.to_string().contains("Invalid configuration"));
        assert!(err.to_string().contains("d_model"));
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_token_out_of_range_display() {
        let err = AtenderError::TokenOutOfRange {
            id: 7,
            vocab_size: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("Token id 7"));
        assert!(msg.contains("size 5"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = AtenderError::shape_mismatch(&[1, 5, 32], &[1, 5, 16]);
        let msg = err.to_string();
        assert!(msg.contains("shape mismatch"));
        assert!(msg.contains("[1, 5, 32]"));
        assert!(msg.contains("[1, 5, 16]"));
    }

    #[test]
    fn test_mask_shape_mismatch_display() {
        let err = AtenderError::MaskShapeMismatch {
            mask_shape: vec![2, 3],
            scores_shape: vec![1, 4, 5, 5],
        };
        let msg = err.to_string();
        assert!(msg.contains("[2, 3]"));
        assert!(msg.contains("[1, 4, 5, 5]"));
    }

    #[test]
    fn test_non_positive_helper() {
        let err = AtenderError::non_positive("num_layers", 0);
        let msg = err.to_string();
        assert!(msg.contains("num_layers"));
        assert!(msg.contains("> 0"));
    }

    #[test]
    fn test_error_eq_str() {
        let err = AtenderError::TokenOutOfRange {
            id: 7,
            vocab_size: 5,
        };
        assert!(err == "Token id 7 out of range for vocabulary of size 5");
    }

    #[test]
    fn test_error_debug_impl() {
        let err = AtenderError::non_positive("d_ff", 0);
        assert!(format!("{err:?}").contains("InvalidConfig"));
    }
}
