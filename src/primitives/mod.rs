//! Core compute primitives (Vector, Matrix).
//!
//! These types back the [`crate::tensor::Tensor`] storage and the 2D
//! matrix products inside attention and the feed-forward blocks.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
