//! Tensor operations: element-wise arithmetic, reshaping, and the matrix
//! products the attention and feed-forward blocks are built on.
//!
//! Shape violations here are programmer errors and panic with descriptive
//! messages; user-facing validation happens at the `nn` component
//! boundaries and returns [`crate::error::AtenderError`].

use super::Tensor;
use crate::primitives::Matrix;

// ============================================================================
// Element-wise
// ============================================================================

impl Tensor {
    /// Element-wise addition: z = self + other.
    ///
    /// # Panics
    ///
    /// Panics if shapes differ.
    #[must_use]
    pub fn add(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.shape(),
            other.shape(),
            "Shapes must match for addition"
        );
        let data: Vec<f32> = self
            .data()
            .iter()
            .zip(other.data().iter())
            .map(|(a, b)| a + b)
            .collect();
        Tensor::new(&data, self.shape())
    }

    /// Multiply every element by a scalar.
    #[must_use]
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        let data: Vec<f32> = self.data().iter().map(|x| x * scalar).collect();
        Tensor::new(&data, self.shape())
    }
}

// ============================================================================
// Linear Algebra
// ============================================================================

impl Tensor {
    /// Matrix multiplication for 2D tensors: z = self @ other.
    ///
    /// # Panics
    ///
    /// Panics if either tensor is not 2D or the inner dimensions differ.
    #[must_use]
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul requires 2D tensors");

        let (m, k1) = (self.shape()[0], self.shape()[1]);
        let (k2, n) = (other.shape()[0], other.shape()[1]);
        assert_eq!(k1, k2, "matmul dimension mismatch: {k1} vs {k2}");

        let a = Matrix::from_vec(m, k1, self.data().to_vec()).expect("valid matrix dimensions");
        let b = Matrix::from_vec(k2, n, other.data().to_vec()).expect("valid matrix dimensions");
        let result = a.matmul(&b).expect("matmul dimensions validated");

        Tensor::new(result.as_slice(), &[m, n])
    }

    /// Batched matrix multiplication over the last two axes.
    ///
    /// For `[.., m, k] @ [.., k, n] -> [.., m, n]`; all leading (batch)
    /// dimensions must match. Iterates over the batch and applies the 2D
    /// matmul per slice.
    ///
    /// # Panics
    ///
    /// Panics if ranks differ, leading dimensions differ, or inner
    /// dimensions don't match.
    #[must_use]
    pub fn matmul_batched(&self, other: &Tensor) -> Tensor {
        let a_shape = self.shape();
        let b_shape = other.shape();
        assert_eq!(
            a_shape.len(),
            b_shape.len(),
            "matmul_batched requires equal ranks"
        );
        let ndim = a_shape.len();
        assert!(ndim >= 2, "matmul_batched requires at least 2D tensors");

        if ndim == 2 {
            return self.matmul(other);
        }

        assert_eq!(
            &a_shape[..ndim - 2],
            &b_shape[..ndim - 2],
            "matmul_batched leading dimensions must match"
        );

        let (m, k1) = (a_shape[ndim - 2], a_shape[ndim - 1]);
        let (k2, n) = (b_shape[ndim - 2], b_shape[ndim - 1]);
        assert_eq!(k1, k2, "matmul_batched inner dimensions: {k1} vs {k2}");

        let batch: usize = a_shape[..ndim - 2].iter().product();
        let a_stride = m * k1;
        let b_stride = k1 * n;
        let out_stride = m * n;

        let mut output = vec![0.0; batch * out_stride];
        for bi in 0..batch {
            let a = Matrix::from_vec(
                m,
                k1,
                self.data()[bi * a_stride..(bi + 1) * a_stride].to_vec(),
            )
            .expect("valid matrix dimensions");
            let b = Matrix::from_vec(
                k1,
                n,
                other.data()[bi * b_stride..(bi + 1) * b_stride].to_vec(),
            )
            .expect("valid matrix dimensions");
            let result = a.matmul(&b).expect("matmul dimensions validated");
            output[bi * out_stride..(bi + 1) * out_stride].copy_from_slice(result.as_slice());
        }

        let mut out_shape = a_shape[..ndim - 2].to_vec();
        out_shape.push(m);
        out_shape.push(n);
        Tensor::new(&output, &out_shape)
    }

    /// Transpose a 2D tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2D.
    #[must_use]
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "transpose requires 2D tensor");

        let (rows, cols) = (self.shape()[0], self.shape()[1]);
        let mut data = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data()[i * cols + j];
            }
        }

        Tensor::new(&data, &[cols, rows])
    }

    /// Transpose the last two dimensions of an ND tensor.
    ///
    /// Used to turn `K [batch, heads, seq, d_k]` into `K^T` for the
    /// attention score product.
    #[must_use]
    pub fn transpose_last_two(&self) -> Tensor {
        let shape = self.shape();
        let ndim = shape.len();

        if ndim < 2 {
            return self.clone();
        }

        let last = shape[ndim - 1];
        let second_last = shape[ndim - 2];

        let mut new_shape = shape.to_vec();
        new_shape[ndim - 2] = last;
        new_shape[ndim - 1] = second_last;

        let batch_size: usize = shape[..ndim - 2].iter().product();
        let matrix_size = last * second_last;

        let mut output = vec![0.0; self.numel()];
        for b in 0..batch_size {
            let offset = b * matrix_size;
            for i in 0..second_last {
                for j in 0..last {
                    // Original: [b, i, j] -> New: [b, j, i]
                    output[offset + j * second_last + i] = self.data()[offset + i * last + j];
                }
            }
        }

        Tensor::new(&output, &new_shape)
    }

    /// Reshape tensor to a new shape (view).
    ///
    /// # Panics
    ///
    /// Panics if the total number of elements would change.
    #[must_use]
    pub fn view(&self, new_shape: &[usize]) -> Tensor {
        let old_numel: usize = self.shape().iter().product();
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            old_numel, new_numel,
            "view: number of elements must match ({old_numel} vs {new_numel})"
        );

        Tensor::new(self.data(), new_shape)
    }

    /// Broadcast addition: z = matrix + vector (broadcasts over rows).
    ///
    /// Used for adding biases after a projection.
    ///
    /// # Shape
    ///
    /// - self: `[N, M]` (2D matrix)
    /// - other: `[M]` (1D vector)
    /// - output: `[N, M]`
    ///
    /// # Panics
    ///
    /// Panics if ranks or dimensions don't line up.
    #[must_use]
    pub fn broadcast_add(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "broadcast_add requires 2D matrix");
        assert_eq!(other.ndim(), 1, "broadcast_add requires 1D vector");
        assert_eq!(
            self.shape()[1],
            other.shape()[0],
            "Matrix columns {} must match vector length {}",
            self.shape()[1],
            other.shape()[0]
        );

        let (rows, cols) = (self.shape()[0], self.shape()[1]);
        let mut data = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                data[i * cols + j] = self.data()[i * cols + j] + other.data()[j];
            }
        }

        Tensor::new(&data, self.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add() {
        let a = Tensor::new(&[1.0, 2.0], &[2]);
        let b = Tensor::new(&[3.0, 4.0], &[2]);
        assert_eq!(a.add(&b).data(), &[4.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "Shapes must match")]
    fn test_add_shape_mismatch_panics() {
        let a = Tensor::zeros(&[2]);
        let b = Tensor::zeros(&[3]);
        let _ = a.add(&b);
    }

    #[test]
    fn test_mul_scalar() {
        let a = Tensor::new(&[1.0, -2.0], &[2]);
        assert_eq!(a.mul_scalar(3.0).data(), &[3.0, -6.0]);
    }

    #[test]
    fn test_matmul_2d() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let b = Tensor::new(&[5.0, 6.0, 7.0, 8.0], &[2, 2]);
        let c = a.matmul(&b);
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_batched_matches_per_slice_matmul() {
        // Two stacked 2x3 @ 3x2 products
        let a = Tensor::new(
            &[
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, //
                -1.0, 0.5, 2.0, 1.5, -2.0, 3.0,
            ],
            &[2, 2, 3],
        );
        let b = Tensor::new(
            &[
                1.0, 0.0, 0.0, 1.0, 1.0, 1.0, //
                2.0, 0.0, 0.0, 2.0, 1.0, -1.0,
            ],
            &[2, 3, 2],
        );
        let c = a.matmul_batched(&b);
        assert_eq!(c.shape(), &[2, 2, 2]);

        for slice in 0..2 {
            let a2 = Tensor::new(&a.data()[slice * 6..(slice + 1) * 6], &[2, 3]);
            let b2 = Tensor::new(&b.data()[slice * 6..(slice + 1) * 6], &[3, 2]);
            let expected = a2.matmul(&b2);
            assert_eq!(&c.data()[slice * 4..(slice + 1) * 4], expected.data());
        }
    }

    #[test]
    fn test_matmul_batched_4d_shape() {
        let a = Tensor::ones(&[2, 3, 4, 5]);
        let b = Tensor::ones(&[2, 3, 5, 6]);
        let c = a.matmul_batched(&b);
        assert_eq!(c.shape(), &[2, 3, 4, 6]);
        // All-ones product: every element is the inner dimension
        assert!(c.data().iter().all(|&x| (x - 5.0).abs() < 1e-6));
    }

    #[test]
    fn test_transpose_2d() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let t = a.transpose();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_last_two_3d() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &[2, 2, 2]);
        let t = a.transpose_last_two();
        assert_eq!(t.shape(), &[2, 2, 2]);
        assert_eq!(t.data(), &[1.0, 3.0, 2.0, 4.0, 5.0, 7.0, 6.0, 8.0]);
    }

    #[test]
    fn test_transpose_last_two_roundtrip() {
        let a = Tensor::new(
            &(0..24).map(|i| i as f32).collect::<Vec<_>>(),
            &[2, 3, 4],
        );
        let back = a.transpose_last_two().transpose_last_two();
        assert_eq!(back.data(), a.data());
        assert_eq!(back.shape(), a.shape());
    }

    #[test]
    fn test_view() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let b = a.view(&[3, 2]);
        assert_eq!(b.shape(), &[3, 2]);
        assert_eq!(b.data(), a.data());
    }

    #[test]
    #[should_panic(expected = "number of elements must match")]
    fn test_view_bad_numel_panics() {
        let a = Tensor::zeros(&[2, 3]);
        let _ = a.view(&[4, 2]);
    }

    #[test]
    fn test_broadcast_add() {
        let m = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let v = Tensor::new(&[10.0, 20.0], &[2]);
        let result = m.broadcast_add(&v);
        assert_eq!(result.data(), &[11.0, 22.0, 13.0, 24.0]);
    }

    proptest! {
        #[test]
        fn prop_view_preserves_data(data in prop::collection::vec(-100.0f32..100.0, 12)) {
            let t = Tensor::new(&data, &[3, 4]);
            let v = t.view(&[2, 6]);
            prop_assert_eq!(v.data(), t.data());
            prop_assert_eq!(v.numel(), 12);
        }

        #[test]
        fn prop_transpose_involution(data in prop::collection::vec(-10.0f32..10.0, 6)) {
            let t = Tensor::new(&data, &[2, 3]);
            let back = t.transpose().transpose();
            prop_assert_eq!(back.data(), t.data());
        }

        #[test]
        fn prop_mul_scalar_zero_annihilates(data in prop::collection::vec(-10.0f32..10.0, 8)) {
            let t = Tensor::new(&data, &[8]);
            let z = t.mul_scalar(0.0);
            prop_assert!(z.data().iter().all(|&x| x == 0.0));
        }
    }
}
