// =========================================================================
// Positional encoding contract tests.
//
// The table is pinned against the closed form
//   PE(pos, 2i)   = sin(pos / 10000^(2i/d))
//   PE(pos, 2i+1) = cos(pos / 10000^(2i/d))
// so any refactor of the table computation stays bit-compatible with
// weights trained against it.
// =========================================================================

use super::*;

#[test]
fn table_matches_closed_form() {
    let d_model = 16;
    let max_len = 10;
    let table = compute_positional_encoding(d_model, max_len);
    assert_eq!(table.shape(), &[max_len, d_model]);

    for pos in 0..max_len {
        for i in 0..d_model / 2 {
            let angle = pos as f32 / 10000_f32.powf(2.0 * i as f32 / d_model as f32);
            let sin_val = table.data()[pos * d_model + 2 * i];
            let cos_val = table.data()[pos * d_model + 2 * i + 1];
            assert!(
                (sin_val - angle.sin()).abs() < 1e-6,
                "PE({pos}, {}) = {sin_val}, expected sin({angle})",
                2 * i
            );
            assert!(
                (cos_val - angle.cos()).abs() < 1e-6,
                "PE({pos}, {}) = {cos_val}, expected cos({angle})",
                2 * i + 1
            );
        }
    }
}

#[test]
fn position_zero_alternates_zero_one() {
    // sin(0) = 0, cos(0) = 1 for every frequency
    let table = compute_positional_encoding(8, 4);
    let row = &table.data()[..8];
    assert_eq!(row, &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn values_are_bounded_and_finite() {
    let table = compute_positional_encoding(64, 200);
    for &v in table.data() {
        assert!(v.is_finite());
        assert!((-1.0..=1.0).contains(&v));
    }
}

#[test]
fn distinct_positions_get_distinct_encodings() {
    let d_model = 32;
    let table = compute_positional_encoding(d_model, 50);

    for a in 0..50 {
        for b in (a + 1)..50 {
            let row_a = &table.data()[a * d_model..(a + 1) * d_model];
            let row_b = &table.data()[b * d_model..(b + 1) * d_model];
            let diff: f32 = row_a
                .iter()
                .zip(row_b)
                .map(|(x, y)| (x - y).abs())
                .sum();
            assert!(diff > 1e-3, "Positions {a} and {b} nearly collide");
        }
    }
}

#[test]
fn forward_adds_table_rows() {
    let encoder = PositionalEncoder::new(8, 10, 0.0);
    let x = Tensor::zeros(&[2, 3, 8]);
    let y = encoder.forward(&x, false).unwrap();

    let table = encoder.table();
    // Both batch elements get the same first three table rows
    assert_eq!(&y.data()[..24], &table.data()[..24]);
    assert_eq!(&y.data()[24..48], &table.data()[..24]);
}

#[test]
fn forward_preserves_shape_and_is_deterministic_in_inference() {
    let encoder = PositionalEncoder::new(16, 20, 0.5);
    let x = Tensor::ones(&[1, 5, 16]);

    let y1 = encoder.forward(&x, false).unwrap();
    let y2 = encoder.forward(&x, false).unwrap();
    assert_eq!(y1.shape(), &[1, 5, 16]);
    assert_eq!(y1.data(), y2.data());
}

#[test]
fn forward_rejects_wrong_rank() {
    let encoder = PositionalEncoder::new(8, 10, 0.0);
    let x = Tensor::zeros(&[3, 8]);
    assert!(encoder.forward(&x, false).is_err());
}

#[test]
fn forward_rejects_wrong_width() {
    let encoder = PositionalEncoder::new(8, 10, 0.0);
    let x = Tensor::zeros(&[1, 3, 16]);
    assert!(encoder.forward(&x, false).is_err());
}

#[test]
fn forward_rejects_sequence_beyond_capacity() {
    let encoder = PositionalEncoder::new(8, 4, 0.0);
    let x = Tensor::zeros(&[1, 5, 8]);
    let err = encoder.forward(&x, false).unwrap_err();
    assert!(err.to_string().contains("seq_len"));
}

#[test]
fn table_handle_is_shared_not_copied() {
    let encoder = PositionalEncoder::new(8, 10, 0.0);
    let a = encoder.table();
    let b = encoder.table();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}
