// =========================================================================
// LayerNorm contract tests.
//
// The scalar-affine form (one alpha, one bias shared by all features) and
// the `(x - mean) / (std + eps)` denominator are intentional; these tests
// pin both so any future widening to per-feature parameters is a visible,
// deliberate change.
// =========================================================================

use super::*;

#[test]
fn normalized_rows_have_zero_mean_unit_variance() {
    let norm = LayerNorm::new();
    let d = 64;
    let x = Tensor::new(
        &(0..2 * 3 * d)
            .map(|i| (i as f32 * 0.37).sin() * 4.0 + 1.5)
            .collect::<Vec<_>>(),
        &[2, 3, d],
    );

    let y = norm.normalize(&x);

    for row in 0..6 {
        let slice = &y.data()[row * d..(row + 1) * d];
        let mean: f32 = slice.iter().sum::<f32>() / d as f32;
        let var: f32 = slice.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / d as f32;

        assert!(mean.abs() < 1e-4, "Row {row} mean {mean} not ~0");
        assert!((var - 1.0).abs() < 1e-3, "Row {row} variance {var} not ~1");
    }
}

#[test]
fn scalar_affine_is_shared_across_features() {
    // With alpha = 2 and bias = 0.5 every feature gets the same scalar
    // transform; a per-feature formulation would allow them to differ.
    let mut norm = LayerNorm::new();
    {
        let mut params = norm.parameters_mut();
        params[0].data_mut()[0] = 2.0;
        params[1].data_mut()[0] = 0.5;
    }

    let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[1, 4]);
    let plain = norm.normalize(&x);
    let affine = norm.forward(&x);

    for (p, a) in plain.data().iter().zip(affine.data().iter()) {
        assert!((a - (2.0 * p + 0.5)).abs() < 1e-6);
    }
}

#[test]
fn eps_is_added_to_std_not_variance() {
    // For a row with std = 1 the denominator is 1 + eps, so a large eps
    // shows up linearly in the output. sqrt(var + eps) would differ.
    let eps = 0.5;
    let norm = LayerNorm::with_eps(eps);

    // Row [-1, 1]: mean 0, biased std 1
    let x = Tensor::new(&[-1.0, 1.0], &[1, 2]);
    let y = norm.normalize(&x);

    let expected = 1.0 / (1.0 + eps);
    assert!((y.data()[0] + expected).abs() < 1e-6);
    assert!((y.data()[1] - expected).abs() < 1e-6);
}

#[test]
fn forward_is_deterministic() {
    let norm = LayerNorm::new();
    let x = Tensor::new(
        &(0..32).map(|i| (i as f32 * 0.11).cos()).collect::<Vec<_>>(),
        &[2, 16],
    );

    assert_eq!(norm.forward(&x).data(), norm.forward(&x).data());
}
