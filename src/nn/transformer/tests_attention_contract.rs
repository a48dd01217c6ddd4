// =========================================================================
// Attention contract tests.
//
// With dropout disabled the weight tensor returned by the forward pass is
// a probability distribution per query position, and a zero in the mask
// must drive the corresponding weight to (numerically) zero.
// =========================================================================

use super::*;

fn rows_sum_to_one(weights: &Tensor) {
    let shape = weights.shape();
    let k_len = shape[3];
    let rows: usize = shape[..3].iter().product();

    for r in 0..rows {
        let sum: f32 = weights.data()[r * k_len..(r + 1) * k_len].iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "Row {r} sums to {sum}");
    }
}

#[test]
fn unmasked_weight_rows_are_distributions() {
    let mha = MultiHeadAttention::with_seed(32, 4, 0.0, 42).unwrap();
    let x = Tensor::new(
        &(0..2 * 6 * 32)
            .map(|i| (i as f32 * 0.13).sin())
            .collect::<Vec<_>>(),
        &[2, 6, 32],
    );

    let (_, weights) = mha.forward(&x, &x, &x, None, false).unwrap();
    assert_eq!(weights.shape(), &[2, 4, 6, 6]);
    rows_sum_to_one(&weights);
    assert!(weights.data().iter().all(|&w| (0.0..=1.0).contains(&w)));
}

#[test]
fn masked_positions_get_negligible_weight() {
    let mha = MultiHeadAttention::with_seed(16, 2, 0.0, 7).unwrap();
    let x = Tensor::new(
        &(0..4 * 16).map(|i| (i as f32 * 0.31).cos()).collect::<Vec<_>>(),
        &[1, 4, 16],
    );

    // Every query may attend to keys 0..3 but not key 3
    let mask = Tensor::new(
        &[
            1.0, 1.0, 1.0, 0.0, //
            1.0, 1.0, 1.0, 0.0, //
            1.0, 1.0, 1.0, 0.0, //
            1.0, 1.0, 1.0, 0.0,
        ],
        &[4, 4],
    );

    let (_, weights) = mha.forward(&x, &x, &x, Some(&mask), false).unwrap();
    rows_sum_to_one(&weights);

    for head in 0..2 {
        for q in 0..4 {
            let w = weights.data()[head * 16 + q * 4 + 3];
            assert!(w < 1e-6, "Masked weight head {head} query {q} is {w}");
        }
    }
}

#[test]
fn causal_mask_zeroes_future_positions() {
    let seq = 4;
    let mha = MultiHeadAttention::with_seed(8, 2, 0.0, 3).unwrap();
    let x = Tensor::new(
        &(0..seq * 8).map(|i| (i as f32 * 0.17).sin()).collect::<Vec<_>>(),
        &[1, seq, 8],
    );

    // Lower-triangular mask: position q sees keys 0..=q
    let mut mask_data = vec![0.0; seq * seq];
    for q in 0..seq {
        for k in 0..=q {
            mask_data[q * seq + k] = 1.0;
        }
    }
    let mask = Tensor::new(&mask_data, &[seq, seq]);

    let (_, weights) = mha.forward(&x, &x, &x, Some(&mask), false).unwrap();
    rows_sum_to_one(&weights);

    for head in 0..2 {
        for q in 0..seq {
            for k in (q + 1)..seq {
                let w = weights.data()[head * seq * seq + q * seq + k];
                assert!(w < 1e-6, "Future weight ({q} -> {k}) is {w}");
            }
        }
    }
}

#[test]
fn identical_keys_give_uniform_weights() {
    // Every key row is the same vector, so every score in a row ties and
    // softmax spreads the mass uniformly.
    let mha = MultiHeadAttention::with_seed(8, 2, 0.0, 11).unwrap();
    let x = Tensor::ones(&[1, 5, 8]);

    let (_, weights) = mha.forward(&x, &x, &x, None, false).unwrap();
    for &w in weights.data() {
        assert!((w - 0.2).abs() < 1e-5, "Expected uniform 1/5, got {w}");
    }
}

#[test]
fn inference_forward_is_deterministic_despite_dropout_config() {
    let mha = MultiHeadAttention::with_seed(16, 4, 0.5, 42).unwrap();
    let x = Tensor::ones(&[1, 3, 16]);

    let (out1, w1) = mha.forward(&x, &x, &x, None, false).unwrap();
    let (out2, w2) = mha.forward(&x, &x, &x, None, false).unwrap();
    assert_eq!(out1.data(), out2.data());
    assert_eq!(w1.data(), w2.data());
}

#[test]
fn scaled_dot_product_applies_inverse_sqrt_scale() {
    // One head, d_k = 4, Q and K chosen so Q K^T is all 4s; the scaled
    // score must be 4 / sqrt(4) = 2 everywhere.
    let q = Tensor::ones(&[1, 1, 2, 4]);
    let k = Tensor::ones(&[1, 1, 2, 4]);
    let v = Tensor::ones(&[1, 1, 2, 4]);
    let dropout = Dropout::new(0.0);

    let (out, weights) = scaled_dot_product_attention(&q, &k, &v, None, &dropout, false).unwrap();

    // Uniform weights over two identical keys
    assert!(weights.data().iter().all(|&w| (w - 0.5).abs() < 1e-6));
    // Weighted sum of all-ones values is all ones
    assert!(out.data().iter().all(|&o| (o - 1.0).abs() < 1e-6));
}
