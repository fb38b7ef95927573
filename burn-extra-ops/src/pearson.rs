//! # Pearson Correlation
//!
//! Per-position Pearson correlation coefficient between two tensors, computed
//! along a single reduction axis (typically the channel axis of two feature
//! maps).

use burn::prelude::*;

/// Default value substituted for a zero denominator.
pub const PEARSON_EPS: f64 = 1e-8;

/// Computes the Pearson correlation of `x` and `y` along `dim`.
///
/// Both inputs are centered on their mean along `dim`; the coefficient is the
/// dot product of the centered vectors divided by the product of their L2
/// norms. A denominator that is exactly zero (one of the vectors has no
/// variance) is replaced by `eps`, which makes the result `0` instead of
/// `NaN`.
///
/// # Shapes
/// - x, y: `[..., n, ...]` with `n` at `dim`
/// - output: same as the inputs with `dim` reduced to size 1
pub fn pearson_correlation<B: Backend, const D: usize>(
    x: Tensor<B, D>,
    y: Tensor<B, D>,
    dim: usize,
    eps: f64,
) -> Tensor<B, D> {
    let xm = x.clone() - x.mean_dim(dim);
    let ym = y.clone() - y.mean_dim(dim);

    let numerator = (xm.clone() * ym.clone()).sum_dim(dim);
    let denominator = l2_norm(xm, dim) * l2_norm(ym, dim);
    let zero = denominator.clone().equal_elem(0.0);
    let denominator = denominator.mask_fill(zero, eps);

    numerator / denominator
}

fn l2_norm<B: Backend, const D: usize>(x: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    x.powi_scalar(2).sum_dim(dim).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_identical_inputs_correlate_perfectly() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::random([2, 16, 3, 5], Distribution::Normal(0.0, 1.0), &device);

        let r = pearson_correlation(x.clone(), x, 1, PEARSON_EPS);
        assert_eq!(r.dims(), [2, 1, 3, 5]);

        for value in r.into_data().to_vec::<f32>().unwrap() {
            assert!((value - 1.0).abs() < 1e-4, "expected 1.0, got {value}");
        }
    }

    #[test]
    fn test_negated_inputs_anticorrelate() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::random([1, 8, 2, 2], Distribution::Normal(0.0, 1.0), &device);

        let r = pearson_correlation(x.clone(), x.neg().mul_scalar(3.0), 1, PEARSON_EPS);

        for value in r.into_data().to_vec::<f32>().unwrap() {
            assert!((value + 1.0).abs() < 1e-4, "expected -1.0, got {value}");
        }
    }

    #[test]
    fn test_zero_variance_is_finite() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::random([1, 8, 4, 4], Distribution::Normal(0.0, 1.0), &device);
        let constant = Tensor::<TestBackend, 4>::full([1, 8, 4, 4], 2.5, &device);

        let r = pearson_correlation(x, constant, 1, PEARSON_EPS);

        for value in r.into_data().to_vec::<f32>().unwrap() {
            assert!(value.is_finite());
            assert_eq!(value, 0.0);
        }
    }
}
