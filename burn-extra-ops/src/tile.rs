//! # Spatial Tiling
//!
//! Repeats a feature map along its two spatial axes so that a small map (for
//! example a pooled visual embedding) covers the grid of a larger one.

use burn::prelude::*;

/// Computes the integer repeat factors that take a `source` spatial size to a
/// `target` spatial size.
///
/// Returns `None` when either source dimension is zero or does not evenly
/// divide the matching target dimension.
pub const fn tile_factors(source: [usize; 2], target: [usize; 2]) -> Option<[usize; 2]> {
    let [h, w] = source;
    let [th, tw] = target;

    if h == 0 || w == 0 || th % h != 0 || tw % w != 0 {
        return None;
    }

    let (rh, rw) = (th / h, tw / w);
    if rh == 0 || rw == 0 {
        return None;
    }

    Some([rh, rw])
}

/// Repeats the last two dimensions of `x` by `factors`.
///
/// The value at spatial position `(y, x)` of the output equals the value at
/// `(y % h, x % w)` of the input.
///
/// # Shapes
/// - input: `[..., h, w]`
/// - output: `[..., h * factors[0], w * factors[1]]`
pub fn tile<B: Backend, const D: usize>(x: Tensor<B, D>, factors: [usize; 2]) -> Tensor<B, D> {
    let [rh, rw] = factors;
    let x = if rh > 1 { x.repeat_dim(D - 2, rh) } else { x };

    if rw > 1 {
        x.repeat_dim(D - 1, rw)
    } else {
        x
    }
}
