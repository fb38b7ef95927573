//! # Symmetric Pad / Crop
//!
//! Matches the spatial size of a feature map to a reference size by padding
//! with zeros or cropping, split evenly between the two edges of each axis.
//! When the difference is odd the trailing edge gets the extra pixel.

use burn::prelude::*;

/// Splits a signed size difference into `(before, after)` edge amounts.
///
/// `before` is `floor(diff / 2)` and `after` is `diff - before`, so both
/// edges move in the same direction and the trailing edge absorbs the odd
/// pixel. Negative amounts mean cropping.
pub const fn symmetric_split(diff: isize) -> (isize, isize) {
    let before = diff.div_euclid(2);
    (before, diff - before)
}

/// Pads (zero fill) or crops the last two dimensions of `x` so they equal
/// `target`.
///
/// Each of the four edges is handled independently, so one axis may be
/// padded while the other is cropped.
///
/// # Shapes
/// - input: `[batch, channels, h, w]`
/// - output: `[batch, channels, target[0], target[1]]`
pub fn pad_or_crop<B: Backend>(x: Tensor<B, 4>, target: [usize; 2]) -> Tensor<B, 4> {
    let [b, c, h, w] = x.dims();
    let [th, tw] = target;

    if h == th && w == tw {
        return x;
    }

    let (top, bottom) = symmetric_split(th as isize - h as isize);
    let (left, right) = symmetric_split(tw as isize - w as isize);

    // Crop first so that padding is applied to the already-trimmed map.
    let crop = |amount: isize| (-amount).max(0) as usize;
    let y0 = crop(top);
    let y1 = h - crop(bottom);
    let x0 = crop(left);
    let x1 = w - crop(right);
    let x = if y0 > 0 || y1 < h || x0 > 0 || x1 < w {
        x.slice([0..b, 0..c, y0..y1, x0..x1])
    } else {
        x
    };

    let pad = |amount: isize| amount.max(0) as usize;
    let padding = (pad(left), pad(right), pad(top), pad(bottom));
    if padding == (0, 0, 0, 0) {
        x
    } else {
        x.pad(padding, 0.0)
    }
}
