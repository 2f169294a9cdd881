//! Sliding window arithmetic shared by convolution and pooling.
//!
//! Image tensors are laid out as `[height, width, channels, batch]`.

use crate::{af_helpers::dims_of, error::Error};
use arrayfire::{dim4, matmul, max, moddims, reorder_v2, unwrap, Array, MatProp};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Window {
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: usize,
}

impl Window {
    pub fn new(kernel_size: usize, stride: usize, padding: usize) -> Self {
        Self {
            kernel_size,
            stride,
            padding,
        }
    }

    /// Number of window positions along an axis of length `input_len`,
    /// None if the kernel does not fit.
    pub fn output_len(&self, input_len: usize) -> Option<usize> {
        let padded = input_len + 2 * self.padding;
        if self.stride == 0 || self.kernel_size == 0 || padded < self.kernel_size {
            None
        } else {
            Some((padded - self.kernel_size) / self.stride + 1)
        }
    }

    /// Output (height, width) for an image tensor.
    pub(crate) fn output_dims(&self, layer: &str, x: &Array<f32>) -> Result<(u64, u64), Error> {
        let [h, w, _, _] = dims_of(x);
        match (self.output_len(h as usize), self.output_len(w as usize)) {
            (Some(oh), Some(ow)) => Ok((oh as u64, ow as u64)),
            _ => Err(Error::shape_mismatch(
                layer,
                format!("spatial dims >= {} (padding {})", self.kernel_size, self.padding),
                format!("{}x{}", h, w),
            )),
        }
    }

    fn patches(&self, x: &Array<f32>) -> Array<f32> {
        let k = self.kernel_size as i64;
        let s = self.stride as i64;
        let p = self.padding as i64;
        unwrap(x, k, k, s, s, p, p, true)
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "k={} s={} p={}",
            self.kernel_size, self.stride, self.padding
        )
    }
}

/// 2d cross-correlation of `x` (`[h, w, c_in, n]`) with `weights`
/// (`[k * k * c_in, c_out]`), via im2col and a single matmul.
///
/// Row `i + k * j + k * k * c` of `weights` multiplies the input element at
/// offset `(i, j)` of the window in channel `c`.
pub(crate) fn conv2d(
    x: &Array<f32>,
    weights: &Array<f32>,
    window: &Window,
    (oh, ow): (u64, u64),
) -> Array<f32> {
    let [_, _, c_in, n] = dims_of(x);
    let c_out = weights.dims()[1];
    let kk = (window.kernel_size * window.kernel_size) as u64;
    let num_windows = oh * ow;

    // [kk, L, c_in, n] -> [L, kk, c_in, n] -> [L, kk * c_in, n]
    let patches = reorder_v2(&window.patches(x), 1, 0, Some(vec![2, 3]));
    let patches = moddims(&patches, dim4!(num_windows, kk * c_in, n, 1));
    // [L, n, kk * c_in] -> [L * n, kk * c_in]
    let patches = reorder_v2(&patches, 0, 2, Some(vec![1, 3]));
    let patches = moddims(&patches, dim4!(num_windows * n, kk * c_in, 1, 1));

    let y = matmul(&patches, weights, MatProp::NONE, MatProp::NONE);
    // [L * n, c_out] -> [L, n, c_out] -> [L, c_out, n] -> [oh, ow, c_out, n]
    let y = moddims(&y, dim4!(num_windows, n, c_out, 1));
    let y = reorder_v2(&y, 0, 2, Some(vec![1, 3]));
    moddims(&y, dim4!(oh, ow, c_out, n))
}

/// Channel wise max pooling without padding.
pub(crate) fn max_pool2d(x: &Array<f32>, window: &Window, (oh, ow): (u64, u64)) -> Array<f32> {
    let [_, _, c, n] = dims_of(x);
    let window_max = max(&window.patches(x), 0);
    moddims(&window_max, dim4!(oh, ow, c, n))
}
