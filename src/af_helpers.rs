//! Useful elementary array based functions that are missing in arrayfire.

use arrayfire::{abs, constant, dim4, exp, gt, log, log1p, lt, maxof, select, tile, Array};

pub(crate) fn to_host(a: &Array<f32>) -> Vec<f32> {
    let mut buffer = Vec::<f32>::new();
    buffer.resize(a.elements(), 0.);
    a.host(&mut buffer);
    buffer
}

pub(crate) fn dims_of(a: &Array<f32>) -> [u64; 4] {
    *a.dims().get()
}

pub(crate) fn sum_all_host(a: &Array<f32>) -> f32 {
    arrayfire::sum_all(a).0
}

/// Numerically stable log(1 + exp(x)).
pub(crate) fn softplus(x: &Array<f32>) -> Array<f32> {
    maxof(x, &constant(0f32, x.dims()), false) + log1p(&exp(&(-abs(x))))
}

/// log(softplus(x)) without underflow to -inf for very negative x,
/// where softplus(x) ~ exp(x).
pub(crate) fn log_softplus(x: &Array<f32>) -> Array<f32> {
    select(x, &lt(x, &-20f32, false), &log(&softplus(x)))
}

pub(crate) fn relu(x: &Array<f32>) -> Array<f32> {
    x * gt(x, &0f32, false)
}

/// Repeat a row vector `[1, d]` into `[rows, d]`.
pub(crate) fn tile_rows(row: &Array<f32>, rows: u64) -> Array<f32> {
    tile(row, dim4!(rows, 1, 1, 1))
}

#[cfg(test)]
mod tests {
    use super::{log_softplus, softplus, tile_rows, to_host};
    use arrayfire::{dim4, Array};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn softplus_matches_naive_formula() {
        let vals = [-30f32, -1., 0., 1., 30.];
        let a = Array::new(&vals, dim4![5, 1, 1, 1]);
        let res = to_host(&softplus(&a));
        for (x, y) in vals.iter().zip(res.iter()) {
            let exp = if *x > 20. { *x } else { x.exp().ln_1p() };
            assert_approx_eq!(exp, y, 1e-5);
        }
    }

    #[test]
    fn log_softplus_is_finite_for_very_negative_inputs() {
        let vals = [-200f32, -30., -1., 0., 5.];
        let a = Array::new(&vals, dim4![5, 1, 1, 1]);
        let res = to_host(&log_softplus(&a));
        assert_approx_eq!(res[0], -200., 1e-3);
        assert_approx_eq!(res[1], -30., 1e-3);
        for (x, y) in vals.iter().zip(res.iter()).skip(2) {
            assert_approx_eq!(x.exp().ln_1p().ln(), y, 1e-5);
        }
    }

    #[test]
    fn tile_rows_repeats_along_first_axis() {
        let row = Array::new(&[1f32, 2., 3.], dim4![1, 3, 1, 1]);
        // column major
        assert_eq!(
            to_host(&tile_rows(&row, 2)),
            vec![1f32, 1., 2., 2., 3., 3.]
        );
    }
}
