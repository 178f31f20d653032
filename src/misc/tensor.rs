//! Index arithmetic for tensor-product control nets.
//!
//! Control points of a spline with `P` parametric axes are stored flat.
//! Parametric axis 0 runs fastest: `index = i_0 + n_0 * (i_1 + n_1 * (i_2 + ...))`.

use std::convert::Infallible;
use std::ops::Range;

use super::FloatingPoint;

/// Number of entries of a tensor with the given extents
pub fn tensor_len<const P: usize>(shape: &[usize; P]) -> usize {
    shape.iter().product()
}

/// Flat index of a multi-index
pub fn ravel<const P: usize>(index: &[usize; P], shape: &[usize; P]) -> usize {
    (0..P)
        .rev()
        .fold(0, |flat, axis| flat * shape[axis] + index[axis])
}

/// Multi-index of a flat index
pub fn unravel<const P: usize>(flat: usize, shape: &[usize; P]) -> [usize; P] {
    let mut rest = flat;
    std::array::from_fn(|axis| {
        let i = rest % shape[axis];
        rest /= shape[axis];
        i
    })
}

/// Rebuild a tensor by replacing every line of entries running along `axis`.
/// All lines must be mapped to the same length, which becomes the new extent of `axis`.
pub fn try_map_fibers<V: Clone, E, const P: usize>(
    values: &[V],
    shape: &[usize; P],
    axis: usize,
    mut f: impl FnMut(&[V]) -> Result<Vec<V>, E>,
) -> Result<(Vec<V>, [usize; P]), E> {
    let n = shape[axis];
    let inner: usize = shape[..axis].iter().product();
    let outer: usize = shape[axis + 1..].iter().product();

    let mut fibers = Vec::with_capacity(inner * outer);
    let mut fiber = Vec::with_capacity(n);
    for o in 0..outer {
        for i in 0..inner {
            fiber.clear();
            fiber.extend((0..n).map(|k| values[i + inner * (k + n * o)].clone()));
            fibers.push(f(&fiber)?);
        }
    }

    let m = fibers.first().map(|f| f.len()).unwrap_or(0);
    debug_assert!(fibers.iter().all(|f| f.len() == m));

    let mut mapped = Vec::with_capacity(inner * m * outer);
    for o in 0..outer {
        for k in 0..m {
            for i in 0..inner {
                mapped.push(fibers[o * inner + i][k].clone());
            }
        }
    }

    let mut next = *shape;
    next[axis] = m;
    Ok((mapped, next))
}

/// Infallible version of [`try_map_fibers`]
pub fn map_fibers<V: Clone, const P: usize>(
    values: &[V],
    shape: &[usize; P],
    axis: usize,
    mut f: impl FnMut(&[V]) -> Vec<V>,
) -> (Vec<V>, [usize; P]) {
    match try_map_fibers::<V, Infallible, P>(values, shape, axis, |fiber| Ok(f(fiber))) {
        Ok(mapped) => mapped,
        Err(never) => match never {},
    }
}

/// Keep the entries whose index along `axis` lies in `range`
pub fn slice_axis<V: Clone, const P: usize>(
    values: &[V],
    shape: &[usize; P],
    axis: usize,
    range: Range<usize>,
) -> (Vec<V>, [usize; P]) {
    map_fibers(values, shape, axis, |fiber| fiber[range.clone()].to_vec())
}

/// Tensor product of per-axis basis values on the window of control points starting at `first`.
/// Returns the products together with the raveled control point index each one belongs to.
pub fn tensor_basis<T: FloatingPoint, const P: usize>(
    per_axis: &[Vec<T>; P],
    first: &[usize; P],
    shape: &[usize; P],
) -> (Vec<T>, Vec<usize>) {
    let window: [usize; P] = std::array::from_fn(|axis| per_axis[axis].len());
    (0..tensor_len(&window))
        .map(|local| {
            let index = unravel(local, &window);
            let value = (0..P).fold(T::one(), |acc, axis| acc * per_axis[axis][index[axis]]);
            let global: [usize; P] = std::array::from_fn(|axis| first[axis] + index[axis]);
            (value, ravel(&global, shape))
        })
        .unzip()
}
