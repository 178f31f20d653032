//! Weight function normalization shared by the rational families.

use nalgebra::SVector;

use crate::error::{Result, SplineError};
use crate::misc::{ravel, tensor_len, unravel, Binomial, FloatingPoint};

fn check_weight<T: FloatingPoint>(weight: T) -> Result<()> {
    if !weight.is_finite() || weight.abs() <= T::default_epsilon() {
        return Err(SplineError::DegenerateGeometry(format!(
            "weight function evaluates to {weight}"
        )));
    }
    Ok(())
}

/// Turn raw basis values into rational ones: `R_i = N_i w_i / Σ N_j w_j`
pub fn rationalize<T: FloatingPoint>(
    basis: &mut [T],
    support: &[usize],
    weights: &[T],
) -> Result<()> {
    basis
        .iter_mut()
        .zip(support)
        .for_each(|(b, id)| *b *= weights[*id]);
    let total = basis.iter().fold(T::zero(), |acc, b| acc + *b);
    check_weight(total)?;
    basis.iter_mut().for_each(|b| *b /= total);
    Ok(())
}

/// Project a weighted control point back by its weight.
/// A vanishing weight is only accepted under a vanishing weighted point.
pub fn project<T: FloatingPoint, const D: usize>(
    weighted: &SVector<T, D>,
    weight: T,
) -> Result<SVector<T, D>> {
    if weight.abs() > T::default_epsilon() {
        Ok(weighted / weight)
    } else if weighted.norm() <= T::default_epsilon() {
        Ok(SVector::zeros())
    } else {
        Err(SplineError::DegenerateGeometry(
            "homogeneous control point with a vanishing weight".to_string(),
        ))
    }
}

/// Mixed partial derivative of a rational function from the derivatives of its homogeneous form.
///
/// `homogeneous(j)` returns the `j` derivative of the weighted numerator and of the weight function.
/// Applies `R^(k) = (A^(k) - Σ_{0 < j <= k} C(k, j) w^(j) R^(k - j)) / w` over all multi-indices below `orders`.
pub fn rational_derivative<T: FloatingPoint, const P: usize, const D: usize>(
    orders: &[usize; P],
    mut homogeneous: impl FnMut(&[usize; P]) -> (SVector<T, D>, T),
) -> Result<SVector<T, D>> {
    let shape = orders.map(|o| o + 1);
    let total = tensor_len(&shape);
    let values: Vec<_> = (0..total)
        .map(|flat| homogeneous(&unravel(flat, &shape)))
        .collect();
    let w = values[0].1;
    check_weight(w)?;

    let mut binomial = Binomial::<T>::new();
    let mut ders: Vec<SVector<T, D>> = Vec::with_capacity(total);
    for (flat, (a, _)) in values.iter().enumerate() {
        let k = unravel(flat, &shape);
        let mut v = *a;
        for (j_flat, (_, w_j)) in values.iter().enumerate().take(flat + 1).skip(1) {
            let j = unravel(j_flat, &shape);
            if (0..P).any(|axis| j[axis] > k[axis]) {
                continue;
            }
            let coefficient = (0..P).fold(T::one(), |acc, axis| {
                acc * binomial.get(k[axis], j[axis])
            });
            let rest: [usize; P] = std::array::from_fn(|axis| k[axis] - j[axis]);
            v -= ders[ravel(&rest, &shape)] * (coefficient * *w_j);
        }
        ders.push(v / w);
    }
    Ok(ders[total - 1])
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector1;

    use super::*;

    #[test]
    fn quotient_rule() {
        // r(t) = t / (1 + t) at t = 1: r' = 1 / (1 + t)^2, r'' = -2 / (1 + t)^3
        let t = 1.0_f64;
        let homogeneous = |j: &[usize; 1]| match j[0] {
            0 => (Vector1::new(t), 1. + t),
            1 => (Vector1::new(1.), 1.),
            _ => (Vector1::new(0.), 0.),
        };
        let first = rational_derivative(&[1], homogeneous).unwrap();
        assert_relative_eq!(first.x, 0.25, epsilon = 1e-12);
        let second = rational_derivative(&[2], homogeneous).unwrap();
        assert_relative_eq!(second.x, -0.25, epsilon = 1e-12);
    }

    #[test]
    fn mixed_partials() {
        // r(u, v) = u v / (1 + u) at (1, 2): r_uv = 1 / (1 + u)^2
        let (u, v) = (1.0_f64, 2.0_f64);
        let homogeneous = |j: &[usize; 2]| match (j[0], j[1]) {
            (0, 0) => (Vector1::new(u * v), 1. + u),
            (1, 0) => (Vector1::new(v), 1.),
            (0, 1) => (Vector1::new(u), 0.),
            (1, 1) => (Vector1::new(1.), 0.),
            _ => (Vector1::new(0.), 0.),
        };
        let mixed = rational_derivative(&[1, 1], homogeneous).unwrap();
        assert_relative_eq!(mixed.x, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn vanishing_weight() {
        let mut basis = vec![0.5, 0.5];
        assert!(matches!(
            rationalize(&mut basis, &[0, 1], &[0., 0.]),
            Err(SplineError::DegenerateGeometry(_))
        ));

        let mut basis = vec![0.5, 0.5];
        rationalize(&mut basis, &[0, 1], &[1., 3.]).unwrap();
        assert_relative_eq!(basis[0], 0.25);
        assert_relative_eq!(basis[1], 0.75);
    }
}
