//! Composition `f ∘ g` of a (rational) Bezier outer function with a (rational) Bezier inner function.
//!
//! With the inner function written homogeneously as `g = h / ω`, every Bernstein product of the outer
//! function turns into a polynomial `T_I = Π_k C(p_k, i_k) h_k^{i_k} (ω - h_k)^{p_k - i_k}` of the inner
//! parameters, so `f ∘ g = Σ_I w_I c_I T_I / Σ_I w_I T_I` with the outer weights `w_I`.

use nalgebra::SVector;

use crate::error::{Result, SplineError};
use crate::misc::{unravel, Binomial, FloatingPoint};
use crate::spline::compatibility::{check_composable, downcast};
use crate::spline::{SharedSpline, Spline};

use super::{Bezier, RationalBezier};

/// Homogeneous composition; the weight function is `None` only when both operands are polynomial
pub fn compose_homogeneous<T, const P: usize, const D: usize, const Q: usize>(
    outer: &Bezier<T, P, D>,
    outer_weights: Option<&Bezier<T, P, 1>>,
    inner: &Bezier<T, Q, P>,
    inner_weights: Option<&Bezier<T, Q, 1>>,
) -> (Bezier<T, Q, D>, Option<Bezier<T, Q, 1>>)
where
    T: FloatingPoint,
{
    let omega = inner_weights
        .cloned()
        .unwrap_or_else(|| Bezier::constant(SVector::<T, 1>::new(T::one())));
    let components: Vec<Bezier<T, Q, 1>> = (0..P)
        .map(|k| inner.map_control_points(|p| SVector::<T, 1>::new(p[k])))
        .collect();
    let complements: Vec<Bezier<T, Q, 1>> = components
        .iter()
        .map(|h| omega.sum(&h.map_control_points(|p| -p)))
        .collect();

    let degrees = *outer.degrees();
    let powers = |base: &Bezier<T, Q, 1>, degree: usize| {
        let mut powers = vec![Bezier::constant(SVector::<T, 1>::new(T::one()))];
        for _ in 0..degree {
            let next = powers[powers.len() - 1].scale_by(base);
            powers.push(next);
        }
        powers
    };
    let component_powers: Vec<_> = (0..P)
        .map(|k| powers(&components[k], degrees[k]))
        .collect();
    let complement_powers: Vec<_> = (0..P)
        .map(|k| powers(&complements[k], degrees[k]))
        .collect();

    let mut binomial = Binomial::<T>::new();
    let shape = outer.shape();
    let terms: Vec<Bezier<T, Q, 1>> = (0..outer.control_points().len())
        .map(|flat| {
            let index = unravel(flat, &shape);
            (0..P).fold(
                Bezier::constant(SVector::<T, 1>::new(T::one())),
                |term, k| {
                    let factor = binomial.get(degrees[k], index[k]);
                    term.scale_by(&component_powers[k][index[k]])
                        .scale_by(&complement_powers[k][degrees[k] - index[k]])
                        .map_control_points(|c| c * factor)
                },
            )
        })
        .collect();

    let result_degrees: [usize; Q] = std::array::from_fn(|axis| {
        terms
            .iter()
            .map(|t| t.degrees()[axis])
            .max()
            .unwrap_or(0)
    });
    let terms: Vec<_> = terms
        .iter()
        .map(|t| t.elevated_to(&result_degrees))
        .collect();
    let len = terms.first().map_or(1, |t| t.control_points().len());

    let numerator_points = (0..len)
        .map(|m| {
            terms
                .iter()
                .zip(outer.control_points())
                .fold(SVector::<T, D>::zeros(), |acc, (term, c)| {
                    acc + c * term.control_points()[m][0]
                })
        })
        .collect();
    let numerator = Bezier::new_unchecked(result_degrees, numerator_points);

    let denominator = match (outer_weights, inner_weights) {
        (None, None) => None,
        (weights, _) => {
            let points = (0..len)
                .map(|m| {
                    let value = terms.iter().enumerate().fold(T::zero(), |acc, (i, term)| {
                        let w = weights.map_or(T::one(), |w| w.control_points()[i][0]);
                        acc + w * term.control_points()[m][0]
                    });
                    SVector::<T, 1>::new(value)
                })
                .collect();
            Some(Bezier::new_unchecked(result_degrees, points))
        }
    };

    (numerator, denominator)
}

fn finish<const Q: usize, const D: usize>(
    (numerator, denominator): (Bezier<f64, Q, D>, Option<Bezier<f64, Q, 1>>),
) -> Result<SharedSpline> {
    match denominator {
        None => Ok(numerator.into_shared()),
        Some(denominator) => {
            Ok(RationalBezier::try_from_homogeneous(numerator, denominator)?.into_shared())
        }
    }
}

fn compose_with<const P: usize, const D: usize, const Q: usize>(
    outer: &Bezier<f64, P, D>,
    outer_weights: Option<&Bezier<f64, P, 1>>,
    inner: &dyn Spline,
) -> Result<SharedSpline> {
    if inner.is_rational() {
        let inner = downcast::<RationalBezier<f64, Q, P>>(inner, "a rational Bezier inner function")?;
        let (numerator, denominator) = inner.homogeneous();
        finish(compose_homogeneous(
            outer,
            outer_weights,
            &numerator,
            Some(&denominator),
        ))
    } else {
        let inner = downcast::<Bezier<f64, Q, P>>(inner, "a Bezier inner function")?;
        finish(compose_homogeneous(outer, outer_weights, inner, None))
    }
}

/// Dispatch on the parametric dimension of the inner function
pub(crate) fn compose_dyn<const P: usize, const D: usize>(
    receiver: &dyn Spline,
    outer: &Bezier<f64, P, D>,
    outer_weights: Option<&Bezier<f64, P, 1>>,
    inner: &dyn Spline,
) -> Result<SharedSpline> {
    check_composable(receiver, inner)?;
    log::trace!(
        "composing {} with {}",
        receiver.what_am_i(),
        inner.what_am_i()
    );
    match inner.para_dim() {
        1 => compose_with::<P, D, 1>(outer, outer_weights, inner),
        2 => compose_with::<P, D, 2>(outer, outer_weights, inner),
        3 => compose_with::<P, D, 3>(outer, outer_weights, inner),
        para_dim => Err(SplineError::UnsupportedOperation(format!(
            "composition with an inner function of parametric dimension {para_dim}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Vector1, Vector2};

    use super::*;

    #[test]
    fn polynomial_reparametrization() {
        // f(s) = (s, s^2), g(t) = t^2 / 2 + t / 2
        let f = Bezier::<f64, 1, 2>::try_new(
            [2],
            vec![
                Vector2::new(0., 0.),
                Vector2::new(0.5, 0.),
                Vector2::new(1., 1.),
            ],
        )
        .unwrap();
        let g = Bezier::<f64, 1, 1>::try_new(
            [2],
            vec![Vector1::new(0.), Vector1::new(0.25), Vector1::new(1.)],
        )
        .unwrap();
        let (composed, weights) = compose_homogeneous(&f, None, &g, None);
        assert!(weights.is_none());
        assert_eq!(composed.degrees(), &[4]);
        for t in [0., 0.2, 0.5, 0.9, 1.] {
            let s = g.point(&[t]).x;
            let expected = f.point(&[s]);
            let actual = composed.point(&[t]);
            assert_relative_eq!(actual, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn rational_inner_function() {
        let f = Bezier::<f64, 1, 1>::try_new([1], vec![Vector1::new(1.), Vector1::new(3.)]).unwrap();
        let g = RationalBezier::<f64, 1, 1>::try_new(
            [2],
            vec![Vector1::new(0.), Vector1::new(0.5), Vector1::new(1.)],
            vec![1., 2., 1.],
        )
        .unwrap();
        let (numerator, denominator) = g.homogeneous();
        let (composed, weights) = compose_homogeneous(&f, None, &numerator, Some(&denominator));
        let composed = RationalBezier::try_from_homogeneous(composed, weights.unwrap()).unwrap();
        for t in [0., 0.3, 0.7, 1.] {
            let s = g.point(&[t]).unwrap().x;
            assert_relative_eq!(composed.point(&[t]).unwrap().x, 1. + 2. * s, epsilon = 1e-12);
        }
    }
}
