//! Runtime dispatch from `(para_dim, dim, family)` and flat buffers to a compiled kernel.
//!
//! Every family is instantiated for parametric and physical dimensions 1 to 3.

use crate::bezier::{Bezier, RationalBezier};
use crate::bspline::{BSpline, Nurbs};
use crate::error::{Result, SplineError};

use super::{SharedSpline, SplineFamily};

/// Flat buffers describing a spline
///
/// Degrees are floating point values truncated to integers.
/// Control points are row-major with `dim` coordinates each.
#[derive(Clone, Copy, Debug, Default)]
pub struct SplineBuffers<'a> {
    pub degrees: &'a [f64],
    /// One knot vector per parametric axis, knotted families only
    pub knot_vectors: Option<&'a [Vec<f64>]>,
    pub control_points: &'a [f64],
    /// One weight per control point, rational families only
    pub weights: Option<&'a [f64]>,
}

impl SplineBuffers<'_> {
    /// Check that exactly the buffers used by `family` are present
    pub fn expect_layout(&self, family: SplineFamily) -> Result<()> {
        match (family.has_knot_vectors(), self.knot_vectors.is_some()) {
            (true, false) => {
                return Err(SplineError::Construction(format!(
                    "{family} requires knot vectors"
                )))
            }
            (false, true) => {
                return Err(SplineError::Construction(format!(
                    "{family} does not take knot vectors"
                )))
            }
            _ => {}
        }
        match (family.is_rational(), self.weights.is_some()) {
            (true, false) => Err(SplineError::Construction(format!(
                "{family} requires weights"
            ))),
            (false, true) => Err(SplineError::Construction(format!(
                "{family} does not take weights"
            ))),
            _ => Ok(()),
        }
    }
}

fn build<const P: usize, const D: usize>(
    family: SplineFamily,
    buffers: &SplineBuffers<'_>,
) -> Result<SharedSpline> {
    Ok(match family {
        SplineFamily::Bezier => Bezier::<f64, P, D>::try_from_buffers(buffers)?.into_shared(),
        SplineFamily::RationalBezier => {
            RationalBezier::<f64, P, D>::try_from_buffers(buffers)?.into_shared()
        }
        SplineFamily::BSpline => BSpline::<f64, P, D>::try_from_buffers(buffers)?.into_shared(),
        SplineFamily::Nurbs => Nurbs::<f64, P, D>::try_from_buffers(buffers)?.into_shared(),
    })
}

/// Create a spline of `family` behind the capability interface
pub fn create_family(
    para_dim: usize,
    dim: usize,
    family: SplineFamily,
    buffers: &SplineBuffers<'_>,
) -> Result<SharedSpline> {
    log::debug!("creating {family} with parametric dimension {para_dim}, physical dimension {dim}");
    match (para_dim, dim) {
        (1, 1) => build::<1, 1>(family, buffers),
        (1, 2) => build::<1, 2>(family, buffers),
        (1, 3) => build::<1, 3>(family, buffers),
        (2, 1) => build::<2, 1>(family, buffers),
        (2, 2) => build::<2, 2>(family, buffers),
        (2, 3) => build::<2, 3>(family, buffers),
        (3, 1) => build::<3, 1>(family, buffers),
        (3, 2) => build::<3, 2>(family, buffers),
        (3, 3) => build::<3, 3>(family, buffers),
        _ => Err(SplineError::UnsupportedDimension { para_dim, dim }),
    }
}

/// Create a spline from the rational and knotted flags
///
/// # Example
/// ```
/// use splinekit::prelude::*;
/// let buffers = SplineBuffers {
///     degrees: &[1.],
///     control_points: &[0., 1.],
///     ..Default::default()
/// };
/// let line = create(1, 1, false, false, &buffers).unwrap();
/// assert_eq!(line.name(), "Bezier");
/// assert!(create(4, 1, false, false, &buffers).is_err());
/// ```
pub fn create(
    para_dim: usize,
    dim: usize,
    rational: bool,
    knotted: bool,
    buffers: &SplineBuffers<'_>,
) -> Result<SharedSpline> {
    create_family(
        para_dim,
        dim,
        SplineFamily::from_flags(rational, knotted),
        buffers,
    )
}

pub fn create_bezier(
    para_dim: usize,
    dim: usize,
    degrees: &[f64],
    control_points: &[f64],
) -> Result<SharedSpline> {
    let buffers = SplineBuffers {
        degrees,
        control_points,
        ..Default::default()
    };
    create_family(para_dim, dim, SplineFamily::Bezier, &buffers)
}

pub fn create_rational_bezier(
    para_dim: usize,
    dim: usize,
    degrees: &[f64],
    control_points: &[f64],
    weights: &[f64],
) -> Result<SharedSpline> {
    let buffers = SplineBuffers {
        degrees,
        control_points,
        weights: Some(weights),
        ..Default::default()
    };
    create_family(para_dim, dim, SplineFamily::RationalBezier, &buffers)
}

pub fn create_bspline(
    para_dim: usize,
    dim: usize,
    degrees: &[f64],
    knot_vectors: &[Vec<f64>],
    control_points: &[f64],
) -> Result<SharedSpline> {
    let buffers = SplineBuffers {
        degrees,
        knot_vectors: Some(knot_vectors),
        control_points,
        ..Default::default()
    };
    create_family(para_dim, dim, SplineFamily::BSpline, &buffers)
}

pub fn create_nurbs(
    para_dim: usize,
    dim: usize,
    degrees: &[f64],
    knot_vectors: &[Vec<f64>],
    control_points: &[f64],
    weights: &[f64],
) -> Result<SharedSpline> {
    let buffers = SplineBuffers {
        degrees,
        knot_vectors: Some(knot_vectors),
        control_points,
        weights: Some(weights),
    };
    create_family(para_dim, dim, SplineFamily::Nurbs, &buffers)
}
