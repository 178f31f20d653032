use std::any::Any;
use std::ops::Range;
use std::sync::Arc;

use nalgebra::SVector;

use crate::bezier::{Bezier, RationalBezier};
use crate::decompose::Decompose;
use crate::error::{check_axis, Result, SplineError};
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;
use crate::proximity::ProximityCache;
use crate::spline::conversion::{
    flatten_bounds, flatten_points, to_degrees, to_knot_vectors, to_orders, to_param, to_points,
};
use crate::spline::rational::{project, rational_derivative, rationalize};
use crate::spline::{
    BasisSupport, SharedSpline, Spline, SplineBuffers, SplineFamily, SplineProperties,
};
use crate::split::Split;

use super::refinement::{self, BezierLayout, KnotRefinement};
use super::BSpline;

/// Tensor-product non-uniform rational B-spline
///
/// Control points are kept in projected form next to their weights.
/// Refinement runs on the homogeneous form so that weighted points and weights share one knot structure.
///
/// # Example
/// ```
/// use nalgebra::Vector2;
/// use splinekit::prelude::*;
///
/// let w = std::f64::consts::FRAC_1_SQRT_2;
/// let arc = Nurbs::<f64, 1, 2>::try_new(
///     [2],
///     [KnotVector::new(vec![0., 0., 0., 1., 1., 1.])],
///     vec![Vector2::new(1., 0.), Vector2::new(1., 1.), Vector2::new(0., 1.)],
///     vec![1., w, 1.],
/// )
/// .unwrap();
/// let p = arc.point(&[0.5]).unwrap();
/// assert!((p.norm() - 1.).abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct Nurbs<T: FloatingPoint, const P: usize, const D: usize> {
    spline: BSpline<T, P, D>,
    weights: Vec<T>,
    proximity: ProximityCache,
}

/// Weighted control points and the weight function over one knot structure
#[derive(Clone, Debug)]
pub struct HomogeneousNurbs<T: FloatingPoint, const P: usize, const D: usize> {
    pub numerator: BSpline<T, P, D>,
    pub denominator: BSpline<T, P, 1>,
}

impl<T: FloatingPoint, const P: usize, const D: usize> Nurbs<T, P, D> {
    pub fn try_new(
        degrees: [usize; P],
        knot_vectors: [KnotVector<T>; P],
        control_points: Vec<SVector<T, D>>,
        weights: Vec<T>,
    ) -> Result<Self> {
        let spline = BSpline::try_new(degrees, knot_vectors, control_points)?;
        if weights.len() != spline.control_points().len() {
            return Err(SplineError::size_mismatch(
                "NURBS weights",
                spline.control_points().len(),
                weights.len(),
            ));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(SplineError::non_finite("NURBS weights"));
        }
        Ok(Self {
            spline,
            weights,
            proximity: ProximityCache::default(),
        })
    }

    pub fn try_from_homogeneous(homogeneous: HomogeneousNurbs<T, P, D>) -> Result<Self> {
        let HomogeneousNurbs {
            numerator,
            denominator,
        } = homogeneous;
        let weights: Vec<T> = denominator.control_points().iter().map(|w| w[0]).collect();
        let control_points = numerator
            .control_points()
            .iter()
            .zip(weights.iter())
            .map(|(a, w)| project(a, *w))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            spline: numerator.with_control_points(control_points),
            weights,
            proximity: ProximityCache::default(),
        })
    }

    pub fn degrees(&self) -> &[usize; P] {
        self.spline.degrees()
    }

    pub fn knot_vectors(&self) -> &[KnotVector<T>; P] {
        self.spline.knot_vectors()
    }

    pub fn control_points(&self) -> &[SVector<T, D>] {
        self.spline.control_points()
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn bounds(&self) -> [(T, T); P] {
        self.spline.bounds()
    }

    pub fn homogeneous(&self) -> HomogeneousNurbs<T, P, D> {
        let weighted = self
            .control_points()
            .iter()
            .zip(self.weights.iter())
            .map(|(c, w)| c * *w)
            .collect();
        let weights = self
            .weights
            .iter()
            .map(|w| SVector::<T, 1>::new(*w))
            .collect();
        HomogeneousNurbs {
            numerator: self.spline.with_control_points(weighted),
            denominator: self.spline.with_control_points(weights),
        }
    }

    /// Rational basis values with the ids of the control points they belong to
    pub fn basis(&self, u: &[T; P]) -> Result<(Vec<T>, Vec<usize>)> {
        let (mut values, support) = self.spline.basis(u, &[0; P]);
        rationalize(&mut values, &support, &self.weights)?;
        Ok((values, support))
    }

    pub fn point(&self, u: &[T; P]) -> Result<SVector<T, D>> {
        let (values, support) = self.basis(u)?;
        Ok(support
            .iter()
            .zip(values)
            .fold(SVector::zeros(), |acc, (id, r)| {
                acc + self.control_points()[*id] * r
            }))
    }

    pub fn point_derivative(&self, u: &[T; P], orders: &[usize; P]) -> Result<SVector<T, D>> {
        let HomogeneousNurbs {
            numerator,
            denominator,
        } = self.homogeneous();
        rational_derivative(orders, |j| {
            (
                numerator.point_derivative(u, j),
                denominator.point_derivative(u, j)[0],
            )
        })
    }

    fn refine(&mut self, f: impl FnOnce(&mut HomogeneousNurbs<T, P, D>) -> bool) -> Result<bool> {
        let mut homogeneous = self.homogeneous();
        if !f(&mut homogeneous) {
            return Ok(false);
        }
        *self = Self::try_from_homogeneous(homogeneous)?;
        Ok(true)
    }

    pub fn try_insert_knot(&mut self, axis: usize, knot: T) -> Result<()> {
        check_axis(axis, P)?;
        let mut homogeneous = self.homogeneous();
        refinement::insert_knot(&mut homogeneous, axis, knot)?;
        *self = Self::try_from_homogeneous(homogeneous)?;
        Ok(())
    }

    pub fn try_remove_knot(&mut self, axis: usize, knot: T, tolerance: T) -> Result<bool> {
        check_axis(axis, P)?;
        self.refine(|h| h.remove_knot_within(axis, knot, tolerance))
    }

    pub fn try_elevate_degree(&mut self, axis: usize) -> Result<()> {
        check_axis(axis, P)?;
        self.refine(|h| {
            refinement::elevate_degree(h, axis);
            true
        })?;
        Ok(())
    }

    pub fn try_reduce_degree(&mut self, axis: usize, tolerance: T) -> Result<bool> {
        check_axis(axis, P)?;
        self.refine(|h| refinement::reduce_degree(h, axis, tolerance))
    }
}

impl<T: FloatingPoint, const P: usize, const D: usize> KnotRefinement for HomogeneousNurbs<T, P, D> {
    type Scalar = T;

    fn degree(&self, axis: usize) -> usize {
        self.numerator.degree(axis)
    }

    fn knots(&self, axis: usize) -> &KnotVector<T> {
        self.numerator.knots(axis)
    }

    fn insert_knot_unchecked(&mut self, axis: usize, u: T) {
        self.numerator.insert_knot_unchecked(axis, u);
        self.denominator.insert_knot_unchecked(axis, u);
    }

    fn remove_knot_within(&mut self, axis: usize, u: T, tolerance: T) -> bool {
        let mut work = self.clone();
        if work.numerator.remove_knot_within(axis, u, tolerance)
            && work.denominator.remove_knot_within(axis, u, tolerance)
        {
            *self = work;
            true
        } else {
            false
        }
    }

    fn restrict(&mut self, axis: usize, range: Range<usize>) {
        self.numerator.restrict(axis, range.clone());
        self.denominator.restrict(axis, range);
    }

    fn elevate_segments(&mut self, axis: usize, layout: &BezierLayout<T>) {
        self.numerator.elevate_segments(axis, layout);
        self.denominator.elevate_segments(axis, layout);
    }

    fn reduce_segments(&mut self, axis: usize, layout: &BezierLayout<T>, tolerance: T) -> bool {
        let mut work = self.clone();
        if work.numerator.reduce_segments(axis, layout, tolerance)
            && work.denominator.reduce_segments(axis, layout, tolerance)
        {
            *self = work;
            true
        } else {
            false
        }
    }

    fn round_off(&self) -> T {
        self.numerator.round_off().max(self.denominator.round_off())
    }
}

impl<T: FloatingPoint, const P: usize, const D: usize> Split for Nurbs<T, P, D> {
    type Parameter = T;

    fn try_split(&self, axis: usize, t: T) -> Result<(Self, Self)> {
        check_axis(axis, P)?;
        let (left, right) = refinement::split(&self.homogeneous(), axis, t)?;
        Ok((
            Self::try_from_homogeneous(left)?,
            Self::try_from_homogeneous(right)?,
        ))
    }
}

impl<T: FloatingPoint, const P: usize, const D: usize> Decompose for Nurbs<T, P, D> {
    type Output = Vec<RationalBezier<T, P, D>>;

    /// One rational Bezier patch per knot span, parametric axis 0 running fastest
    fn try_decompose(&self) -> Result<Self::Output> {
        let HomogeneousNurbs {
            numerator,
            denominator,
        } = self.homogeneous();
        numerator
            .bezier_patches()
            .into_iter()
            .zip(denominator.bezier_patches())
            .map(|(numerator, denominator): (Bezier<T, P, D>, Bezier<T, P, 1>)| {
                RationalBezier::try_from_homogeneous(numerator, denominator)
            })
            .collect()
    }
}

impl<const P: usize, const D: usize> Nurbs<f64, P, D> {
    pub fn try_from_buffers(buffers: &SplineBuffers<'_>) -> Result<Self> {
        buffers.expect_layout(SplineFamily::Nurbs)?;
        Self::try_new(
            to_degrees(buffers.degrees)?,
            to_knot_vectors(buffers.knot_vectors.unwrap_or_default())?,
            to_points(buffers.control_points)?,
            buffers.weights.unwrap_or_default().to_vec(),
        )
    }

    pub(crate) fn into_shared(self) -> SharedSpline {
        Arc::new(self)
    }
}

impl<const P: usize, const D: usize> Spline for Nurbs<f64, P, D> {
    fn family(&self) -> SplineFamily {
        SplineFamily::Nurbs
    }

    fn para_dim(&self) -> usize {
        P
    }

    fn dim(&self) -> usize {
        D
    }

    fn degrees(&self) -> Vec<usize> {
        self.degrees().to_vec()
    }

    fn number_of_control_points(&self) -> usize {
        self.weights.len()
    }

    fn current_properties(&self) -> SplineProperties {
        SplineProperties {
            family: SplineFamily::Nurbs,
            para_dim: P,
            dim: D,
            degrees: self.degrees().to_vec(),
            knot_vectors: Some(self.knot_vectors().iter().map(|k| k.to_vec()).collect()),
            control_points: flatten_points(self.control_points()),
            weights: Some(self.weights.clone()),
        }
    }

    fn parametric_bounds(&self) -> Vec<f64> {
        flatten_bounds(&self.bounds())
    }

    fn evaluate(&self, para_coord: &[f64]) -> Result<Vec<f64>> {
        let u = to_param::<P>(para_coord)?;
        Ok(self.point(&u)?.as_slice().to_vec())
    }

    fn derivative(&self, para_coord: &[f64], orders: &[usize]) -> Result<Vec<f64>> {
        let u = to_param::<P>(para_coord)?;
        let orders = to_orders::<P>(orders)?;
        Ok(self.point_derivative(&u, &orders)?.as_slice().to_vec())
    }

    fn basis_and_support(&self, para_coord: &[f64]) -> Result<BasisSupport> {
        let u = to_param::<P>(para_coord)?;
        let (values, support) = self.basis(&u)?;
        Ok(BasisSupport { values, support })
    }

    fn elevate_degree(&mut self, axis: usize) -> Result<()> {
        self.try_elevate_degree(axis)
    }

    fn reduce_degree(&mut self, axis: usize, tolerance: f64) -> Result<bool> {
        let reduced = self.try_reduce_degree(axis, tolerance)?;
        log::debug!("NURBS degree reduction along axis {axis}: {reduced}");
        Ok(reduced)
    }

    fn insert_knot(&mut self, axis: usize, knot: f64) -> Result<()> {
        self.try_insert_knot(axis, knot)
    }

    fn remove_knot(&mut self, axis: usize, knot: f64, tolerance: f64) -> Result<bool> {
        let removed = self.try_remove_knot(axis, knot, tolerance)?;
        log::debug!("NURBS knot removal of {knot} along axis {axis}: {removed}");
        Ok(removed)
    }

    fn split(&self, axis: usize, location: f64) -> Result<(SharedSpline, SharedSpline)> {
        let (left, right) = self.try_split(axis, location)?;
        Ok((left.into_shared(), right.into_shared()))
    }

    fn extract_bezier_patches(&self) -> Result<Vec<SharedSpline>> {
        Ok(self
            .try_decompose()?
            .into_iter()
            .map(|patch| patch.into_shared())
            .collect())
    }

    fn proximity_cache(&self) -> &ProximityCache {
        &self.proximity
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_shared(&self) -> SharedSpline {
        self.clone().into_shared()
    }
}
