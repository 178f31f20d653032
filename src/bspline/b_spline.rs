use std::any::Any;
use std::ops::Range;
use std::sync::Arc;

use nalgebra::SVector;

use crate::bezier::{elevate_fiber, reduce_fiber, Bezier, OutOfTolerance};
use crate::decompose::Decompose;
use crate::error::{check_axis, Result, SplineError};
use crate::knot::KnotVector;
use crate::misc::{
    map_fibers, slice_axis, tensor_basis, tensor_len, try_map_fibers, unravel, FloatingPoint,
};
use crate::proximity::ProximityCache;
use crate::spline::compatibility::{check_addable, downcast};
use crate::spline::conversion::{
    flatten_bounds, flatten_points, to_degrees, to_knot_vectors, to_orders, to_param, to_points,
};
use crate::spline::{
    BasisSupport, SharedSpline, Spline, SplineBuffers, SplineFamily, SplineProperties,
};
use crate::split::Split;

use super::refinement::{self, BezierLayout, KnotRefinement};

/// Tensor-product B-spline with `P` parametric and `D` physical dimensions
///
/// # Example
/// ```
/// use nalgebra::Vector1;
/// use splinekit::prelude::*;
///
/// let ramp = BSpline::<f64, 1, 1>::try_new(
///     [1],
///     [KnotVector::new(vec![0., 0., 1., 2., 2.])],
///     vec![Vector1::new(0.), Vector1::new(1.), Vector1::new(1.)],
/// )
/// .unwrap();
/// assert_eq!(ramp.point(&[0.5]).x, 0.5);
/// assert_eq!(ramp.point(&[1.5]).x, 1.);
/// ```
#[derive(Clone, Debug)]
pub struct BSpline<T: FloatingPoint, const P: usize, const D: usize> {
    degrees: [usize; P],
    knot_vectors: [KnotVector<T>; P],
    control_points: Vec<SVector<T, D>>,
    proximity: ProximityCache,
}

impl<T: FloatingPoint, const P: usize, const D: usize> BSpline<T, P, D> {
    pub fn try_new(
        degrees: [usize; P],
        knot_vectors: [KnotVector<T>; P],
        control_points: Vec<SVector<T, D>>,
    ) -> Result<Self> {
        for (axis, (degree, knots)) in degrees.iter().zip(knot_vectors.iter()).enumerate() {
            if knots.iter().any(|k| !k.is_finite())
                || knots.as_slice().windows(2).any(|w| w[1] < w[0])
            {
                return Err(SplineError::Construction(format!(
                    "knot vector of axis {axis} must be finite and non-decreasing"
                )));
            }
            if *degree >= knots.len() {
                return Err(SplineError::Construction(format!(
                    "degree {degree} of axis {axis} needs more than the {} given knots",
                    knots.len()
                )));
            }
            if knots.len() < 2 * (degree + 1) {
                return Err(SplineError::Construction(format!(
                    "knot vector of axis {axis} needs at least {} knots for degree {degree}, got {}",
                    2 * (degree + 1),
                    knots.len()
                )));
            }
            if knots.multiplicity().iter().any(|m| m.is_full(degree + 1)) {
                return Err(SplineError::Construction(format!(
                    "knot multiplicity of axis {axis} exceeds degree + 1"
                )));
            }
            let (lo, hi) = knots.domain(*degree);
            if !(lo < hi) {
                return Err(SplineError::Construction(format!(
                    "parametric domain of axis {axis} is empty"
                )));
            }
        }

        let shape: [usize; P] =
            std::array::from_fn(|axis| knot_vectors[axis].len() - degrees[axis] - 1);
        let expected = tensor_len(&shape);
        if control_points.len() != expected {
            return Err(SplineError::size_mismatch(
                "B-spline control points",
                expected,
                control_points.len(),
            ));
        }
        if control_points.iter().any(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(SplineError::non_finite("B-spline control points"));
        }
        Ok(Self::new_unchecked(degrees, knot_vectors, control_points))
    }

    pub(crate) fn new_unchecked(
        degrees: [usize; P],
        knot_vectors: [KnotVector<T>; P],
        control_points: Vec<SVector<T, D>>,
    ) -> Self {
        Self {
            degrees,
            knot_vectors,
            control_points,
            proximity: ProximityCache::default(),
        }
    }

    pub fn degrees(&self) -> &[usize; P] {
        &self.degrees
    }

    pub fn knot_vectors(&self) -> &[KnotVector<T>; P] {
        &self.knot_vectors
    }

    pub fn control_points(&self) -> &[SVector<T, D>] {
        &self.control_points
    }

    /// Number of control points along each axis
    pub fn shape(&self) -> [usize; P] {
        std::array::from_fn(|axis| self.knot_vectors[axis].len() - self.degrees[axis] - 1)
    }

    /// Parametric domain of every axis
    pub fn bounds(&self) -> [(T, T); P] {
        std::array::from_fn(|axis| self.knot_vectors[axis].domain(self.degrees[axis]))
    }

    /// Same degrees and knots with other control points
    pub(crate) fn with_control_points<const E: usize>(
        &self,
        control_points: Vec<SVector<T, E>>,
    ) -> BSpline<T, P, E> {
        BSpline::new_unchecked(self.degrees, self.knot_vectors.clone(), control_points)
    }

    /// Non-vanishing basis values (or their mixed partial derivatives) with the ids of their control points
    pub fn basis(&self, u: &[T; P], orders: &[usize; P]) -> (Vec<T>, Vec<usize>) {
        let shape = self.shape();
        let mut first = [0; P];
        let per_axis: [Vec<T>; P] = std::array::from_fn(|axis| {
            let knots = &self.knot_vectors[axis];
            let degree = self.degrees[axis];
            let span = knots.find_knot_span_index(shape[axis] - 1, degree, u[axis]);
            first[axis] = span - degree;
            if orders[axis] == 0 {
                knots.basis_functions(span, u[axis], degree)
            } else {
                knots
                    .derivative_basis_functions(span, u[axis], degree, orders[axis])
                    .swap_remove(orders[axis])
            }
        });
        tensor_basis(&per_axis, &first, &shape)
    }

    pub fn point(&self, u: &[T; P]) -> SVector<T, D> {
        self.point_derivative(u, &[0; P])
    }

    pub fn point_derivative(&self, u: &[T; P], orders: &[usize; P]) -> SVector<T, D> {
        let (values, support) = self.basis(u, orders);
        support
            .iter()
            .zip(values)
            .fold(SVector::zeros(), |acc, (id, b)| {
                acc + self.control_points[*id] * b
            })
    }

    /// Insert `knot` along `axis` without changing the geometry
    pub fn try_insert_knot(&mut self, axis: usize, knot: T) -> Result<()> {
        check_axis(axis, P)?;
        refinement::insert_knot(self, axis, knot)?;
        self.proximity.reset();
        Ok(())
    }

    /// Remove one copy of `knot` along `axis` when the geometry moves by at most `tolerance`
    pub fn try_remove_knot(&mut self, axis: usize, knot: T, tolerance: T) -> Result<bool> {
        check_axis(axis, P)?;
        let removed = self.remove_knot_within(axis, knot, tolerance);
        if removed {
            self.proximity.reset();
        }
        Ok(removed)
    }

    pub fn try_elevate_degree(&mut self, axis: usize) -> Result<()> {
        check_axis(axis, P)?;
        refinement::elevate_degree(self, axis);
        self.proximity.reset();
        Ok(())
    }

    pub fn try_reduce_degree(&mut self, axis: usize, tolerance: T) -> Result<bool> {
        check_axis(axis, P)?;
        let reduced = refinement::reduce_degree(self, axis, tolerance);
        if reduced {
            self.proximity.reset();
        }
        Ok(reduced)
    }

    /// Make every axis interpolate its end control points
    pub fn clamped(&self) -> Self {
        let mut clamped = self.clone();
        for axis in 0..P {
            refinement::clamp(&mut clamped, axis);
        }
        clamped
    }

    /// Derivative along `axis` as a B-spline of one degree less over the same domain
    pub fn differentiate(&self, axis: usize) -> Result<Self> {
        check_axis(axis, P)?;
        let degree = self.degrees[axis];
        if degree == 0 {
            let zeros = vec![SVector::zeros(); self.control_points.len()];
            return Ok(self.with_control_points(zeros));
        }
        let knots = &self.knot_vectors[axis];
        let (control_points, _) = map_fibers(&self.control_points, &self.shape(), axis, |fiber| {
            refinement::differentiate_fiber(knots, degree, fiber)
        });
        let mut degrees = self.degrees;
        degrees[axis] = degree - 1;
        let mut knot_vectors = self.knot_vectors.clone();
        knot_vectors[axis] = knots.slice(1..knots.len() - 1);
        Ok(Self::new_unchecked(degrees, knot_vectors, control_points))
    }

    /// Pointwise sum of two B-splines over the same parametric bounds.
    /// Both operands are clamped and brought to common degrees and knot vectors first.
    pub fn try_sum(&self, other: &Self) -> Result<Self> {
        for (axis, (a, b)) in self.bounds().iter().zip(other.bounds().iter()).enumerate() {
            let scale = T::one() + a.0.abs().max(a.1.abs());
            let tolerance = T::default_epsilon() * nalgebra::convert::<f64, T>(1e3) * scale;
            if (a.0 - b.0).abs() > tolerance || (a.1 - b.1).abs() > tolerance {
                return Err(SplineError::DimensionMismatch(format!(
                    "B-spline addition requires identical parametric bounds, axis {axis} differs"
                )));
            }
        }

        let mut lhs = self.clamped();
        let mut rhs = other.clamped();
        for axis in 0..P {
            while lhs.degrees[axis] < rhs.degrees[axis] {
                refinement::elevate_degree(&mut lhs, axis);
            }
            while rhs.degrees[axis] < lhs.degrees[axis] {
                refinement::elevate_degree(&mut rhs, axis);
            }
            refinement::unify_knots(&mut lhs, &mut rhs, axis);
            if lhs.knot_vectors[axis].len() != rhs.knot_vectors[axis].len() {
                return Err(SplineError::DimensionMismatch(format!(
                    "B-spline addition could not unify the knot vectors of axis {axis}"
                )));
            }
        }

        let control_points = lhs
            .control_points
            .iter()
            .zip(rhs.control_points.iter())
            .map(|(a, b)| a + b)
            .collect();
        Ok(lhs.with_control_points(control_points))
    }

    /// Segment boundaries per axis of a spline in Bezier form
    fn bezier_form(&self) -> (Self, [BezierLayout<T>; P]) {
        let mut work = self.clone();
        let layouts = std::array::from_fn(|axis| refinement::to_bezier_form(&mut work, axis));
        (work, layouts)
    }

    /// Control points of the Bezier patch `segment` of a spline in Bezier form
    fn patch_points(
        &self,
        layouts: &[BezierLayout<T>; P],
        segment: &[usize; P],
    ) -> Vec<SVector<T, D>> {
        let mut values = self.control_points.clone();
        let mut shape = self.shape();
        for axis in 0..P {
            let degree = self.degrees[axis];
            let start = layouts[axis].starts(degree)[segment[axis]];
            (values, shape) = slice_axis(&values, &shape, axis, start..start + degree + 1);
        }
        values
    }

    pub(crate) fn bezier_patches(&self) -> Vec<Bezier<T, P, D>> {
        let (work, layouts) = self.bezier_form();
        let segments: [usize; P] = std::array::from_fn(|axis| layouts[axis].breaks.len() - 1);
        (0..tensor_len(&segments))
            .map(|flat| {
                let segment = unravel(flat, &segments);
                Bezier::new_unchecked(work.degrees, work.patch_points(&layouts, &segment))
            })
            .collect()
    }
}

impl<T: FloatingPoint, const P: usize, const D: usize> KnotRefinement for BSpline<T, P, D> {
    type Scalar = T;

    fn degree(&self, axis: usize) -> usize {
        self.degrees[axis]
    }

    fn knots(&self, axis: usize) -> &KnotVector<T> {
        &self.knot_vectors[axis]
    }

    fn insert_knot_unchecked(&mut self, axis: usize, u: T) {
        let degree = self.degrees[axis];
        let knots = &self.knot_vectors[axis];
        let span = knots.floor(u).unwrap_or(degree);
        let multiplicity = knots.multiplicity_of(u);
        let (control_points, _) = map_fibers(&self.control_points, &self.shape(), axis, |fiber| {
            refinement::insert_knot_fiber(knots, degree, span, multiplicity, u, fiber)
        });
        self.control_points = control_points;
        self.knot_vectors[axis].add(u);
    }

    fn remove_knot_within(&mut self, axis: usize, u: T, tolerance: T) -> bool {
        let degree = self.degrees[axis];
        let knots = &self.knot_vectors[axis];
        let n = self.shape()[axis];
        let Some(r) = knots.iter().rposition(|k| *k == u) else {
            return false;
        };
        let s = knots.multiplicity_of(u);
        if r < degree + 1 || r + 2 > n + s {
            return false;
        }
        let removed = try_map_fibers(&self.control_points, &self.shape(), axis, |fiber| {
            refinement::remove_knot_fiber(knots, degree, r, s, fiber, tolerance).ok_or(OutOfTolerance)
        });
        match removed {
            Ok((control_points, _)) => {
                self.control_points = control_points;
                self.knot_vectors[axis].remove(r);
                true
            }
            Err(OutOfTolerance) => false,
        }
    }

    fn restrict(&mut self, axis: usize, range: Range<usize>) {
        let degree = self.degrees[axis];
        let knots = self.knot_vectors[axis].slice(range.start..range.end + degree + 1);
        let (control_points, _) = slice_axis(&self.control_points, &self.shape(), axis, range);
        self.control_points = control_points;
        self.knot_vectors[axis] = knots;
    }

    fn elevate_segments(&mut self, axis: usize, layout: &BezierLayout<T>) {
        let degree = self.degrees[axis];
        let (control_points, _) = map_fibers(&self.control_points, &self.shape(), axis, |fiber| {
            let segments = layout
                .segments(fiber, degree)
                .into_iter()
                .map(elevate_fiber)
                .collect();
            layout.join(segments)
        });
        self.control_points = control_points;
        self.degrees[axis] = degree + 1;
        self.knot_vectors[axis] = layout.knots(degree + 1);
    }

    fn reduce_segments(&mut self, axis: usize, layout: &BezierLayout<T>, tolerance: T) -> bool {
        let degree = self.degrees[axis];
        let reduced = try_map_fibers(&self.control_points, &self.shape(), axis, |fiber| {
            let segments = layout
                .segments(fiber, degree)
                .into_iter()
                .map(|segment| reduce_fiber(segment, tolerance))
                .collect::<Option<Vec<_>>>()
                .ok_or(OutOfTolerance)?;
            Ok(layout.join(segments))
        });
        match reduced {
            Ok((control_points, _)) => {
                self.control_points = control_points;
                self.degrees[axis] = degree - 1;
                self.knot_vectors[axis] = layout.knots(degree - 1);
                true
            }
            Err(OutOfTolerance) => false,
        }
    }

    fn round_off(&self) -> T {
        let scale = self
            .control_points
            .iter()
            .fold(T::zero(), |acc, p| acc.max(p.norm()));
        nalgebra::convert::<f64, T>(1e-9) * (T::one() + scale)
    }
}

impl<T: FloatingPoint, const P: usize, const D: usize> Split for BSpline<T, P, D> {
    type Parameter = T;

    /// Split at `t` along `axis`; both pieces keep the global parametrization
    fn try_split(&self, axis: usize, t: T) -> Result<(Self, Self)> {
        check_axis(axis, P)?;
        refinement::split(self, axis, t)
    }
}

impl<T: FloatingPoint, const P: usize, const D: usize> Decompose for BSpline<T, P, D> {
    type Output = Vec<Bezier<T, P, D>>;

    /// One Bezier patch per knot span, parametric axis 0 running fastest
    fn try_decompose(&self) -> Result<Self::Output> {
        Ok(self.bezier_patches())
    }
}

impl<const P: usize, const D: usize> BSpline<f64, P, D> {
    pub fn try_from_buffers(buffers: &SplineBuffers<'_>) -> Result<Self> {
        buffers.expect_layout(SplineFamily::BSpline)?;
        Self::try_new(
            to_degrees(buffers.degrees)?,
            to_knot_vectors(buffers.knot_vectors.unwrap_or_default())?,
            to_points(buffers.control_points)?,
        )
    }

    pub(crate) fn into_shared(self) -> SharedSpline {
        Arc::new(self)
    }
}

impl<const P: usize, const D: usize> Spline for BSpline<f64, P, D> {
    fn family(&self) -> SplineFamily {
        SplineFamily::BSpline
    }

    fn para_dim(&self) -> usize {
        P
    }

    fn dim(&self) -> usize {
        D
    }

    fn degrees(&self) -> Vec<usize> {
        self.degrees.to_vec()
    }

    fn number_of_control_points(&self) -> usize {
        self.control_points.len()
    }

    fn current_properties(&self) -> SplineProperties {
        SplineProperties {
            family: SplineFamily::BSpline,
            para_dim: P,
            dim: D,
            degrees: self.degrees.to_vec(),
            knot_vectors: Some(self.knot_vectors.iter().map(|k| k.to_vec()).collect()),
            control_points: flatten_points(&self.control_points),
            weights: None,
        }
    }

    fn parametric_bounds(&self) -> Vec<f64> {
        flatten_bounds(&self.bounds())
    }

    fn evaluate(&self, para_coord: &[f64]) -> Result<Vec<f64>> {
        let u = to_param::<P>(para_coord)?;
        Ok(self.point(&u).as_slice().to_vec())
    }

    fn derivative(&self, para_coord: &[f64], orders: &[usize]) -> Result<Vec<f64>> {
        let u = to_param::<P>(para_coord)?;
        let orders = to_orders::<P>(orders)?;
        Ok(self.point_derivative(&u, &orders).as_slice().to_vec())
    }

    fn basis_and_support(&self, para_coord: &[f64]) -> Result<BasisSupport> {
        let u = to_param::<P>(para_coord)?;
        let (values, support) = self.basis(&u, &[0; P]);
        Ok(BasisSupport { values, support })
    }

    fn elevate_degree(&mut self, axis: usize) -> Result<()> {
        self.try_elevate_degree(axis)
    }

    fn reduce_degree(&mut self, axis: usize, tolerance: f64) -> Result<bool> {
        let reduced = self.try_reduce_degree(axis, tolerance)?;
        log::debug!("B-spline degree reduction along axis {axis}: {reduced}");
        Ok(reduced)
    }

    fn insert_knot(&mut self, axis: usize, knot: f64) -> Result<()> {
        self.try_insert_knot(axis, knot)
    }

    fn remove_knot(&mut self, axis: usize, knot: f64, tolerance: f64) -> Result<bool> {
        let removed = self.try_remove_knot(axis, knot, tolerance)?;
        log::debug!("B-spline knot removal of {knot} along axis {axis}: {removed}");
        Ok(removed)
    }

    fn add(&self, other: &dyn Spline) -> Result<SharedSpline> {
        check_addable(self, other)?;
        let other = downcast::<Self>(other, "a B-spline of equal dimensions")?;
        Ok(self.try_sum(other)?.into_shared())
    }

    fn split(&self, axis: usize, location: f64) -> Result<(SharedSpline, SharedSpline)> {
        let (left, right) = self.try_split(axis, location)?;
        Ok((left.into_shared(), right.into_shared()))
    }

    fn derivative_spline(&self, orders: &[usize]) -> Result<SharedSpline> {
        let orders = to_orders::<P>(orders)?;
        let mut derivative = self.clone();
        for (axis, order) in orders.iter().enumerate() {
            for _ in 0..*order {
                derivative = derivative.differentiate(axis)?;
            }
        }
        Ok(derivative.into_shared())
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
