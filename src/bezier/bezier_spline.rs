use std::any::Any;
use std::sync::Arc;

use itertools::Itertools;
use nalgebra::SVector;

use crate::error::{check_axis, Result, SplineError};
use crate::knot::KnotVector;
use crate::misc::{
    cast_usize, map_fibers, ravel, slice_axis, tensor_basis, tensor_len, try_map_fibers, unravel,
    Binomial, FloatingPoint,
};
use crate::proximity::ProximityCache;
use crate::spline::compatibility::{check_addable, check_multipliable, downcast, ProductKind};
use crate::spline::conversion::{flatten_points, to_degrees, to_orders, to_param, to_points};
use crate::spline::{
    BasisSupport, SharedSpline, Spline, SplineBuffers, SplineFamily, SplineProperties,
};
use crate::split::Split;

use super::RationalBezier;

/// Tensor-product Bezier spline on the unit box `[0, 1]^P` with points in `D` dimensions
///
/// # Example
/// ```
/// use nalgebra::Vector2;
/// use splinekit::prelude::*;
///
/// let parabola = Bezier::<f64, 1, 2>::try_new(
///     [2],
///     vec![Vector2::new(0., 0.), Vector2::new(0.5, 1.), Vector2::new(1., 0.)],
/// )
/// .unwrap();
/// let p = parabola.point(&[0.5]);
/// assert!((p.x - 0.5).abs() < 1e-12 && (p.y - 0.5).abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct Bezier<T: FloatingPoint, const P: usize, const D: usize> {
    degrees: [usize; P],
    control_points: Vec<SVector<T, D>>,
    proximity: ProximityCache,
}

/// Bernstein polynomials of `degree` (or their `order` derivative) at `t`
pub fn bernstein<T: FloatingPoint>(degree: usize, t: T, order: usize) -> Vec<T> {
    let knots = KnotVector::bezier(degree);
    knots
        .derivative_basis_functions(degree, t, degree, order)
        .swap_remove(order)
}

impl<T: FloatingPoint, const P: usize, const D: usize> Bezier<T, P, D> {
    pub fn try_new(degrees: [usize; P], control_points: Vec<SVector<T, D>>) -> Result<Self> {
        if degrees.iter().any(|d| *d >= control_points.len()) {
            return Err(SplineError::Construction(format!(
                "degrees {degrees:?} need more than the {} given control points",
                control_points.len()
            )));
        }
        let expected = degrees
            .iter()
            .try_fold(1usize, |len, d| len.checked_mul(d + 1))
            .unwrap_or(usize::MAX);
        if control_points.len() != expected {
            return Err(SplineError::size_mismatch(
                "Bezier control points",
                expected,
                control_points.len(),
            ));
        }
        if control_points.iter().any(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(SplineError::non_finite("Bezier control points"));
        }
        Ok(Self::new_unchecked(degrees, control_points))
    }

    pub(crate) fn new_unchecked(degrees: [usize; P], control_points: Vec<SVector<T, D>>) -> Self {
        Self {
            degrees,
            control_points,
            proximity: ProximityCache::default(),
        }
    }

    /// Degree zero spline with a single control point
    pub fn constant(value: SVector<T, D>) -> Self {
        Self::new_unchecked([0; P], vec![value])
    }

    pub fn degrees(&self) -> &[usize; P] {
        &self.degrees
    }

    pub fn control_points(&self) -> &[SVector<T, D>] {
        &self.control_points
    }

    /// Number of control points along each axis
    pub fn shape(&self) -> [usize; P] {
        self.degrees.map(|d| d + 1)
    }

    /// Basis values (or their mixed partial derivatives) with the ids of the control points they belong to
    pub fn basis(&self, u: &[T; P], orders: &[usize; P]) -> (Vec<T>, Vec<usize>) {
        let per_axis: [Vec<T>; P] =
            std::array::from_fn(|axis| bernstein(self.degrees[axis], u[axis], orders[axis]));
        tensor_basis(&per_axis, &[0; P], &self.shape())
    }

    pub fn point(&self, u: &[T; P]) -> SVector<T, D> {
        self.point_derivative(u, &[0; P])
    }

    /// Mixed partial derivative of the spline at `u`
    pub fn point_derivative(&self, u: &[T; P], orders: &[usize; P]) -> SVector<T, D> {
        let (values, support) = self.basis(u, orders);
        support
            .iter()
            .zip(values)
            .fold(SVector::zeros(), |acc, (id, b)| {
                acc + self.control_points[*id] * b
            })
    }

    pub fn map_control_points<const E: usize>(
        &self,
        f: impl Fn(&SVector<T, D>) -> SVector<T, E>,
    ) -> Bezier<T, P, E> {
        Bezier::new_unchecked(self.degrees, self.control_points.iter().map(f).collect())
    }

    /// Raise the degree along `axis` by one without changing the geometry
    pub fn try_elevate_degree(&mut self, axis: usize) -> Result<()> {
        check_axis(axis, P)?;
        let (control_points, _) =
            map_fibers(&self.control_points, &self.shape(), axis, elevate_fiber);
        self.control_points = control_points;
        self.degrees[axis] += 1;
        self.proximity.reset();
        Ok(())
    }

    /// Copy with every degree raised to at least `degrees`
    pub fn elevated_to(&self, degrees: &[usize; P]) -> Self {
        let mut elevated = self.clone();
        for axis in 0..P {
            while elevated.degrees[axis] < degrees[axis] {
                let (control_points, _) =
                    map_fibers(&elevated.control_points, &elevated.shape(), axis, elevate_fiber);
                elevated.control_points = control_points;
                elevated.degrees[axis] += 1;
            }
        }
        elevated
    }

    /// Lower the degree along `axis` when every control point is reproduced within `tolerance`
    pub fn try_reduce_degree(&mut self, axis: usize, tolerance: T) -> Result<bool> {
        check_axis(axis, P)?;
        if self.degrees[axis] == 0 {
            return Ok(false);
        }
        let reduced = try_map_fibers(&self.control_points, &self.shape(), axis, |fiber| {
            reduce_fiber(fiber, tolerance).ok_or(OutOfTolerance)
        });
        match reduced {
            Ok((control_points, _)) => {
                self.control_points = control_points;
                self.degrees[axis] -= 1;
                self.proximity.reset();
                Ok(true)
            }
            Err(OutOfTolerance) => Ok(false),
        }
    }

    /// Derivative along `axis` as a Bezier of one degree less
    pub fn differentiate(&self, axis: usize) -> Result<Self> {
        check_axis(axis, P)?;
        let (control_points, _) =
            map_fibers(&self.control_points, &self.shape(), axis, differentiate_fiber);
        let mut degrees = self.degrees;
        degrees[axis] = degrees[axis].saturating_sub(1);
        Ok(Self::new_unchecked(degrees, control_points))
    }

    /// Pointwise product, combining control points pairwise with `combine`
    pub fn product<const E: usize, const G: usize>(
        &self,
        other: &Bezier<T, P, E>,
        combine: impl Fn(&SVector<T, D>, &SVector<T, E>) -> SVector<T, G>,
    ) -> Bezier<T, P, G> {
        let degrees: [usize; P] =
            std::array::from_fn(|axis| self.degrees[axis] + other.degrees[axis]);
        let shape = degrees.map(|d| d + 1);
        let lhs_shape = self.shape();
        let rhs_shape = other.shape();

        let mut binomial = Binomial::<T>::new();
        let mut control_points = vec![SVector::<T, G>::zeros(); tensor_len(&shape)];
        let pairs = self
            .control_points
            .iter()
            .enumerate()
            .cartesian_product(other.control_points.iter().enumerate());
        for ((i, a), (j, b)) in pairs {
            let ii = unravel(i, &lhs_shape);
            let jj = unravel(j, &rhs_shape);
            let kk: [usize; P] = std::array::from_fn(|axis| ii[axis] + jj[axis]);
            let factor = (0..P).fold(T::one(), |acc, axis| {
                acc * binomial.get(self.degrees[axis], ii[axis])
                    * binomial.get(other.degrees[axis], jj[axis])
                    / binomial.get(degrees[axis], kk[axis])
            });
            control_points[ravel(&kk, &shape)] += combine(a, b) * factor;
        }
        Bezier::new_unchecked(degrees, control_points)
    }

    /// Scale every point by a scalar field
    pub fn scale_by(&self, field: &Bezier<T, P, 1>) -> Self {
        self.product(field, |a, b| a * b[0])
    }

    /// Scalar field of pointwise dot products
    pub fn dot(&self, other: &Self) -> Bezier<T, P, 1> {
        self.product(other, |a, b| SVector::<T, 1>::new(a.dot(b)))
    }

    /// Pointwise sum, elevating both operands to common degrees
    pub fn sum(&self, other: &Self) -> Self {
        let degrees: [usize; P] =
            std::array::from_fn(|axis| self.degrees[axis].max(other.degrees[axis]));
        let lhs = self.elevated_to(&degrees);
        let rhs = other.elevated_to(&degrees);
        let control_points = lhs
            .control_points
            .iter()
            .zip(rhs.control_points.iter())
            .map(|(a, b)| a + b)
            .collect();
        Self::new_unchecked(degrees, control_points)
    }
}

/// Marker for a fiber that can not be processed within tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutOfTolerance;

pub(crate) fn elevate_fiber<T: FloatingPoint, const D: usize>(
    points: &[SVector<T, D>],
) -> Vec<SVector<T, D>> {
    let p = points.len() - 1;
    let p1: T = cast_usize(p + 1);
    (0..=p + 1)
        .map(|i| {
            if i == 0 {
                points[0]
            } else if i == p + 1 {
                points[p]
            } else {
                let alpha = cast_usize::<T>(i) / p1;
                points[i - 1] * alpha + points[i] * (T::one() - alpha)
            }
        })
        .collect()
}

/// Invert the elevation from both ends of the fiber and accept the result
/// if elevating it again lands within `tolerance` of every original point
pub(crate) fn reduce_fiber<T: FloatingPoint, const D: usize>(
    points: &[SVector<T, D>],
    tolerance: T,
) -> Option<Vec<SVector<T, D>>> {
    let p = points.len() - 1;
    if p == 0 {
        return None;
    }
    let reduced = if p == 1 {
        vec![(points[0] + points[1]) * nalgebra::convert::<f64, T>(0.5)]
    } else {
        let pf: T = cast_usize(p);
        let r = (p - 1) / 2;
        let mut q = vec![SVector::<T, D>::zeros(); p];
        q[0] = points[0];
        for i in 1..=r {
            let alpha = cast_usize::<T>(i) / pf;
            q[i] = (points[i] - q[i - 1] * alpha) / (T::one() - alpha);
        }
        q[p - 1] = points[p];
        for i in (r + 1..p - 1).rev() {
            let alpha = cast_usize::<T>(i + 1) / pf;
            q[i] = (points[i + 1] - q[i + 1] * (T::one() - alpha)) / alpha;
        }
        q
    };

    let error = elevate_fiber(&reduced)
        .iter()
        .zip(points)
        .fold(T::zero(), |acc, (a, b)| acc.max((a - b).norm()));
    (error <= tolerance).then_some(reduced)
}

fn differentiate_fiber<T: FloatingPoint, const D: usize>(
    points: &[SVector<T, D>],
) -> Vec<SVector<T, D>> {
    let p = points.len() - 1;
    if p == 0 {
        return vec![SVector::zeros()];
    }
    let pf: T = cast_usize(p);
    points.windows(2).map(|w| (w[1] - w[0]) * pf).collect()
}

/// de Casteljau subdivision of a fiber at `t`
pub(crate) fn split_fiber<T: FloatingPoint, const D: usize>(
    points: &[SVector<T, D>],
    t: T,
) -> (Vec<SVector<T, D>>, Vec<SVector<T, D>>) {
    let n = points.len();
    let mut work = points.to_vec();
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    left.push(work[0]);
    right.push(work[n - 1]);
    for level in 1..n {
        for i in 0..n - level {
            work[i] = work[i] * (T::one() - t) + work[i + 1] * t;
        }
        left.push(work[0]);
        right.push(work[n - 1 - level]);
    }
    right.reverse();
    (left, right)
}

/// Split both the geometry and the unit box at `t` along `axis`
pub(crate) fn split_tensor<T, const P: usize, const D: usize>(
    values: &[SVector<T, D>],
    shape: &[usize; P],
    axis: usize,
    t: T,
) -> ((Vec<SVector<T, D>>, [usize; P]), (Vec<SVector<T, D>>, [usize; P]))
where
    T: FloatingPoint,
{
    let n = shape[axis];
    let (joined, joined_shape) = map_fibers(values, shape, axis, |fiber| {
        let (mut left, right) = split_fiber(fiber, t);
        left.extend(right);
        left
    });
    (
        slice_axis(&joined, &joined_shape, axis, 0..n),
        slice_axis(&joined, &joined_shape, axis, n..2 * n),
    )
}

impl<T: FloatingPoint, const P: usize, const D: usize> Split for Bezier<T, P, D> {
    type Parameter = T;

    /// Split at `t` along `axis`; both halves are reparametrized to `[0, 1]`
    fn try_split(&self, axis: usize, t: T) -> Result<(Self, Self)> {
        check_axis(axis, P)?;
        if !(t > T::zero() && t < T::one()) {
            return Err(SplineError::InvalidParameter(format!(
                "split location {t} must lie strictly inside (0, 1)"
            )));
        }
        let ((left, _), (right, _)) =
            split_tensor(&self.control_points, &self.shape(), axis, t);
        Ok((
            Self::new_unchecked(self.degrees, left),
            Self::new_unchecked(self.degrees, right),
        ))
    }
}

impl<const P: usize, const D: usize> Bezier<f64, P, D> {
    pub fn try_from_buffers(buffers: &SplineBuffers<'_>) -> Result<Self> {
        buffers.expect_layout(SplineFamily::Bezier)?;
        Self::try_new(
            to_degrees(buffers.degrees)?,
            to_points(buffers.control_points)?,
        )
    }

    pub(crate) fn into_shared(self) -> SharedSpline {
        Arc::new(self)
    }
}

impl<const P: usize, const D: usize> Spline for Bezier<f64, P, D> {
    fn family(&self) -> SplineFamily {
        SplineFamily::Bezier
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
            family: SplineFamily::Bezier,
            para_dim: P,
            dim: D,
            degrees: self.degrees.to_vec(),
            knot_vectors: None,
            control_points: flatten_points(&self.control_points),
            weights: None,
        }
    }

    fn parametric_bounds(&self) -> Vec<f64> {
        [0.; P].into_iter().chain([1.; P]).collect()
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
        log::debug!("Bezier degree reduction along axis {axis}: {reduced}");
        Ok(reduced)
    }

    fn multiply(&self, other: &dyn Spline) -> Result<SharedSpline> {
        match check_multipliable(self, other)? {
            ProductKind::Scalar => {
                let field = downcast::<Bezier<f64, P, 1>>(other, "a Bezier scalar field")?;
                Ok(self.scale_by(field).into_shared())
            }
            ProductKind::Dot => {
                let other = downcast::<Self>(other, "a Bezier of equal dimensions")?;
                Ok(self.dot(other).into_shared())
            }
        }
    }

    fn add(&self, other: &dyn Spline) -> Result<SharedSpline> {
        check_addable(self, other)?;
        let other = downcast::<Self>(other, "a Bezier of equal dimensions")?;
        Ok(self.sum(other).into_shared())
    }

    fn compose(&self, inner: &dyn Spline) -> Result<SharedSpline> {
        super::composition::compose_dyn(self, self, None, inner)
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
        Ok(vec![self.clone_shared()])
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

impl<T: FloatingPoint, const P: usize, const D: usize> From<Bezier<T, P, D>>
    for RationalBezier<T, P, D>
{
    /// Unit weights
    fn from(bezier: Bezier<T, P, D>) -> Self {
        let weights = vec![T::one(); bezier.control_points.len()];
        RationalBezier::new_unchecked(bezier, weights)
    }
}
