use std::any::Any;
use std::sync::Arc;

use nalgebra::SVector;

use crate::error::{check_axis, Result, SplineError};
use crate::misc::FloatingPoint;
use crate::proximity::ProximityCache;
use crate::spline::compatibility::{check_addable, check_multipliable, downcast, ProductKind};
use crate::spline::conversion::{flatten_points, to_degrees, to_orders, to_param, to_points};
use crate::spline::rational::{project, rational_derivative, rationalize};
use crate::spline::{
    BasisSupport, SharedSpline, Spline, SplineBuffers, SplineFamily, SplineProperties,
};
use crate::split::Split;

use super::{split_tensor, Bezier};

/// Tensor-product rational Bezier spline on the unit box `[0, 1]^P`
///
/// Control points are kept in projected form next to their weights;
/// algebra runs on the homogeneous form (weighted points and the weight function) and projects back.
#[derive(Clone, Debug)]
pub struct RationalBezier<T: FloatingPoint, const P: usize, const D: usize> {
    bezier: Bezier<T, P, D>,
    weights: Vec<T>,
    proximity: ProximityCache,
}

impl<T: FloatingPoint, const P: usize, const D: usize> RationalBezier<T, P, D> {
    pub fn try_new(
        degrees: [usize; P],
        control_points: Vec<SVector<T, D>>,
        weights: Vec<T>,
    ) -> Result<Self> {
        let bezier = Bezier::try_new(degrees, control_points)?;
        if weights.len() != bezier.control_points().len() {
            return Err(SplineError::size_mismatch(
                "rational Bezier weights",
                bezier.control_points().len(),
                weights.len(),
            ));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(SplineError::non_finite("rational Bezier weights"));
        }
        Ok(Self::new_unchecked(bezier, weights))
    }

    pub(crate) fn new_unchecked(bezier: Bezier<T, P, D>, weights: Vec<T>) -> Self {
        Self {
            bezier,
            weights,
            proximity: ProximityCache::default(),
        }
    }

    /// Project a homogeneous pair back to control points and weights.
    /// A vanishing weight is only accepted under a vanishing weighted point.
    pub fn try_from_homogeneous(
        numerator: Bezier<T, P, D>,
        denominator: Bezier<T, P, 1>,
    ) -> Result<Self> {
        let degrees: [usize; P] = std::array::from_fn(|axis| {
            numerator.degrees()[axis].max(denominator.degrees()[axis])
        });
        let numerator = numerator.elevated_to(&degrees);
        let denominator = denominator.elevated_to(&degrees);
        let weights: Vec<T> = denominator.control_points().iter().map(|w| w[0]).collect();
        let control_points = numerator
            .control_points()
            .iter()
            .zip(weights.iter())
            .map(|(a, w)| project(a, *w))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new_unchecked(
            Bezier::new_unchecked(degrees, control_points),
            weights,
        ))
    }

    pub fn degrees(&self) -> &[usize; P] {
        self.bezier.degrees()
    }

    pub fn control_points(&self) -> &[SVector<T, D>] {
        self.bezier.control_points()
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Weighted control points `w_i c_i`
    pub fn weighted(&self) -> Bezier<T, P, D> {
        let control_points = self
            .control_points()
            .iter()
            .zip(self.weights.iter())
            .map(|(c, w)| c * *w)
            .collect();
        Bezier::new_unchecked(*self.degrees(), control_points)
    }

    /// The weight function as a scalar Bezier field
    pub fn weight_function(&self) -> Bezier<T, P, 1> {
        let weights = self
            .weights
            .iter()
            .map(|w| SVector::<T, 1>::new(*w))
            .collect();
        Bezier::new_unchecked(*self.degrees(), weights)
    }

    pub fn homogeneous(&self) -> (Bezier<T, P, D>, Bezier<T, P, 1>) {
        (self.weighted(), self.weight_function())
    }

    /// Rational basis values with the ids of the control points they belong to
    pub fn basis(&self, u: &[T; P]) -> Result<(Vec<T>, Vec<usize>)> {
        let (mut values, support) = self.bezier.basis(u, &[0; P]);
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
        let (numerator, denominator) = self.homogeneous();
        rational_derivative(orders, |j| {
            (
                numerator.point_derivative(u, j),
                denominator.point_derivative(u, j)[0],
            )
        })
    }

    pub fn try_elevate_degree(&mut self, axis: usize) -> Result<()> {
        check_axis(axis, P)?;
        let (mut numerator, mut denominator) = self.homogeneous();
        numerator.try_elevate_degree(axis)?;
        denominator.try_elevate_degree(axis)?;
        *self = Self::try_from_homogeneous(numerator, denominator)?;
        Ok(())
    }

    /// Reduce the homogeneous form; both the weighted points and the weights must stay within `tolerance`
    pub fn try_reduce_degree(&mut self, axis: usize, tolerance: T) -> Result<bool> {
        check_axis(axis, P)?;
        let (mut numerator, mut denominator) = self.homogeneous();
        if !numerator.try_reduce_degree(axis, tolerance)?
            || !denominator.try_reduce_degree(axis, tolerance)?
        {
            return Ok(false);
        }
        *self = Self::try_from_homogeneous(numerator, denominator)?;
        Ok(true)
    }

    /// Derivative along `axis` by the quotient rule `(A' w - A w') / w^2`
    pub fn differentiate(&self, axis: usize) -> Result<Self> {
        let (numerator, denominator) = self.homogeneous();
        let d_numerator = numerator.differentiate(axis)?;
        let d_denominator = denominator.differentiate(axis)?;
        let lhs = d_numerator.scale_by(&denominator);
        let rhs = numerator
            .scale_by(&d_denominator)
            .map_control_points(|p| -p);
        Self::try_from_homogeneous(lhs.sum(&rhs), denominator.scale_by(&denominator))
    }

    pub fn scale_by(&self, field: &RationalBezier<T, P, 1>) -> Result<Self> {
        let (a, w) = self.homogeneous();
        let (b, v) = field.homogeneous();
        Self::try_from_homogeneous(a.scale_by(&b), w.scale_by(&v))
    }

    pub fn dot(&self, other: &Self) -> Result<RationalBezier<T, P, 1>> {
        let (a, w) = self.homogeneous();
        let (b, v) = other.homogeneous();
        RationalBezier::try_from_homogeneous(a.dot(&b), w.scale_by(&v))
    }

    /// Pointwise sum `(A v + B w) / (w v)`
    pub fn sum(&self, other: &Self) -> Result<Self> {
        let (a, w) = self.homogeneous();
        let (b, v) = other.homogeneous();
        Self::try_from_homogeneous(a.scale_by(&v).sum(&b.scale_by(&w)), w.scale_by(&v))
    }
}

impl<T: FloatingPoint, const P: usize, const D: usize> Split for RationalBezier<T, P, D> {
    type Parameter = T;

    fn try_split(&self, axis: usize, t: T) -> Result<(Self, Self)> {
        check_axis(axis, P)?;
        if !(t > T::zero() && t < T::one()) {
            return Err(SplineError::InvalidParameter(format!(
                "split location {t} must lie strictly inside (0, 1)"
            )));
        }
        let (numerator, denominator) = self.homogeneous();
        let shape = self.bezier.shape();
        let ((left, _), (right, _)) = split_tensor(numerator.control_points(), &shape, axis, t);
        let ((left_w, _), (right_w, _)) =
            split_tensor(denominator.control_points(), &shape, axis, t);
        let degrees = *self.degrees();
        Ok((
            Self::try_from_homogeneous(
                Bezier::new_unchecked(degrees, left),
                Bezier::new_unchecked(degrees, left_w),
            )?,
            Self::try_from_homogeneous(
                Bezier::new_unchecked(degrees, right),
                Bezier::new_unchecked(degrees, right_w),
            )?,
        ))
    }
}

impl<const P: usize, const D: usize> RationalBezier<f64, P, D> {
    pub fn try_from_buffers(buffers: &SplineBuffers<'_>) -> Result<Self> {
        buffers.expect_layout(SplineFamily::RationalBezier)?;
        Self::try_new(
            to_degrees(buffers.degrees)?,
            to_points(buffers.control_points)?,
            buffers.weights.unwrap_or_default().to_vec(),
        )
    }

    pub(crate) fn into_shared(self) -> SharedSpline {
        Arc::new(self)
    }
}

impl<const P: usize, const D: usize> Spline for RationalBezier<f64, P, D> {
    fn family(&self) -> SplineFamily {
        SplineFamily::RationalBezier
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
            family: SplineFamily::RationalBezier,
            para_dim: P,
            dim: D,
            degrees: self.degrees().to_vec(),
            knot_vectors: None,
            control_points: flatten_points(self.control_points()),
            weights: Some(self.weights.clone()),
        }
    }

    fn parametric_bounds(&self) -> Vec<f64> {
        [0.; P].into_iter().chain([1.; P]).collect()
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
        log::debug!("rational Bezier degree reduction along axis {axis}: {reduced}");
        Ok(reduced)
    }

    fn multiply(&self, other: &dyn Spline) -> Result<SharedSpline> {
        match check_multipliable(self, other)? {
            ProductKind::Scalar => {
                let field =
                    downcast::<RationalBezier<f64, P, 1>>(other, "a rational Bezier scalar field")?;
                Ok(self.scale_by(field)?.into_shared())
            }
            ProductKind::Dot => {
                let other = downcast::<Self>(other, "a rational Bezier of equal dimensions")?;
                Ok(self.dot(other)?.into_shared())
            }
        }
    }

    fn add(&self, other: &dyn Spline) -> Result<SharedSpline> {
        check_addable(self, other)?;
        let other = downcast::<Self>(other, "a rational Bezier of equal dimensions")?;
        Ok(self.sum(other)?.into_shared())
    }

    fn compose(&self, inner: &dyn Spline) -> Result<SharedSpline> {
        let (numerator, denominator) = self.homogeneous();
        super::composition::compose_dyn(self, &numerator, Some(&denominator), inner)
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
