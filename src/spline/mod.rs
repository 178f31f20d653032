//! The capability interface shared by every concrete spline kernel.

pub mod compatibility;
pub mod conversion;
pub mod factory;
pub mod family;
pub mod properties;
pub mod rational;

pub use factory::*;
pub use family::*;
pub use properties::*;

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Result, SplineError};
use crate::proximity::{Proximity, ProximityCache, ProximityOptions};

/// Shared handle to a spline behind the capability interface
pub type SharedSpline = Arc<dyn Spline>;

/// Basis function values at a parametric point together with the control point ids they weigh
#[derive(Clone, Debug, PartialEq)]
pub struct BasisSupport {
    pub values: Vec<f64>,
    pub support: Vec<usize>,
}

/// Uniform query and algebra surface over the four spline families and every compiled dimension pair.
///
/// Parametric coordinates, derivative orders and axes are validated against [`Spline::para_dim`].
/// Operations a family does not offer fail with [`SplineError::UnsupportedOperation`].
pub trait Spline: Any + Send + Sync + Debug {
    fn family(&self) -> SplineFamily;

    fn para_dim(&self) -> usize;

    fn dim(&self) -> usize;

    fn name(&self) -> &'static str {
        self.family().name()
    }

    fn has_knot_vectors(&self) -> bool {
        self.family().has_knot_vectors()
    }

    fn is_rational(&self) -> bool {
        self.family().is_rational()
    }

    /// Human readable description used in error messages
    fn what_am_i(&self) -> String {
        format!(
            "{}, parametric dimension: {}, physical dimension: {}",
            self.name(),
            self.para_dim(),
            self.dim()
        )
    }

    fn degrees(&self) -> Vec<usize>;

    fn number_of_control_points(&self) -> usize;

    /// Number of basis functions that are non-zero at a parametric point
    fn number_of_supports(&self) -> usize {
        self.degrees().iter().map(|d| d + 1).product()
    }

    fn current_properties(&self) -> SplineProperties;

    /// Copy the defining data into caller owned buffers.
    /// Buffers a family does not use are left untouched.
    fn write_properties(
        &self,
        degrees: Option<&mut [f64]>,
        knot_vectors: Option<&mut [Vec<f64>]>,
        control_points: Option<&mut [f64]>,
        weights: Option<&mut [f64]>,
    ) -> Result<()> {
        let properties = self.current_properties();
        if let Some(out) = degrees {
            let values = properties.degree_buffer();
            copy_into(out, &values, "degree buffer")?;
        }
        if let (Some(out), Some(knots)) = (knot_vectors, properties.knot_vectors.as_ref()) {
            if out.len() != knots.len() {
                return Err(SplineError::InvalidParameter(format!(
                    "knot vector buffer: expected {} axes, got {}",
                    knots.len(),
                    out.len()
                )));
            }
            out.clone_from_slice(knots);
        }
        if let Some(out) = control_points {
            copy_into(out, &properties.control_points, "control point buffer")?;
        }
        if let (Some(out), Some(w)) = (weights, properties.weights.as_ref()) {
            copy_into(out, w, "weight buffer")?;
        }
        Ok(())
    }

    /// Lower bounds of every axis followed by the upper bounds
    fn parametric_bounds(&self) -> Vec<f64>;

    fn evaluate(&self, para_coord: &[f64]) -> Result<Vec<f64>>;

    fn derivative(&self, para_coord: &[f64], orders: &[usize]) -> Result<Vec<f64>>;

    fn basis_and_support(&self, para_coord: &[f64]) -> Result<BasisSupport>;

    fn elevate_degree(&mut self, axis: usize) -> Result<()>;

    /// Lower the degree along `axis`.
    /// Returns `false` and keeps the spline when the geometry can not be kept within `tolerance`.
    fn reduce_degree(&mut self, axis: usize, tolerance: f64) -> Result<bool>;

    fn insert_knot(&mut self, axis: usize, knot: f64) -> Result<()> {
        let _ = (axis, knot);
        Err(SplineError::unsupported("knot insertion", self.name()))
    }

    /// Remove one copy of `knot` along `axis`.
    /// Returns `false` and keeps the spline when the knot is absent or the removal exceeds `tolerance`.
    fn remove_knot(&mut self, axis: usize, knot: f64, tolerance: f64) -> Result<bool> {
        let _ = (axis, knot, tolerance);
        Err(SplineError::unsupported("knot removal", self.name()))
    }

    /// Pointwise product with a scalar field or, for equal physical dimensions, the dot product
    fn multiply(&self, other: &dyn Spline) -> Result<SharedSpline> {
        let _ = other;
        Err(SplineError::unsupported("multiplication", self.name()))
    }

    fn add(&self, other: &dyn Spline) -> Result<SharedSpline> {
        let _ = other;
        Err(SplineError::unsupported("addition", self.name()))
    }

    /// The spline `self ∘ inner`, mapping the parameters of `inner` through `self`
    fn compose(&self, inner: &dyn Spline) -> Result<SharedSpline> {
        let _ = inner;
        Err(SplineError::unsupported("composition", self.name()))
    }

    /// Split in two at `location` along `axis`
    fn split(&self, axis: usize, location: f64) -> Result<(SharedSpline, SharedSpline)>;

    fn derivative_spline(&self, orders: &[usize]) -> Result<SharedSpline> {
        let _ = orders;
        Err(SplineError::unsupported("derivative spline", self.name()))
    }

    /// Bezier patches covering the spline, parametric axis 0 running fastest
    fn extract_bezier_patches(&self) -> Result<Vec<SharedSpline>>;

    fn proximity_cache(&self) -> &ProximityCache;

    fn as_any(&self) -> &dyn Any;

    /// Copy into a new shared handle with an empty proximity cache
    fn clone_shared(&self) -> SharedSpline;
}

impl dyn Spline {
    /// Nearest point queries, sharing a sample grid built on first access
    /// # Example
    /// ```
    /// use splinekit::prelude::*;
    /// let line = create_bezier(1, 2, &[1.], &[0., 0., 2., 0.]).unwrap();
    /// let nearest = line.proximity().unwrap().nearest(&[0.5, 1.]).unwrap();
    /// assert!((nearest.parameter[0] - 0.25).abs() < 1e-8);
    /// ```
    pub fn proximity(&self) -> Result<Proximity<'_>> {
        self.proximity_with_options(ProximityOptions::default())
    }

    pub fn proximity_with_options(&self, options: ProximityOptions) -> Result<Proximity<'_>> {
        Proximity::try_new(self, options)
    }

    /// Checked downcast to a concrete kernel
    pub fn downcast_ref<S: Spline>(&self) -> Option<&S> {
        self.as_any().downcast_ref::<S>()
    }
}

/// Mutable access to a shared spline, cloning it first when the handle is not unique
pub fn make_mut(spline: &mut SharedSpline) -> &mut dyn Spline {
    if Arc::get_mut(spline).is_none() {
        *spline = spline.clone_shared();
    }
    match Arc::get_mut(spline) {
        Some(unique) => unique,
        None => unreachable!("freshly cloned spline is uniquely owned"),
    }
}

fn copy_into(out: &mut [f64], values: &[f64], context: &str) -> Result<()> {
    if out.len() != values.len() {
        return Err(SplineError::InvalidParameter(format!(
            "{context}: expected {} entries, got {}",
            values.len(),
            out.len()
        )));
    }
    out.copy_from_slice(values);
    Ok(())
}
