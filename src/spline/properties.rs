use super::{create_family, SharedSpline, SplineBuffers, SplineFamily};
use crate::error::Result;

/// Snapshot of the defining data of a spline in flat buffer layout
#[derive(Clone, Debug, PartialEq)]
pub struct SplineProperties {
    pub family: SplineFamily,
    pub para_dim: usize,
    pub dim: usize,
    pub degrees: Vec<usize>,
    /// One knot vector per parametric axis, knotted families only
    pub knot_vectors: Option<Vec<Vec<f64>>>,
    /// Row-major coordinates, `dim` values per control point
    pub control_points: Vec<f64>,
    /// One weight per control point, rational families only
    pub weights: Option<Vec<f64>>,
}

impl SplineProperties {
    pub fn number_of_control_points(&self) -> usize {
        self.control_points.len() / self.dim.max(1)
    }

    /// Degrees in the floating point layout taken by the factory
    pub fn degree_buffer(&self) -> Vec<f64> {
        self.degrees.iter().map(|d| *d as f64).collect()
    }

    /// Construct a new spline from the snapshot
    /// # Example
    /// ```
    /// use splinekit::prelude::*;
    /// let line = create_bezier(1, 2, &[1.], &[0., 0., 1., 2.]).unwrap();
    /// let copy = line.current_properties().rebuild().unwrap();
    /// assert_eq!(copy.evaluate(&[0.5]).unwrap(), vec![0.5, 1.]);
    /// ```
    pub fn rebuild(&self) -> Result<SharedSpline> {
        let degrees = self.degree_buffer();
        let buffers = SplineBuffers {
            degrees: &degrees,
            knot_vectors: self.knot_vectors.as_deref(),
            control_points: &self.control_points,
            weights: self.weights.as_deref(),
        };
        create_family(self.para_dim, self.dim, self.family, &buffers)
    }
}
