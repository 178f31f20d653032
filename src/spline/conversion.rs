//! Conversions between the flat buffers of the dynamic interface and the fixed size kernel types.

use nalgebra::SVector;

use crate::error::{Result, SplineError};
use crate::knot::KnotVector;

/// Parametric coordinate of a `P` dimensional parameter space
pub fn to_param<const P: usize>(para_coord: &[f64]) -> Result<[f64; P]> {
    para_coord.try_into().map_err(|_| {
        SplineError::InvalidParameter(format!(
            "expected {P} parametric coordinates, got {}",
            para_coord.len()
        ))
    })
}

/// Derivative orders, one per parametric axis
pub fn to_orders<const P: usize>(orders: &[usize]) -> Result<[usize; P]> {
    orders.try_into().map_err(|_| {
        SplineError::InvalidParameter(format!(
            "expected {P} derivative orders, got {}",
            orders.len()
        ))
    })
}

/// Truncate floating point degrees to integers
pub fn to_degrees<const P: usize>(degrees: &[f64]) -> Result<[usize; P]> {
    if degrees.len() != P {
        return Err(SplineError::size_mismatch("degrees", P, degrees.len()));
    }
    if degrees.iter().any(|d| !d.is_finite() || *d < 0.) {
        return Err(SplineError::Construction(format!(
            "degrees must be finite and non-negative, got {degrees:?}"
        )));
    }
    Ok(std::array::from_fn(|axis| degrees[axis].trunc() as usize))
}

pub fn to_knot_vectors<const P: usize>(knot_vectors: &[Vec<f64>]) -> Result<[KnotVector<f64>; P]> {
    if knot_vectors.len() != P {
        return Err(SplineError::size_mismatch(
            "knot vectors",
            P,
            knot_vectors.len(),
        ));
    }
    let parsed = knot_vectors
        .iter()
        .map(|knots| KnotVector::try_new(knots.clone()))
        .collect::<Result<Vec<_>>>()?;
    parsed
        .try_into()
        .map_err(|_| SplineError::size_mismatch("knot vectors", P, knot_vectors.len()))
}

/// Split row-major coordinates into points of width `D`
pub fn to_points<const D: usize>(coordinates: &[f64]) -> Result<Vec<SVector<f64, D>>> {
    if D == 0 || coordinates.len() % D != 0 {
        return Err(SplineError::Construction(format!(
            "control point buffer of length {} is not a multiple of the physical dimension {D}",
            coordinates.len()
        )));
    }
    if coordinates.iter().any(|c| !c.is_finite()) {
        return Err(SplineError::non_finite("control point buffer"));
    }
    Ok(coordinates
        .chunks_exact(D)
        .map(SVector::<f64, D>::from_column_slice)
        .collect())
}

pub fn flatten_points<const D: usize>(points: &[SVector<f64, D>]) -> Vec<f64> {
    points.iter().flat_map(|p| p.iter().copied()).collect()
}

pub fn flatten_bounds<const P: usize>(bounds: &[(f64, f64); P]) -> Vec<f64> {
    bounds
        .iter()
        .map(|b| b.0)
        .chain(bounds.iter().map(|b| b.1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_are_truncated() {
        assert_eq!(to_degrees::<2>(&[2.7, 1.0]).unwrap(), [2, 1]);
        assert!(to_degrees::<2>(&[-1., 1.]).is_err());
        assert!(to_degrees::<2>(&[f64::NAN, 1.]).is_err());
        assert!(to_degrees::<1>(&[1., 1.]).is_err());
    }

    #[test]
    fn points_from_rows() {
        let points = to_points::<2>(&[0., 1., 2., 3.]).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].y, 3.);
        assert!(to_points::<2>(&[0., 1., 2.]).is_err());
        assert_eq!(flatten_points(&points), vec![0., 1., 2., 3.]);
    }

    #[test]
    fn coordinate_length_is_checked() {
        assert!(to_param::<2>(&[0.5]).is_err());
        assert_eq!(to_param::<2>(&[0.5, 0.25]).unwrap(), [0.5, 0.25]);
        assert_eq!(flatten_bounds(&[(0., 1.), (2., 3.)]), vec![0., 2., 1., 3.]);
    }
}
