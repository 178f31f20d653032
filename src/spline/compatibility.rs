//! Ordered operand checks run before addition, multiplication and composition.

use super::Spline;
use crate::error::{Result, SplineError};

/// How a product combines the physical dimensions of its operands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductKind {
    /// The right operand is a scalar field, the result keeps the left dimension
    Scalar,
    /// Equal dimensions, the result is the pointwise dot product
    Dot,
}

fn describe(operation: &str, requirement: &str, lhs: &dyn Spline, rhs: &dyn Spline) -> String {
    format!(
        "{operation} requires {requirement}. (lhs: {} / rhs: {})",
        lhs.what_am_i(),
        rhs.what_am_i()
    )
}

fn check_family_and_para_dim(operation: &str, lhs: &dyn Spline, rhs: &dyn Spline) -> Result<()> {
    if lhs.family() != rhs.family() {
        return Err(SplineError::DimensionMismatch(describe(
            operation,
            "splines of the same type",
            lhs,
            rhs,
        )));
    }
    if lhs.para_dim() != rhs.para_dim() {
        return Err(SplineError::DimensionMismatch(describe(
            operation,
            "splines of the same parametric dimension",
            lhs,
            rhs,
        )));
    }
    Ok(())
}

pub fn check_addable(lhs: &dyn Spline, rhs: &dyn Spline) -> Result<()> {
    check_family_and_para_dim("Spline addition", lhs, rhs)?;
    if lhs.dim() != rhs.dim() {
        return Err(SplineError::DimensionMismatch(describe(
            "Spline addition",
            "splines of the same physical dimension",
            lhs,
            rhs,
        )));
    }
    Ok(())
}

pub fn check_multipliable(lhs: &dyn Spline, rhs: &dyn Spline) -> Result<ProductKind> {
    check_family_and_para_dim("Spline multiplication", lhs, rhs)?;
    if rhs.dim() == 1 {
        Ok(ProductKind::Scalar)
    } else if lhs.dim() == rhs.dim() {
        Ok(ProductKind::Dot)
    } else {
        Err(SplineError::DimensionMismatch(describe(
            "Spline multiplication",
            "a scalar field or splines of the same physical dimension",
            lhs,
            rhs,
        )))
    }
}

pub fn check_composable(outer: &dyn Spline, inner: &dyn Spline) -> Result<()> {
    if !inner.family().is_bezier_family() {
        return Err(SplineError::UnsupportedOperation(describe(
            "Spline composition",
            "a Bezier or rational Bezier inner function",
            outer,
            inner,
        )));
    }
    if inner.dim() != outer.para_dim() {
        return Err(SplineError::DimensionMismatch(describe(
            "Spline composition",
            "the physical dimension of the inner function to match the outer parametric dimension",
            outer,
            inner,
        )));
    }
    Ok(())
}

/// Downcast an operand that already passed the tag checks
pub fn downcast<'a, S: Spline>(spline: &'a dyn Spline, expected: &str) -> Result<&'a S> {
    spline.as_any().downcast_ref::<S>().ok_or_else(|| {
        SplineError::DimensionMismatch(format!(
            "expected {expected}, got {}",
            spline.what_am_i()
        ))
    })
}
