use crate::error::Result;

/// Decompose a knotted spline into its Bezier patches
pub trait Decompose {
    type Output;

    fn try_decompose(&self) -> Result<Self::Output>;
}
