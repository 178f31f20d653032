use crate::error::Result;

/// Split a spline in two along one parametric axis
pub trait Split
where
    Self: Sized,
{
    type Parameter;

    fn try_split(&self, axis: usize, parameter: Self::Parameter) -> Result<(Self, Self)>;
}
