pub mod b_spline;
pub mod nurbs;
pub mod refinement;

pub use b_spline::*;
pub use nurbs::*;

#[cfg(test)]
mod tests;
