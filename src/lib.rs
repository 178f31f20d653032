#![allow(clippy::needless_range_loop)]

mod bezier;
mod bspline;
mod decompose;
mod error;
mod knot;
mod misc;
mod proximity;
mod spline;
mod split;

pub mod prelude {
    pub use crate::bezier::*;
    pub use crate::bspline::*;
    pub use crate::decompose::*;
    pub use crate::error::SplineError;
    pub use crate::knot::*;
    pub use crate::misc::FloatingPoint;
    pub use crate::proximity::*;
    pub use crate::spline::*;
    pub use crate::split::*;
}
