pub mod bezier_spline;
pub mod composition;
pub mod rational_bezier;

pub use bezier_spline::*;
pub use composition::*;
pub use rational_bezier::*;
