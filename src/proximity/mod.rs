pub mod proximity_cache;
pub mod proximity_newton;
pub mod proximity_options;
pub mod proximity_problem;
pub mod proximity_query;

pub use proximity_cache::*;
pub use proximity_newton::*;
pub use proximity_options::*;
pub use proximity_problem::*;
pub use proximity_query::*;
