pub mod binomial;
pub mod floating_point;
pub mod tensor;

pub use binomial::*;
pub use floating_point::*;
pub use tensor::*;
