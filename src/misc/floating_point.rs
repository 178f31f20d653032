use nalgebra::RealField;
use num_traits::ToPrimitive;
use simba::scalar::SupersetOf;

/// Trait for floating point types (f32, f64)
/// Mainly used to identify the type of the field in nalgebra
pub trait FloatingPoint: RealField + ToPrimitive + Copy {}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}

/// Convert an index or a count into the scalar field
pub fn cast_usize<T: FloatingPoint>(value: usize) -> T {
    <T as SupersetOf<f64>>::from_subset(&(value as f64))
}
