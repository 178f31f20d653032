/// A distinct knot value and the number of times it repeats in a knot vector
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KnotMultiplicity<T> {
    knot: T,
    multiplicity: usize,
}

impl<T: Copy> KnotMultiplicity<T> {
    pub fn new(knot: T, multiplicity: usize) -> Self {
        Self { knot, multiplicity }
    }

    pub fn knot(&self) -> T {
        self.knot
    }

    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }

    /// Whether the basis of `degree` is discontinuous at this knot
    pub fn is_full(&self, degree: usize) -> bool {
        self.multiplicity > degree
    }
}
