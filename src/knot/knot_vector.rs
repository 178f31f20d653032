use std::ops::Index;

use itertools::Itertools;
use nalgebra::RealField;

use crate::error::{Result, SplineError};
use crate::misc::cast_usize;
use crate::prelude::{FloatingPoint, KnotMultiplicity};

/// Knot vector representation
#[derive(Clone, Debug, PartialEq)]
pub struct KnotVector<T>(Vec<T>);

impl<T: RealField + Copy> KnotVector<T> {
    pub fn new(knots: Vec<T>) -> Self {
        Self(knots)
    }

    /// Create a knot vector after checking that the knots are finite and non-decreasing
    /// # Example
    /// ```
    /// use splinekit::prelude::KnotVector;
    /// assert!(KnotVector::try_new(vec![0., 0., 0.5, 1., 1.]).is_ok());
    /// assert!(KnotVector::try_new(vec![0., 1., 0.5]).is_err());
    /// ```
    pub fn try_new(knots: Vec<T>) -> Result<Self> {
        if knots.iter().any(|k| !k.is_finite()) {
            return Err(SplineError::non_finite("knot vector"));
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(SplineError::Construction(
                "knot vector must be non-decreasing".to_string(),
            ));
        }
        Ok(Self(knots))
    }

    /// Knot vector of a single Bezier segment on [0, 1]
    /// # Example
    /// ```
    /// use splinekit::prelude::KnotVector;
    /// let knots: KnotVector<f64> = KnotVector::bezier(2);
    /// assert_eq!(knots.to_vec(), vec![0., 0., 0., 1., 1., 1.]);
    /// ```
    pub fn bezier(degree: usize) -> Self {
        let mut knots = vec![T::zero(); degree + 1];
        knots.extend(std::iter::repeat_n(T::one(), degree + 1));
        Self(knots)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.clone()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Get the domain of the knot vector by degree
    pub fn domain(&self, degree: usize) -> (T, T) {
        (self.0[degree], self.0[self.0.len() - 1 - degree])
    }

    /// Returns the index of the last knot less than or equal to knot
    pub fn floor(&self, knot: T) -> Option<usize> {
        self.iter().rposition(|t| *t <= knot)
    }

    /// Add a knot and return the index of added knot
    pub fn add(&mut self, knot: T) -> usize {
        match self.floor(knot) {
            Some(idx) => {
                self.0.insert(idx + 1, knot);
                idx + 1
            }
            None => {
                self.0.insert(0, knot);
                0
            }
        }
    }

    /// Remove the knot at `index`
    pub fn remove(&mut self, index: usize) -> T {
        self.0.remove(index)
    }

    /// Keep the knots in `range`
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self(self.0[range].to_vec())
    }

    /// Number of knots equal to `knot`
    pub fn multiplicity_of(&self, knot: T) -> usize {
        self.iter().filter(|k| **k == knot).count()
    }

    /// Get the multiplicity of each distinct knot value
    /// # Example
    /// ```
    /// use splinekit::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// let knot_multiplicity = knots.multiplicity();
    /// assert_eq!(knot_multiplicity[0].multiplicity(), 3);
    /// assert_eq!(knot_multiplicity[1].multiplicity(), 1);
    /// assert_eq!(knot_multiplicity[2].multiplicity(), 1);
    /// assert_eq!(knot_multiplicity[3].multiplicity(), 3);
    /// ```
    pub fn multiplicity(&self) -> Vec<KnotMultiplicity<T>> {
        self.0
            .iter()
            .dedup_with_count()
            .map(|(count, knot)| KnotMultiplicity::new(*knot, count))
            .collect()
    }

    /// Distinct knot values lying strictly inside the domain, with their multiplicities
    pub fn interior_multiplicity(&self, degree: usize) -> Vec<KnotMultiplicity<T>> {
        let (start, end) = self.domain(degree);
        self.multiplicity()
            .into_iter()
            .filter(|m| m.knot() > start && m.knot() < end)
            .collect()
    }

    /// Check if the knot vector is clamped
    /// `clamped` means the first and last knots have a multiplicity greater than the degree
    /// e.g. [0, 0, 0, 1, 2, 3, 3, 3] with degree 2 is clamped
    pub fn is_clamped(&self, degree: usize) -> bool {
        let multiplicity = self.multiplicity();
        match (multiplicity.first(), multiplicity.last()) {
            (Some(start), Some(end)) => start.is_full(degree) && end.is_full(degree),
            _ => false,
        }
    }

    /// Find the knot span index by binary search
    ///
    /// # Example
    /// ```
    /// use splinekit::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// let idx = knots.find_knot_span_index(4, 2, 2.5);
    /// assert_eq!(idx, 4);
    /// ```
    pub fn find_knot_span_index(&self, n: usize, degree: usize, u: T) -> usize {
        if u >= self[n + 1] {
            return n;
        }

        if u <= self[degree] {
            return degree;
        }

        // binary search
        let mut low = degree;
        let mut high = n + 1;
        let mut mid = (low + high) / 2;
        while u < self[mid] || self[mid + 1] <= u {
            if u < self[mid] {
                high = mid;
            } else {
                low = mid;
            }
            let next = (low + high) / 2;
            if mid == next {
                break;
            }
            mid = next;
        }

        mid
    }

    /// Compute the non-vanishing basis functions
    pub fn basis_functions(&self, knot_span_index: usize, u: T, degree: usize) -> Vec<T> {
        let mut basis_functions = vec![T::zero(); degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        basis_functions[0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[knot_span_index + 1 - j];
            right[j] = self[knot_span_index + j] - u;
            let mut saved = T::zero();

            for r in 0..j {
                let temp = basis_functions[r] / (right[r + 1] + left[j - r]);
                basis_functions[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }

            basis_functions[j] = saved;
        }

        basis_functions
    }

    /// Compute the non-vanishing basis functions and their derivatives
    /// 2d array of basis and derivative values of size (derivs+1, p+1).
    /// The kth row is the kth derivative and the first row is made up of the basis function values.
    /// Rows above the degree are zero.
    pub fn derivative_basis_functions(
        &self,
        knot_index: usize,
        u: T,
        degree: usize,
        derivs: usize,
    ) -> Vec<Vec<T>>
    where
        T: FloatingPoint,
    {
        let mut ndu = vec![vec![T::zero(); degree + 1]; degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        ndu[0][0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[knot_index + 1 - j];
            right[j] = self[knot_index + j] - u;

            let mut saved = T::zero();
            for r in 0..j {
                // lower triangle
                ndu[j][r] = right[r + 1] + left[j - r];
                let temp = ndu[r][j - 1] / ndu[j][r];

                // upper triangle
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }

        let mut ders = vec![vec![T::zero(); degree + 1]; derivs + 1];
        let mut a = vec![vec![T::zero(); degree + 1]; 2];

        // load the basis functions
        for j in 0..=degree {
            ders[0][j] = ndu[j][degree];
        }

        let idegree = degree as isize;
        let n = derivs.min(degree) as isize;

        // compute the derivatives
        for r in 0..=idegree {
            // alternate rows in array a
            let mut s1 = 0;
            let mut s2 = 1;
            a[0][0] = T::one();

            // loop to compute the kth derivative
            for k in 1..=n {
                let mut d = T::zero();
                let rk = r - k;
                let pk = idegree - k;

                if r >= k {
                    a[s2][0] = a[s1][0] / ndu[(pk + 1) as usize][rk as usize];
                    d = a[s2][0] * ndu[rk as usize][pk as usize];
                }

                let j1 = if rk >= -1 { 1 } else { -rk };
                let j2 = if r - 1 <= pk { k - 1 } else { idegree - r };

                for j in j1..=j2 {
                    a[s2][j as usize] = (a[s1][j as usize] - a[s1][j as usize - 1])
                        / ndu[(pk + 1) as usize][(rk + j) as usize];
                    d += a[s2][j as usize] * ndu[(rk + j) as usize][pk as usize];
                }

                let uk = k as usize;
                let ur = r as usize;
                if r <= pk {
                    a[s2][uk] = -a[s1][(k - 1) as usize] / ndu[(pk + 1) as usize][ur];
                    d += a[s2][uk] * ndu[ur][pk as usize];
                }

                ders[uk][ur] = d;

                // switch rows
                std::mem::swap(&mut s1, &mut s2);
            }
        }

        let mut acc = degree;
        for k in 1..=(n as usize) {
            let factor: T = cast_usize(acc);
            for value in ders[k].iter_mut() {
                *value *= factor;
            }
            acc *= degree - k;
        }
        ders
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::KnotVector;

    #[test]
    fn span_lookup_respects_domain() {
        let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
        // five control points, n = 4
        assert_eq!(knots.find_knot_span_index(4, 2, 0.), 2);
        assert_eq!(knots.find_knot_span_index(4, 2, 0.5), 2);
        assert_eq!(knots.find_knot_span_index(4, 2, 1.), 3);
        assert_eq!(knots.find_knot_span_index(4, 2, 3.), 4);
    }

    #[test]
    fn bernstein_basis() {
        let knots = KnotVector::<f64>::bezier(3);
        let ders = knots.derivative_basis_functions(3, 0.5, 3, 1);
        let expected = [0.125, 0.375, 0.375, 0.125];
        for (value, expected) in ders[0].iter().zip(expected) {
            assert_relative_eq!(*value, expected, epsilon = 1e-12);
        }
        // derivatives sum to zero
        assert_relative_eq!(ders[1].iter().sum::<f64>(), 0., epsilon = 1e-12);
        assert_relative_eq!(ders[1][0], -0.75, epsilon = 1e-12);
    }

    #[test]
    fn derivatives_above_degree_vanish() {
        let knots = KnotVector::<f64>::bezier(1);
        let ders = knots.derivative_basis_functions(1, 0.3, 1, 3);
        assert_eq!(ders.len(), 4);
        assert_relative_eq!(ders[1][0], -1.);
        assert_relative_eq!(ders[1][1], 1.);
        assert!(ders[2].iter().chain(ders[3].iter()).all(|v| *v == 0.));
    }

    #[test]
    fn basis_matches_derivative_row() {
        let knots = KnotVector::new(vec![0., 0., 0., 0.4, 1., 1., 1.]);
        let span = knots.find_knot_span_index(3, 2, 0.7);
        let basis = knots.basis_functions(span, 0.7, 2);
        let ders = knots.derivative_basis_functions(span, 0.7, 2, 2);
        for (a, b) in basis.iter().zip(ders[0].iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        assert_relative_eq!(basis.iter().sum::<f64>(), 1., epsilon = 1e-12);
    }

    #[test]
    fn insertion_and_multiplicity() {
        let mut knots = KnotVector::new(vec![0., 0., 1., 1.]);
        assert!(knots.is_clamped(1));
        assert_eq!(knots.add(0.5), 2);
        assert_eq!(knots.add(0.5), 3);
        assert_eq!(knots.multiplicity_of(0.5), 2);
        assert_eq!(knots.interior_multiplicity(1).len(), 1);
        assert_eq!(knots.remove(2), 0.5);
        assert_eq!(knots.to_vec(), vec![0., 0., 0.5, 1., 1.]);
    }
}
