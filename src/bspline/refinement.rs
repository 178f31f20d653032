//! Knot-based refinement shared by the polynomial and the rational knotted kernels.
//!
//! Algorithms are written once against [`KnotRefinement`]. `BSpline` implements it directly and
//! `Nurbs` through its homogeneous form, so weighted points and weights always share one knot structure.

use std::ops::Range;

use nalgebra::SVector;

use crate::error::{Result, SplineError};
use crate::knot::KnotVector;
use crate::misc::{cast_usize, FloatingPoint};

/// Per-axis knot operations a knotted kernel provides to the refinement algorithms
pub trait KnotRefinement: Clone {
    type Scalar: FloatingPoint;

    fn degree(&self, axis: usize) -> usize;

    fn knots(&self, axis: usize) -> &KnotVector<Self::Scalar>;

    /// Insert one copy of `u`; `u` lies in the domain and its multiplicity stays within `degree + 1`
    fn insert_knot_unchecked(&mut self, axis: usize, u: Self::Scalar);

    /// Remove one copy of `u`, returning `false` with the spline untouched when not possible within `tolerance`
    fn remove_knot_within(&mut self, axis: usize, u: Self::Scalar, tolerance: Self::Scalar) -> bool;

    /// Keep the control points in `range` along `axis` and the knots spanning them
    fn restrict(&mut self, axis: usize, range: Range<usize>);

    /// Elevate every Bezier segment of an axis in Bezier form
    fn elevate_segments(&mut self, axis: usize, layout: &BezierLayout<Self::Scalar>);

    /// Reduce every Bezier segment of an axis in Bezier form, or leave the spline untouched
    fn reduce_segments(
        &mut self,
        axis: usize,
        layout: &BezierLayout<Self::Scalar>,
        tolerance: Self::Scalar,
    ) -> bool;

    /// Tolerance for removing knots that are known to be removable
    fn round_off(&self) -> Self::Scalar;

    fn number_of_points(&self, axis: usize) -> usize {
        self.knots(axis).len() - self.degree(axis) - 1
    }
}

/// Structure of an axis whose interior knots all have multiplicity `degree` or `degree + 1`
#[derive(Clone, Debug, PartialEq)]
pub struct BezierLayout<T> {
    /// Segment boundaries, domain ends included
    pub breaks: Vec<T>,
    /// Whether the segments meeting at each interior break share their end point
    pub shared: Vec<bool>,
    /// Multiplicity of each interior break before the conversion
    pub original: Vec<usize>,
}

impl<T: FloatingPoint> BezierLayout<T> {
    /// Index of the first control point of each segment
    pub fn starts(&self, degree: usize) -> Vec<usize> {
        let mut start = 0;
        let mut starts = vec![0];
        for shared in self.shared.iter() {
            start += if *shared { degree } else { degree + 1 };
            starts.push(start);
        }
        starts
    }

    /// Knot vector of the layout for segments of `degree`
    pub fn knots(&self, degree: usize) -> KnotVector<T> {
        let last = self.breaks.len() - 1;
        let mut knots = vec![self.breaks[0]; degree + 1];
        for (u, shared) in self.breaks[1..last].iter().zip(self.shared.iter()) {
            let copies = if *shared { degree } else { degree + 1 };
            knots.extend(std::iter::repeat_n(*u, copies));
        }
        knots.extend(std::iter::repeat_n(self.breaks[last], degree + 1));
        KnotVector::new(knots)
    }

    pub fn segments<'a, V>(&self, points: &'a [V], degree: usize) -> Vec<&'a [V]> {
        self.starts(degree)
            .into_iter()
            .map(|start| &points[start..=start + degree])
            .collect()
    }

    pub fn join<V: Clone>(&self, segments: Vec<Vec<V>>) -> Vec<V> {
        let mut joined: Vec<V> = vec![];
        for (i, segment) in segments.into_iter().enumerate() {
            if i > 0 && self.shared[i - 1] {
                joined.extend(segment.into_iter().skip(1));
            } else {
                joined.extend(segment);
            }
        }
        joined
    }
}

/// Boehm insertion of `u` into one line of control points, `span` being the last knot index not above `u`
pub fn insert_knot_fiber<T: FloatingPoint, const D: usize>(
    knots: &KnotVector<T>,
    degree: usize,
    span: usize,
    multiplicity: usize,
    u: T,
    points: &[SVector<T, D>],
) -> Vec<SVector<T, D>> {
    let (p, k, s) = (degree, span, multiplicity);
    (0..=points.len())
        .map(|i| {
            if i + p <= k {
                points[i]
            } else if i + s > k {
                points[i - 1]
            } else {
                let alpha = (u - knots[i]) / (knots[i + p] - knots[i]);
                points[i] * alpha + points[i - 1] * (T::one() - alpha)
            }
        })
        .collect()
}

/// Remove one copy of the knot at index `r` (its last occurrence, multiplicity `s`) from one line of control points.
/// Solves from both ends towards the middle and accepts when the two solutions meet within `tolerance`.
pub fn remove_knot_fiber<T: FloatingPoint, const D: usize>(
    knots: &KnotVector<T>,
    degree: usize,
    r: usize,
    s: usize,
    points: &[SVector<T, D>],
    tolerance: T,
) -> Option<Vec<SVector<T, D>>> {
    let p = degree;
    let u = knots[r];
    let first = r - p;
    if s > p {
        // the net is broken at `u`; one copy goes when both sides meet
        if !((points[first] - points[first - 1]).norm() <= tolerance) {
            return None;
        }
        let mut removed = points.to_vec();
        removed.remove(first);
        return Some(removed);
    }
    let last = r - s;
    let alpha = |i: usize| (u - knots[i]) / (knots[i + p + 1] - knots[i]);

    // slot `idx - (first - 1)` holds the new point `Q_idx`
    let width = last - first + 2;
    let mut left = vec![SVector::<T, D>::zeros(); width];
    let mut right = vec![SVector::<T, D>::zeros(); width];
    left[0] = points[first - 1];
    right[width - 1] = points[last + 1];

    let (mut i, mut j) = (first, last);
    while j > i {
        let ai = alpha(i);
        left[i - first + 1] = (points[i] - left[i - first] * (T::one() - ai)) / ai;
        let aj = alpha(j);
        right[j - first] = (points[j] - right[j - first + 1] * aj) / (T::one() - aj);
        i += 1;
        j -= 1;
    }

    let deviation = if j < i {
        (left[i - first] - right[j - first + 1]).norm()
    } else {
        let ai = alpha(i);
        (points[i] - (right[i - first + 1] * ai + left[i - first] * (T::one() - ai))).norm()
    };
    if !(deviation <= tolerance) {
        return None;
    }

    let mut removed = points[..first].to_vec();
    removed.extend((first..last).map(|q| {
        if q < i {
            left[q - first + 1]
        } else {
            right[q - first + 1]
        }
    }));
    removed.extend_from_slice(&points[last + 1..]);
    Some(removed)
}

/// Control points of the derivative along one line, `p (P_{i+1} - P_i) / (U_{i+p+1} - U_{i+1})`
pub fn differentiate_fiber<T: FloatingPoint, const D: usize>(
    knots: &KnotVector<T>,
    degree: usize,
    points: &[SVector<T, D>],
) -> Vec<SVector<T, D>> {
    let pf: T = cast_usize(degree);
    points
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let span = knots[i + degree + 1] - knots[i + 1];
            if span > T::zero() {
                (w[1] - w[0]) * (pf / span)
            } else {
                SVector::zeros()
            }
        })
        .collect()
}

/// Insert `u` along `axis` after checking the domain and the multiplicity limit
pub fn insert_knot<S: KnotRefinement>(spline: &mut S, axis: usize, u: S::Scalar) -> Result<()> {
    let degree = spline.degree(axis);
    let (lo, hi) = spline.knots(axis).domain(degree);
    if !(u >= lo && u <= hi) {
        return Err(SplineError::InvalidParameter(format!(
            "knot {u} lies outside the parametric bounds [{lo}, {hi}]"
        )));
    }
    if spline.knots(axis).multiplicity_of(u) > degree {
        return Err(SplineError::InvalidParameter(format!(
            "knot {u} already has the maximal multiplicity {}",
            degree + 1
        )));
    }
    spline.insert_knot_unchecked(axis, u);
    Ok(())
}

fn raise_multiplicity<S: KnotRefinement>(spline: &mut S, axis: usize, u: S::Scalar, target: usize) {
    let current = spline.knots(axis).multiplicity_of(u);
    for _ in current..target {
        spline.insert_knot_unchecked(axis, u);
    }
}

/// Make both ends of `axis` interpolating by raising their multiplicity to `degree + 1`
pub fn clamp<S: KnotRefinement>(spline: &mut S, axis: usize) {
    let degree = spline.degree(axis);
    if spline.knots(axis).is_clamped(degree) {
        return;
    }

    let (lo, hi) = spline.knots(axis).domain(degree);
    raise_multiplicity(spline, axis, lo, degree + 1);
    let first = spline.knots(axis).iter().position(|k| *k == lo).unwrap_or(0);
    if first > 0 {
        let n = spline.number_of_points(axis);
        spline.restrict(axis, first..n);
    }

    raise_multiplicity(spline, axis, hi, degree + 1);
    let knots = spline.knots(axis);
    let last = knots.iter().rposition(|k| *k == hi).unwrap_or(knots.len() - 1);
    if last + 1 < knots.len() {
        spline.restrict(axis, 0..last - degree);
    }
}

/// Clamp `axis` and raise every interior knot to multiplicity `degree`, one Bezier segment per knot span
pub fn to_bezier_form<S: KnotRefinement>(spline: &mut S, axis: usize) -> BezierLayout<S::Scalar> {
    clamp(spline, axis);
    let degree = spline.degree(axis);
    let interior = spline.knots(axis).interior_multiplicity(degree);
    let original: Vec<usize> = interior.iter().map(|m| m.multiplicity()).collect();
    for m in interior.iter() {
        raise_multiplicity(spline, axis, m.knot(), degree.max(1));
    }

    let (lo, hi) = spline.knots(axis).domain(degree);
    let mut breaks = vec![lo];
    breaks.extend(interior.iter().map(|m| m.knot()));
    breaks.push(hi);
    let shared = interior
        .iter()
        .map(|m| degree > 0 && spline.knots(axis).multiplicity_of(m.knot()) == degree)
        .collect();
    BezierLayout {
        breaks,
        shared,
        original,
    }
}

/// Remove copies of the interior breaks down to `target(original multiplicity)`.
/// Returns `false` at the first removal that exceeds `tolerance`.
fn remove_to_multiplicity<S: KnotRefinement>(
    spline: &mut S,
    axis: usize,
    layout: &BezierLayout<S::Scalar>,
    target: impl Fn(usize) -> usize,
    tolerance: S::Scalar,
) -> bool {
    for (u, m) in layout.breaks[1..layout.breaks.len() - 1]
        .iter()
        .zip(layout.original.iter())
    {
        let goal = target(*m);
        while spline.knots(axis).multiplicity_of(*u) > goal {
            if !spline.remove_knot_within(axis, *u, tolerance) {
                log::debug!(
                    "knot {u} can not be removed below multiplicity {}",
                    spline.knots(axis).multiplicity_of(*u)
                );
                return false;
            }
        }
    }
    true
}

/// Raise the degree along `axis` by one, keeping the continuity at every interior knot
pub fn elevate_degree<S: KnotRefinement>(spline: &mut S, axis: usize) {
    let layout = to_bezier_form(spline, axis);
    spline.elevate_segments(axis, &layout);
    let tolerance = spline.round_off();
    // the exact elevation has multiplicity m + 1 at a knot of multiplicity m
    remove_to_multiplicity(spline, axis, &layout, |m| m + 1, tolerance);
}

/// Lower the degree along `axis` by one; `false` leaves the spline untouched
pub fn reduce_degree<S: KnotRefinement>(spline: &mut S, axis: usize, tolerance: S::Scalar) -> bool {
    if spline.degree(axis) == 0 {
        return false;
    }
    let mut work = spline.clone();
    let layout = to_bezier_form(&mut work, axis);
    if layout.shared.iter().any(|shared| !shared) {
        return false;
    }
    if !work.reduce_segments(axis, &layout, tolerance) {
        return false;
    }
    if !remove_to_multiplicity(&mut work, axis, &layout, |m| m.saturating_sub(1), tolerance) {
        return false;
    }
    *spline = work;
    true
}

/// Split at `t` strictly inside the bounds; both pieces keep the global parameters
pub fn split<S: KnotRefinement>(spline: &S, axis: usize, t: S::Scalar) -> Result<(S, S)> {
    let degree = spline.degree(axis);
    let (lo, hi) = spline.knots(axis).domain(degree);
    if !(t > lo && t < hi) {
        return Err(SplineError::InvalidParameter(format!(
            "split location {t} must lie strictly inside ({lo}, {hi})"
        )));
    }
    let mut work = spline.clone();
    raise_multiplicity(&mut work, axis, t, degree + 1);
    let k = work.knots(axis).iter().position(|k| *k == t).unwrap_or(0);
    let n = work.number_of_points(axis);
    let mut left = work.clone();
    left.restrict(axis, 0..k);
    work.restrict(axis, k..n);
    Ok((left, work))
}

/// Insert knots into both splines until their knot vectors along `axis` agree
pub fn unify_knots<S: KnotRefinement>(lhs: &mut S, rhs: &mut S, axis: usize) {
    let degree = lhs.degree(axis);
    let interior = |s: &S| s.knots(axis).interior_multiplicity(degree);
    let mut targets = interior(&*lhs);
    for m in interior(&*rhs) {
        match targets.iter_mut().find(|t| t.knot() == m.knot()) {
            Some(t) if t.multiplicity() < m.multiplicity() => *t = m,
            Some(_) => {}
            None => targets.push(m),
        }
    }
    for target in targets {
        raise_multiplicity(lhs, axis, target.knot(), target.multiplicity());
        raise_multiplicity(rhs, axis, target.knot(), target.multiplicity());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector1;

    use super::*;

    #[test]
    fn layout_knots_and_segments() {
        let layout = BezierLayout {
            breaks: vec![0., 0.5, 1.],
            shared: vec![true],
            original: vec![1],
        };
        assert_eq!(
            layout.knots(2).to_vec(),
            vec![0., 0., 0., 0.5, 0.5, 1., 1., 1.]
        );
        let points: Vec<usize> = (0..5).collect();
        let segments = layout.segments(&points, 2);
        assert_eq!(segments, vec![&[0, 1, 2][..], &[2, 3, 4][..]]);
        let joined = layout.join(segments.iter().map(|s| s.to_vec()).collect());
        assert_eq!(joined, points);
    }

    #[test]
    fn insertion_then_removal() {
        let knots = KnotVector::new(vec![0., 0., 0., 1., 1., 1.]);
        let points = vec![Vector1::new(0.), Vector1::new(2.), Vector1::new(1.)];
        let inserted = insert_knot_fiber(&knots, 2, 2, 0, 0.5, &points);
        assert_eq!(inserted.len(), 4);
        assert_relative_eq!(inserted[1].x, 1.);
        assert_relative_eq!(inserted[2].x, 1.5);

        let refined = KnotVector::new(vec![0., 0., 0., 0.5, 1., 1., 1.]);
        let removed = remove_knot_fiber(&refined, 2, 3, 1, &inserted, 1e-12).unwrap();
        for (a, b) in removed.iter().zip(points.iter()) {
            assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
        }

        // a kink at 0.5 can not be removed
        let kinked = vec![
            Vector1::new(0.),
            Vector1::new(1.),
            Vector1::new(0.),
            Vector1::new(1.),
        ];
        assert!(remove_knot_fiber(&refined, 2, 3, 1, &kinked, 1e-6).is_none());
    }

    #[test]
    fn removal_at_full_multiplicity() {
        let knots = KnotVector::new(vec![0., 0., 0.5, 0.5, 1., 1.]);
        let joined = vec![
            Vector1::new(0.),
            Vector1::new(1.),
            Vector1::new(1.),
            Vector1::new(2.),
        ];
        let removed = remove_knot_fiber(&knots, 1, 3, 2, &joined, 1e-9).unwrap();
        assert_eq!(removed, vec![Vector1::new(0.), Vector1::new(1.), Vector1::new(2.)]);

        let broken = vec![
            Vector1::new(0.),
            Vector1::new(1.),
            Vector1::new(3.),
            Vector1::new(2.),
        ];
        assert!(remove_knot_fiber(&knots, 1, 3, 2, &broken, 1e-9).is_none());
    }

    #[test]
    fn derivative_fiber() {
        let knots = KnotVector::new(vec![0., 0., 0., 1., 1., 1.]);
        let points = vec![Vector1::new(0.), Vector1::new(2.), Vector1::new(1.)];
        let derivative = differentiate_fiber(&knots, 2, &points);
        assert_relative_eq!(derivative[0].x, 4.);
        assert_relative_eq!(derivative[1].x, -2.);
    }
}
