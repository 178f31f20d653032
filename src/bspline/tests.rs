use approx::assert_relative_eq;
use nalgebra::{Vector1, Vector2, Vector3};

use crate::{
    error::SplineError,
    prelude::{BSpline, Decompose, KnotVector, Nurbs, Split},
    spline::Spline,
};

fn wave() -> BSpline<f64, 1, 2> {
    BSpline::try_new(
        [2],
        [KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.])],
        vec![
            Vector2::new(0., 0.),
            Vector2::new(1., 2.),
            Vector2::new(2., -1.),
            Vector2::new(3., 2.),
            Vector2::new(4., 0.),
        ],
    )
    .unwrap()
}

fn sheet() -> BSpline<f64, 2, 3> {
    let mut points = vec![];
    for j in 0..3 {
        for i in 0..4 {
            let (x, y) = (i as f64, j as f64);
            points.push(Vector3::new(x, y, (x * 0.7).sin() * (y * 0.4).cos()));
        }
    }
    BSpline::try_new(
        [2, 1],
        [
            KnotVector::new(vec![0., 0., 0., 0.5, 1., 1., 1.]),
            KnotVector::new(vec![0., 0., 0.4, 1., 1.]),
        ],
        points,
    )
    .unwrap()
}

fn quarter_circle() -> Nurbs<f64, 1, 2> {
    let w = std::f64::consts::FRAC_1_SQRT_2;
    Nurbs::try_new(
        [2],
        [KnotVector::new(vec![0., 0., 0., 1., 1., 1.])],
        vec![Vector2::new(1., 0.), Vector2::new(1., 1.), Vector2::new(0., 1.)],
        vec![1., w, 1.],
    )
    .unwrap()
}

fn samples(lo: f64, hi: f64) -> Vec<f64> {
    (0..=10).map(|i| lo + (hi - lo) * i as f64 / 10.).collect()
}

#[test]
fn construction_validates_knots_and_points() {
    let points = vec![Vector1::new(0.); 3];
    // decreasing knots
    assert!(BSpline::<f64, 1, 1>::try_new(
        [1],
        [KnotVector::new(vec![0., 1., 0.5, 2., 2.])],
        points.clone()
    )
    .is_err());
    // wrong number of control points
    assert!(BSpline::<f64, 1, 1>::try_new(
        [1],
        [KnotVector::new(vec![0., 0., 1., 1.])],
        points.clone()
    )
    .is_err());
    // multiplicity above degree + 1
    assert!(BSpline::<f64, 1, 1>::try_new(
        [1],
        [KnotVector::new(vec![0., 0., 0., 1., 1.])],
        points.clone()
    )
    .is_err());
    assert!(BSpline::<f64, 1, 1>::try_new(
        [1],
        [KnotVector::new(vec![0., 0., 0.5, 1., 1.])],
        points
    )
    .is_ok());
}

#[test]
fn construction_rejects_degrees_beyond_the_knots() {
    assert!(matches!(
        BSpline::<f64, 1, 1>::try_new(
            [usize::MAX],
            [KnotVector::new(vec![0., 0., 1., 1.])],
            vec![Vector1::new(0.), Vector1::new(1.)],
        ),
        Err(SplineError::Construction(_))
    ));
    assert!(matches!(
        Nurbs::<f64, 1, 1>::try_new(
            [4],
            [KnotVector::new(vec![0., 0., 1., 1.])],
            vec![Vector1::new(0.), Vector1::new(1.)],
            vec![1., 1.],
        ),
        Err(SplineError::Construction(_))
    ));
}

#[test]
fn clamped_ends_interpolate() {
    let spline = wave();
    assert_relative_eq!(spline.point(&[0.]), Vector2::new(0., 0.));
    assert_relative_eq!(spline.point(&[3.]), Vector2::new(4., 0.));
    assert_eq!(spline.parametric_bounds(), vec![0., 3.]);
    assert_eq!(spline.shape(), [5]);
}

#[test]
fn basis_is_a_partition_of_unity() {
    let spline = sheet();
    for u in samples(0., 1.) {
        for v in samples(0., 1.) {
            let basis = spline.basis_and_support(&[u, v]).unwrap();
            assert_eq!(basis.values.len(), spline.number_of_supports());
            assert_relative_eq!(basis.values.iter().sum::<f64>(), 1., epsilon = 1e-12);
            assert!(basis.support.iter().all(|id| *id < 12));
        }
    }
}

#[test]
fn derivatives_match_finite_differences() {
    let spline = sheet();
    let h = 1e-6;
    let u = [0.3, 0.7];
    let du = spline.point_derivative(&u, &[1, 0]);
    let fd = (spline.point(&[u[0] + h, u[1]]) - spline.point(&[u[0] - h, u[1]])) / (2. * h);
    assert_relative_eq!(du, fd, epsilon = 1e-6);
    let dv = spline.point_derivative(&u, &[0, 1]);
    let fd = (spline.point(&[u[0], u[1] + h]) - spline.point(&[u[0], u[1] - h])) / (2. * h);
    assert_relative_eq!(dv, fd, epsilon = 1e-6);
}

#[test]
fn knot_insertion_then_removal_round_trip() {
    let original = wave();
    let mut spline = original.clone();
    spline.try_insert_knot(0, 1.5).unwrap();
    assert_eq!(spline.control_points().len(), 6);
    for u in samples(0., 3.) {
        assert_relative_eq!(spline.point(&[u]), original.point(&[u]), epsilon = 1e-12);
    }
    assert!(spline.try_remove_knot(0, 1.5, 1e-9).unwrap());
    assert_eq!(spline.knot_vectors()[0].to_vec(), original.knot_vectors()[0].to_vec());
    for (a, b) in spline.control_points().iter().zip(original.control_points()) {
        assert_relative_eq!(a, b, epsilon = 1e-9);
    }
}

#[test]
fn knot_insertion_rejects_invalid_input() {
    let mut spline = wave();
    assert!(matches!(
        spline.try_insert_knot(0, 4.),
        Err(SplineError::InvalidParameter(_))
    ));
    assert!(matches!(
        spline.try_insert_knot(1, 1.),
        Err(SplineError::InvalidParameter(_))
    ));
    spline.try_insert_knot(0, 1.).unwrap();
    spline.try_insert_knot(0, 1.).unwrap();
    assert_eq!(spline.knot_vectors()[0].multiplicity_of(1.), 3);
    assert!(spline.try_insert_knot(0, 1.).is_err());
}

#[test]
fn removing_a_structural_knot_fails() {
    let mut spline = wave();
    assert!(!spline.try_remove_knot(0, 1., 1e-9).unwrap());
    assert!(!spline.try_remove_knot(0, 0.25, 1e-9).unwrap());
    assert_eq!(spline.control_points().len(), 5);
}

#[test]
fn knot_of_full_multiplicity_is_removed_where_the_net_joins() {
    let knots = KnotVector::new(vec![0., 0., 0.5, 0.5, 1., 1.]);
    let mut joined = BSpline::<f64, 1, 1>::try_new(
        [1],
        [knots.clone()],
        vec![0., 1., 1., 2.].into_iter().map(Vector1::new).collect(),
    )
    .unwrap();
    assert!(joined.try_remove_knot(0, 0.5, 1e-9).unwrap());
    assert_eq!(joined.knot_vectors()[0].to_vec(), vec![0., 0., 0.5, 1., 1.]);
    assert_eq!(joined.control_points().len(), 3);
    for u in samples(0., 1.) {
        assert_relative_eq!(joined.point(&[u]).x, 2. * u, epsilon = 1e-12);
    }

    let mut broken = BSpline::<f64, 1, 1>::try_new(
        [1],
        [knots],
        vec![0., 1., 3., 2.].into_iter().map(Vector1::new).collect(),
    )
    .unwrap();
    assert!(!broken.try_remove_knot(0, 0.5, 1e-9).unwrap());
    assert_eq!(broken.knot_vectors()[0].multiplicity_of(0.5), 2);
    assert_eq!(broken.control_points().len(), 4);
}

#[test]
fn degree_elevation_keeps_geometry_and_continuity() {
    let original = wave();
    let mut spline = original.clone();
    spline.try_elevate_degree(0).unwrap();
    assert_eq!(spline.degrees(), &[3]);
    // each interior knot gains one copy
    assert_eq!(
        spline.knot_vectors()[0].to_vec(),
        vec![0., 0., 0., 0., 1., 1., 2., 2., 3., 3., 3., 3.]
    );
    for u in samples(0., 3.) {
        assert_relative_eq!(spline.point(&[u]), original.point(&[u]), epsilon = 1e-9);
    }

    assert!(spline.try_reduce_degree(0, 1e-6).unwrap());
    assert_eq!(spline.degrees(), &[2]);
    for u in samples(0., 3.) {
        assert_relative_eq!(spline.point(&[u]), original.point(&[u]), epsilon = 1e-6);
    }
}

#[test]
fn degree_reduction_of_a_true_quadratic_fails() {
    let mut spline = wave();
    assert!(!spline.try_reduce_degree(0, 1e-6).unwrap());
    assert_eq!(spline.degrees(), &[2]);
}

#[test]
fn unclamped_splines_are_clamped_without_moving() {
    let spline = BSpline::<f64, 1, 1>::try_new(
        [2],
        [KnotVector::new((0..8).map(|i| i as f64).collect())],
        (0..5).map(|i| Vector1::new((i * i) as f64)).collect(),
    )
    .unwrap();
    let (lo, hi) = spline.bounds()[0];
    let clamped = spline.clamped();
    assert!(clamped.knot_vectors()[0].is_clamped(2));
    assert_eq!(clamped.bounds()[0], (lo, hi));
    for u in samples(lo, hi) {
        assert_relative_eq!(clamped.point(&[u]), spline.point(&[u]), epsilon = 1e-12);
    }
}

#[test]
fn split_keeps_global_parameters() {
    let spline = sheet();
    let (left, right) = spline.try_split(1, 0.6).unwrap();
    assert_eq!(left.bounds()[1], (0., 0.6));
    assert_eq!(right.bounds()[1], (0.6, 1.));
    for u in samples(0., 1.) {
        assert_relative_eq!(left.point(&[u, 0.3]), spline.point(&[u, 0.3]), epsilon = 1e-12);
        assert_relative_eq!(right.point(&[u, 0.8]), spline.point(&[u, 0.8]), epsilon = 1e-12);
    }
    assert!(spline.try_split(1, 1.).is_err());
    assert!(spline.try_split(2, 0.5).is_err());
}

#[test]
fn derivative_spline_matches_pointwise_derivative() {
    let spline = sheet();
    let derivative = Spline::derivative_spline(&spline, &[1, 1]).unwrap();
    assert_eq!(derivative.degrees(), vec![1, 0]);
    for (u, v) in [(0.2, 0.1), (0.7, 0.5), (0.45, 0.9)] {
        let expected = spline.point_derivative(&[u, v], &[1, 1]);
        let actual = derivative.evaluate(&[u, v]).unwrap();
        assert_relative_eq!(Vector3::from_column_slice(&actual), expected, epsilon = 1e-9);
    }
}

#[test]
fn sum_unifies_degrees_and_knots() {
    let a = wave();
    let b = BSpline::<f64, 1, 2>::try_new(
        [1],
        [KnotVector::new(vec![0., 0., 2.5, 3., 3.])],
        vec![Vector2::new(1., 1.), Vector2::new(0., 3.), Vector2::new(-1., 0.)],
    )
    .unwrap();
    let sum = a.try_sum(&b).unwrap();
    assert_eq!(sum.degrees(), &[2]);
    for u in samples(0., 3.) {
        assert_relative_eq!(sum.point(&[u]), a.point(&[u]) + b.point(&[u]), epsilon = 1e-9);
    }

    let shifted = BSpline::<f64, 1, 2>::try_new(
        [1],
        [KnotVector::new(vec![0., 0., 2., 2.])],
        vec![Vector2::zeros(); 2],
    )
    .unwrap();
    assert!(matches!(
        a.try_sum(&shifted),
        Err(SplineError::DimensionMismatch(_))
    ));
}

#[test]
fn decomposition_yields_one_patch_per_span() {
    let spline = sheet();
    let patches = spline.try_decompose().unwrap();
    assert_eq!(patches.len(), 4);
    // axis 0 runs fastest: patch 1 covers u in [0.5, 1], v in [0, 0.4]
    let patch = &patches[1];
    for (s, t) in [(0., 0.), (0.5, 0.5), (1., 1.)] {
        let u = 0.5 + 0.5 * s;
        let v = 0.4 * t;
        assert_relative_eq!(patch.point(&[s, t]), spline.point(&[u, v]), epsilon = 1e-12);
    }
}

#[test]
fn nurbs_with_unit_weights_matches_bspline() {
    let spline = wave();
    let nurbs = Nurbs::try_new(
        [2],
        [spline.knot_vectors()[0].clone()],
        spline.control_points().to_vec(),
        vec![1.; 5],
    )
    .unwrap();
    for u in samples(0., 3.) {
        assert_relative_eq!(nurbs.point(&[u]).unwrap(), spline.point(&[u]), epsilon = 1e-12);
        assert_relative_eq!(
            nurbs.point_derivative(&[u], &[1]).unwrap(),
            spline.point_derivative(&[u], &[1]),
            epsilon = 1e-9
        );
    }
}

#[test]
fn nurbs_arc_stays_on_the_circle_under_refinement() {
    let mut arc = quarter_circle();
    arc.try_insert_knot(0, 0.3).unwrap();
    arc.try_elevate_degree(0).unwrap();
    assert_eq!(arc.degrees(), &[3]);
    assert_eq!(arc.weights().len(), arc.control_points().len());
    for u in samples(0., 1.) {
        assert_relative_eq!(arc.point(&[u]).unwrap().norm(), 1., epsilon = 1e-9);
    }
    assert!(arc.try_remove_knot(0, 0.3, 1e-9).unwrap());
    for u in samples(0., 1.) {
        assert_relative_eq!(arc.point(&[u]).unwrap().norm(), 1., epsilon = 1e-9);
    }
}

#[test]
fn nurbs_split_and_decompose() {
    let arc = quarter_circle();
    let (left, right) = arc.try_split(0, 0.25).unwrap();
    assert_relative_eq!(left.point(&[0.1]).unwrap(), arc.point(&[0.1]).unwrap(), epsilon = 1e-12);
    assert_relative_eq!(right.point(&[0.9]).unwrap(), arc.point(&[0.9]).unwrap(), epsilon = 1e-12);

    let mut refined = arc.clone();
    refined.try_insert_knot(0, 0.5).unwrap();
    let patches = refined.try_decompose().unwrap();
    assert_eq!(patches.len(), 2);
    assert_relative_eq!(
        patches[1].point(&[0.5]).unwrap(),
        arc.point(&[0.75]).unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn nurbs_rational_derivative() {
    let arc = quarter_circle();
    let h = 1e-6;
    for u in [0.2, 0.5, 0.8] {
        let d = arc.point_derivative(&[u], &[1]).unwrap();
        let fd = (arc.point(&[u + h]).unwrap() - arc.point(&[u - h]).unwrap()) / (2. * h);
        assert_relative_eq!(d, fd, epsilon = 1e-6);
        // tangent of a circle is orthogonal to its radius
        assert_relative_eq!(d.dot(&arc.point(&[u]).unwrap()), 0., epsilon = 1e-9);
    }
}

#[test]
fn nurbs_basis_is_a_partition_of_unity() {
    let sheet = sheet();
    let weights = (0..12).map(|i| 0.5 + 0.25 * (i % 5) as f64).collect();
    let nurbs = Nurbs::try_new(
        *sheet.degrees(),
        sheet.knot_vectors().clone(),
        sheet.control_points().to_vec(),
        weights,
    )
    .unwrap();
    for u in samples(0., 1.) {
        for v in samples(0., 1.) {
            let (values, support) = nurbs.basis(&[u, v]).unwrap();
            assert_eq!(values.len(), support.len());
            assert!(values.iter().all(|r| *r >= 0.));
            assert_relative_eq!(values.iter().sum::<f64>(), 1., epsilon = 1e-12);

            let basis = nurbs.basis_and_support(&[u, v]).unwrap();
            assert_relative_eq!(basis.values.iter().sum::<f64>(), 1., epsilon = 1e-12);
            assert!(basis.support.iter().all(|id| *id < 12));
        }
    }
}

#[test]
fn nurbs_with_vanishing_weights_is_degenerate() {
    let nurbs = Nurbs::<f64, 1, 1>::try_new(
        [1],
        [KnotVector::new(vec![0., 0., 1., 1.])],
        vec![Vector1::new(0.), Vector1::new(0.)],
        vec![0., 0.],
    )
    .unwrap();
    assert!(matches!(
        nurbs.point(&[0.5]),
        Err(SplineError::DegenerateGeometry(_))
    ));
    assert!(matches!(
        nurbs.evaluate(&[0.5]),
        Err(SplineError::DegenerateGeometry(_))
    ));
}

#[test]
fn nurbs_lacks_algebra() {
    let arc = quarter_circle();
    assert!(matches!(
        arc.add(&arc),
        Err(SplineError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        arc.derivative_spline(&[1]),
        Err(SplineError::UnsupportedOperation(_))
    ));
}
