use approx::assert_relative_eq;
use splinekit::prelude::*;

fn parabola() -> SharedSpline {
    create_bezier(1, 2, &[2.], &[0., 0., 1., 2., 2., 0.]).unwrap()
}

fn ramp() -> SharedSpline {
    create_bezier(1, 1, &[1.], &[1., 3.]).unwrap()
}

fn assert_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_relative_eq!(x, y, epsilon = 1e-10);
    }
}

#[test]
fn addition_checks_operands_in_order() {
    let bezier = parabola();
    let bspline = create_bspline(1, 2, &[1.], &[vec![0., 0., 1., 1.]], &[0., 0., 1., 1.]).unwrap();
    match bezier.add(&*bspline) {
        Err(SplineError::DimensionMismatch(message)) => {
            assert!(message.starts_with("Spline addition requires splines of the same type."));
            assert!(message.contains("lhs: Bezier"));
            assert!(message.contains("rhs: BSpline"));
        }
        other => panic!("unexpected result {other:?}"),
    }

    let surface = create_bezier(2, 2, &[1., 1.], &[0.; 8]).unwrap();
    assert!(matches!(
        bezier.add(&*surface),
        Err(SplineError::DimensionMismatch(_))
    ));
    let space = create_bezier(1, 3, &[1.], &[0.; 6]).unwrap();
    assert!(matches!(
        bezier.add(&*space),
        Err(SplineError::DimensionMismatch(_))
    ));
}

#[test]
fn sums_are_pointwise() {
    let a = parabola();
    let b = create_bezier(1, 2, &[1.], &[1., 1., 0., -1.]).unwrap();
    let sum = a.add(&*b).unwrap();
    assert_eq!(sum.degrees(), vec![2]);
    for t in [0., 0.25, 0.6, 1.] {
        let expected: Vec<f64> = a
            .evaluate(&[t])
            .unwrap()
            .iter()
            .zip(b.evaluate(&[t]).unwrap())
            .map(|(x, y)| x + y)
            .collect();
        assert_close(&sum.evaluate(&[t]).unwrap(), &expected);
    }

    let c = create_bspline(1, 1, &[1.], &[vec![0., 0., 0.5, 1., 1.]], &[0., 1., 0.]).unwrap();
    let d = create_bspline(1, 1, &[2.], &[vec![0., 0., 0., 1., 1., 1.]], &[1., 1., 2.]).unwrap();
    let sum = c.add(&*d).unwrap();
    for t in [0., 0.3, 0.5, 0.9] {
        let expected = c.evaluate(&[t]).unwrap()[0] + d.evaluate(&[t]).unwrap()[0];
        assert_relative_eq!(sum.evaluate(&[t]).unwrap()[0], expected, epsilon = 1e-10);
    }
}

#[test]
fn products_with_scalar_fields_and_dot_products() {
    let curve = parabola();
    let field = ramp();
    let scaled = curve.multiply(&*field).unwrap();
    assert_eq!(scaled.dim(), 2);
    assert_eq!(scaled.degrees(), vec![3]);
    for t in [0., 0.4, 1.] {
        let s = field.evaluate(&[t]).unwrap()[0];
        let expected: Vec<f64> = curve.evaluate(&[t]).unwrap().iter().map(|x| x * s).collect();
        assert_close(&scaled.evaluate(&[t]).unwrap(), &expected);
    }

    let dot = curve.multiply(&*curve).unwrap();
    assert_eq!(dot.dim(), 1);
    for t in [0.1, 0.7] {
        let p = curve.evaluate(&[t]).unwrap();
        let expected = p[0] * p[0] + p[1] * p[1];
        assert_relative_eq!(dot.evaluate(&[t]).unwrap()[0], expected, epsilon = 1e-10);
    }

    let space = create_bezier(1, 3, &[1.], &[0.; 6]).unwrap();
    assert!(matches!(
        curve.multiply(&*space),
        Err(SplineError::DimensionMismatch(_))
    ));
}

#[test]
fn knotted_families_do_not_multiply() {
    let bspline = create_bspline(1, 1, &[1.], &[vec![0., 0., 1., 1.]], &[0., 1.]).unwrap();
    assert!(matches!(
        bspline.multiply(&*bspline),
        Err(SplineError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        bspline.compose(&*ramp()),
        Err(SplineError::UnsupportedOperation(_))
    ));
}

#[test]
fn composition_maps_through_the_outer_spline() {
    // outer: bilinear surface, inner: curve inside its parameter square
    let surface = create_bezier(
        2,
        3,
        &[1., 1.],
        &[0., 0., 0., 1., 0., 1., 0., 1., 2., 1., 1., 0.],
    )
    .unwrap();
    let inner = create_bezier(1, 2, &[2.], &[0.1, 0.2, 0.9, 0.1, 0.5, 0.8]).unwrap();
    let composed = surface.compose(&*inner).unwrap();
    assert_eq!(composed.para_dim(), 1);
    assert_eq!(composed.dim(), 3);
    for t in [0., 0.3, 0.75, 1.] {
        let st = inner.evaluate(&[t]).unwrap();
        assert_close(
            &composed.evaluate(&[t]).unwrap(),
            &surface.evaluate(&st).unwrap(),
        );
    }

    let bspline_inner =
        create_bspline(1, 2, &[1.], &[vec![0., 0., 1., 1.]], &[0., 0., 1., 1.]).unwrap();
    assert!(matches!(
        surface.compose(&*bspline_inner),
        Err(SplineError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        surface.compose(&*ramp()),
        Err(SplineError::DimensionMismatch(_))
    ));
}

#[test]
fn rational_composition_stays_on_the_circle() {
    let w = std::f64::consts::FRAC_1_SQRT_2;
    let arc =
        create_rational_bezier(1, 2, &[2.], &[1., 0., 1., 1., 0., 1.], &[1., w, 1.]).unwrap();
    let inner = create_bezier(1, 1, &[2.], &[0., 0.8, 1.]).unwrap();
    let composed = arc.compose(&*inner).unwrap();
    assert!(composed.is_rational());
    for t in [0., 0.2, 0.5, 0.9, 1.] {
        let s = inner.evaluate(&[t]).unwrap();
        let p = composed.evaluate(&[t]).unwrap();
        assert_close(&p, &arc.evaluate(&s).unwrap());
        assert_relative_eq!(p[0].hypot(p[1]), 1., epsilon = 1e-10);
    }
}

#[test]
fn derivative_splines_match_pointwise_derivatives() {
    let curve = parabola();
    let derivative = curve.derivative_spline(&[1]).unwrap();
    for t in [0., 0.5, 1.] {
        assert_close(
            &derivative.evaluate(&[t]).unwrap(),
            &curve.derivative(&[t], &[1]).unwrap(),
        );
    }
    assert!(matches!(
        curve.derivative_spline(&[1, 0]),
        Err(SplineError::InvalidParameter(_))
    ));
}

#[test]
fn patches_cover_the_spline() {
    let spline = create_bspline(
        1,
        1,
        &[2.],
        &[vec![0., 0., 0., 0.25, 0.5, 1., 1., 1.]],
        &[0., 1., 3., 2., 0.],
    )
    .unwrap();
    let patches = spline.extract_bezier_patches().unwrap();
    assert_eq!(patches.len(), 3);
    assert!(patches.iter().all(|p| p.name() == "Bezier"));
    // the last patch covers [0.5, 1]
    assert_relative_eq!(
        patches[2].evaluate(&[0.5]).unwrap()[0],
        spline.evaluate(&[0.75]).unwrap()[0],
        epsilon = 1e-12
    );

    let (left, right) = spline.split(0, 0.4).unwrap();
    assert_eq!(left.parametric_bounds(), vec![0., 0.4]);
    assert_eq!(right.parametric_bounds(), vec![0.4, 1.]);
}

#[test]
fn shared_splines_copy_on_write() {
    let original = create_bspline(1, 1, &[1.], &[vec![0., 0., 1., 1.]], &[0., 2.]).unwrap();
    let mut edited = original.clone();
    make_mut(&mut edited).insert_knot(0, 0.5).unwrap();
    make_mut(&mut edited).elevate_degree(0).unwrap();
    assert_eq!(original.number_of_control_points(), 2);
    assert_eq!(original.degrees(), vec![1]);
    assert_eq!(edited.degrees(), vec![2]);
    for t in [0., 0.3, 1.] {
        assert_relative_eq!(
            edited.evaluate(&[t]).unwrap()[0],
            original.evaluate(&[t]).unwrap()[0],
            epsilon = 1e-12
        );
    }
    assert!(make_mut(&mut edited).reduce_degree(0, 1e-9).unwrap());
    assert_eq!(edited.degrees(), vec![1]);

    let mut bezier = parabola();
    assert!(matches!(
        make_mut(&mut bezier).insert_knot(0, 0.5),
        Err(SplineError::UnsupportedOperation(_))
    ));
}

#[test]
fn discontinuities_are_removed_only_where_the_net_joins() {
    let mut joined =
        create_bspline(1, 1, &[1.], &[vec![0., 0., 0.5, 0.5, 1., 1.]], &[0., 1., 1., 2.]).unwrap();
    assert!(make_mut(&mut joined).remove_knot(0, 0.5, 1e-9).unwrap());
    let properties = joined.current_properties();
    assert_eq!(properties.knot_vectors, Some(vec![vec![0., 0., 0.5, 1., 1.]]));
    assert_eq!(properties.control_points, vec![0., 1., 2.]);

    let mut broken =
        create_bspline(1, 1, &[1.], &[vec![0., 0., 0.5, 0.5, 1., 1.]], &[0., 1., 3., 2.]).unwrap();
    assert!(!make_mut(&mut broken).remove_knot(0, 0.5, 1e-9).unwrap());
    assert_eq!(broken.number_of_control_points(), 4);
}
