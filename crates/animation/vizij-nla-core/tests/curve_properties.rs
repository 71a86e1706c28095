use vizij_nla_core::modifier::{Cycles, CycleMode};
use vizij_nla_core::solver::{find_zero, ROOT_MAX, ROOT_MIN};
use vizij_nla_core::{
    Curve, Extrapolation, Interpolation, Keyframe, Modifier, ModifierKind,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn linear_curve(path: &str, index: usize, points: &[(f32, f32)]) -> Curve {
    Curve::new(path, index).with_keys(
        points
            .iter()
            .map(|&(t, v)| Keyframe::new(t, v).with_interpolation(Interpolation::Linear))
            .collect(),
    )
}

/// it should interpolate linearly between keys and hit keys exactly
#[test]
fn linear_keys_interpolate_and_hit_exactly() {
    let curve = linear_curve("x", 0, &[(1.0, 7.0), (2.0, 13.0), (3.0, 19.0)]);
    assert_eq!(curve.evaluate(1.0), 7.0);
    assert_eq!(curve.evaluate(2.0), 13.0);
    assert_eq!(curve.evaluate(3.0), 19.0);
    approx(curve.evaluate(1.5), 10.0, 1e-6);
    approx(curve.evaluate(2.25), 14.5, 1e-5);
}

/// it should extrapolate along the first segment's slope in linear mode
#[test]
fn linear_extrapolation_follows_edge_slope() {
    let curve = linear_curve("x", 0, &[(1.0, 7.0), (2.0, 13.0), (3.0, 19.0)])
        .with_extrapolation(Extrapolation::Linear);
    approx(curve.evaluate(0.5), 4.0, 1e-6);
    approx(curve.evaluate(4.0), 25.0, 1e-5);
}

/// it should hold edge values with constant extrapolation, whatever the interpolation
#[test]
fn constant_extrapolation_holds_edges() {
    for interpolation in [
        Interpolation::Linear,
        Interpolation::Bezier,
        Interpolation::Constant,
        Interpolation::Elastic,
    ] {
        let mut curve = Curve::new("x", 0).with_keys(vec![
            Keyframe::new(0.0, 2.0).with_interpolation(interpolation),
            Keyframe::new(5.0, 9.0).with_interpolation(interpolation),
        ]);
        curve.recalc_handles();
        assert_eq!(curve.evaluate(-3.0), 2.0, "{interpolation:?}");
        assert_eq!(curve.evaluate(8.0), 9.0, "{interpolation:?}");
    }
}

/// it should hold the left key for constant interpolation
#[test]
fn constant_interpolation_steps() {
    let curve = Curve::new("x", 0).with_keys(vec![
        Keyframe::new(0.0, 1.0).with_interpolation(Interpolation::Constant),
        Keyframe::new(4.0, 5.0).with_interpolation(Interpolation::Constant),
        Keyframe::new(8.0, 2.0).with_interpolation(Interpolation::Constant),
    ]);
    for t in [0.0, 1.0, 3.99] {
        assert_eq!(curve.evaluate(t), 1.0);
    }
    for t in [4.0, 6.5, 7.999] {
        assert_eq!(curve.evaluate(t), 5.0);
    }
    assert_eq!(curve.evaluate(8.0), 2.0);
}

/// it should return the only key's value everywhere
#[test]
fn single_key_is_flat() {
    for extrapolation in [Extrapolation::Constant, Extrapolation::Linear] {
        let curve = Curve::new("x", 0)
            .with_keys(vec![Keyframe::new(3.0, 4.5)])
            .with_extrapolation(extrapolation);
        for t in [-100.0, 0.0, 3.0, 3.5, 1e4] {
            assert_eq!(curve.evaluate(t), 4.5);
        }
    }
}

/// it should find u = 0 and u = 1 at the segment's own end points
#[test]
fn root_finder_returns_segment_ends() {
    let (q0, q1, q2, q3) = (2.0, 3.0, 5.0, 6.0);
    let start = find_zero(q0, q0, q1, q2, q3);
    assert!(start.as_slice().iter().any(|&u| (ROOT_MIN..=ROOT_MAX).contains(&u) && u.abs() < 1e-4));
    let end = find_zero(q3, q0, q1, q2, q3);
    assert!(end.as_slice().iter().any(|&u| (u - 1.0).abs() < 1e-4));
}

/// it should keep a symmetric bezier symmetric about its midpoint
#[test]
fn bezier_with_auto_handles_is_symmetric() {
    let mut curve = Curve::new("x", 0).with_keys(vec![
        Keyframe::new(0.0, 0.0),
        Keyframe::new(10.0, 10.0),
    ]);
    curve.recalc_handles();
    let mid = curve.evaluate(5.0);
    approx(mid, 5.0, 1e-4);
    let a = curve.evaluate(2.0);
    let b = curve.evaluate(8.0);
    approx(a + b, 10.0, 1e-3);
    assert!(a < 2.0, "auto-clamped ends ease in");
}

/// it should repeat the keyed range under a Cycles modifier
#[test]
fn cycles_modifier_repeats_keys() {
    let curve = linear_curve("x", 0, &[(0.0, 0.0), (4.0, 8.0)])
        .with_modifier(Modifier::new(ModifierKind::Cycles(Cycles::repeat())));
    approx(curve.evaluate(5.0), 2.0, 1e-5);
    approx(curve.evaluate(-1.0), 6.0, 1e-5);

    let offset = linear_curve("x", 0, &[(0.0, 0.0), (4.0, 8.0)]).with_modifier(Modifier::new(
        ModifierKind::Cycles(Cycles::with_modes(CycleMode::RepeatOffset, CycleMode::RepeatOffset)),
    ));
    approx(offset.evaluate(5.0), 10.0, 1e-5);
}

/// it should load fixture curves and evaluate them like hand-built ones
#[test]
fn fixture_curves_evaluate() {
    let ramp: Curve = vizij_test_fixtures::curves::load("linear-ramp").expect("fixture");
    approx(ramp.evaluate(1.5), 10.0, 1e-6);
    approx(ramp.evaluate(0.5), 4.0, 1e-6);

    let steps: Curve = vizij_test_fixtures::curves::load("stepped-constant").expect("fixture");
    assert_eq!(steps.evaluate(3.0), 1.0);
    assert_eq!(steps.evaluate(4.0), 0.0);
    assert_eq!(steps.evaluate(100.0), 1.0);
}
