//! Curve and action builders shared by the integration tests.

use vizij_nla_core::{Action, ActionId, Curve, Interpolation, Keyframe, Strip};

pub fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

pub fn linear_curve(path: &str, index: usize, points: &[(f32, f32)]) -> Curve {
    Curve::new(path, index).with_keys(
        points
            .iter()
            .map(|&(t, v)| Keyframe::new(t, v).with_interpolation(Interpolation::Linear))
            .collect(),
    )
}

/// Action with one linear curve on `path[index]`.
pub fn ramp_action(name: &str, path: &str, index: usize, points: &[(f32, f32)]) -> Action {
    Action::new(name).with_curve(linear_curve(path, index, points))
}

/// Action holding `value` on `path[index]` over `[0, 10]`.
pub fn flat_action(name: &str, path: &str, index: usize, value: f32) -> Action {
    ramp_action(name, path, index, &[(0.0, value), (10.0, value)])
}

pub fn clip(name: &str, action: ActionId, start: f32) -> Strip {
    Strip::clip(name, action, (0.0, 10.0), start)
}
