//! Automatic handle computation for keyframe curves.

use super::Extrapolation;
use crate::keyframe::{HandleType, Keyframe};

/// Auto handle weighting.
const AUTO_WEIGHT: f32 = 2.5614;
const ALIGN_EPS: f32 = 1.0e-5;

#[inline]
fn sub(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

#[inline]
fn madd(p: [f32; 2], v: [f32; 2], f: f32) -> [f32; 2] {
    [p[0] + v[0] * f, p[1] + v[1] * f]
}

/// Reflection of `other` through `p`.
#[inline]
fn mirror(p: [f32; 2], other: [f32; 2]) -> [f32; 2] {
    [2.0 * p[0] - other[0], 2.0 * p[1] - other[1]]
}

#[inline]
fn dist(a: [f32; 2], b: [f32; 2]) -> f32 {
    let d = sub(a, b);
    (d[0] * d[0] + d[1] * d[1]).sqrt()
}

#[inline]
fn is_auto_both(key: &Keyframe) -> bool {
    key.handle_left_type.is_auto() && key.handle_right_type.is_auto()
}

/// Recompute every non-free handle of `keys`.
///
/// `cyclic` makes the first and last key see the far end of the curve (shifted by
/// one period) as their outer neighbour, so auto handles run smoothly through the
/// cycle seam.
pub(crate) fn recalc_handles(keys: &mut [Keyframe], extrapolation: Extrapolation, cyclic: bool) {
    let len = keys.len();
    if len < 2 {
        return;
    }
    let first_co = keys[0].co;
    let last_co = keys[len - 1].co;
    let cycle = cyclic && is_auto_both(&keys[0]) && is_auto_both(&keys[len - 1]);

    // neighbours one period away, for the seam
    let seam_prev = cycle.then(|| madd(keys[len - 2].co, sub(first_co, last_co), 1.0));
    let seam_next = cycle.then(|| madd(keys[1].co, sub(last_co, first_co), 1.0));

    let mut locked_first = false;
    let mut locked_last = false;

    for i in 0..len {
        let prev = if i > 0 { Some(keys[i - 1].co) } else { seam_prev };
        let next = if i + 1 < len {
            Some(keys[i + 1].co)
        } else {
            seam_next
        };

        let key = &mut keys[i];
        if key.handle_left[0] > key.co[0] {
            key.handle_left[0] = key.co[0];
        }
        if key.handle_right[0] < key.co[0] {
            key.handle_right[0] = key.co[0];
        }

        let mut locked = calc_key_handles(key, prev, next);

        let is_end = i == 0 || i == len - 1;
        if is_auto_both(key) && !cycle && is_end && extrapolation == Extrapolation::Constant {
            key.handle_left[1] = key.co[1];
            key.handle_right[1] = key.co[1];
            locked = true;
        }

        if i == 0 {
            locked_first = locked;
        }
        if i == len - 1 {
            locked_last = locked;
        }
    }

    if cycle && (locked_first || locked_last) {
        for i in [0, len - 1] {
            let key = &mut keys[i];
            key.handle_left[1] = key.co[1];
            key.handle_right[1] = key.co[1];
        }
    }
}

/// Handles of one key from its neighbours' positions. Returns whether an
/// auto-clamped handle was flattened at an extremum.
fn calc_key_handles(key: &mut Keyframe, prev: Option<[f32; 2]>, next: Option<[f32; 2]>) -> bool {
    let (lt, rt) = (key.handle_left_type, key.handle_right_type);
    if lt == HandleType::Free && rt == HandleType::Free {
        return false;
    }

    let p2 = key.co;
    let (p1, p3) = match (prev, next) {
        (Some(p), Some(n)) => (p, n),
        (None, Some(n)) => (mirror(p2, n), n),
        (Some(p), None) => (p, mirror(p2, p)),
        (None, None) => return false,
    };
    let clamp_ok = prev.is_some() && next.is_some();

    let dvec_a = sub(p2, p1);
    let dvec_b = sub(p3, p2);
    let mut len_a = if dvec_a[0] == 0.0 { 1.0 } else { dvec_a[0] };
    let mut len_b = if dvec_b[0] == 0.0 { 1.0 } else { dvec_b[0] };

    let mut h1 = key.handle_left;
    let mut h2 = key.handle_right;
    let mut locked = false;

    if lt.is_auto() || rt.is_auto() {
        let tvec = [
            dvec_b[0] / len_b + dvec_a[0] / len_a,
            dvec_b[1] / len_b + dvec_a[1] / len_a,
        ];
        let len = tvec[0] * AUTO_WEIGHT;

        if len != 0.0 {
            let mut left_violate = false;
            let mut right_violate = false;

            if len_a > 5.0 * len_b {
                len_a = 5.0 * len_b;
            }
            if len_b > 5.0 * len_a {
                len_b = 5.0 * len_a;
            }

            let ydiff1 = p1[1] - p2[1];
            let ydiff2 = p3[1] - p2[1];
            let extremum = (ydiff1 <= 0.0 && ydiff2 <= 0.0) || (ydiff1 >= 0.0 && ydiff2 >= 0.0);

            if lt.is_auto() {
                h1 = madd(p2, tvec, -len_a / len);
                if lt == HandleType::AutoClamped && clamp_ok {
                    if extremum {
                        h1[1] = p2[1];
                        locked = true;
                    } else if (ydiff1 <= 0.0 && p1[1] > h1[1]) || (ydiff1 > 0.0 && p1[1] < h1[1]) {
                        h1[1] = p1[1];
                        left_violate = true;
                    }
                }
            }
            if rt.is_auto() {
                h2 = madd(p2, tvec, len_b / len);
                if rt == HandleType::AutoClamped && clamp_ok {
                    if extremum {
                        h2[1] = p2[1];
                        locked = true;
                    } else if (ydiff1 <= 0.0 && p3[1] < h2[1]) || (ydiff1 > 0.0 && p3[1] > h2[1]) {
                        h2[1] = p3[1];
                        right_violate = true;
                    }
                }
            }

            // keep the pair collinear after clamping one side
            if left_violate || right_violate {
                let h1_x = h1[0] - p2[0];
                let h2_x = p2[0] - h2[0];
                if left_violate {
                    h2[1] = p2[1] + ((p2[1] - h1[1]) / h1_x) * h2_x;
                } else {
                    h1[1] = p2[1] + ((p2[1] - h2[1]) / h2_x) * h1_x;
                }
            }
        }
    }

    if lt == HandleType::Vector {
        h1 = madd(p2, dvec_a, -1.0 / 3.0);
    }
    if rt == HandleType::Vector {
        h2 = madd(p2, dvec_b, 1.0 / 3.0);
    }

    let skip_align = lt == HandleType::Free
        || rt == HandleType::Free
        || (lt == HandleType::Vector && rt == HandleType::Vector);
    if !skip_align {
        let mut la = dist(h1, p2);
        let mut lb = dist(h2, p2);
        if la == 0.0 {
            la = 1.0;
        }
        if lb == 0.0 {
            lb = 1.0;
        }
        let align_right = |h1: [f32; 2], h2: &mut [f32; 2]| {
            if rt == HandleType::Aligned && la > ALIGN_EPS {
                *h2 = madd(p2, sub(p2, h1), lb / la);
            }
        };
        let align_left = |h2: [f32; 2], h1: &mut [f32; 2]| {
            if lt == HandleType::Aligned && lb > ALIGN_EPS {
                *h1 = madd(p2, sub(p2, h2), la / lb);
            }
        };
        // a selected key keeps its left handle and swings the right one
        if key.selected {
            align_right(h1, &mut h2);
            align_left(h2, &mut h1);
        } else {
            align_left(h2, &mut h1);
            align_right(h1, &mut h2);
        }
    }

    key.handle_left = h1;
    key.handle_right = h2;
    locked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn auto_clamped_flattens_extremum() {
        let mut keys = vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(1.0, 5.0),
            Keyframe::new(2.0, 0.0),
        ];
        recalc_handles(&mut keys, Extrapolation::Constant, false);
        approx(keys[1].handle_left[1], 5.0, 1e-6);
        approx(keys[1].handle_right[1], 5.0, 1e-6);
        assert!(keys[1].handle_left[0] < 1.0);
        assert!(keys[1].handle_right[0] > 1.0);
    }

    #[test]
    fn auto_handles_follow_slope_on_straight_line() {
        let mut keys: Vec<Keyframe> = (0..3)
            .map(|i| {
                Keyframe::new(i as f32, i as f32 * 2.0)
                    .with_handle_types(HandleType::Auto, HandleType::Auto)
            })
            .collect();
        recalc_handles(&mut keys, Extrapolation::Linear, false);
        let k = &keys[1];
        let slope_l = (k.co[1] - k.handle_left[1]) / (k.co[0] - k.handle_left[0]);
        let slope_r = (k.handle_right[1] - k.co[1]) / (k.handle_right[0] - k.co[0]);
        approx(slope_l, 2.0, 1e-4);
        approx(slope_r, 2.0, 1e-4);
    }

    #[test]
    fn vector_handles_point_a_third_toward_neighbours() {
        let mut keys: Vec<Keyframe> = [(0.0, 0.0), (3.0, 3.0), (6.0, 0.0)]
            .iter()
            .map(|&(t, v)| {
                Keyframe::new(t, v).with_handle_types(HandleType::Vector, HandleType::Vector)
            })
            .collect();
        recalc_handles(&mut keys, Extrapolation::Constant, false);
        assert_eq!(keys[1].handle_left, [2.0, 2.0]);
        assert_eq!(keys[1].handle_right, [4.0, 2.0]);
    }

    #[test]
    fn constant_extrapolation_flattens_end_keys() {
        let mut keys = vec![
            Keyframe::new(0.0, 0.0).with_handle_types(HandleType::Auto, HandleType::Auto),
            Keyframe::new(4.0, 8.0).with_handle_types(HandleType::Auto, HandleType::Auto),
        ];
        recalc_handles(&mut keys, Extrapolation::Constant, false);
        approx(keys[0].handle_right[1], 0.0, 0.0);
        approx(keys[1].handle_left[1], 8.0, 0.0);
    }

    #[test]
    fn aligned_mirrors_free_partner_direction() {
        let mut keys = vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(2.0, 2.0)
                .with_handles([1.0, 1.0], [4.0, 0.0])
                .with_handle_types(HandleType::Aligned, HandleType::Aligned)
                .selected(true),
            Keyframe::new(4.0, 0.0),
        ];
        recalc_handles(&mut keys, Extrapolation::Constant, false);
        let k = &keys[1];
        // right handle keeps its length (sqrt(8)) along the left handle's opposite direction
        approx(k.handle_right[0], 4.0, 1e-5);
        approx(k.handle_right[1], 4.0, 1e-5);
    }
}
