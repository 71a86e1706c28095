//! Keyframe search and raw keyframe/sample evaluation.

use tracing::debug;

use super::Extrapolation;
use crate::easing;
use crate::keyframe::{Interpolation, Keyframe, Sample};
use crate::solver;

/// Default equality threshold for key times.
pub const KEY_THRESHOLD: f32 = 1.0e-4;

/// Times closer than this count as sitting on a key during interpolation.
const ON_KEY_EPS: f32 = 1.0e-8;

#[inline]
fn eq_threshold(a: f32, b: f32, threshold: f32) -> bool {
    if a > b {
        a - b <= threshold
    } else {
        b - a <= threshold
    }
}

/// Find where `time` sits in `keys`.
///
/// Returns `(index, true)` when a key lies within `threshold` of `time`, otherwise
/// `(index, false)` with the index `time` would be inserted at. The midpoint loop is
/// bounded by `2·len` iterations so unsorted input cannot spin forever.
pub fn binary_search_index(keys: &[Keyframe], time: f32, threshold: f32) -> (usize, bool) {
    let len = keys.len();
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return (0, false);
    };

    if eq_threshold(time, first.co[0], threshold) {
        return (0, true);
    }
    if time < first.co[0] {
        return (0, false);
    }

    if eq_threshold(time, last.co[0], threshold) {
        return (len - 1, true);
    }
    if time > last.co[0] {
        return (len, false);
    }

    let mut start: isize = 0;
    let mut end: isize = len as isize;
    let max_loop = len * 2;
    let mut iterations = 0;
    while start <= end && iterations < max_loop {
        iterations += 1;
        let mid = start + (end - start) / 2;
        let Some(key) = keys.get(mid as usize) else {
            break;
        };
        let mid_time = key.co[0];
        if eq_threshold(time, mid_time, threshold) {
            return (mid as usize, true);
        }
        if time > mid_time {
            start = mid + 1;
        } else if time < mid_time {
            end = mid - 1;
        }
    }
    if iterations >= max_loop {
        debug!(time, len, "keyframe search hit its loop limit; keys unsorted?");
    }
    (start.max(0) as usize, false)
}

/// Value of a keyframe curve at `t`. `keys` must be non-empty and sorted.
pub(crate) fn evaluate_keyframes(
    keys: &[Keyframe],
    extrapolation: Extrapolation,
    discrete: bool,
    t: f32,
) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return 0.0;
    };
    if t <= first.co[0] {
        return extrapolate(keys, 0, true, extrapolation, discrete, t);
    }
    if last.co[0] <= t {
        return extrapolate(keys, keys.len() - 1, false, extrapolation, discrete, t);
    }
    interpolate(keys, discrete, t)
}

fn extrapolate(
    keys: &[Keyframe],
    endpoint: usize,
    neighbor_after: bool,
    extrapolation: Extrapolation,
    discrete: bool,
    t: f32,
) -> f32 {
    let end = &keys[endpoint];
    let value = end.co[1];

    if end.interpolation == Interpolation::Constant
        || extrapolation == Extrapolation::Constant
        || discrete
    {
        return value;
    }

    let dx = end.co[0] - t;

    if end.interpolation == Interpolation::Linear {
        if keys.len() == 1 {
            return value;
        }
        let neighbor = if neighbor_after { endpoint + 1 } else { endpoint - 1 };
        let next = &keys[neighbor];
        let span = next.co[0] - end.co[0];
        if span == 0.0 {
            return value;
        }
        let slope = (next.co[1] - end.co[1]) / span;
        return value - slope * dx;
    }

    // outer handle: left of the first key, right of the last
    let handle = if neighbor_after {
        end.handle_left
    } else {
        end.handle_right
    };
    let span = end.co[0] - handle[0];
    if span == 0.0 {
        return value;
    }
    let slope = (end.co[1] - handle[1]) / span;
    value - slope * dx
}

fn interpolate(keys: &[Keyframe], discrete: bool, t: f32) -> f32 {
    let (a, exact) = binary_search_index(keys, t, KEY_THRESHOLD);
    let Some(key) = keys.get(a) else {
        debug!(t, index = a, "interpolation index past the last key");
        return 0.0;
    };
    if exact {
        return key.co[1];
    }
    let prev = if a > 0 { &keys[a - 1] } else { key };

    if (key.co[0] - t).abs() < ON_KEY_EPS {
        return key.co[1];
    }

    if t < prev.co[0] || key.co[0] < t {
        debug!(
            t,
            prev = prev.co[0],
            next = key.co[0],
            "time outside the bracketing keyframes"
        );
        return 0.0;
    }

    let begin = prev.co[1];
    let change = key.co[1] - prev.co[1];
    let duration = key.co[0] - prev.co[0];
    let time = t - prev.co[0];

    if prev.interpolation == Interpolation::Constant || discrete || duration == 0.0 {
        return prev.co[1];
    }

    match prev.interpolation {
        Interpolation::Bezier => {
            solver::bezier_segment_value(prev.co, prev.handle_right, key.handle_left, key.co, t)
                .unwrap_or_else(|| {
                    debug!(t, from = prev.co[0], to = key.co[0], "no bezier root in band");
                    begin
                })
        }
        Interpolation::Linear => easing::linear(time, begin, change, duration),
        other => easing::ease(
            other,
            prev.easing,
            prev.ease_params(),
            time,
            begin,
            change,
            duration,
        ),
    }
}

/// Value of a baked curve at `t`. Samples are assumed one frame apart.
pub(crate) fn evaluate_samples(samples: &[Sample], t: f32) -> f32 {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return 0.0;
    };
    if first.time >= t {
        return first.value;
    }
    if last.time <= t {
        return last.value;
    }
    let frac = (t - t.floor()).abs();
    let index = (t.floor() - first.time.floor()) as usize;
    let Some(here) = samples.get(index) else {
        return last.value;
    };
    if frac != 0.0 && frac < 1.0 {
        let next = samples.get(index + 1).map_or(here.value, |s| s.value);
        here.value * (1.0 - frac) + next * frac
    } else {
        here.value
    }
}
