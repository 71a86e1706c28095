//! Parametric easing families (Penner equations).
//!
//! All functions share the signature `(time, begin, change, duration)`: `time` runs
//! from `0` to `duration`, the result runs from `begin` to `begin + change`.

use std::f32::consts::{FRAC_PI_2, PI};

use crate::keyframe::{Easing, Interpolation};

/// Per-keyframe easing parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EaseParams {
    pub back: f32,
    pub amplitude: f32,
    pub period: f32,
}

/// Evaluate the segment easing of `interpolation`. `Constant` holds `begin`; `Linear`
/// and `Bezier` (which never reach here from curve evaluation) are linear.
pub fn ease(
    interpolation: Interpolation,
    easing: Easing,
    params: EaseParams,
    t: f32,
    b: f32,
    c: f32,
    d: f32,
) -> f32 {
    use Interpolation as I;
    let mode = resolve_auto(interpolation, easing);
    match interpolation {
        I::Constant => b,
        I::Linear | I::Bezier => linear(t, b, c, d),
        I::Back => pick(mode, t, b, c, d, params.back, back_in, back_out, back_in_out),
        I::Bounce => match mode {
            Easing::In => bounce_in(t, b, c, d),
            Easing::InOut => bounce_in_out(t, b, c, d),
            _ => bounce_out(t, b, c, d),
        },
        I::Circ => pick3(mode, t, b, c, d, circ_in, circ_out, circ_in_out),
        I::Cubic => pick3(mode, t, b, c, d, cubic_in, cubic_out, cubic_in_out),
        I::Elastic => {
            let (a, p) = (params.amplitude, params.period);
            match mode {
                Easing::In => elastic_in(t, b, c, d, a, p),
                Easing::InOut => elastic_in_out(t, b, c, d, a, p),
                _ => elastic_out(t, b, c, d, a, p),
            }
        }
        I::Expo => pick3(mode, t, b, c, d, expo_in, expo_out, expo_in_out),
        I::Quad => pick3(mode, t, b, c, d, quad_in, quad_out, quad_in_out),
        I::Quart => pick3(mode, t, b, c, d, quart_in, quart_out, quart_in_out),
        I::Quint => pick3(mode, t, b, c, d, quint_in, quint_out, quint_in_out),
        I::Sine => pick3(mode, t, b, c, d, sine_in, sine_out, sine_in_out),
    }
}

/// `Auto` picks ease-out for the overshooting families and ease-in for the rest.
pub fn resolve_auto(interpolation: Interpolation, easing: Easing) -> Easing {
    match easing {
        Easing::Auto => match interpolation {
            Interpolation::Back | Interpolation::Bounce | Interpolation::Elastic => Easing::Out,
            _ => Easing::In,
        },
        other => other,
    }
}

type Ease4 = fn(f32, f32, f32, f32) -> f32;
type Ease5 = fn(f32, f32, f32, f32, f32) -> f32;

#[inline]
#[allow(clippy::too_many_arguments)]
fn pick3(mode: Easing, t: f32, b: f32, c: f32, d: f32, i: Ease4, o: Ease4, io: Ease4) -> f32 {
    match mode {
        Easing::Out => o(t, b, c, d),
        Easing::InOut => io(t, b, c, d),
        _ => i(t, b, c, d),
    }
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn pick(
    mode: Easing,
    t: f32,
    b: f32,
    c: f32,
    d: f32,
    extra: f32,
    i: Ease5,
    o: Ease5,
    io: Ease5,
) -> f32 {
    match mode {
        Easing::Out => o(t, b, c, d, extra),
        Easing::InOut => io(t, b, c, d, extra),
        _ => i(t, b, c, d, extra),
    }
}

#[inline]
pub fn linear(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c * t / d + b
}

pub fn back_in(t: f32, b: f32, c: f32, d: f32, s: f32) -> f32 {
    let t = t / d;
    c * t * t * ((s + 1.0) * t - s) + b
}

pub fn back_out(t: f32, b: f32, c: f32, d: f32, s: f32) -> f32 {
    let t = t / d - 1.0;
    c * (t * t * ((s + 1.0) * t + s) + 1.0) + b
}

pub fn back_in_out(t: f32, b: f32, c: f32, d: f32, s: f32) -> f32 {
    let s = s * 1.525;
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * (t * t * ((s + 1.0) * t - s)) + b;
    }
    t -= 2.0;
    c / 2.0 * (t * t * ((s + 1.0) * t + s) + 2.0) + b
}

pub fn bounce_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let mut t = t / d;
    if t < 1.0 / 2.75 {
        c * (7.5625 * t * t) + b
    } else if t < 2.0 / 2.75 {
        t -= 1.5 / 2.75;
        c * (7.5625 * t * t + 0.75) + b
    } else if t < 2.5 / 2.75 {
        t -= 2.25 / 2.75;
        c * (7.5625 * t * t + 0.9375) + b
    } else {
        t -= 2.625 / 2.75;
        c * (7.5625 * t * t + 0.984_375) + b
    }
}

pub fn bounce_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c - bounce_out(d - t, 0.0, c, d) + b
}

pub fn bounce_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    if t < d / 2.0 {
        bounce_in(t * 2.0, 0.0, c, d) * 0.5 + b
    } else {
        bounce_out(t * 2.0 - d, 0.0, c, d) * 0.5 + c * 0.5 + b
    }
}

pub fn circ_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    -c * ((1.0 - t * t).max(0.0).sqrt() - 1.0) + b
}

pub fn circ_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    c * (1.0 - t * t).max(0.0).sqrt() + b
}

pub fn circ_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return -c / 2.0 * ((1.0 - t * t).max(0.0).sqrt() - 1.0) + b;
    }
    t -= 2.0;
    c / 2.0 * ((1.0 - t * t).max(0.0).sqrt() + 1.0) + b
}

pub fn cubic_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t * t + b
}

pub fn cubic_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    c * (t * t * t + 1.0) + b
}

pub fn cubic_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t * t + b;
    }
    t -= 2.0;
    c / 2.0 * (t * t * t + 2.0) + b
}

/// Default period and amplitude handling for the elastic family.
fn elastic_shape(c: f32, d: f32, amplitude: f32, period: f32, default_period: f32) -> (f32, f32, f32) {
    let p = if period == 0.0 { d * default_period } else { period };
    if amplitude == 0.0 || amplitude < c.abs() {
        (c, p, p / 4.0)
    } else {
        (amplitude, p, p / (2.0 * PI) * (c / amplitude).asin())
    }
}

pub fn elastic_in(t: f32, b: f32, c: f32, d: f32, amplitude: f32, period: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    let t = t / d;
    if t == 1.0 {
        return b + c;
    }
    let (a, p, s) = elastic_shape(c, d, amplitude, period, 0.3);
    let t = t - 1.0;
    -(a * 2f32.powf(10.0 * t) * ((t * d - s) * (2.0 * PI) / p).sin()) + b
}

pub fn elastic_out(t: f32, b: f32, c: f32, d: f32, amplitude: f32, period: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    let t = t / d;
    if t == 1.0 {
        return b + c;
    }
    let (a, p, s) = elastic_shape(c, d, amplitude, period, 0.3);
    a * 2f32.powf(-10.0 * t) * ((t * d - s) * (2.0 * PI) / p).sin() + c + b
}

pub fn elastic_in_out(t: f32, b: f32, c: f32, d: f32, amplitude: f32, period: f32) -> f32 {
    if t == 0.0 {
        return b;
    }
    let t = t / (d / 2.0);
    if t == 2.0 {
        return b + c;
    }
    let (a, p, s) = elastic_shape(c, d, amplitude, period, 0.3 * 1.5);
    let t = t - 1.0;
    let wave = ((t * d - s) * (2.0 * PI) / p).sin();
    if t < 0.0 {
        -0.5 * (a * 2f32.powf(10.0 * t) * wave) + b
    } else {
        a * 2f32.powf(-10.0 * t) * wave * 0.5 + c + b
    }
}

const EXPO_MIN: f32 = 0.000_976_562_5;
const EXPO_SCALE: f32 = 1.0 / (1.0 - EXPO_MIN);

pub fn expo_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c * (2f32.powf(10.0 * (t / d - 1.0)) - EXPO_MIN) * EXPO_SCALE + b
}

pub fn expo_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c * (1.0 - (2f32.powf(-10.0 * t / d) - EXPO_MIN) * EXPO_SCALE) + b
}

pub fn expo_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * (2f32.powf(10.0 * (t - 1.0)) - EXPO_MIN) * EXPO_SCALE + b;
    }
    let t = t - 1.0;
    c / 2.0 * (2.0 - (2f32.powf(-10.0 * t) - EXPO_MIN) * EXPO_SCALE) + b
}

pub fn quad_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t + b
}

pub fn quad_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    -c * t * (t - 2.0) + b
}

pub fn quad_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t + b;
    }
    t -= 1.0;
    -c / 2.0 * (t * (t - 2.0) - 1.0) + b
}

pub fn quart_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t * t * t + b
}

pub fn quart_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    -c * (t * t * t * t - 1.0) + b
}

pub fn quart_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t * t * t + b;
    }
    t -= 2.0;
    -c / 2.0 * (t * t * t * t - 2.0) + b
}

pub fn quint_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d;
    c * t * t * t * t * t + b
}

pub fn quint_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let t = t / d - 1.0;
    c * (t * t * t * t * t + 1.0) + b
}

pub fn quint_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t * t * t * t + b;
    }
    t -= 2.0;
    c / 2.0 * (t * t * t * t * t + 2.0) + b
}

pub fn sine_in(t: f32, b: f32, c: f32, d: f32) -> f32 {
    -c * (t / d * FRAC_PI_2).cos() + c + b
}

pub fn sine_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    c * (t / d * FRAC_PI_2).sin() + b
}

pub fn sine_in_out(t: f32, b: f32, c: f32, d: f32) -> f32 {
    -c / 2.0 * ((PI * t / d).cos() - 1.0) + b
}
