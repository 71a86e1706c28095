//! Cubic Bezier segment solver.
//!
//! A keyframe segment is a 2D cubic Bezier whose X axis is time. Evaluating it at a
//! time means finding the curve parameter `u` where `X(u) == time` (a cubic root) and
//! then evaluating `Y(u)` with the same basis. Roots are computed in `f64` with the
//! closed-form Cardano solution.

/// Lower bound of the accepted root band. Tolerates roots that land a hair before 0.
pub const ROOT_MIN: f32 = -1.0e-10;
/// Upper bound of the accepted root band.
pub const ROOT_MAX: f32 = 1.000_001;

/// Up to three accepted roots, in discovery order.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Roots {
    vals: [f32; 3],
    len: usize,
}

impl Roots {
    #[inline]
    fn push_if_accepted(&mut self, root: f64) {
        let r = root as f32;
        if (ROOT_MIN..=ROOT_MAX).contains(&r) {
            self.vals[self.len] = r;
            self.len += 1;
        }
    }

    #[inline]
    pub fn first(&self) -> Option<f32> {
        self.as_slice().first().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.vals[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Solve `c0 + c1·t + c2·t² + c3·t³ = 0`, keeping roots inside `[ROOT_MIN, ROOT_MAX]`.
///
/// With a single real root (positive discriminant) only that root is considered.
/// The degenerate quadratic, linear and constant equations are handled explicitly;
/// the constant equation `0 = 0` yields the single root `0`.
pub fn solve_cubic(c0: f64, c1: f64, c2: f64, c3: f64) -> Roots {
    let mut roots = Roots::default();

    if c3 != 0.0 {
        let a = c2 / c3 / 3.0;
        let b = c1 / c3;
        let c = c0 / c3;

        let p = b / 3.0 - a * a;
        let q = (2.0 * a * a * a - a * b + c) / 2.0;
        let d = q * q + p * p * p;

        if d > 0.0 {
            let t = d.sqrt();
            roots.push_if_accepted((-q + t).cbrt() + (-q - t).cbrt() - a);
            return roots;
        }

        if d == 0.0 {
            let t = (-q).cbrt();
            roots.push_if_accepted(2.0 * t - a);
            roots.push_if_accepted(-t - a);
            return roots;
        }

        let phi = (-q / (-(p * p * p)).sqrt()).acos();
        let t = (-p).sqrt();
        let cp = (phi / 3.0).cos();
        let sq = (3.0 - 3.0 * cp * cp).sqrt();
        roots.push_if_accepted(2.0 * t * cp - a);
        roots.push_if_accepted(-t * (cp + sq) - a);
        roots.push_if_accepted(-t * (cp - sq) - a);
        return roots;
    }

    let (a, b, c) = (c2, c1, c0);

    if a != 0.0 {
        let disc = b * b - 4.0 * a * c;
        if disc > 0.0 {
            let s = disc.sqrt();
            roots.push_if_accepted((-b - s) / (2.0 * a));
            roots.push_if_accepted((-b + s) / (2.0 * a));
        } else if disc == 0.0 {
            roots.push_if_accepted(-b / (2.0 * a));
        }
        return roots;
    }

    if b != 0.0 {
        roots.push_if_accepted(-c / b);
        return roots;
    }

    if c == 0.0 {
        roots.vals[0] = 0.0;
        roots.len = 1;
    }
    roots
}

/// Parameters `u` at which the Bezier X polynomial with control values `q0..q3`
/// equals `x`.
pub fn find_zero(x: f32, q0: f32, q1: f32, q2: f32, q3: f32) -> Roots {
    let (x, q0, q1, q2, q3) = (x as f64, q0 as f64, q1 as f64, q2 as f64, q3 as f64);
    let c0 = q0 - x;
    let c1 = 3.0 * (q1 - q0);
    let c2 = 3.0 * (q0 - 2.0 * q1 + q2);
    let c3 = q3 - q0 + 3.0 * (q1 - q2);
    solve_cubic(c0, c1, c2, c3)
}

/// Evaluate the cubic Bezier basis with control values `f1..f4` at parameter `u`.
#[inline]
pub fn bezier_y(f1: f32, f2: f32, f3: f32, f4: f32, u: f32) -> f32 {
    let c0 = f1;
    let c1 = 3.0 * (f2 - f1);
    let c2 = 3.0 * (f1 - 2.0 * f2 + f3);
    let c3 = f4 - f1 + 3.0 * (f2 - f3);
    c0 + u * c1 + u * u * c2 + u * u * u * c3
}

/// Shorten segment handles whose time span exceeds the segment, so X stays monotonic.
///
/// `v1` and `v4` are the keys, `v2` the right handle of `v1`, `v3` the left handle
/// of `v4`. A handle that reaches past the other key is scaled toward its own key
/// until it ends exactly at the other key's time.
pub fn correct_bezpart(v1: [f32; 2], v2: &mut [f32; 2], v3: &mut [f32; 2], v4: [f32; 2]) {
    let h1 = [v1[0] - v2[0], v1[1] - v2[1]];
    let h2 = [v4[0] - v3[0], v4[1] - v3[1]];

    let len = v4[0] - v1[0];
    let len1 = h1[0].abs();
    let len2 = h2[0].abs();

    if len1 + len2 == 0.0 {
        return;
    }

    if len1 > len {
        let fac = len / len1;
        v2[0] = v1[0] - fac * h1[0];
        v2[1] = v1[1] - fac * h1[1];
    }
    if len2 > len {
        let fac = len / len2;
        v3[0] = v4[0] - fac * h2[0];
        v3[1] = v4[1] - fac * h2[1];
    }
}

/// Value of the Bezier segment `(v1, v2, v3, v4)` at time `t`.
///
/// Returns `None` when no root lands in the accepted band; the caller decides the
/// fallback.
pub fn bezier_segment_value(
    v1: [f32; 2],
    mut v2: [f32; 2],
    mut v3: [f32; 2],
    v4: [f32; 2],
    t: f32,
) -> Option<f32> {
    if (v1[1] - v4[1]).abs() < f32::EPSILON
        && (v2[1] - v3[1]).abs() < f32::EPSILON
        && (v3[1] - v4[1]).abs() < f32::EPSILON
    {
        return Some(v1[1]);
    }

    correct_bezpart(v1, &mut v2, &mut v3, v4);
    let u = find_zero(t, v1[0], v2[0], v3[0], v4[0]).first()?;
    Some(bezier_y(v1[1], v2[1], v3[1], v4[1], u))
}
