//! Curve and strip modifiers.
//!
//! A modifier participates in up to two passes: the *time pass* remaps the time the
//! curve is sampled at (Cycles, Limits, Stepped), the *value pass* transforms the
//! sampled value (Generator, FnGenerator, Envelope, Cycles offset, Noise, Limits).
//! Each kind is one variant of [`ModifierKind`]; see [`stack`] for the passes.

pub mod noise;
pub mod stack;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use stack::{JoinedModifiers, ModifierStack, ModifierStorage};

/// Restricted frame range with linear blend ramps at both edges.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: f32,
    pub end: f32,
    #[serde(default)]
    pub blend_in: f32,
    #[serde(default)]
    pub blend_out: f32,
}

impl FrameRange {
    pub fn new(start: f32, end: f32) -> Self {
        Self {
            start,
            end,
            blend_in: 0.0,
            blend_out: 0.0,
        }
    }

    pub fn with_blend(mut self, blend_in: f32, blend_out: f32) -> Self {
        self.blend_in = blend_in;
        self.blend_out = blend_out;
        self
    }

    #[inline]
    pub fn contains(&self, t: f32) -> bool {
        self.start <= t && t <= self.end
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    #[serde(default)]
    pub muted: bool,
    /// Set by the engine's owner when the modifier cannot run (e.g. bad data).
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub range: Option<FrameRange>,
    /// User influence; `None` means full.
    #[serde(default)]
    pub influence: Option<f32>,
}

impl Modifier {
    pub fn new(kind: ModifierKind) -> Self {
        Self {
            kind,
            muted: false,
            disabled: false,
            range: None,
            influence: None,
        }
    }

    pub fn with_range(mut self, range: FrameRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_influence(mut self, influence: f32) -> Self {
        self.influence = Some(influence);
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// Muted, disabled, or outside its restricted range.
    #[inline]
    pub fn is_active_at(&self, t: f32) -> bool {
        if self.muted || self.disabled {
            return false;
        }
        self.range.map_or(true, |r| r.contains(t))
    }

    /// Blend weight at `t`.
    pub fn influence_at(&self, t: f32) -> f32 {
        let influence = self.influence.unwrap_or(1.0);
        let Some(r) = self.range else {
            return influence;
        };
        if t <= r.start || t >= r.end {
            return 0.0;
        }
        if r.blend_in != 0.0 && t >= r.start && t <= r.start + r.blend_in {
            return influence * (t - r.start) / r.blend_in;
        }
        if r.blend_out != 0.0 && t <= r.end && t >= r.end - r.blend_out {
            return influence * (t - r.end) / -r.blend_out;
        }
        influence
    }

    /// Kinds that produce a curve on their own, so a curve without keys is not empty.
    #[inline]
    pub fn generates_curve(&self) -> bool {
        matches!(
            self.kind,
            ModifierKind::Generator(_) | ModifierKind::FnGenerator(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierKind {
    Generator(Generator),
    FnGenerator(FnGenerator),
    Envelope(Envelope),
    Cycles(Cycles),
    Noise(NoiseMod),
    Limits(Limits),
    Stepped(Stepped),
}

// ---------- Generator ----------

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolyMode {
    /// `c0 + c1·t + c2·t² + ...`
    #[default]
    Expanded,
    /// `(c0·t + c1)(c2·t + c3)...`
    Factorised,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    #[serde(default)]
    pub mode: PolyMode,
    pub coefficients: Vec<f32>,
    #[serde(default)]
    pub additive: bool,
}

impl Generator {
    fn evaluate(&self, value: f32, t: f32) -> f32 {
        let result = match self.mode {
            PolyMode::Expanded => {
                let mut power = 1.0f32;
                let mut sum = 0.0f32;
                for c in &self.coefficients {
                    sum += c * power;
                    power *= t;
                }
                sum
            }
            PolyMode::Factorised => self
                .coefficients
                .chunks_exact(2)
                .fold(1.0f32, |acc, pair| acc * (pair[0] * t + pair[1])),
        };
        if self.additive {
            value + result
        } else {
            result
        }
    }
}

// ---------- FnGenerator ----------

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinFn {
    Sin,
    Cos,
    Tan,
    Sqrt,
    Ln,
    Sinc,
}

fn one() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FnGenerator {
    pub function: BuiltinFn,
    #[serde(default = "one")]
    pub amplitude: f32,
    #[serde(default = "one")]
    pub phase_multiplier: f32,
    #[serde(default)]
    pub phase_offset: f32,
    #[serde(default)]
    pub value_offset: f32,
    #[serde(default)]
    pub additive: bool,
}

impl FnGenerator {
    pub fn new(function: BuiltinFn) -> Self {
        Self {
            function,
            amplitude: 1.0,
            phase_multiplier: 1.0,
            phase_offset: 0.0,
            value_offset: 0.0,
            additive: false,
        }
    }

    fn evaluate(&self, value: f32, t: f32) -> f32 {
        let arg = self.phase_multiplier as f64 * t as f64 + self.phase_offset as f64;
        let f: Option<f64> = match self.function {
            BuiltinFn::Sin => Some(arg.sin()),
            BuiltinFn::Cos => Some(arg.cos()),
            BuiltinFn::Sinc => Some(if arg == 0.0 { 1.0 } else { arg.sin() / arg }),
            BuiltinFn::Tan => {
                let pole = (arg - std::f64::consts::FRAC_PI_2) % std::f64::consts::PI;
                if pole.abs() < f64::EPSILON {
                    None
                } else {
                    Some(arg.tan())
                }
            }
            BuiltinFn::Ln => (arg > 0.0).then(|| arg.ln()),
            BuiltinFn::Sqrt => (arg > 0.0).then(|| arg.sqrt()),
        };
        match f {
            Some(f) => {
                let result = self.amplitude * f as f32 + self.value_offset;
                if self.additive {
                    value + result
                } else {
                    result
                }
            }
            None => {
                debug!(function = ?self.function, arg, "fn generator outside its domain");
                if self.additive {
                    value
                } else {
                    0.0
                }
            }
        }
    }
}

// ---------- Envelope ----------

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    pub time: f32,
    pub min: f32,
    pub max: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Reference value the default range is relative to.
    #[serde(default)]
    pub reference: f32,
    #[serde(default = "neg_one")]
    pub default_min: f32,
    #[serde(default = "one")]
    pub default_max: f32,
    /// Control points, sorted by time.
    #[serde(default)]
    pub points: Vec<EnvelopePoint>,
}

fn neg_one() -> f32 {
    -1.0
}

impl Envelope {
    fn bounds_at(&self, t: f32) -> Option<(f32, f32)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if first.time >= t {
            return Some((first.min, first.max));
        }
        if last.time <= t {
            return Some((last.min, last.max));
        }
        self.points.windows(2).find_map(|w| {
            let (a, b) = (w[0], w[1]);
            if a.time <= t && b.time >= t {
                let diff = b.time - a.time;
                let afra = (t - a.time) / diff;
                let bfra = (b.time - t) / diff;
                Some((bfra * a.min + afra * b.min, bfra * a.max + afra * b.max))
            } else {
                None
            }
        })
    }

    fn evaluate(&self, value: f32, t: f32) -> f32 {
        let Some((min, max)) = self.bounds_at(t) else {
            return value;
        };
        let span = self.default_max - self.default_min;
        if span == 0.0 {
            debug!("envelope reference range is empty");
            return value;
        }
        let fac = (value - (self.reference + self.default_min)) / span;
        min + fac * (max - min)
    }
}

// ---------- Cycles ----------

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    Off,
    #[default]
    Repeat,
    RepeatOffset,
    RepeatMirror,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Cycles {
    #[serde(default)]
    pub before_mode: CycleMode,
    #[serde(default)]
    pub after_mode: CycleMode,
    /// 0 = infinite
    #[serde(default)]
    pub before_cycles: u32,
    #[serde(default)]
    pub after_cycles: u32,
}

/// First and last key of the curve a modifier stack runs on.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KeyExtent {
    pub first: [f32; 2],
    pub last: [f32; 2],
}

impl Cycles {
    pub fn repeat() -> Self {
        Self::default()
    }

    pub fn with_modes(before: CycleMode, after: CycleMode) -> Self {
        Self {
            before_mode: before,
            after_mode: after,
            ..Self::default()
        }
    }

    /// Fold `t` into the key range. Returns the folded time and the value offset of
    /// the cycle it fell into.
    fn evaluate_time(&self, extent: KeyExtent, t: f32) -> (f32, f32) {
        let (prev, last) = (extent.first, extent.last);

        let (side, mode, cycles, ofs) = if t < prev[0] {
            (-1.0f32, self.before_mode, self.before_cycles, prev[0])
        } else if t > last[0] {
            (1.0f32, self.after_mode, self.after_cycles, last[0])
        } else {
            return (t, 0.0);
        };
        if mode == CycleMode::Off {
            return (t, 0.0);
        }

        let cycdx = last[0] - prev[0];
        let cycdy = last[1] - prev[1];
        if cycdx == 0.0 {
            return (t, 0.0);
        }

        let cycle = side * (t - ofs) / cycdx;
        let cyct = (t - ofs) % cycdx;

        if cycles != 0 && cycle > cycles as f32 {
            return (t, 0.0);
        }

        let offset = if mode == CycleMode::RepeatOffset {
            let n = (t - ofs) / cycdx;
            let n = if side < 0.0 { n.floor() } else { n.ceil() };
            n * cycdy
        } else {
            0.0
        };

        let mirror = mode == CycleMode::RepeatMirror;
        let mut folded = if cyct == 0.0 {
            let odd = (cycle as i64) % 2 != 0;
            match (side > 0.0, mirror && odd) {
                (true, false) | (false, true) => last[0],
                (false, false) | (true, true) => prev[0],
            }
        } else if mirror && ((cycle + 1.0) as i64) % 2 != 0 {
            if side < 0.0 {
                prev[0] - cyct
            } else {
                last[0] - cyct
            }
        } else {
            prev[0] + cyct
        };
        if folded < prev[0] {
            folded += cycdx;
        }
        (folded, offset)
    }
}

// ---------- Noise ----------

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseModification {
    #[default]
    Replace,
    Add,
    Subtract,
    Multiply,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseMod {
    #[serde(default = "one")]
    pub size: f32,
    #[serde(default = "one")]
    pub strength: f32,
    #[serde(default = "one")]
    pub phase: f32,
    #[serde(default)]
    pub offset: f32,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub modification: NoiseModification,
}

impl Default for NoiseMod {
    fn default() -> Self {
        Self {
            size: 1.0,
            strength: 1.0,
            phase: 1.0,
            offset: 0.0,
            depth: 0,
            modification: NoiseModification::Replace,
        }
    }
}

impl NoiseMod {
    fn evaluate(&self, value: f32, t: f32) -> f32 {
        let n = noise::turbulence(self.size, t - self.offset, self.phase, self.depth);
        match self.modification {
            NoiseModification::Replace => value + (n - 0.5) * self.strength,
            NoiseModification::Add => value + n * self.strength,
            NoiseModification::Subtract => value - n * self.strength,
            NoiseModification::Multiply => value * n * self.strength,
        }
    }
}

// ---------- Limits ----------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Limits {
    #[serde(default)]
    pub min_time: Option<f32>,
    #[serde(default)]
    pub max_time: Option<f32>,
    #[serde(default)]
    pub min_value: Option<f32>,
    #[serde(default)]
    pub max_value: Option<f32>,
}

impl Limits {
    fn evaluate_time(&self, t: f32) -> f32 {
        match (self.min_time, self.max_time) {
            (Some(min), _) if t <= min => min,
            (_, Some(max)) if t >= max => max,
            _ => t,
        }
    }

    fn evaluate(&self, value: f32) -> f32 {
        match (self.min_value, self.max_value) {
            (Some(min), _) if value < min => min,
            (_, Some(max)) if value > max => max,
            _ => value,
        }
    }
}

// ---------- Stepped ----------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stepped {
    #[serde(default = "two")]
    pub step: f32,
    #[serde(default)]
    pub offset: f32,
    /// Frames before this are left alone.
    #[serde(default)]
    pub start: Option<f32>,
    /// Frames after this are left alone.
    #[serde(default)]
    pub end: Option<f32>,
}

fn two() -> f32 {
    2.0
}

impl Stepped {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            offset: 0.0,
            start: None,
            end: None,
        }
    }

    fn evaluate_time(&self, t: f32) -> f32 {
        if self.start.is_some_and(|s| t < s) || self.end.is_some_and(|e| t > e) {
            return t;
        }
        if self.step == 0.0 {
            return t;
        }
        let block = ((t - self.offset) / self.step).trunc();
        block * self.step + self.offset
    }
}

// ---------- dispatch ----------

impl ModifierKind {
    /// Time pass for one modifier. `is_first` gates Cycles, which only folds time when
    /// it leads the stack. Returns the new time and the cycle value offset.
    pub(crate) fn evaluate_time(
        &self,
        extent: Option<KeyExtent>,
        is_first: bool,
        t: f32,
    ) -> (f32, f32) {
        match self {
            ModifierKind::Cycles(c) => match extent {
                Some(extent) if is_first => c.evaluate_time(extent, t),
                _ => (t, 0.0),
            },
            ModifierKind::Limits(l) => (l.evaluate_time(t), 0.0),
            ModifierKind::Stepped(s) => (s.evaluate_time(t), 0.0),
            ModifierKind::Generator(_)
            | ModifierKind::FnGenerator(_)
            | ModifierKind::Envelope(_)
            | ModifierKind::Noise(_) => (t, 0.0),
        }
    }

    /// Value pass for one modifier. `cycle_offset` is what the time pass stored for it.
    pub(crate) fn evaluate_value(&self, value: f32, t: f32, cycle_offset: f32) -> f32 {
        match self {
            ModifierKind::Generator(g) => g.evaluate(value, t),
            ModifierKind::FnGenerator(g) => g.evaluate(value, t),
            ModifierKind::Envelope(e) => e.evaluate(value, t),
            ModifierKind::Cycles(_) => value + cycle_offset,
            ModifierKind::Noise(n) => n.evaluate(value, t),
            ModifierKind::Limits(l) => l.evaluate(value),
            ModifierKind::Stepped(_) => value,
        }
    }

    /// Does this kind implement a time pass at all.
    #[inline]
    pub(crate) fn has_time_pass(&self) -> bool {
        matches!(
            self,
            ModifierKind::Cycles(_) | ModifierKind::Limits(_) | ModifierKind::Stepped(_)
        )
    }

    #[inline]
    pub(crate) fn has_value_pass(&self) -> bool {
        !matches!(self, ModifierKind::Stepped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn extent() -> KeyExtent {
        KeyExtent {
            first: [0.0, 0.0],
            last: [10.0, 5.0],
        }
    }

    #[test]
    fn influence_ramps_inside_range() {
        let m = Modifier::new(ModifierKind::Limits(Limits::default()))
            .with_range(FrameRange::new(0.0, 10.0).with_blend(2.0, 4.0));
        approx(m.influence_at(0.0), 0.0, 0.0);
        approx(m.influence_at(1.0), 0.5, 1e-6);
        approx(m.influence_at(5.0), 1.0, 0.0);
        approx(m.influence_at(8.0), 0.5, 1e-6);
        approx(m.influence_at(10.0), 0.0, 0.0);
    }

    #[test]
    fn generator_modes() {
        let expanded = Generator {
            mode: PolyMode::Expanded,
            coefficients: vec![1.0, 2.0, 3.0],
            additive: false,
        };
        approx(expanded.evaluate(100.0, 2.0), 1.0 + 4.0 + 12.0, 1e-6);
        let factorised = Generator {
            mode: PolyMode::Factorised,
            coefficients: vec![1.0, 1.0, 2.0, -1.0],
            additive: true,
        };
        // (t + 1)(2t - 1) at t = 2 -> 9, added to 1
        approx(factorised.evaluate(1.0, 2.0), 10.0, 1e-6);
    }

    #[test]
    fn fn_generator_domain() {
        let mut ln = FnGenerator::new(BuiltinFn::Ln);
        approx(ln.evaluate(7.0, 1.0), 0.0, 1e-7);
        approx(ln.evaluate(7.0, -1.0), 0.0, 0.0);
        ln.additive = true;
        approx(ln.evaluate(7.0, -1.0), 7.0, 0.0);
        let sinc = FnGenerator::new(BuiltinFn::Sinc);
        approx(sinc.evaluate(0.0, 0.0), 1.0, 0.0);
    }

    #[test]
    fn fn_generator_sqrt_needs_positive_argument() {
        let mut sqrt = FnGenerator::new(BuiltinFn::Sqrt);
        sqrt.value_offset = 3.0;
        approx(sqrt.evaluate(5.0, 4.0), 5.0, 1e-6);
        // zero is outside the domain, so the offset is not applied either
        approx(sqrt.evaluate(5.0, 0.0), 0.0, 0.0);
        sqrt.additive = true;
        approx(sqrt.evaluate(5.0, 0.0), 5.0, 0.0);
    }

    #[test]
    fn envelope_maps_reference_range() {
        let env = Envelope {
            reference: 0.0,
            default_min: -1.0,
            default_max: 1.0,
            points: vec![
                EnvelopePoint {
                    time: 0.0,
                    min: -2.0,
                    max: 2.0,
                },
                EnvelopePoint {
                    time: 10.0,
                    min: 0.0,
                    max: 4.0,
                },
            ],
        };
        // value 1 is the top of the reference range -> max of the envelope
        approx(env.evaluate(1.0, -5.0), 2.0, 1e-6);
        approx(env.evaluate(1.0, 5.0), 3.0, 1e-6);
        approx(env.evaluate(-1.0, 20.0), 0.0, 1e-6);
        let empty = Envelope {
            points: vec![],
            ..env
        };
        approx(empty.evaluate(0.3, 1.0), 0.3, 0.0);
    }

    #[test]
    fn cycles_repeat_and_offset() {
        let repeat = Cycles::repeat();
        let (t, off) = repeat.evaluate_time(extent(), 13.0);
        approx(t, 3.0, 1e-5);
        approx(off, 0.0, 0.0);
        let (t, _) = repeat.evaluate_time(extent(), -3.0);
        approx(t, 7.0, 1e-5);

        let offset = Cycles::with_modes(CycleMode::RepeatOffset, CycleMode::RepeatOffset);
        let (t, off) = offset.evaluate_time(extent(), 13.0);
        approx(t, 3.0, 1e-5);
        approx(off, 5.0, 1e-6);
        let (t, off) = offset.evaluate_time(extent(), -3.0);
        approx(t, 7.0, 1e-5);
        approx(off, -5.0, 1e-6);
    }

    #[test]
    fn cycles_mirror_and_count() {
        let mirror = Cycles::with_modes(CycleMode::RepeatMirror, CycleMode::RepeatMirror);
        let (t, _) = mirror.evaluate_time(extent(), 13.0);
        approx(t, 7.0, 1e-5);
        let (t, _) = mirror.evaluate_time(extent(), 23.0);
        approx(t, 3.0, 1e-5);
        let (t, _) = mirror.evaluate_time(extent(), 20.0);
        approx(t, 0.0, 1e-5);

        let limited = Cycles {
            after_cycles: 1,
            ..Cycles::repeat()
        };
        let (t, _) = limited.evaluate_time(extent(), 25.0);
        approx(t, 25.0, 0.0);
    }

    #[test]
    fn stepped_truncates_blocks() {
        let s = Stepped {
            step: 2.0,
            offset: 0.5,
            start: Some(0.0),
            end: None,
        };
        approx(s.evaluate_time(3.9), 2.5, 1e-6);
        approx(s.evaluate_time(-1.0), -1.0, 0.0);
        approx(Stepped::new(0.0).evaluate_time(3.3), 3.3, 0.0);
    }

    #[test]
    fn limits_clamp_both_axes() {
        let l = Limits {
            min_time: Some(1.0),
            max_time: Some(4.0),
            min_value: None,
            max_value: Some(2.0),
        };
        approx(l.evaluate_time(0.0), 1.0, 0.0);
        approx(l.evaluate_time(9.0), 4.0, 0.0);
        approx(l.evaluate(3.0), 2.0, 0.0);
        approx(l.evaluate(-3.0), -3.0, 0.0);
    }
}
