//! Strips: one placement of an action, a cross-fade between neighbours, or a
//! container of child strips.

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::ids::{ActionId, StripId};
use crate::modifier::{Modifier, ModifierStack};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Replace,
    Add,
    Subtract,
    Multiply,
}

/// What a strip does outside its own frame range.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extend {
    Nothing,
    /// Hold both the first and the last frame. Only meaningful on a track's first strip.
    Hold,
    #[default]
    HoldForward,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StripKind {
    Clip { action: ActionId },
    Transition,
    Meta { strips: Vec<Strip> },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripFlags {
    pub muted: bool,
    pub reversed: bool,
    /// Evaluate at global time, ignoring the strip range.
    pub no_time_map: bool,
    /// `influence` (or `influence_curve`) replaces the blend ramps.
    pub user_influence: bool,
    /// `strip_time` (or `time_curve`) replaces the time mapping.
    pub user_time: bool,
    pub user_time_cyclic: bool,
    /// Blend ramps are derived from overlaps with the tracks above and below.
    pub auto_blends: bool,
}

/// Influence and local time of a strip at one global time.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StripControls {
    pub influence: f32,
    pub strip_time: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strip {
    #[serde(default)]
    pub id: StripId,
    #[serde(default)]
    pub name: String,
    pub kind: StripKind,
    pub start: f32,
    pub end: f32,
    #[serde(default)]
    pub action_start: f32,
    #[serde(default)]
    pub action_end: f32,
    #[serde(default = "one")]
    pub repeat: f32,
    #[serde(default = "one")]
    pub scale: f32,
    #[serde(default)]
    pub blend_in: f32,
    #[serde(default)]
    pub blend_out: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub extend: Extend,
    #[serde(default)]
    pub flags: StripFlags,
    /// User influence, read when `flags.user_influence` is set.
    #[serde(default = "one")]
    pub influence: f32,
    /// User strip time, read when `flags.user_time` is set.
    #[serde(default)]
    pub strip_time: f32,
    #[serde(default)]
    pub influence_curve: Option<Curve>,
    #[serde(default)]
    pub time_curve: Option<Curve>,
    #[serde(default)]
    pub modifiers: ModifierStack,
}

fn one() -> f32 {
    1.0
}

impl Strip {
    fn with_kind(name: impl Into<String>, kind: StripKind, start: f32, end: f32) -> Self {
        Self {
            id: StripId::fresh(),
            name: name.into(),
            kind,
            start,
            end,
            action_start: 0.0,
            action_end: 0.0,
            repeat: 1.0,
            scale: 1.0,
            blend_in: 0.0,
            blend_out: 0.0,
            blend_mode: BlendMode::Replace,
            extend: Extend::HoldForward,
            flags: StripFlags::default(),
            influence: 1.0,
            strip_time: 0.0,
            influence_curve: None,
            time_curve: None,
            modifiers: ModifierStack::default(),
        }
    }

    /// Clip playing `action_range` of `action` once, starting at `start`.
    pub fn clip(
        name: impl Into<String>,
        action: ActionId,
        action_range: (f32, f32),
        start: f32,
    ) -> Self {
        let mut strip = Self::with_kind(name, StripKind::Clip { action }, start, start);
        strip.action_start = action_range.0;
        strip.action_end = action_range.1;
        strip.recalculate_bounds();
        strip
    }

    pub fn transition(name: impl Into<String>, start: f32, end: f32) -> Self {
        Self::with_kind(name, StripKind::Transition, start, end)
    }

    /// Container spanning its children.
    pub fn meta(name: impl Into<String>, strips: Vec<Strip>) -> Self {
        let start = strips.first().map_or(0.0, |s| s.start);
        let end = strips.last().map_or(0.0, |s| s.end);
        Self::with_kind(name, StripKind::Meta { strips }, start, end)
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn with_extend(mut self, extend: Extend) -> Self {
        self.extend = extend;
        self
    }

    pub fn with_blend(mut self, blend_in: f32, blend_out: f32) -> Self {
        self.blend_in = blend_in;
        self.blend_out = blend_out;
        self
    }

    pub fn with_repeat(mut self, repeat: f32) -> Self {
        self.repeat = repeat;
        self.recalculate_bounds();
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self.recalculate_bounds();
        self
    }

    pub fn reversed(mut self, reversed: bool) -> Self {
        self.flags.reversed = reversed;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.flags.muted = muted;
        self
    }

    /// Fixed user influence.
    pub fn with_influence(mut self, influence: f32) -> Self {
        self.flags.user_influence = true;
        self.influence = influence;
        self
    }

    pub fn with_influence_curve(mut self, curve: Curve) -> Self {
        self.flags.user_influence = true;
        self.influence_curve = Some(curve);
        self
    }

    pub fn with_time_curve(mut self, curve: Curve, cyclic: bool) -> Self {
        self.flags.user_time = true;
        self.flags.user_time_cyclic = cyclic;
        self.time_curve = Some(curve);
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_flags(mut self, flags: StripFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    /// Action played by a clip.
    pub fn action(&self) -> Option<ActionId> {
        match self.kind {
            StripKind::Clip { action } => Some(action),
            _ => None,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.kind, StripKind::Transition)
    }

    pub fn children(&self) -> &[Strip] {
        match &self.kind {
            StripKind::Meta { strips } => strips,
            _ => &[],
        }
    }

    /// Blend ramp weight at `t`, ignoring the user influence.
    pub fn influence_at(&self, t: f32) -> f32 {
        let blend_in = self.blend_in.abs();
        let blend_out = self.blend_out.abs();
        if blend_in != 0.0 && t <= self.start + blend_in {
            return (t - self.start).abs() / blend_in;
        }
        if blend_out != 0.0 && t >= self.end - blend_out {
            return (self.end - t).abs() / blend_out;
        }
        1.0
    }

    /// Normalised scale and repeat plus the action length, as used by clip mapping.
    fn clip_factors(&self) -> (f32, f32, f32) {
        let repeat = if self.repeat == 0.0 { 1.0 } else { self.repeat };
        let scale = match self.scale.abs() {
            s if s == 0.0 => 1.0,
            s => s,
        };
        let length = match self.action_end - self.action_start {
            l if l <= 0.0 => 1.0,
            l => l,
        };
        (repeat, scale, length)
    }

    /// Strip-local time for global time `t`.
    ///
    /// Clips return action time, wrapping over repeats. Transitions and meta strips
    /// return the normalised position within the strip.
    pub fn map_time(&self, t: f32) -> f32 {
        match self.kind {
            StripKind::Clip { .. } => {
                let (repeat, scale, length) = self.clip_factors();
                let at_end = (t - self.end).abs() < f32::EPSILON && repeat == repeat.floor();
                let local = (t - self.start) % (length * scale) / scale;
                match (self.flags.reversed, at_end) {
                    (false, true) => self.action_end,
                    (false, false) => self.action_start + local,
                    (true, true) => self.action_start,
                    (true, false) => self.action_end - local,
                }
            }
            StripKind::Transition | StripKind::Meta { .. } => {
                let length = self.length();
                if length == 0.0 {
                    return 0.0;
                }
                if self.flags.reversed {
                    (self.end - t) / length
                } else {
                    (t - self.start) / length
                }
            }
        }
    }

    /// Global time of a strip-local time; the inverse of the first repeat of [`map_time`](Self::map_time).
    pub fn map_to_global(&self, local: f32) -> f32 {
        match self.kind {
            StripKind::Clip { .. } => {
                let (_, scale, _) = self.clip_factors();
                if self.flags.reversed {
                    self.end - scale * (local - self.action_start)
                } else {
                    self.start + scale * (local - self.action_start)
                }
            }
            StripKind::Transition | StripKind::Meta { .. } => {
                let length = self.length();
                if self.flags.reversed {
                    self.end - length * local
                } else {
                    length * local + self.start
                }
            }
        }
    }

    /// Strip-local time of a global time without repeat wrapping.
    pub fn map_to_local(&self, t: f32) -> f32 {
        match self.kind {
            StripKind::Clip { .. } => {
                let (_, scale, _) = self.clip_factors();
                if self.flags.reversed {
                    (self.end + (self.action_start * scale - t)) / scale
                } else {
                    self.action_start + (t - self.start) / scale
                }
            }
            StripKind::Transition | StripKind::Meta { .. } => self.map_time(t),
        }
    }

    /// Move a clip's end so the strip plays its action range `repeat` times at `scale`.
    pub fn recalculate_bounds(&mut self) {
        if !matches!(self.kind, StripKind::Clip { .. }) {
            return;
        }
        let mut length = self.action_end - self.action_start;
        if length == 0.0 {
            length = 1.0;
        }
        let mapping = self.scale * self.repeat;
        if mapping != 0.0 {
            self.end = self.start + length * mapping;
        }
    }

    /// Keep both blend ramps inside the strip.
    pub fn recalculate_blend(&mut self) {
        if self.blend_in == 0.0 && self.blend_out == 0.0 {
            return;
        }
        let length = self.length();
        let blend_in_max = (length - self.blend_out).max(0.0);
        self.blend_in = self.blend_in.clamp(0.0, blend_in_max);
        self.blend_out = self.blend_out.clamp(0.0, (length - self.blend_in).max(0.0));
    }

    /// Influence and local time at global time `t`.
    ///
    /// Curves on the strip are evaluated at `t` itself. The cyclic user-time wrap is
    /// relative to the action range.
    pub fn controls(&self, t: f32) -> StripControls {
        let influence = if self.flags.user_influence {
            self.influence_curve
                .as_ref()
                .map_or(self.influence, |c| c.evaluate(t))
        } else {
            self.influence_at(t)
        };

        if self.flags.no_time_map {
            return StripControls {
                influence,
                strip_time: t,
            };
        }

        let mut strip_time = if self.flags.user_time {
            self.time_curve
                .as_ref()
                .map_or(self.strip_time, |c| c.evaluate(t))
        } else {
            self.map_time(t)
        };
        if self.flags.user_time && self.flags.user_time_cyclic {
            let length = self.action_end - self.action_start;
            // an empty action range has nothing to wrap around
            strip_time = if length > 0.0 {
                (strip_time - self.action_start) % length
            } else {
                0.0
            };
        }

        StripControls {
            influence,
            strip_time,
        }
    }

    /// Every action referenced by this strip or its descendants.
    pub fn for_each_action(&self, f: &mut impl FnMut(ActionId)) {
        match &self.kind {
            StripKind::Clip { action } => f(*action),
            StripKind::Transition => {}
            StripKind::Meta { strips } => {
                for s in strips {
                    s.for_each_action(f);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Keyframe;

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() <= 1e-5, "left={a} right={b}");
    }

    #[test]
    fn clip_bounds_follow_scale_and_repeat() {
        let strip = Strip::clip("walk", ActionId(0), (0.0, 10.0), 5.0)
            .with_scale(2.0)
            .with_repeat(3.0);
        approx(strip.end, 65.0);
    }

    #[test]
    fn clip_mapping_wraps_repeats() {
        let strip = Strip::clip("walk", ActionId(0), (0.0, 10.0), 100.0).with_repeat(2.0);
        approx(strip.map_time(100.0), 0.0);
        approx(strip.map_time(105.0), 5.0);
        approx(strip.map_time(115.0), 5.0);
        // the end of a whole repeat stays on the last action frame
        approx(strip.map_time(120.0), 10.0);
    }

    #[test]
    fn reversed_clip_plays_backwards() {
        let strip = Strip::clip("walk", ActionId(0), (0.0, 10.0), 0.0).reversed(true);
        approx(strip.map_time(0.0), 10.0);
        approx(strip.map_time(4.0), 6.0);
        approx(strip.map_time(10.0), 0.0);
    }

    #[test]
    fn map_and_unmap_are_inverse() {
        for reversed in [false, true] {
            let strip = Strip::clip("a", ActionId(0), (2.0, 12.0), 30.0)
                .with_scale(1.5)
                .reversed(reversed);
            for local in [2.0, 5.5, 11.0] {
                approx(strip.map_to_local(strip.map_to_global(local)), local);
            }
        }
        let t = Strip::transition("t", 10.0, 20.0);
        approx(t.map_to_global(t.map_time(13.0)), 13.0);
    }

    #[test]
    fn blend_ramps() {
        let strip = Strip::transition("t", 0.0, 10.0).with_blend(2.0, -4.0);
        approx(strip.influence_at(1.0), 0.5);
        approx(strip.influence_at(5.0), 1.0);
        approx(strip.influence_at(8.0), 0.5);
    }

    #[test]
    fn controls_prefer_user_values() {
        let strip = Strip::clip("a", ActionId(0), (0.0, 10.0), 0.0)
            .with_blend(5.0, 0.0)
            .with_influence_curve(
                Curve::new("influence", 0)
                    .with_keys(vec![Keyframe::new(0.0, 0.25), Keyframe::new(10.0, 0.25)]),
            );
        let c = strip.controls(1.0);
        approx(c.influence, 0.25);
        approx(c.strip_time, 1.0);

        let mut cyclic = Strip::clip("b", ActionId(0), (0.0, 4.0), 0.0);
        cyclic.flags.user_time = true;
        cyclic.flags.user_time_cyclic = true;
        cyclic.strip_time = 9.0;
        approx(cyclic.controls(0.0).strip_time, 1.0);

        let mut unmapped = Strip::clip("c", ActionId(0), (0.0, 4.0), 100.0);
        unmapped.flags.no_time_map = true;
        approx(unmapped.controls(3.0).strip_time, 3.0);
    }

    #[test]
    fn cyclic_user_time_on_empty_range_is_zero() {
        let mut strip = Strip::clip("d", ActionId(0), (0.0, 4.0), 0.0);
        strip.action_start = 2.0;
        strip.action_end = 2.0;
        strip.flags.user_time = true;
        strip.flags.user_time_cyclic = true;
        strip.strip_time = 7.5;
        let c = strip.controls(3.0);
        assert!(c.strip_time.is_finite());
        approx(c.strip_time, 0.0);

        strip.flags.user_time_cyclic = false;
        approx(strip.controls(3.0).strip_time, 7.5);
    }

    #[test]
    fn blend_is_clamped_to_length() {
        let mut strip = Strip::transition("t", 0.0, 4.0).with_blend(3.0, 3.0);
        strip.recalculate_blend();
        approx(strip.blend_in, 1.0);
        approx(strip.blend_out, 3.0);
    }
}
