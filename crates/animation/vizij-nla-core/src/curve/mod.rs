//! Animation curves: keyframes or samples, a modifier stack and an optional driver.
//!
//! Evaluation order for one curve at time `t`:
//! 1. modifier time pass, giving the sampling time;
//! 2. keyframe or sample lookup at that time (a curve with no data yields its seed);
//! 3. modifier value pass at the sampling time;
//! 4. rounding for integer-only properties.

pub mod bounds;
pub mod handles;
pub mod keys;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::action::Group;
use crate::driver::Driver;
use crate::error::{NlaError, Result};
use crate::keyframe::{InsertMode, Keyframe, Sample};
use crate::modifier::{
    CycleMode, JoinedModifiers, KeyExtent, Modifier, ModifierKind, ModifierStack,
};

pub use bounds::Rect;
pub use keys::{binary_search_index, KEY_THRESHOLD};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Extrapolation {
    #[default]
    Constant,
    Linear,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveFlags {
    pub muted: bool,
    pub disabled: bool,
    /// Round results to whole numbers.
    pub integer_only: bool,
    /// Only whole-step values: no interpolation, no extrapolation slope.
    pub discrete_values: bool,
    /// Bypass the modifier stack.
    pub modifiers_off: bool,
}

/// Keyframes and samples are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveData {
    Keyframes(Vec<Keyframe>),
    Samples(Vec<Sample>),
}

impl Default for CurveData {
    fn default() -> Self {
        CurveData::Keyframes(Vec::new())
    }
}

impl CurveData {
    pub fn len(&self) -> usize {
        match self {
            CurveData::Keyframes(k) => k.len(),
            CurveData::Samples(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind_name(&self) -> &'static str {
        match self {
            CurveData::Keyframes(_) => "keyframes",
            CurveData::Samples(_) => "samples",
        }
    }
}

/// How a leading Cycles modifier makes the curve repeat.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleType {
    None,
    /// Plain repetition in both directions.
    Cycle,
    /// Repetition with the value offset accumulating per cycle.
    CycleOffset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    /// Property path resolved by the accessor, e.g. `"location"`.
    pub path: String,
    #[serde(default)]
    pub array_index: usize,
    #[serde(default)]
    pub data: CurveData,
    #[serde(default)]
    pub modifiers: ModifierStack,
    #[serde(default)]
    pub driver: Option<Driver>,
    #[serde(default)]
    pub extrapolation: Extrapolation,
    #[serde(default)]
    pub flags: CurveFlags,
    #[serde(default)]
    pub group: Option<String>,
    /// Last value computed through a `&mut` path. Display only; evaluation never reads it.
    #[serde(skip)]
    pub last_value: f32,
}

impl Curve {
    pub fn new(path: impl Into<String>, array_index: usize) -> Self {
        Self {
            path: path.into(),
            array_index,
            data: CurveData::default(),
            modifiers: ModifierStack::default(),
            driver: None,
            extrapolation: Extrapolation::Constant,
            flags: CurveFlags::default(),
            group: None,
            last_value: 0.0,
        }
    }

    pub fn with_keys(mut self, keys: Vec<Keyframe>) -> Self {
        self.data = CurveData::Keyframes(keys);
        self
    }

    pub fn with_samples(mut self, samples: Vec<Sample>) -> Self {
        self.data = CurveData::Samples(samples);
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_driver(mut self, driver: Driver) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_flags(mut self, flags: CurveFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn keyframes(&self) -> Option<&[Keyframe]> {
        match &self.data {
            CurveData::Keyframes(k) => Some(k),
            CurveData::Samples(_) => None,
        }
    }

    pub fn keyframes_mut(&mut self) -> Option<&mut Vec<Keyframe>> {
        match &mut self.data {
            CurveData::Keyframes(k) => Some(k),
            CurveData::Samples(_) => None,
        }
    }

    pub fn samples(&self) -> Option<&[Sample]> {
        match &self.data {
            CurveData::Samples(s) => Some(s),
            CurveData::Keyframes(_) => None,
        }
    }

    fn keys_mut_or_err(&mut self) -> Result<&mut Vec<Keyframe>> {
        match &mut self.data {
            CurveData::Keyframes(k) => Ok(k),
            CurveData::Samples(_) => Err(NlaError::CurveDataMismatch {
                path: self.path.clone(),
                index: self.array_index,
                expected: "keyframes",
                found: "samples",
            }),
        }
    }

    pub(crate) fn data_mismatch(&self, expected: &'static str) -> NlaError {
        NlaError::CurveDataMismatch {
            path: self.path.clone(),
            index: self.array_index,
            expected,
            found: self.data.kind_name(),
        }
    }

    /// First and last key as seen by a Cycles modifier.
    pub fn key_extent(&self) -> Option<KeyExtent> {
        match &self.data {
            CurveData::Keyframes(k) => Some(KeyExtent {
                first: k.first()?.co,
                last: k.last()?.co,
            }),
            CurveData::Samples(s) => {
                let (first, last) = (s.first()?, s.last()?);
                Some(KeyExtent {
                    first: [first.time, first.value],
                    last: [last.time, last.value],
                })
            }
        }
    }

    #[inline]
    pub(crate) fn modifier_view(&self) -> JoinedModifiers<'_> {
        if self.flags.modifiers_off {
            JoinedModifiers::EMPTY
        } else {
            self.modifiers.as_joined()
        }
    }

    // ---------- evaluation ----------

    /// Value at `t`, ignoring any driver. A curve without data evaluates its
    /// modifiers on top of `0.0`.
    pub fn evaluate(&self, t: f32) -> f32 {
        self.evaluate_seeded(t, 0.0)
    }

    /// Value of a driver curve once the driver produced `driver_time`.
    ///
    /// Without keys or samples the curve maps the driver value 1:1, unless a modifier
    /// with a restricted range excludes that time.
    pub fn evaluate_driven(&self, driver_time: f32) -> f32 {
        let mut seed = 0.0;
        if self.data.is_empty() {
            let excluded = self
                .modifier_view()
                .iter()
                .any(|m| m.range.is_some_and(|r| !r.contains(driver_time)));
            if !excluded {
                seed = driver_time;
            }
        }
        self.evaluate_seeded(driver_time, seed)
    }

    fn evaluate_seeded(&self, t: f32, seed: f32) -> f32 {
        let view = self.modifier_view();
        let (sample_time, storage) = view.evaluate_time(self.key_extent(), t);

        let mut value = match &self.data {
            CurveData::Keyframes(k) if !k.is_empty() => keys::evaluate_keyframes(
                k,
                self.extrapolation,
                self.flags.discrete_values,
                sample_time,
            ),
            CurveData::Samples(s) if !s.is_empty() => keys::evaluate_samples(s, sample_time),
            _ => seed,
        };

        value = view.evaluate_value(&storage, value, sample_time);

        if self.flags.integer_only {
            value = (value + 0.5).floor();
        }
        value
    }

    /// No data, no driver and no generator: nothing to evaluate.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
            && self.driver.is_none()
            && !self.modifiers.iter().any(Modifier::generates_curve)
    }

    /// Should this curve contribute when its action is evaluated.
    pub fn is_evaluatable(&self, groups: &[Group]) -> bool {
        if self.flags.muted || self.flags.disabled || self.is_empty() {
            return false;
        }
        match &self.group {
            Some(name) => !groups.iter().any(|g| g.name == *name && g.muted),
            None => true,
        }
    }

    /// Evaluate and remember the result in `last_value`. An empty curve returns
    /// `fallback` and leaves `last_value` untouched.
    pub fn calculate(&mut self, t: f32, fallback: f32) -> f32 {
        if self.is_empty() {
            return fallback;
        }
        let value = self.evaluate(t);
        self.last_value = value;
        value
    }

    // ---------- editing primitives ----------

    /// Insert `key` in time order, or merge it into a key at the same time.
    /// Returns the key's index.
    pub fn insert_keyframe(&mut self, key: Keyframe, mode: InsertMode) -> Result<usize> {
        let keys = self.keys_mut_or_err()?;
        let (index, exact) = binary_search_index(keys, key.co[0], KEY_THRESHOLD);
        if exact {
            let dst = &mut keys[index];
            match mode {
                InsertMode::Replace => *dst = key,
                InsertMode::Update => {
                    let dy = key.co[1] - dst.co[1];
                    dst.translate(0.0, dy);
                    dst.selected = key.selected;
                }
            }
        } else {
            keys.insert(index, key);
        }
        Ok(index)
    }

    pub fn delete_keyframe(&mut self, index: usize) -> Result<Keyframe> {
        let keys = self.keys_mut_or_err()?;
        if index >= keys.len() {
            return Err(NlaError::KeyframeOutOfRange {
                index,
                len: keys.len(),
            });
        }
        Ok(keys.remove(index))
    }

    pub fn delete_keyframes(&mut self, range: Range<usize>) -> Result<()> {
        let keys = self.keys_mut_or_err()?;
        if range.start > range.end || range.end > keys.len() {
            return Err(NlaError::KeyframeOutOfRange {
                index: range.end,
                len: keys.len(),
            });
        }
        keys.drain(range);
        Ok(())
    }

    /// Remove every key or sample.
    pub fn clear_keyframes(&mut self) {
        match &mut self.data {
            CurveData::Keyframes(k) => k.clear(),
            CurveData::Samples(s) => s.clear(),
        }
    }

    /// Any key (or sample) earlier than its predecessor.
    pub fn needs_sort(&self) -> bool {
        match &self.data {
            CurveData::Keyframes(k) => k.windows(2).any(|w| w[0].co[0] > w[1].co[0]),
            CurveData::Samples(s) => s.windows(2).any(|w| w[0].time > w[1].time),
        }
    }

    /// Stable sort by time. Handles that crossed over their key are swapped back;
    /// otherwise they are clamped to their own side of the key.
    pub fn sort_by_time(&mut self) {
        match &mut self.data {
            CurveData::Keyframes(keys) => {
                keys.sort_by(|a, b| a.co[0].total_cmp(&b.co[0]));
                for key in keys.iter_mut() {
                    if key.handle_left[0] > key.co[0] && key.handle_right[0] < key.co[0] {
                        std::mem::swap(&mut key.handle_left, &mut key.handle_right);
                    } else {
                        key.handle_left[0] = key.handle_left[0].min(key.co[0]);
                        key.handle_right[0] = key.handle_right[0].max(key.co[0]);
                    }
                }
            }
            CurveData::Samples(samples) => samples.sort_by(|a, b| a.time.total_cmp(&b.time)),
        }
    }

    /// Recompute automatic, vector and aligned handles.
    pub fn recalc_handles(&mut self) {
        let cyclic = self.cycle_type() != CycleType::None;
        let extrapolation = self.extrapolation;
        if let CurveData::Keyframes(keys) = &mut self.data {
            handles::recalc_handles(keys, extrapolation, cyclic);
        }
    }

    /// Read from a leading, unrestricted Cycles modifier that repeats infinitely in
    /// both directions.
    pub fn cycle_type(&self) -> CycleType {
        let Some(first) = self.modifiers.first() else {
            return CycleType::None;
        };
        let ModifierKind::Cycles(cycles) = &first.kind else {
            return CycleType::None;
        };
        if first.muted || first.disabled || first.range.is_some() || first.influence.is_some() {
            return CycleType::None;
        }
        if cycles.before_cycles != 0 || cycles.after_cycles != 0 {
            return CycleType::None;
        }
        let repeating = |m: CycleMode| matches!(m, CycleMode::Repeat | CycleMode::RepeatOffset);
        if cycles.before_mode == CycleMode::Repeat && cycles.after_mode == CycleMode::Repeat {
            CycleType::Cycle
        } else if repeating(cycles.before_mode) && repeating(cycles.after_mode) {
            CycleType::CycleOffset
        } else {
            CycleType::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Interpolation;
    use crate::modifier::{Cycles, FrameRange, Generator, PolyMode};

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn linear_keys(points: &[(f32, f32)]) -> Vec<Keyframe> {
        points
            .iter()
            .map(|&(t, v)| Keyframe::new(t, v).with_interpolation(Interpolation::Linear))
            .collect()
    }

    #[test]
    fn insert_keeps_order_and_merges_duplicates() {
        let mut curve = Curve::new("x", 0).with_keys(linear_keys(&[(0.0, 0.0), (10.0, 1.0)]));
        assert_eq!(curve.insert_keyframe(Keyframe::new(5.0, 3.0), InsertMode::Update).unwrap(), 1);
        assert_eq!(curve.insert_keyframe(Keyframe::new(5.00001, 4.0), InsertMode::Update).unwrap(), 1);
        let keys = curve.keyframes().unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[1].co, [5.0, 4.0]);
        assert_eq!(curve.insert_keyframe(Keyframe::new(20.0, 0.0), InsertMode::Replace).unwrap(), 3);
    }

    #[test]
    fn delete_reports_out_of_range() {
        let mut curve = Curve::new("x", 0).with_keys(linear_keys(&[(0.0, 0.0)]));
        assert!(matches!(
            curve.delete_keyframe(3),
            Err(NlaError::KeyframeOutOfRange { index: 3, len: 1 })
        ));
        assert_eq!(curve.delete_keyframe(0).unwrap().co, [0.0, 0.0]);
        let mut baked = Curve::new("x", 0).with_samples(vec![Sample::new(0.0, 1.0)]);
        assert!(baked.delete_keyframe(0).is_err());
    }

    #[test]
    fn sort_swaps_crossed_handles() {
        let mut curve = Curve::new("x", 0).with_keys(vec![
            Keyframe::new(5.0, 0.0).with_handles([6.0, 1.0], [4.0, -1.0]),
            Keyframe::new(1.0, 0.0),
        ]);
        assert!(curve.needs_sort());
        curve.sort_by_time();
        assert!(!curve.needs_sort());
        let keys = curve.keyframes().unwrap();
        assert_eq!(keys[0].co[0], 1.0);
        assert_eq!(keys[1].handle_left, [4.0, -1.0]);
        assert_eq!(keys[1].handle_right, [6.0, 1.0]);
    }

    #[test]
    fn empty_generator_curve_is_not_empty() {
        let gen = Modifier::new(ModifierKind::Generator(Generator {
            mode: PolyMode::Expanded,
            coefficients: vec![1.0, 2.0],
            additive: false,
        }));
        let curve = Curve::new("x", 0).with_modifier(gen);
        assert!(!curve.is_empty());
        approx(curve.evaluate(3.0), 7.0, 1e-6);
        assert!(Curve::new("x", 0).is_empty());
    }

    #[test]
    fn calculate_uses_fallback_for_empty_curves() {
        let mut empty = Curve::new("x", 0);
        empty.last_value = 4.0;
        approx(empty.calculate(2.0, -1.0), -1.0, 0.0);
        approx(empty.last_value, 4.0, 0.0);

        let mut ramp = Curve::new("x", 0).with_keys(linear_keys(&[(0.0, 0.0), (10.0, 10.0)]));
        approx(ramp.calculate(2.0, -1.0), 2.0, 1e-6);
        approx(ramp.last_value, 2.0, 1e-6);
    }

    #[test]
    fn driven_curve_without_keys_maps_one_to_one() {
        let curve = Curve::new("x", 0);
        approx(curve.evaluate_driven(2.5), 2.5, 0.0);
        let limited = Curve::new("x", 0).with_modifier(
            Modifier::new(ModifierKind::Generator(Generator {
                mode: PolyMode::Expanded,
                coefficients: vec![0.0],
                additive: true,
            }))
            .with_range(FrameRange::new(0.0, 1.0)),
        );
        approx(limited.evaluate_driven(2.5), 0.0, 0.0);
    }

    #[test]
    fn cycle_type_reads_leading_cycles() {
        let curve = Curve::new("x", 0).with_modifier(Modifier::new(ModifierKind::Cycles(
            Cycles::repeat(),
        )));
        assert_eq!(curve.cycle_type(), CycleType::Cycle);
        let offset = Curve::new("x", 0).with_modifier(Modifier::new(ModifierKind::Cycles(
            Cycles::with_modes(CycleMode::RepeatOffset, CycleMode::Repeat),
        )));
        assert_eq!(offset.cycle_type(), CycleType::CycleOffset);
        let muted = Curve::new("x", 0).with_modifier(
            Modifier::new(ModifierKind::Cycles(Cycles::repeat())).muted(true),
        );
        assert_eq!(muted.cycle_type(), CycleType::None);
    }

    #[test]
    fn integer_only_rounds() {
        let curve = Curve::new("x", 0)
            .with_keys(linear_keys(&[(0.0, 0.0), (10.0, 10.0)]))
            .with_flags(CurveFlags {
                integer_only: true,
                ..CurveFlags::default()
            });
        approx(curve.evaluate(2.4), 2.0, 0.0);
        approx(curve.evaluate(2.6), 3.0, 0.0);
    }
}
