//! Baking: turn a keyframe curve into whole-frame samples and back.

use tracing::debug;

use crate::action::Action;
use crate::curve::{Curve, CurveData};
use crate::error::{NlaError, Result};
use crate::keyframe::{HandleType, Interpolation, Keyframe, Sample};

impl Curve {
    /// Replace the curve data with one sample per frame over `[start, end]`
    /// (rounded to whole frames). Values include the modifier stack, which is
    /// removed afterwards so the samples are not modified twice.
    pub fn bake_to_samples(&mut self, start: f32, end: f32) -> Result<usize> {
        let (first, last) = (start.round(), end.round());
        if !first.is_finite() || !last.is_finite() || first > last {
            return Err(NlaError::InvalidFrameRange { start, end });
        }

        let count = (last - first) as usize + 1;
        let samples: Vec<Sample> = (0..count)
            .map(|i| {
                let t = first + i as f32;
                Sample::new(t, self.evaluate(t))
            })
            .collect();

        debug!(path = %self.path, index = self.array_index, count, "baked curve");
        self.data = CurveData::Samples(samples);
        self.modifiers.modifiers.clear();
        Ok(count)
    }

    /// Convert baked samples into linear keys with vector handles.
    pub fn samples_to_keyframes(&mut self) -> Result<usize> {
        let Some(samples) = self.samples() else {
            return Err(self.data_mismatch("samples"));
        };
        let keys: Vec<Keyframe> = samples
            .iter()
            .map(|s| {
                Keyframe::new(s.time, s.value)
                    .with_interpolation(Interpolation::Linear)
                    .with_handle_types(HandleType::Vector, HandleType::Vector)
            })
            .collect();
        let count = keys.len();
        self.data = CurveData::Keyframes(keys);
        self.recalc_handles();
        Ok(count)
    }
}

impl Action {
    /// Bake every non-empty curve of the action over `[start, end]`.
    pub fn bake(&mut self, start: f32, end: f32) -> Result<usize> {
        let mut baked = 0;
        for curve in self.curves.iter_mut().filter(|c| !c.is_empty()) {
            curve.bake_to_samples(start, end)?;
            baked += 1;
        }
        Ok(baked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{Generator, Modifier, ModifierKind, PolyMode};

    fn ramp() -> Curve {
        Curve::new("x", 0).with_keys(vec![
            Keyframe::new(0.0, 0.0).with_interpolation(Interpolation::Linear),
            Keyframe::new(4.0, 8.0).with_interpolation(Interpolation::Linear),
        ])
    }

    #[test]
    fn bake_samples_whole_frames() {
        let mut curve = ramp();
        assert_eq!(curve.bake_to_samples(0.2, 3.6).unwrap(), 5);
        let samples = curve.samples().unwrap();
        assert_eq!(samples.first().unwrap().time, 0.0);
        assert_eq!(samples.last().unwrap().time, 4.0);
        assert_eq!(samples[2].value, 4.0);
        assert!((curve.evaluate(1.5) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn bake_folds_modifiers_in() {
        let mut curve = ramp().with_modifier(Modifier::new(ModifierKind::Generator(Generator {
            mode: PolyMode::Expanded,
            coefficients: vec![10.0],
            additive: true,
        })));
        curve.bake_to_samples(0.0, 2.0).unwrap();
        assert!(curve.modifiers.is_empty());
        assert_eq!(curve.samples().unwrap()[1].value, 12.0);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut curve = ramp();
        assert!(matches!(
            curve.bake_to_samples(5.0, 1.0),
            Err(NlaError::InvalidFrameRange { .. })
        ));
        assert!(curve.keyframes().is_some());
    }

    #[test]
    fn samples_back_to_linear_keys() {
        let mut curve = ramp();
        curve.bake_to_samples(0.0, 4.0).unwrap();
        assert_eq!(curve.samples_to_keyframes().unwrap(), 5);
        let keys = curve.keyframes().unwrap();
        assert!(keys.iter().all(|k| k.interpolation == Interpolation::Linear));
        assert_eq!(keys[3].handle_left_type, HandleType::Vector);
        assert!((curve.evaluate(2.5) - 5.0).abs() < 1e-6);
        assert!(curve.samples_to_keyframes().is_err());
    }
}
