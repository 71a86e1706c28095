//! Keyframes, samples and their enums.

use serde::{Deserialize, Serialize};

use crate::easing::EaseParams;

/// Interpolation from a keyframe to the next.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Constant,
    Linear,
    #[default]
    Bezier,
    Back,
    Bounce,
    Circ,
    Cubic,
    Elastic,
    Expo,
    Quad,
    Quart,
    Quint,
    Sine,
}

/// Easing direction for the Penner families.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Auto,
    In,
    Out,
    InOut,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandleType {
    Free,
    Aligned,
    Vector,
    Auto,
    #[default]
    AutoClamped,
}

impl HandleType {
    #[inline]
    pub fn is_auto(self) -> bool {
        matches!(self, HandleType::Auto | HandleType::AutoClamped)
    }
}

fn default_back() -> f32 {
    1.70158
}

/// A control point with its two tangent handles. All points are `[time, value]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub co: [f32; 2],
    pub handle_left: [f32; 2],
    pub handle_right: [f32; 2],
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default)]
    pub handle_left_type: HandleType,
    #[serde(default)]
    pub handle_right_type: HandleType,
    #[serde(default)]
    pub selected: bool,
    /// Overshoot of the Back family.
    #[serde(default = "default_back")]
    pub back: f32,
    /// Elastic amplitude; 0 means "fit the segment".
    #[serde(default)]
    pub amplitude: f32,
    /// Elastic period; 0 means "derive from duration".
    #[serde(default)]
    pub period: f32,
}

impl Keyframe {
    /// Bezier key with auto-clamped handles collapsed onto the key.
    /// Run `Curve::recalc_handles` to give the handles their shape.
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            co: [time, value],
            handle_left: [time, value],
            handle_right: [time, value],
            interpolation: Interpolation::Bezier,
            easing: Easing::Auto,
            handle_left_type: HandleType::AutoClamped,
            handle_right_type: HandleType::AutoClamped,
            selected: false,
            back: default_back(),
            amplitude: 0.0,
            period: 0.0,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Explicit free handles.
    pub fn with_handles(mut self, left: [f32; 2], right: [f32; 2]) -> Self {
        self.handle_left = left;
        self.handle_right = right;
        self.handle_left_type = HandleType::Free;
        self.handle_right_type = HandleType::Free;
        self
    }

    pub fn with_handle_types(mut self, left: HandleType, right: HandleType) -> Self {
        self.handle_left_type = left;
        self.handle_right_type = right;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.co[0]
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.co[1]
    }

    #[inline]
    pub fn ease_params(&self) -> EaseParams {
        EaseParams {
            back: self.back,
            amplitude: self.amplitude,
            period: self.period,
        }
    }

    /// Move the key in time and value, carrying its handles along.
    pub fn translate(&mut self, dt: f32, dv: f32) {
        for p in [&mut self.co, &mut self.handle_left, &mut self.handle_right] {
            p[0] += dt;
            p[1] += dv;
        }
    }
}

/// A baked point. Samples sit on whole frames.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f32,
    pub value: f32,
}

impl Sample {
    pub fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// How `Curve::insert_keyframe` treats a key that already exists at the same time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum InsertMode {
    /// Overwrite position and handles; keep the existing handle types and interpolation.
    #[default]
    Update,
    /// Overwrite the whole key.
    Replace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_moves_handles() {
        let mut key = Keyframe::new(1.0, 2.0).with_handles([0.5, 2.0], [1.5, 2.5]);
        key.translate(10.0, -1.0);
        assert_eq!(key.co, [11.0, 1.0]);
        assert_eq!(key.handle_left, [10.5, 1.0]);
        assert_eq!(key.handle_right, [11.5, 1.5]);
    }

    #[test]
    fn json_defaults() {
        let key: Keyframe = serde_json::from_str(
            r#"{ "co": [1, 2], "handle_left": [0, 2], "handle_right": [2, 2], "interpolation": "linear" }"#,
        )
        .unwrap();
        assert_eq!(key.interpolation, Interpolation::Linear);
        assert_eq!(key.handle_left_type, HandleType::AutoClamped);
        assert!((key.back - 1.70158).abs() < 1e-6);
    }
}
