//! Range and bounds queries.

use serde::{Deserialize, Serialize};

use super::{Curve, CurveData};

/// Axis-aligned rectangle in (time, value) space.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
}

impl Rect {
    fn point(p: [f32; 2]) -> Self {
        Self {
            xmin: p[0],
            xmax: p[0],
            ymin: p[1],
            ymax: p[1],
        }
    }

    fn include(&mut self, p: [f32; 2]) {
        self.xmin = self.xmin.min(p[0]);
        self.xmax = self.xmax.max(p[0]);
        self.ymin = self.ymin.min(p[1]);
        self.ymax = self.ymax.max(p[1]);
    }
}

impl Curve {
    /// First and last time covered by keys or samples, widened by the outer
    /// handles when `include_handles` is set. `None` for a curve without data.
    pub fn frame_range(&self, include_handles: bool) -> Option<(f32, f32)> {
        match &self.data {
            CurveData::Keyframes(keys) => {
                let (first, last) = (keys.first()?, keys.last()?);
                if include_handles {
                    Some((
                        first.co[0].min(first.handle_left[0]),
                        last.co[0].max(last.handle_right[0]),
                    ))
                } else {
                    Some((first.co[0], last.co[0]))
                }
            }
            CurveData::Samples(samples) => {
                let (first, last) = (samples.first()?, samples.last()?);
                Some((first.time, last.time))
            }
        }
    }

    /// Bounding box of every key (and handle, if requested) or sample.
    pub fn bounds(&self, include_handles: bool) -> Option<Rect> {
        match &self.data {
            CurveData::Keyframes(keys) => {
                let mut rect = Rect::point(keys.first()?.co);
                for key in keys {
                    rect.include(key.co);
                    if include_handles {
                        rect.include(key.handle_left);
                        rect.include(key.handle_right);
                    }
                }
                Some(rect)
            }
            CurveData::Samples(samples) => {
                let first = samples.first()?;
                let mut rect = Rect::point([first.time, first.value]);
                for s in samples {
                    rect.include([s.time, s.value]);
                }
                Some(rect)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::curve::Curve;
    use crate::keyframe::{Keyframe, Sample};

    #[test]
    fn ranges_with_and_without_handles() {
        let curve = Curve::new("location", 0).with_keys(vec![
            Keyframe::new(1.0, 0.0).with_handles([0.0, -1.0], [2.0, 1.0]),
            Keyframe::new(5.0, 3.0).with_handles([4.0, 4.0], [6.5, 2.0]),
        ]);
        assert_eq!(curve.frame_range(false), Some((1.0, 5.0)));
        assert_eq!(curve.frame_range(true), Some((0.0, 6.5)));
        let rect = curve.bounds(true).unwrap();
        assert_eq!((rect.ymin, rect.ymax), (-1.0, 4.0));
        let rect = curve.bounds(false).unwrap();
        assert_eq!((rect.ymin, rect.ymax), (0.0, 3.0));
        assert_eq!(Curve::new("x", 0).frame_range(false), None);
    }

    #[test]
    fn samples_have_ranges_too() {
        let curve = Curve::new("x", 0).with_samples(vec![Sample::new(2.0, 1.0), Sample::new(3.0, -1.0)]);
        assert_eq!(curve.frame_range(true), Some((2.0, 3.0)));
        assert_eq!(curve.bounds(false).unwrap().ymin, -1.0);
    }
}
