//! Copy/paste buffer for keyframes.
//!
//! Owned by the caller; nothing here is global. Copied keys keep their curve target
//! `(path, index)` and are stored relative to the earliest copied key, so a paste
//! places that key at the requested time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::Curve;
use crate::keyframe::{InsertMode, Keyframe};

/// How pasted keys combine with the keys already on the target curve.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasteMerge {
    /// Insert over the existing keys, replacing keys at the same time.
    #[default]
    Mix,
    /// Remove all existing keys first.
    OverwriteAll,
    /// Remove existing keys within the time range of the pasted keys.
    OverwriteRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct CopiedCurve {
    path: String,
    index: usize,
    keys: Vec<Keyframe>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframeClipboard {
    curves: Vec<CopiedCurve>,
}

impl KeyframeClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn clear(&mut self) {
        self.curves.clear();
    }

    /// Number of copied keys over all curves.
    pub fn key_count(&self) -> usize {
        self.curves.iter().map(|c| c.keys.len()).sum()
    }

    /// Replace the buffer with the selected keys of `curves`. Returns the number of keys copied.
    pub fn copy(&mut self, curves: &[Curve]) -> usize {
        self.clear();
        for curve in curves {
            let Some(keys) = curve.keyframes() else {
                continue;
            };
            let selected: Vec<Keyframe> = keys.iter().filter(|k| k.selected).cloned().collect();
            if selected.is_empty() {
                continue;
            }
            self.curves.push(CopiedCurve {
                path: curve.path.clone(),
                index: curve.array_index,
                keys: selected,
            });
        }

        let earliest = self
            .curves
            .iter()
            .flat_map(|c| c.keys.iter().map(Keyframe::time))
            .fold(f32::INFINITY, f32::min);
        if earliest.is_finite() {
            for key in self.curves.iter_mut().flat_map(|c| c.keys.iter_mut()) {
                key.translate(-earliest, 0.0);
            }
        }
        let copied = self.key_count();
        debug!(curves = self.curves.len(), keys = copied, "copied keyframes");
        copied
    }

    /// Paste onto the curves of `curves` whose `(path, index)` matches a copied curve,
    /// with the earliest copied key landing at `offset_time`. When nothing matches and
    /// both sides hold a single curve, that pair is used regardless of target.
    ///
    /// Returns the number of curves that received keys. Sampled curves are left alone.
    pub fn paste(&self, curves: &mut [Curve], offset_time: f32, merge: PasteMerge) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut pasted = 0;
        for curve in curves.iter_mut() {
            let source = self
                .curves
                .iter()
                .find(|c| c.path == curve.path && c.index == curve.array_index);
            if let Some(source) = source {
                pasted += usize::from(paste_into(curve, &source.keys, offset_time, merge));
            }
        }

        if pasted == 0 && self.curves.len() == 1 && curves.len() == 1 {
            debug!(target = %curves[0].path, "no matching curve; pasting single source");
            pasted += usize::from(paste_into(&mut curves[0], &self.curves[0].keys, offset_time, merge));
        }
        pasted
    }
}

fn paste_into(curve: &mut Curve, source: &[Keyframe], offset: f32, merge: PasteMerge) -> bool {
    let Some(keys) = curve.keyframes_mut() else {
        return false;
    };
    let (Some(first), Some(last)) = (source.first(), source.last()) else {
        return false;
    };

    match merge {
        PasteMerge::Mix => {}
        PasteMerge::OverwriteAll => keys.clear(),
        PasteMerge::OverwriteRange => {
            let (lo, hi) = (first.time() + offset, last.time() + offset);
            keys.retain(|k| k.time() < lo || k.time() > hi);
        }
    }
    for key in keys.iter_mut() {
        key.selected = false;
    }

    for key in source {
        let mut key = key.clone();
        key.translate(offset, 0.0);
        key.selected = true;
        // keys were checked above, insertion into keyframes cannot fail
        let _ = curve.insert_keyframe(key, InsertMode::Replace);
    }
    curve.recalc_handles();
    true
}
