use serde::{Deserialize, Serialize};
use tracing::debug;

use super::strip::Strip;
use crate::error::{NlaError, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackFlags {
    pub muted: bool,
    pub solo: bool,
    /// Set on the tweaked track and every track above it while in tweak mode.
    pub disabled: bool,
}

/// An ordered lane of non-overlapping strips.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub strips: Vec<Strip>,
    #[serde(default)]
    pub flags: TrackFlags,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strips: Vec::new(),
            flags: TrackFlags::default(),
        }
    }

    /// Build a track from strips, inserting each one through [`Track::insert`].
    pub fn from_strips(name: impl Into<String>, strips: Vec<Strip>) -> Result<Self> {
        let mut track = Self::new(name);
        for strip in strips {
            track.insert(strip)?;
        }
        Ok(track)
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.flags.muted = muted;
        self
    }

    pub fn solo(mut self, solo: bool) -> Self {
        self.flags.solo = solo;
        self
    }

    /// Whether `[start, end]` is free. Touching an existing strip is allowed.
    pub fn has_space(&self, start: f32, end: f32) -> bool {
        if start == end {
            return false;
        }
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        for strip in &self.strips {
            if strip.start >= end {
                return true;
            }
            if strip.end > start {
                return false;
            }
        }
        true
    }

    /// Insert `strip` in time order. Returns its index.
    pub fn insert(&mut self, strip: Strip) -> Result<usize> {
        if strip.start >= strip.end {
            return Err(NlaError::InvalidStripRange {
                name: strip.name,
                start: strip.start,
                end: strip.end,
            });
        }
        if !self.has_space(strip.start, strip.end) {
            return Err(NlaError::StripOverlap {
                name: strip.name,
                start: strip.start,
                end: strip.end,
            });
        }
        let index = self.strips.partition_point(|s| s.start < strip.start);
        debug!(track = %self.name, strip = %strip.name, index, "strip inserted");
        self.strips.insert(index, strip);
        Ok(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<Strip> {
        (index < self.strips.len()).then(|| self.strips.remove(index))
    }

    /// Index of the strip covering `t`, if any.
    pub fn strip_at(&self, t: f32) -> Option<usize> {
        self.strips.iter().position(|s| s.start <= t && t <= s.end)
    }

    /// First start and last end of the strips.
    pub fn bounds(&self) -> Option<(f32, f32)> {
        Some((self.strips.first()?.start, self.strips.last()?.end))
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }
}
