//! Per-owner animation settings: the active action, the NLA tracks, drivers and
//! overrides, plus the tweak-mode state machine.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::curve::Curve;
use crate::error::{NlaError, Result};
use crate::ids::{ActionId, OwnerId};
use crate::nla::{BlendMode, Extend, Strip, StripKind, Track};

bitflags::bitflags! {
    /// Which parts of an [`AnimData`] need re-evaluating.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Recalc: u8 {
        const ANIM = 0b01;
        const DRIVERS = 0b10;
    }
}

impl Default for Recalc {
    fn default() -> Self {
        Self::all()
    }
}

/// A value written on top of everything else, every evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub path: String,
    #[serde(default)]
    pub index: usize,
    pub value: f32,
}

impl Override {
    pub fn new(path: impl Into<String>, index: usize, value: f32) -> Self {
        Self {
            path: path.into(),
            index,
            value,
        }
    }
}

/// Strip whose action is being edited in place.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweakTarget {
    pub track: usize,
    pub strip: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimFlags {
    /// Evaluate only the active action.
    pub nla_disabled: bool,
    /// Some track is soloed; only solo tracks evaluate.
    pub solo_track: bool,
    pub tweak_mode: bool,
    /// In tweak mode, keep evaluating the action track above the tweaked strip.
    pub eval_upper_tracks: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimData {
    pub owner: OwnerId,
    #[serde(default)]
    pub action: Option<ActionId>,
    /// Active action stashed while tweaking.
    #[serde(default)]
    pub tmp_action: Option<ActionId>,
    #[serde(default)]
    pub action_blend_mode: BlendMode,
    #[serde(default = "hold")]
    pub action_extend: Extend,
    #[serde(default = "one")]
    pub action_influence: f32,
    /// Bottom to top.
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub drivers: Vec<Curve>,
    #[serde(default)]
    pub overrides: Vec<Override>,
    #[serde(skip)]
    pub recalc: Recalc,
    #[serde(default)]
    pub flags: AnimFlags,
    #[serde(default)]
    pub tweak: Option<TweakTarget>,
}

fn one() -> f32 {
    1.0
}

fn hold() -> Extend {
    Extend::Hold
}

impl AnimData {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            action: None,
            tmp_action: None,
            action_blend_mode: BlendMode::Replace,
            action_extend: Extend::Hold,
            action_influence: 1.0,
            tracks: Vec::new(),
            drivers: Vec::new(),
            overrides: Vec::new(),
            recalc: Recalc::all(),
            flags: AnimFlags::default(),
            tweak: None,
        }
    }

    pub fn with_action(mut self, action: ActionId) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn with_driver(mut self, driver: Curve) -> Self {
        self.drivers.push(driver);
        self
    }

    pub fn with_override(mut self, ov: Override) -> Self {
        self.overrides.push(ov);
        self
    }

    /// Mark parts for re-evaluation.
    pub fn tag(&mut self, recalc: Recalc) {
        self.recalc |= recalc;
    }

    /// Add a track on top of the stack. Returns its index.
    pub fn push_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn track(&self, index: usize) -> Result<&Track> {
        self.tracks
            .get(index)
            .ok_or(NlaError::TrackNotFound { index })
    }

    pub fn track_mut(&mut self, index: usize) -> Result<&mut Track> {
        self.tracks
            .get_mut(index)
            .ok_or(NlaError::TrackNotFound { index })
    }

    /// Solo `index` (or clear solo with `None`). At most one track is solo.
    pub fn set_solo(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.track(i)?;
        }
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.flags.solo = Some(i) == index;
        }
        self.flags.solo_track = index.is_some();
        Ok(())
    }

    /// Whether track `index` takes part in evaluation. Disabled tracks are skipped
    /// unless they hold the tweaked strip; with a solo track only solo tracks count,
    /// otherwise muted tracks are skipped.
    pub fn is_track_evaluatable(&self, index: usize) -> bool {
        let Some(track) = self.tracks.get(index) else {
            return false;
        };
        let holds_tweak = self.flags.tweak_mode && self.tweak.is_some_and(|t| t.track == index);
        if track.flags.disabled && !holds_tweak {
            return false;
        }
        if self.flags.solo_track {
            track.flags.solo
        } else {
            !track.flags.muted
        }
    }

    /// Track contributes to the reset domain: solo and mute rules, ignoring `disabled`.
    pub(crate) fn is_track_in_domain(&self, track: &Track) -> bool {
        if self.flags.solo_track {
            track.flags.solo
        } else {
            !track.flags.muted
        }
    }

    pub fn tweak_strip(&self) -> Option<&Strip> {
        let t = self.tweak?;
        self.tracks.get(t.track)?.strips.get(t.strip)
    }

    /// Edit the action of `(track, strip)` in place.
    ///
    /// The active action is stashed, the strip's action becomes active, and the
    /// tweaked track plus every track above it are disabled.
    pub fn enter_tweak_mode(&mut self, track: usize, strip: usize) -> Result<()> {
        if self.flags.tweak_mode {
            return Err(NlaError::TweakState {
                reason: "already in tweak mode".into(),
            });
        }
        let target = self
            .track(track)?
            .strips
            .get(strip)
            .ok_or(NlaError::StripNotFound { track, strip })?;
        let StripKind::Clip { action } = target.kind else {
            return Err(NlaError::TweakState {
                reason: format!("strip '{}' is not an action clip", target.name),
            });
        };

        self.tmp_action = self.action.take();
        self.action = Some(action);
        for t in &mut self.tracks[track..] {
            t.flags.disabled = true;
        }
        self.tweak = Some(TweakTarget { track, strip });
        self.flags.tweak_mode = true;
        self.tag(Recalc::ANIM);
        info!(owner = ?self.owner, track, strip, ?action, "entered tweak mode");
        Ok(())
    }

    /// Leave tweak mode, restoring the stashed action and re-enabling tracks.
    pub fn exit_tweak_mode(&mut self) -> Result<()> {
        if !self.flags.tweak_mode {
            return Err(NlaError::TweakState {
                reason: "not in tweak mode".into(),
            });
        }
        for t in &mut self.tracks {
            t.flags.disabled = false;
        }
        self.action = self.tmp_action.take();
        self.tweak = None;
        self.flags.tweak_mode = false;
        self.tag(Recalc::ANIM);
        info!(owner = ?self.owner, "left tweak mode");
        Ok(())
    }

    /// Restore structural invariants after strips were moved.
    ///
    /// Transitions are snapped to their neighbours (and dropped when they no longer
    /// fit), auto-blend ramps are rederived from overlaps with adjacent tracks, and
    /// every ramp is clamped to its strip. Returns the names of dropped transitions.
    pub fn validate(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        for track in &mut self.tracks {
            let mut i = 0;
            while i < track.strips.len() {
                if !track.strips[i].is_transition() {
                    i += 1;
                    continue;
                }
                let prev_end = i.checked_sub(1).map(|p| track.strips[p].end);
                let next_start = track.strips.get(i + 1).map(|n| n.start);
                let strip = &mut track.strips[i];
                if let Some(e) = prev_end {
                    strip.start = e;
                }
                if let Some(s) = next_start {
                    strip.end = s;
                }
                if prev_end.is_none() || next_start.is_none() || strip.start >= strip.end {
                    debug!(strip = %strip.name, "transition no longer fits; removed");
                    dropped.push(track.strips.remove(i).name);
                    continue;
                }
                i += 1;
            }
        }

        for ti in 0..self.tracks.len() {
            for si in 0..self.tracks[ti].strips.len() {
                if self.tracks[ti].strips[si].flags.auto_blends {
                    let (blend_in, blend_out) = self.auto_blends(ti, si);
                    let strip = &mut self.tracks[ti].strips[si];
                    strip.blend_in = blend_in;
                    strip.blend_out = blend_out;
                }
                self.tracks[ti].strips[si].recalculate_blend();
            }
        }
        dropped
    }

    /// Blend ramps for a strip from the partial overlaps in the tracks below and above.
    fn auto_blends(&self, ti: usize, si: usize) -> (f32, f32) {
        let track = &self.tracks[ti];
        let strip = &track.strips[si];
        if self.tracks.len() < 2 {
            return (strip.blend_in, strip.blend_out);
        }
        let below = ti.checked_sub(1).map(|i| endpoint_overlaps(strip, &self.tracks[i]));
        let above = self
            .tracks
            .get(ti + 1)
            .map(|t| endpoint_overlaps(strip, t));
        let (ps, pe) = below.unwrap_or((None, None));
        let (ns, ne) = above.unwrap_or((None, None));

        let joined_before = si
            .checked_sub(1)
            .is_some_and(|p| track.strips[p].end == strip.start);
        let joined_after = track
            .strips
            .get(si + 1)
            .is_some_and(|n| n.start == strip.end);

        // larger overlap wins
        let blend_in = match (ps, ns) {
            _ if joined_before => 0.0,
            (Some(p), Some(n)) => p.max(n) - strip.start,
            (Some(p), None) => p - strip.start,
            (None, Some(n)) => n - strip.start,
            (None, None) => 0.0,
        };
        let blend_out = match (pe, ne) {
            _ if joined_after => 0.0,
            (Some(p), Some(n)) => strip.end - p.min(n),
            (Some(p), None) => strip.end - p,
            (None, Some(n)) => strip.end - n,
            (None, None) => 0.0,
        };
        (blend_in, blend_out)
    }
}

/// Ends of strips in `track` that fall strictly inside `strip`, ignoring ends that
/// continue into an adjacent strip. A strip covering `strip` entirely cancels both.
fn endpoint_overlaps(strip: &Strip, track: &Track) -> (Option<f32>, Option<f32>) {
    let mut start = None;
    let mut end = None;
    for (i, other) in track.strips.iter().enumerate() {
        if other.start <= strip.start && other.end >= strip.end {
            return (None, None);
        }
        if other.end < strip.start {
            continue;
        }
        if other.start > strip.end {
            break;
        }
        let continues = track.strips.get(i + 1).is_some_and(|n| n.start == other.end);
        if !continues && other.end > strip.start && other.end < strip.end {
            start = Some(other.end);
        }
        let continued = i
            .checked_sub(1)
            .is_some_and(|p| track.strips[p].end == other.start);
        if !continued && other.start < strip.end && other.start > strip.start {
            end = Some(other.start);
        }
    }
    (start, end)
}
