//! Picking the active strip of a track at a given time.

use tracing::debug;

use super::strip::{Extend, Strip, StripControls, StripKind};
use crate::action::ActionLibrary;

/// Where the evaluation time sits relative to the chosen strip.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StripTimeMode {
    Before,
    Within,
    After,
    /// Source side of a transition.
    TransitionStart,
    /// Destination side of a transition, weighted by the transition's local time.
    TransitionEnd { fade: f32 },
}

/// Strips flanking a transition, with controls taken at the transition's edges.
#[derive(Copy, Clone, Debug)]
pub struct Neighbours<'a> {
    pub prev: &'a Strip,
    pub prev_controls: StripControls,
    pub next: &'a Strip,
    pub next_controls: StripControls,
}

/// A strip chosen for evaluation together with its controls at this time.
#[derive(Copy, Clone, Debug)]
pub struct EvalStrip<'a> {
    pub strip: &'a Strip,
    pub mode: StripTimeMode,
    pub strip_time: f32,
    pub influence: f32,
    pub neighbours: Option<Neighbours<'a>>,
}

impl<'a> EvalStrip<'a> {
    pub(crate) fn from_controls(strip: &'a Strip, mode: StripTimeMode, c: StripControls) -> Self {
        Self {
            strip,
            mode,
            strip_time: c.strip_time,
            influence: c.influence,
            neighbours: None,
        }
    }

    /// Influence used when accumulating this strip's values.
    #[inline]
    pub fn blend_weight(&self) -> f32 {
        match self.mode {
            StripTimeMode::TransitionEnd { fade } => self.influence * fade,
            _ => self.influence,
        }
    }
}

/// Active strip of `strips` at `time`, or `None` when nothing should contribute.
pub fn select_active<'a>(
    strips: &'a [Strip],
    library: &ActionLibrary,
    time: f32,
) -> Option<EvalStrip<'a>> {
    let (index, mode) = find_candidate(strips, time)?;
    let strip = &strips[index];
    if strip.flags.muted {
        return None;
    }

    let clamped = match mode {
        StripTimeMode::Before => strip.start,
        StripTimeMode::After => strip.end,
        _ => time,
    };
    let controls = strip.controls(clamped);
    if controls.influence <= 0.0 {
        return None;
    }

    let mut eval = EvalStrip::from_controls(strip, mode, controls);
    match &strip.kind {
        StripKind::Clip { action } => {
            if !library.contains(*action) {
                debug!(strip = %strip.name, ?action, "clip strip has no action");
                return None;
            }
        }
        StripKind::Transition => {
            let (Some(prev), Some(next)) = (
                index.checked_sub(1).and_then(|i| strips.get(i)),
                strips.get(index + 1),
            ) else {
                debug!(strip = %strip.name, "transition without a strip on both sides");
                return None;
            };
            eval.neighbours = Some(Neighbours {
                prev,
                prev_controls: prev.controls(strip.start),
                next,
                next_controls: next.controls(strip.end),
            });
        }
        StripKind::Meta { .. } => {}
    }
    Some(eval)
}

/// Scan in order for the strip covering `time`, or the one held across it.
fn find_candidate(strips: &[Strip], time: f32) -> Option<(usize, StripTimeMode)> {
    let last = strips.len().checked_sub(1)?;
    for (i, strip) in strips.iter().enumerate() {
        if (strip.start <= time && time <= strip.end) || strip.flags.no_time_map {
            return Some((i, StripTimeMode::Within));
        }
        if time < strip.start {
            if i == 0 {
                return (strip.extend == Extend::Hold).then_some((i, StripTimeMode::Before));
            }
            let prev = &strips[i - 1];
            return (prev.extend != Extend::Nothing).then_some((i - 1, StripTimeMode::After));
        }
        if time > strip.end && i == last {
            return (strip.extend != Extend::Nothing).then_some((i, StripTimeMode::After));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::ids::ActionId;

    fn setup() -> (ActionLibrary, ActionId) {
        let mut lib = ActionLibrary::new();
        let id = lib.add(Action::new("a"));
        (lib, id)
    }

    #[test]
    fn gap_holds_previous_strip() {
        let (lib, id) = setup();
        let strips = vec![
            Strip::clip("a", id, (0.0, 5.0), 0.0),
            Strip::clip("b", id, (0.0, 5.0), 10.0),
        ];
        let e = select_active(&strips, &lib, 7.0).unwrap();
        assert_eq!(e.strip.name, "a");
        assert_eq!(e.mode, StripTimeMode::After);
        assert_eq!(e.strip_time, 5.0);

        let strips = vec![
            Strip::clip("a", id, (0.0, 5.0), 0.0).with_extend(Extend::Nothing),
            Strip::clip("b", id, (0.0, 5.0), 10.0),
        ];
        assert!(select_active(&strips, &lib, 7.0).is_none());
    }

    #[test]
    fn muted_and_silent_strips_are_skipped() {
        let (lib, id) = setup();
        let muted = vec![Strip::clip("a", id, (0.0, 5.0), 0.0).muted(true)];
        assert!(select_active(&muted, &lib, 1.0).is_none());
        let silent = vec![Strip::clip("a", id, (0.0, 5.0), 0.0).with_influence(0.0)];
        assert!(select_active(&silent, &lib, 1.0).is_none());
    }

    #[test]
    fn clip_needs_its_action() {
        let (lib, _) = setup();
        let strips = vec![Strip::clip("a", ActionId(42), (0.0, 5.0), 0.0)];
        assert!(select_active(&strips, &lib, 1.0).is_none());
    }

    #[test]
    fn transition_needs_both_neighbours() {
        let (lib, id) = setup();
        let lonely = vec![
            Strip::clip("a", id, (0.0, 5.0), 0.0),
            Strip::transition("t", 5.0, 8.0),
        ];
        assert!(select_active(&lonely, &lib, 6.0).is_none());

        let strips = vec![
            Strip::clip("a", id, (0.0, 5.0), 0.0),
            Strip::transition("t", 5.0, 8.0),
            Strip::clip("b", id, (10.0, 15.0), 8.0),
        ];
        let e = select_active(&strips, &lib, 6.5).unwrap();
        assert!((e.strip_time - 0.5).abs() < 1e-6);
        let n = e.neighbours.unwrap();
        assert_eq!(n.prev_controls.strip_time, 5.0);
        assert_eq!(n.next_controls.strip_time, 10.0);
    }
}
