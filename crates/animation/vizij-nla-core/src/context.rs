//! AnimationContext: owns the action library and evaluation systems, and runs the
//! per-owner evaluation (NLA or active action, then drivers, then overrides).

use tracing::{debug, warn};

use crate::accessor::{bind_channel, resolve_handle, BindingCache, PropertyAccessor};
use crate::action::{Action, ActionLibrary};
use crate::anim_data::{AnimData, Recalc};
use crate::config::Config;
use crate::driver::{ExpressionBackend, SimpleExpressionBackend};
use crate::ids::{ActionId, OwnerId};
use crate::modifier::JoinedModifiers;
use crate::nla::eval::{Binder, StripEvaluator};
use crate::nla::{select_active, BlendMode, EvalChannels, EvalGuard, Extend, Strip};
use crate::report::{EvalReport, SkipEvent, SkipReason};
use crate::scratch::Scratch;

/// Name of the synthetic strip that plays the active action on top of the NLA.
pub const ACTION_TRACK_STRIP: &str = "[Action Track]";

pub struct AnimationContext {
    cfg: Config,
    library: ActionLibrary,
    backend: Box<dyn ExpressionBackend>,
    bindings: BindingCache,
    scratch: Scratch,
}

impl AnimationContext {
    /// Context with the built-in expression backend.
    pub fn new(cfg: Config) -> Self {
        Self::with_backend(cfg, Box::new(SimpleExpressionBackend::new()))
    }

    pub fn with_backend(cfg: Config, backend: Box<dyn ExpressionBackend>) -> Self {
        Self {
            scratch: Scratch::new(&cfg),
            cfg,
            library: ActionLibrary::new(),
            backend,
            bindings: BindingCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn library(&self) -> &ActionLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut ActionLibrary {
        &mut self.library
    }

    /// Shorthand for `library_mut().add(action)`.
    pub fn add_action(&mut self, action: Action) -> ActionId {
        self.library.add(action)
    }

    pub fn bindings(&self) -> &BindingCache {
        &self.bindings
    }

    /// Drop cached path resolutions of `owner`, e.g. after the host rebuilt it.
    pub fn invalidate_bindings(&mut self, owner: OwnerId) {
        self.bindings.forget_owner(owner);
    }

    /// Channels accumulated by the last NLA pass.
    pub fn last_channels(&self) -> &EvalChannels {
        &self.scratch.channels
    }

    /// Evaluate `anim` at `time` and write the results through `accessor`.
    ///
    /// `recalc` is combined with the flags tagged on `anim`; ANIM evaluates the NLA
    /// stack (or the active action alone), DRIVERS evaluates the driver curves.
    /// Overrides are applied on every call. `anim.recalc` is cleared afterwards.
    pub fn evaluate(
        &mut self,
        anim: &mut AnimData,
        accessor: &mut dyn PropertyAccessor,
        time: f32,
        recalc: Recalc,
    ) -> EvalReport {
        let mut report = EvalReport::at(time);
        let recalc = recalc | anim.recalc;

        if recalc.contains(Recalc::ANIM) {
            if !anim.tracks.is_empty() && !anim.flags.nla_disabled {
                self.evaluate_nla(anim, accessor, time, &mut report);
            } else if let Some(action) = anim.action {
                self.evaluate_action(anim.owner, action, accessor, time, &mut report);
            }
        }

        if recalc.contains(Recalc::DRIVERS) {
            self.evaluate_drivers(anim, accessor, &mut report);
        }

        self.apply_overrides(anim, accessor, &mut report);
        anim.recalc = Recalc::empty();
        report
    }

    /// Write every evaluatable curve of one action at `time`, without any blending.
    pub fn evaluate_action(
        &mut self,
        owner: OwnerId,
        action: ActionId,
        accessor: &mut dyn PropertyAccessor,
        time: f32,
        report: &mut EvalReport,
    ) {
        let Some(action) = self.library.get(action) else {
            debug!(?action, "active action missing from library");
            return;
        };
        let mut binder = Binder {
            accessor,
            cache: self.cfg.cache_bindings.then_some(&mut self.bindings),
            owner,
            report,
        };
        for curve in &action.curves {
            if !curve.is_evaluatable(&action.groups) {
                continue;
            }
            let Some(key) = binder.bind(&curve.path, curve.array_index) else {
                continue;
            };
            let value = curve.evaluate(time);
            if binder.accessor.set(key.handle, key.index, value as f64) {
                binder.report.channels_written += 1;
            } else {
                warn!(path = %curve.path, index = curve.array_index, "property write refused");
                binder.report.skip(SkipEvent::new(
                    SkipReason::WriteFailed,
                    curve.path.as_str(),
                    Some(curve.array_index),
                ));
            }
        }
    }

    fn evaluate_nla(
        &mut self,
        anim: &AnimData,
        accessor: &mut dyn PropertyAccessor,
        time: f32,
        report: &mut EvalReport,
    ) {
        self.scratch.begin_frame();
        let library = &self.library;

        // copies that must outlive the selected eval strips
        let tweak_strip = tweak_eval_strip(anim);
        let action_strip = action_track_strip(anim, library);

        let mut selected = Vec::with_capacity(anim.tracks.len() + 1);
        let mut has_strips = false;
        for (index, track) in anim.tracks.iter().enumerate() {
            if !anim.is_track_evaluatable(index) {
                continue;
            }
            has_strips |= !track.strips.is_empty();
            let is_tweaked = anim.flags.tweak_mode && anim.tweak.is_some_and(|t| t.track == index);
            let candidate = match (&tweak_strip, is_tweaked) {
                (Some(strip), true) => select_active(std::slice::from_ref(strip), library, time),
                _ => select_active(&track.strips, library, time),
            };
            selected.extend(candidate);
        }

        let soloing_or_tweaking = anim.flags.solo_track || anim.flags.tweak_mode;
        if let (Some(action), false, false) = (anim.action, has_strips, soloing_or_tweaking) {
            debug!(owner = ?anim.owner, "no strips evaluated; playing the active action alone");
            self.evaluate_action(anim.owner, action, accessor, time, report);
            return;
        }

        if let Some(strip) = &action_strip {
            selected.extend(select_active(std::slice::from_ref(strip), library, time));
        }

        let channels = &mut self.scratch.channels;
        let mut evaluator = StripEvaluator {
            library,
            binder: Binder {
                accessor,
                cache: self.cfg.cache_bindings.then_some(&mut self.bindings),
                owner: anim.owner,
                report,
            },
            guard: EvalGuard::new(self.cfg.max_strip_depth),
            pool: &mut self.scratch.pool,
        };
        for es in &selected {
            evaluator.evaluate_strip(es, channels, &JoinedModifiers::EMPTY);
        }

        let Binder {
            accessor,
            mut cache,
            report,
            ..
        } = evaluator.binder;

        if self.cfg.reset_untouched_channels {
            let touched = &mut self.scratch.touched_actions;
            for_each_domain_action(anim, |id| {
                if !touched.contains(&id) {
                    touched.push(id);
                }
            });
            for &id in touched.iter() {
                let Some(action) = library.get(id) else {
                    continue;
                };
                for curve in &action.curves {
                    if !curve.is_evaluatable(&action.groups) {
                        continue;
                    }
                    let Ok(key) = bind_channel(
                        &mut *accessor,
                        cache.as_deref_mut(),
                        anim.owner,
                        &curve.path,
                        curve.array_index,
                    ) else {
                        continue;
                    };
                    if !channels.contains(key) {
                        let default = accessor.get_default(key.handle, key.index) as f32;
                        channels.accumulate(key, default, BlendMode::Replace, 1.0);
                        report.channels_reset += 1;
                    }
                }
            }
        }

        let refused = channels.flush(accessor);
        report.channels_written += channels.len() - refused.len();
        for key in refused {
            report.skip(SkipEvent::new(
                SkipReason::WriteFailed,
                format!("#{}", key.handle.0),
                Some(key.index),
            ));
        }
    }

    fn evaluate_drivers(
        &mut self,
        anim: &mut AnimData,
        accessor: &mut dyn PropertyAccessor,
        report: &mut EvalReport,
    ) {
        let owner = anim.owner;
        for curve in &mut anim.drivers {
            if curve.flags.muted || curve.flags.disabled {
                continue;
            }
            let Some(driver) = curve.driver.as_mut() else {
                continue;
            };
            if driver.invalid {
                debug!(path = %curve.path, "driver flagged invalid; skipped");
                report.skip(SkipEvent::new(
                    SkipReason::DriverInvalid,
                    curve.path.as_str(),
                    Some(curve.array_index),
                ));
                continue;
            }

            let key = Binder {
                accessor: &mut *accessor,
                cache: self.cfg.cache_bindings.then_some(&mut self.bindings),
                owner,
                report: &mut *report,
            }
            .bind(&curve.path, curve.array_index);
            let Some(key) = key else {
                driver.invalid = true;
                continue;
            };

            let value = curve.calculate_driven(&mut *accessor, self.backend.as_mut());
            report.drivers_evaluated += 1;
            if accessor.set(key.handle, key.index, value as f64) {
                report.channels_written += 1;
            } else {
                warn!(path = %curve.path, "driver result write refused; marking invalid");
                if let Some(driver) = curve.driver.as_mut() {
                    driver.invalid = true;
                }
                report.skip(SkipEvent::new(
                    SkipReason::WriteFailed,
                    curve.path.as_str(),
                    Some(curve.array_index),
                ));
            }
        }
    }

    fn apply_overrides(
        &mut self,
        anim: &AnimData,
        accessor: &mut dyn PropertyAccessor,
        report: &mut EvalReport,
    ) {
        for ov in &anim.overrides {
            let cache = self.cfg.cache_bindings.then_some(&mut self.bindings);
            let handle = resolve_handle(&mut *accessor, cache, anim.owner, &ov.path)
                .filter(|&h| ov.index < accessor.array_len(h));
            let written = handle.is_some_and(|h| accessor.set(h, ov.index, ov.value as f64));
            if written {
                report.overrides_applied += 1;
            } else {
                debug!(path = %ov.path, index = ov.index, "override not applied");
                report.skip(SkipEvent::new(
                    SkipReason::Unresolved,
                    ov.path.as_str(),
                    Some(ov.index),
                ));
            }
        }
    }
}

/// The tweaked strip, detached from its neighbours. Strips driven by a user time
/// curve are held and evaluated unmapped.
fn tweak_eval_strip(anim: &AnimData) -> Option<Strip> {
    if !anim.flags.tweak_mode {
        return None;
    }
    let mut strip = anim.tweak_strip()?.clone();
    if strip.flags.user_time {
        strip.extend = Extend::Hold;
        strip.flags.no_time_map = true;
    }
    Some(strip)
}

/// Synthetic strip playing the active action (the stashed one while tweaking).
fn action_track_strip(anim: &AnimData, library: &ActionLibrary) -> Option<Strip> {
    let tweaking = anim.flags.tweak_mode;
    let id = if tweaking { anim.tmp_action } else { anim.action }?;
    let (start, end) = library
        .get(id)
        .map_or((0.0, 1.0), |action| action.frame_range(true));

    let mut strip = Strip::clip(ACTION_TRACK_STRIP, id, (start, end), start);
    strip.blend_mode = anim.action_blend_mode;
    strip.extend = anim.action_extend;
    strip.influence = anim.action_influence;
    strip.flags.user_influence = true;
    strip.flags.no_time_map = anim.action_extend != Extend::Nothing;

    let eval_upper = !tweaking || anim.flags.eval_upper_tracks;
    strip.flags.muted = anim.flags.solo_track || !eval_upper;
    Some(strip)
}

/// Every action whose channels the NLA result covers: the action track's action and
/// the actions of all tracks passing the solo and mute rules.
fn for_each_domain_action(anim: &AnimData, mut f: impl FnMut(ActionId)) {
    if !anim.flags.tweak_mode {
        if let Some(id) = anim.action {
            f(id);
        }
    } else if anim.flags.eval_upper_tracks {
        if let Some(id) = anim.tmp_action {
            f(id);
        }
    }
    for track in &anim.tracks {
        if !anim.is_track_in_domain(track) {
            continue;
        }
        for strip in &track.strips {
            strip.for_each_action(&mut f);
        }
    }
}

impl std::fmt::Debug for AnimationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationContext")
            .field("cfg", &self.cfg)
            .field("actions", &self.library.len())
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PropertyHandle;
    use crate::curve::Curve;
    use crate::keyframe::Keyframe;
    use crate::nla::{StripKind, Track};

    /// A single scalar property `"x"`.
    #[derive(Default)]
    struct Scalar(f64);

    impl PropertyAccessor for Scalar {
        fn resolve(&mut self, _owner: OwnerId, path: &str) -> Option<PropertyHandle> {
            (path == "x").then_some(PropertyHandle(0))
        }
        fn is_animatable(&self, _handle: PropertyHandle) -> bool {
            true
        }
        fn array_len(&self, _handle: PropertyHandle) -> usize {
            1
        }
        fn get(&self, _handle: PropertyHandle, _index: usize) -> Option<f64> {
            Some(self.0)
        }
        fn get_default(&self, _handle: PropertyHandle, _index: usize) -> f64 {
            0.0
        }
        fn set(&mut self, _handle: PropertyHandle, _index: usize, value: f64) -> bool {
            self.0 = value;
            true
        }
    }

    fn hold(value: f32) -> Action {
        Action::new("hold").with_curve(
            Curve::new("x", 0).with_keys(vec![Keyframe::new(0.0, value), Keyframe::new(10.0, value)]),
        )
    }

    #[test]
    fn transitions_reuse_pooled_buffers() {
        let mut ctx = AnimationContext::new(Config::default());
        let a = ctx.add_action(hold(0.0));
        let b = ctx.add_action(hold(10.0));
        let track = Track::from_strips(
            "t",
            vec![
                Strip::clip("a", a, (0.0, 10.0), 0.0),
                Strip::transition("fade", 10.0, 20.0),
                Strip::clip("b", b, (0.0, 10.0), 20.0),
            ],
        )
        .unwrap();
        let mut anim = AnimData::new(OwnerId(0)).with_track(track);
        let mut x = Scalar::default();

        assert!(ctx.scratch.pool.is_empty());
        ctx.evaluate(&mut anim, &mut x, 15.0, Recalc::ANIM);
        assert!((x.0 - 5.0).abs() < 1e-5);
        assert_eq!(ctx.scratch.pool.len(), 1);
        ctx.evaluate(&mut anim, &mut x, 12.0, Recalc::ANIM);
        assert!((x.0 - 2.0).abs() < 1e-5);
        assert_eq!(ctx.scratch.pool.len(), 1);
    }

    #[test]
    fn action_track_strip_follows_anim_settings() {
        let mut lib = ActionLibrary::new();
        let id = lib.add(Action::new("a").with_frame_range(4.0, 9.0));
        let mut anim = AnimData::new(OwnerId(0)).with_action(id);
        anim.action_blend_mode = BlendMode::Add;
        anim.action_influence = 0.5;

        let strip = action_track_strip(&anim, &lib).unwrap();
        assert_eq!((strip.start, strip.end), (4.0, 9.0));
        assert_eq!(strip.blend_mode, BlendMode::Add);
        assert!(strip.flags.user_influence && strip.flags.no_time_map);
        assert!(!strip.flags.muted);
        assert!(matches!(strip.kind, StripKind::Clip { action } if action == id));

        anim.flags.solo_track = true;
        assert!(action_track_strip(&anim, &lib).unwrap().flags.muted);

        anim.flags.solo_track = false;
        anim.action_extend = Extend::Nothing;
        assert!(!action_track_strip(&anim, &lib).unwrap().flags.no_time_map);
    }
}
