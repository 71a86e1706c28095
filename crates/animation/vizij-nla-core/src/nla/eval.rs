//! Strip evaluation: clips write curve values, transitions cross-fade their
//! neighbours, meta strips open a window onto their children.

use tracing::{debug, warn};

use super::channels::EvalChannels;
use super::select::{select_active, EvalStrip, StripTimeMode};
use super::strip::StripKind;
use crate::accessor::{bind_channel, BindFailure, BindingCache, ChannelKey, PropertyAccessor};
use crate::action::ActionLibrary;
use crate::ids::{OwnerId, StripId};
use crate::modifier::JoinedModifiers;
use crate::report::{EvalReport, SkipEvent, SkipReason};
use crate::scratch::ChannelPool;

/// Strips on the current evaluation path. Lives on the stack of one evaluation call.
#[derive(Debug)]
pub struct EvalGuard {
    active: Vec<StripId>,
    max_depth: usize,
}

impl EvalGuard {
    pub fn new(max_depth: usize) -> Self {
        Self {
            active: Vec::with_capacity(max_depth.min(16)),
            max_depth,
        }
    }

    /// Push `id`; `false` if it is already on the path or the path is full.
    pub fn enter(&mut self, id: StripId) -> bool {
        if self.active.len() >= self.max_depth || self.active.contains(&id) {
            return false;
        }
        self.active.push(id);
        true
    }

    pub fn leave(&mut self) {
        self.active.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.active.len()
    }
}

/// Binds curves to channels and reports what it skipped.
pub(crate) struct Binder<'e> {
    pub accessor: &'e mut dyn PropertyAccessor,
    pub cache: Option<&'e mut BindingCache>,
    pub owner: OwnerId,
    pub report: &'e mut EvalReport,
}

impl Binder<'_> {
    pub fn bind(&mut self, path: &str, index: usize) -> Option<ChannelKey> {
        match bind_channel(
            &mut *self.accessor,
            self.cache.as_deref_mut(),
            self.owner,
            path,
            index,
        ) {
            Ok(key) => Some(key),
            Err(failure) => {
                let reason = match failure {
                    BindFailure::Unresolved => {
                        warn!(%path, owner = ?self.owner, "path did not resolve; curve skipped");
                        SkipReason::Unresolved
                    }
                    BindFailure::NotAnimatable => {
                        warn!(%path, "property is not animatable; curve skipped");
                        SkipReason::NotAnimatable
                    }
                    BindFailure::IndexOutOfRange { len } => {
                        warn!(%path, index, len, "array index out of range; curve skipped");
                        SkipReason::IndexOutOfRange { len }
                    }
                };
                self.report.skip(SkipEvent::new(reason, path, Some(index)));
                None
            }
        }
    }
}

/// Recursive strip evaluator for one NLA pass.
pub(crate) struct StripEvaluator<'e> {
    pub library: &'e ActionLibrary,
    pub binder: Binder<'e>,
    pub guard: EvalGuard,
    pub pool: &'e mut ChannelPool,
}

impl StripEvaluator<'_> {
    pub fn evaluate_strip(
        &mut self,
        es: &EvalStrip<'_>,
        channels: &mut EvalChannels,
        parent: &JoinedModifiers<'_>,
    ) {
        let strip = es.strip;
        if !self.guard.enter(strip.id) {
            debug!(strip = %strip.name, depth = self.guard.depth(), "strip guard hit; skipped");
            self.binder.report.skip(SkipEvent::new(
                SkipReason::GuardHit {
                    depth: self.guard.depth(),
                },
                strip.name.as_str(),
                None,
            ));
            return;
        }

        match &strip.kind {
            StripKind::Clip { .. } => self.evaluate_clip(es, channels, parent),
            StripKind::Transition => self.evaluate_transition(es, channels, parent),
            StripKind::Meta { .. } => self.evaluate_meta(es, channels, parent),
        }

        self.guard.leave();
    }

    fn evaluate_clip(
        &mut self,
        es: &EvalStrip<'_>,
        channels: &mut EvalChannels,
        parent: &JoinedModifiers<'_>,
    ) {
        let strip = es.strip;
        let library = self.library;
        let Some(action) = strip.action().and_then(|id| library.get(id)) else {
            debug!(strip = %strip.name, "clip action missing; skipped");
            self.binder.report.skip(SkipEvent::new(
                SkipReason::MissingAction,
                strip.name.as_str(),
                None,
            ));
            return;
        };

        let modifiers = strip.modifiers.joined(parent);
        let (modified_time, storage) = modifiers.evaluate_time(None, es.strip_time);
        let weight = es.blend_weight();

        for curve in &action.curves {
            if !curve.is_evaluatable(&action.groups) {
                continue;
            }
            let Some(key) = self.binder.bind(&curve.path, curve.array_index) else {
                continue;
            };
            let value = curve.evaluate(modified_time);
            let value = modifiers.evaluate_value(&storage, value, es.strip_time);
            channels.accumulate(key, value, strip.blend_mode, weight);
        }
    }

    fn evaluate_transition(
        &mut self,
        es: &EvalStrip<'_>,
        channels: &mut EvalChannels,
        parent: &JoinedModifiers<'_>,
    ) {
        let Some(n) = es.neighbours else {
            debug!(strip = %es.strip.name, "transition evaluated without neighbours");
            return;
        };
        let (from, to) = if es.strip.flags.reversed {
            ((n.next, n.next_controls), (n.prev, n.prev_controls))
        } else {
            ((n.prev, n.prev_controls), (n.next, n.next_controls))
        };

        let modifiers = es.strip.modifiers.joined(parent);
        let mut tmp = self.pool.take();

        let start = EvalStrip::from_controls(from.0, StripTimeMode::TransitionStart, from.1);
        self.evaluate_strip(&start, &mut tmp, &modifiers);

        let end = EvalStrip::from_controls(
            to.0,
            StripTimeMode::TransitionEnd {
                fade: es.strip_time,
            },
            to.1,
        );
        self.evaluate_strip(&end, &mut tmp, &modifiers);

        channels.merge(&mut tmp, es.strip.blend_mode, es.blend_weight());
        self.pool.give(tmp);
    }

    fn evaluate_meta(
        &mut self,
        es: &EvalStrip<'_>,
        channels: &mut EvalChannels,
        parent: &JoinedModifiers<'_>,
    ) {
        let strip = es.strip;
        let modifiers = strip.modifiers.joined(parent);
        let time = strip.start + es.strip_time * (strip.end - strip.start);
        match select_active(strip.children(), self.library, time) {
            Some(child) => self.evaluate_strip(&child, channels, &modifiers),
            None => debug!(strip = %strip.name, time, "meta strip has no active child"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_reentry_and_depth() {
        let mut guard = EvalGuard::new(2);
        let (a, b, c) = (StripId(1), StripId(2), StripId(3));
        assert!(guard.enter(a));
        assert!(!guard.enter(a));
        assert!(guard.enter(b));
        assert!(!guard.enter(c));
        guard.leave();
        assert!(guard.enter(c));
        assert_eq!(guard.depth(), 2);
    }
}
