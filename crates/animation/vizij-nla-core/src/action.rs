//! Actions (bags of curves) and the library that owns them.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::Curve;
use crate::error::{NlaError, Result};
use crate::ids::{ActionId, IdAllocator};
use crate::modifier::{CycleMode, ModifierKind};

/// Outermost frame an infinitely extending modifier is taken to reach.
pub const MAX_FRAME: f32 = 1_048_574.0;
pub const MIN_FRAME: f32 = -MAX_FRAME;

/// Named curve group. Muting a group mutes every curve in it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub muted: bool,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            muted: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    #[serde(default)]
    pub curves: Vec<Curve>,
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Manual range, overriding the one computed from the curves.
    #[serde(default)]
    pub frame_range: Option<(f32, f32)>,
}

impl Action {
    /// New action with a placeholder id; [`ActionLibrary::add`] assigns the real one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ActionId(0),
            name: name.into(),
            curves: Vec::new(),
            groups: Vec::new(),
            frame_range: None,
        }
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curves.push(curve);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_frame_range(mut self, start: f32, end: f32) -> Self {
        self.frame_range = Some((start, end));
        self
    }

    pub fn curve(&self, path: &str, index: usize) -> Option<&Curve> {
        self.curves
            .iter()
            .find(|c| c.path == path && c.array_index == index)
    }

    pub fn curve_mut(&mut self, path: &str, index: usize) -> Option<&mut Curve> {
        self.curves
            .iter_mut()
            .find(|c| c.path == path && c.array_index == index)
    }

    pub fn group_muted(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.name == name && g.muted)
    }

    /// Frames the action spans. The manual range wins when set.
    ///
    /// With `include_modifiers`, the last modifier of each curve can widen the range:
    /// Limits to its time bounds, Cycles to the outermost frame on each cycling side,
    /// any other kind to the outermost frames on both sides. The result is at least
    /// one frame long; an action without data spans `(0, 1)`.
    pub fn frame_range(&self, include_modifiers: bool) -> (f32, f32) {
        let (mut start, mut end) = match self.frame_range {
            Some(range) => range,
            None => self.computed_range(include_modifiers),
        };
        if start >= end {
            end = start + 1.0;
        }
        start = start.max(MIN_FRAME);
        end = end.min(MAX_FRAME);
        (start, end)
    }

    fn computed_range(&self, include_modifiers: bool) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut found = false;

        for curve in &self.curves {
            if let Some((s, e)) = curve.frame_range(false) {
                min = min.min(s);
                max = max.max(e);
                found = true;
            }
            if !include_modifiers {
                continue;
            }
            let Some(last) = curve.modifiers.last() else {
                continue;
            };
            match &last.kind {
                ModifierKind::Limits(l) => {
                    if let Some(t) = l.min_time {
                        min = min.min(t);
                    }
                    if let Some(t) = l.max_time {
                        max = max.max(t);
                    }
                }
                ModifierKind::Cycles(c) => {
                    if c.before_mode != CycleMode::Off {
                        min = MIN_FRAME;
                    }
                    if c.after_mode != CycleMode::Off {
                        max = MAX_FRAME;
                    }
                }
                _ => {
                    min = MIN_FRAME;
                    max = MAX_FRAME;
                }
            }
            found = true;
        }

        if !found {
            return (0.0, 1.0);
        }
        if min == max {
            max += 1.0;
        }
        (min, max)
    }
}

/// Owns every action by id. Strips and AnimData refer to actions through their ids.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionLibrary {
    actions: HashMap<ActionId, Action>,
    #[serde(default)]
    ids: IdAllocator,
}

impl ActionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `action` under a fresh id and return it.
    pub fn add(&mut self, mut action: Action) -> ActionId {
        let id = self.ids.alloc_action();
        action.id = id;
        debug!(?id, name = %action.name, "action added");
        self.actions.insert(id, action);
        id
    }

    /// Store `action` under its own id, replacing any action with that id.
    pub fn insert(&mut self, action: Action) -> ActionId {
        let id = action.id;
        self.ids.observe_action(id);
        self.actions.insert(id, action);
        id
    }

    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(&id)
    }

    pub fn get_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions.get_mut(&id)
    }

    pub fn require(&self, id: ActionId) -> Result<&Action> {
        self.get(id).ok_or(NlaError::ActionNotFound { id })
    }

    pub fn require_mut(&mut self, id: ActionId) -> Result<&mut Action> {
        self.get_mut(id).ok_or(NlaError::ActionNotFound { id })
    }

    pub fn remove(&mut self, id: ActionId) -> Option<Action> {
        self.actions.remove(&id)
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.actions.contains_key(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Action> {
        self.actions.values().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
