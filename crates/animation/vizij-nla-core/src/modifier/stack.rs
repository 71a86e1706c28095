//! Ordered modifier sequences and the two evaluation passes.

use serde::{Deserialize, Serialize};

use super::{KeyExtent, Modifier};

/// Modifiers owned by a curve or a strip, in evaluation order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierStack {
    pub modifiers: Vec<Modifier>,
}

impl ModifierStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Modifier> {
        self.modifiers.iter()
    }

    pub fn first(&self) -> Option<&Modifier> {
        self.modifiers.first()
    }

    pub fn last(&self) -> Option<&Modifier> {
        self.modifiers.last()
    }

    /// View of this stack alone.
    #[inline]
    pub fn as_joined(&self) -> JoinedModifiers<'_> {
        JoinedModifiers {
            own: &self.modifiers,
            parent: None,
        }
    }

    /// This stack followed by an inherited one. Neither is copied or modified.
    #[inline]
    pub fn joined<'a>(&'a self, parent: &'a JoinedModifiers<'a>) -> JoinedModifiers<'a> {
        JoinedModifiers {
            own: &self.modifiers,
            parent: (!parent.is_empty()).then_some(parent),
        }
    }
}

impl<'a> IntoIterator for &'a ModifierStack {
    type Item = &'a Modifier;
    type IntoIter = std::slice::Iter<'a, Modifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.modifiers.iter()
    }
}

/// Borrowed concatenation `own ++ parent` of modifier sequences.
///
/// Nested strips chain views on the stack: a meta strip's child joins its own
/// modifiers onto the meta's joined view, and so on.
#[derive(Copy, Clone, Debug, Default)]
pub struct JoinedModifiers<'a> {
    own: &'a [Modifier],
    parent: Option<&'a JoinedModifiers<'a>>,
}

impl<'a> JoinedModifiers<'a> {
    pub const EMPTY: JoinedModifiers<'static> = JoinedModifiers {
        own: &[],
        parent: None,
    };

    pub fn is_empty(&self) -> bool {
        self.own.is_empty() && self.parent.map_or(true, |p| p.is_empty())
    }

    pub fn len(&self) -> usize {
        self.own.len() + self.parent.map_or(0, |p| p.len())
    }

    pub fn iter(&self) -> JoinedIter<'a> {
        JoinedIter {
            current: self.own.iter(),
            next: self.parent,
        }
    }

    /// Time pass, left to right. Returns the remapped time and the storage the value
    /// pass needs. `extent` is the key range of the curve being evaluated, if any.
    pub fn evaluate_time(&self, extent: Option<KeyExtent>, t: f32) -> (f32, ModifierStorage) {
        let mut storage = ModifierStorage::default();
        let mut time = t;
        for (index, m) in self.iter().enumerate() {
            if !m.kind.has_time_pass() || !m.is_active_at(time) {
                continue;
            }
            let influence = m.influence_at(time);
            let (mapped, offset) = m.kind.evaluate_time(extent, index == 0, time);
            if offset != 0.0 {
                storage.offsets.push((index, offset));
            }
            time = mapped * influence + time * (1.0 - influence);
        }
        (time, storage)
    }

    /// Value pass, left to right, at time `t`.
    pub fn evaluate_value(&self, storage: &ModifierStorage, value: f32, t: f32) -> f32 {
        let mut value = value;
        for (index, m) in self.iter().enumerate() {
            if !m.kind.has_value_pass() || !m.is_active_at(t) {
                continue;
            }
            let modified = m.kind.evaluate_value(value, t, storage.offset_of(index));
            let influence = m.influence_at(t);
            value = modified * influence + value * (1.0 - influence);
        }
        value
    }
}

pub struct JoinedIter<'a> {
    current: std::slice::Iter<'a, Modifier>,
    next: Option<&'a JoinedModifiers<'a>>,
}

impl<'a> Iterator for JoinedIter<'a> {
    type Item = &'a Modifier;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(m) = self.current.next() {
                return Some(m);
            }
            let parent = self.next.take()?;
            self.current = parent.own.iter();
            self.next = parent.parent;
        }
    }
}

/// Values the time pass hands to the value pass: the cycle offset of each
/// modifier that produced one, by position in the joined sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModifierStorage {
    offsets: Vec<(usize, f32)>,
}

impl ModifierStorage {
    #[inline]
    fn offset_of(&self, index: usize) -> f32 {
        self.offsets
            .iter()
            .find(|(i, _)| *i == index)
            .map_or(0.0, |(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{FrameRange, Generator, Limits, ModifierKind, PolyMode, Stepped};

    fn offset_gen(c: f32) -> Modifier {
        Modifier::new(ModifierKind::Generator(Generator {
            mode: PolyMode::Expanded,
            coefficients: vec![c],
            additive: true,
        }))
    }

    #[test]
    fn join_concatenates_without_mutation() {
        let parent = ModifierStack::new().with(offset_gen(1.0));
        let own = ModifierStack::new().with(offset_gen(10.0)).with(offset_gen(100.0));
        let parent_view = parent.as_joined();
        let joined = own.joined(&parent_view);
        assert_eq!(joined.len(), 3);
        let order: Vec<f32> = joined
            .iter()
            .map(|m| match &m.kind {
                ModifierKind::Generator(g) => g.coefficients[0],
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![10.0, 100.0, 1.0]);
        assert_eq!(own.len(), 2);
        assert_eq!(parent.len(), 1);

        let grandchild = ModifierStack::new().with(offset_gen(1000.0));
        let nested = grandchild.joined(&joined);
        assert_eq!(nested.len(), 4);
        assert!((nested.evaluate_value(&ModifierStorage::default(), 0.0, 0.0) - 1111.0).abs() < 1e-3);
    }

    #[test]
    fn time_pass_runs_left_to_right() {
        // Limits first clamps 9 -> 5, then stepped snaps 5 -> 4
        let stack = ModifierStack::new()
            .with(Modifier::new(ModifierKind::Limits(Limits {
                max_time: Some(5.0),
                ..Limits::default()
            })))
            .with(Modifier::new(ModifierKind::Stepped(Stepped::new(2.0))));
        let (t, _) = stack.as_joined().evaluate_time(None, 9.0);
        assert!((t - 4.0).abs() < 1e-6);
    }

    #[test]
    fn influence_blends_modified_and_original() {
        let stack = ModifierStack::new().with(offset_gen(10.0).with_influence(0.25));
        let v = stack
            .as_joined()
            .evaluate_value(&ModifierStorage::default(), 2.0, 0.0);
        assert!((v - 4.5).abs() < 1e-6);
    }

    #[test]
    fn restricted_range_skips_outside() {
        let stack =
            ModifierStack::new().with(offset_gen(10.0).with_range(FrameRange::new(5.0, 8.0)));
        let view = stack.as_joined();
        let storage = ModifierStorage::default();
        assert_eq!(view.evaluate_value(&storage, 1.0, 2.0), 1.0);
        assert_eq!(view.evaluate_value(&storage, 1.0, 6.0), 11.0);
    }
}
