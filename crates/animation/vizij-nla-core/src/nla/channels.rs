//! Accumulation buffer for NLA evaluation.

use hashbrown::HashMap;
use tracing::warn;

use super::strip::BlendMode;
use crate::accessor::{ChannelKey, PropertyAccessor};

/// Combine an existing channel value with a new contribution.
///
/// `influence == 0` leaves `old` untouched.
#[inline]
pub fn blend(old: f32, value: f32, mode: BlendMode, influence: f32) -> f32 {
    if influence == 0.0 {
        return old;
    }
    match mode {
        BlendMode::Add => old + value * influence,
        BlendMode::Subtract => old - value * influence,
        BlendMode::Multiply => influence * (old * value) + (1.0 - influence) * old,
        BlendMode::Replace => old * (1.0 - influence) + value * influence,
    }
}

/// Insertion-ordered `ChannelKey -> value` map, reused across evaluations.
///
/// `clear` keeps both allocations; flushing walks channels in the order they were
/// first written, so host writes are deterministic.
#[derive(Debug, Default)]
pub struct EvalChannels {
    slots: HashMap<ChannelKey, usize>,
    entries: Vec<(ChannelKey, f32)>,
}

impl EvalChannels {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.slots.clear();
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn get(&self, key: ChannelKey) -> Option<f32> {
        self.slots.get(&key).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, key: ChannelKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelKey, f32)> + '_ {
        self.entries.iter().copied()
    }

    /// Write `value` into the channel. The first write stores it as is; later
    /// writes go through [`blend`].
    pub fn accumulate(&mut self, key: ChannelKey, value: f32, mode: BlendMode, influence: f32) {
        match self.slots.get(&key) {
            Some(&i) => {
                let slot = &mut self.entries[i].1;
                *slot = blend(*slot, value, mode, influence);
            }
            None => self.insert_new(key, value),
        }
    }

    /// Blend every channel of `other` into `self`; channels missing here are moved
    /// in unchanged. Leaves `other` empty.
    pub fn merge(&mut self, other: &mut EvalChannels, mode: BlendMode, influence: f32) {
        for (key, value) in other.entries.drain(..) {
            match self.slots.get(&key) {
                Some(&i) => {
                    let slot = &mut self.entries[i].1;
                    *slot = blend(*slot, value, mode, influence);
                }
                None => self.insert_new(key, value),
            }
        }
        other.slots.clear();
    }

    fn insert_new(&mut self, key: ChannelKey, value: f32) {
        self.slots.insert(key, self.entries.len());
        self.entries.push((key, value));
    }

    /// Write every channel through the accessor. Returns the channels the accessor
    /// refused.
    pub fn flush(&self, accessor: &mut dyn PropertyAccessor) -> Vec<ChannelKey> {
        let mut refused = Vec::new();
        for &(key, value) in &self.entries {
            if !accessor.set(key.handle, key.index, value as f64) {
                warn!(handle = key.handle.0, index = key.index, "property write refused");
                refused.push(key);
            }
        }
        refused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PropertyHandle;

    fn key(h: u64, i: usize) -> ChannelKey {
        ChannelKey::new(PropertyHandle(h), i)
    }

    #[test]
    fn blend_modes() {
        assert_eq!(blend(2.0, 3.0, BlendMode::Add, 0.5), 3.5);
        assert_eq!(blend(2.0, 3.0, BlendMode::Subtract, 1.0), -1.0);
        assert_eq!(blend(2.0, 3.0, BlendMode::Multiply, 1.0), 6.0);
        assert_eq!(blend(2.0, 3.0, BlendMode::Multiply, 0.5), 4.0);
        assert_eq!(blend(2.0, 4.0, BlendMode::Replace, 0.25), 2.5);
        assert_eq!(blend(2.0, 4.0, BlendMode::Replace, 0.0), 2.0);
    }

    #[test]
    fn first_write_is_raw_and_order_is_kept() {
        let mut ch = EvalChannels::with_capacity(4);
        ch.accumulate(key(2, 0), 5.0, BlendMode::Add, 0.1);
        ch.accumulate(key(1, 0), 1.0, BlendMode::Replace, 1.0);
        ch.accumulate(key(2, 0), 1.0, BlendMode::Add, 0.5);
        assert_eq!(ch.get(key(2, 0)), Some(5.5));
        let order: Vec<_> = ch.iter().map(|(k, _)| k.handle.0).collect();
        assert_eq!(order, [2, 1]);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut ch = EvalChannels::with_capacity(8);
        for i in 0..8 {
            ch.accumulate(key(i, 0), 0.0, BlendMode::Replace, 1.0);
        }
        let cap = ch.capacity();
        ch.clear();
        assert!(ch.is_empty());
        assert_eq!(ch.capacity(), cap);
    }

    #[test]
    fn merge_moves_unmatched_channels() {
        let mut parent = EvalChannels::default();
        parent.accumulate(key(1, 0), 10.0, BlendMode::Replace, 1.0);
        let mut tmp = EvalChannels::default();
        tmp.accumulate(key(1, 0), 20.0, BlendMode::Replace, 1.0);
        tmp.accumulate(key(2, 1), 7.0, BlendMode::Replace, 1.0);
        parent.merge(&mut tmp, BlendMode::Replace, 0.5);
        assert_eq!(parent.get(key(1, 0)), Some(15.0));
        assert_eq!(parent.get(key(2, 1)), Some(7.0));
        assert!(tmp.is_empty());
    }
}
