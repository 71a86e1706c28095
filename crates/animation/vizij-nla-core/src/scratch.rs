//! Scratch buffers reused across evaluations.

use crate::config::Config;
use crate::ids::ActionId;
use crate::nla::EvalChannels;

#[derive(Debug, Default)]
pub struct Scratch {
    /// NLA accumulation buffer.
    pub channels: EvalChannels,
    /// Temporary buffers for transitions.
    pub pool: ChannelPool,
    /// Actions already visited by the domain reset.
    pub touched_actions: Vec<ActionId>,
}

/// Spare accumulation buffers. Nested transitions take one each and give it back
/// when merged, so a steady-state evaluation allocates nothing.
#[derive(Debug, Default)]
pub struct ChannelPool {
    free: Vec<EvalChannels>,
}

impl ChannelPool {
    /// An empty buffer, reusing a returned one when available.
    pub fn take(&mut self) -> EvalChannels {
        let mut channels = self.free.pop().unwrap_or_default();
        channels.clear();
        channels
    }

    pub fn give(&mut self, channels: EvalChannels) {
        self.free.push(channels);
    }

    /// Buffers waiting for reuse.
    #[inline]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

impl Scratch {
    pub fn new(cfg: &Config) -> Self {
        Self {
            channels: EvalChannels::with_capacity(cfg.scratch_channels),
            pool: ChannelPool::default(),
            touched_actions: Vec::new(),
        }
    }

    /// Empty every buffer, keeping allocations.
    #[inline]
    pub fn begin_frame(&mut self) {
        self.channels.clear();
        self.touched_actions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{ChannelKey, PropertyHandle};
    use crate::nla::BlendMode;

    #[test]
    fn pool_hands_back_cleared_buffers() {
        let mut pool = ChannelPool::default();
        let mut tmp = pool.take();
        tmp.accumulate(ChannelKey::new(PropertyHandle(1), 0), 3.0, BlendMode::Replace, 1.0);
        let capacity = tmp.capacity();
        pool.give(tmp);
        assert_eq!(pool.len(), 1);

        let reused = pool.take();
        assert!(reused.is_empty());
        assert!(reused.capacity() >= capacity);
        assert!(pool.is_empty());
    }
}
