//! Identifiers and simple allocators for core entities.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Key of an [`Action`](crate::action::Action) in the [`ActionLibrary`](crate::action::ActionLibrary).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u32);

/// Opaque handle for the object whose properties an [`AnimData`](crate::anim_data::AnimData)
/// animates. Interpreted only by the property accessor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
pub struct OwnerId(pub u32);

/// Identity of a strip, used by the recursion guard.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StripId(pub u32);

static NEXT_STRIP: AtomicU32 = AtomicU32::new(1);

impl StripId {
    /// Process-wide unique id. Strips are created in many places (builders, serde,
    /// the synthetic action-track strip), so ids do not come from a per-library allocator.
    pub fn fresh() -> Self {
        Self(NEXT_STRIP.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for StripId {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Monotonic allocator for ActionId.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next_action: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_action(&mut self) -> ActionId {
        let id = ActionId(self.next_action);
        self.next_action = self.next_action.wrapping_add(1);
        id
    }

    /// Make sure future allocations never collide with an externally assigned id.
    pub fn observe_action(&mut self, id: ActionId) {
        if id.0 >= self.next_action {
            self.next_action = id.0.wrapping_add(1);
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
