//! Property accessor trait and binding cache.
//!
//! The host's reflection system is consumed through [`PropertyAccessor`]. A path is
//! resolved against an owner into an opaque [`PropertyHandle`]; channels are keyed by
//! `(handle, array index)`. Resolutions can be memoised in a [`BindingCache`] that lives
//! on the context, so repeated evaluations of the same curves skip the string lookup.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::ids::OwnerId;

/// Opaque handle to a resolved property slot. Only the accessor interprets the value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyHandle(pub u64);

/// One scalar component of a property: the key of an EvalChannel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChannelKey {
    pub handle: PropertyHandle,
    pub index: usize,
}

impl ChannelKey {
    #[inline]
    pub fn new(handle: PropertyHandle, index: usize) -> Self {
        Self { handle, index }
    }
}

/// Host-side property reflection.
///
/// Every failure is non-fatal: `resolve` returning `None`, or `set` returning `false`,
/// makes the engine skip that curve or channel and continue.
pub trait PropertyAccessor {
    fn resolve(&mut self, owner: OwnerId, path: &str) -> Option<PropertyHandle>;
    fn is_animatable(&self, handle: PropertyHandle) -> bool;
    fn array_len(&self, handle: PropertyHandle) -> usize;
    /// Current value, used for driver variable targets.
    fn get(&self, handle: PropertyHandle, index: usize) -> Option<f64>;
    fn get_default(&self, handle: PropertyHandle, index: usize) -> f64;
    fn set(&mut self, handle: PropertyHandle, index: usize, value: f64) -> bool;
}

/// Why a path did not yield a usable handle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BindFailure {
    Unresolved,
    NotAnimatable,
    IndexOutOfRange { len: usize },
}

/// Memoised `(owner, path) -> handle` resolutions.
///
/// Only successful resolutions are cached; a failed path is retried on the next call
/// because the host may have created the property in between.
#[derive(Default, Debug)]
pub struct BindingCache {
    rows: HashMap<OwnerId, HashMap<String, PropertyHandle>>,
}

impl BindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: OwnerId, path: &str) -> Option<PropertyHandle> {
        self.rows.get(&owner).and_then(|paths| paths.get(path)).copied()
    }

    /// Insert or update a binding.
    pub fn upsert(&mut self, owner: OwnerId, path: &str, handle: PropertyHandle) {
        self.rows
            .entry(owner)
            .or_default()
            .insert(path.to_string(), handle);
    }

    /// Forget every binding of one owner (e.g. the host object was rebuilt).
    pub fn forget_owner(&mut self, owner: OwnerId) {
        self.rows.remove(&owner);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve a path, optionally through the cache.
pub(crate) fn resolve_handle(
    accessor: &mut dyn PropertyAccessor,
    cache: Option<&mut BindingCache>,
    owner: OwnerId,
    path: &str,
) -> Option<PropertyHandle> {
    match cache {
        Some(cache) => {
            if let Some(handle) = cache.get(owner, path) {
                return Some(handle);
            }
            let handle = accessor.resolve(owner, path)?;
            cache.upsert(owner, path, handle);
            Some(handle)
        }
        None => accessor.resolve(owner, path),
    }
}

/// Resolve a curve target into a writable channel key, checking animatability and index.
pub(crate) fn bind_channel(
    accessor: &mut dyn PropertyAccessor,
    cache: Option<&mut BindingCache>,
    owner: OwnerId,
    path: &str,
    index: usize,
) -> Result<ChannelKey, BindFailure> {
    let handle = resolve_handle(accessor, cache, owner, path).ok_or(BindFailure::Unresolved)?;
    if !accessor.is_animatable(handle) {
        return Err(BindFailure::NotAnimatable);
    }
    let len = accessor.array_len(handle);
    if index >= len {
        return Err(BindFailure::IndexOutOfRange { len });
    }
    Ok(ChannelKey::new(handle, index))
}
