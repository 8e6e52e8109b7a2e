use std::collections::BTreeMap;

use crate::api::types::BodyHandle;

/// Handle-keyed body storage.
///
/// Handles come from a monotonic counter and are never handed out twice, so a
/// stale handle can only ever miss. Iteration is in ascending handle order,
/// which is also creation order; stepping and raycast tie-breaks rely on it.
pub struct BodyRegistry<T> {
    bodies: BTreeMap<u64, T>,
    next_handle: u64,
}

impl<T> BodyRegistry<T> {
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// Register a record under a freshly minted handle.
    pub fn insert(&mut self, record: T) -> BodyHandle {
        let handle = self.mint();
        self.bodies.insert(handle.0, record);
        handle
    }

    /// Reserve the next handle without storing anything yet.
    ///
    /// Backends that must build native objects tagged with the handle mint
    /// first and [`BodyRegistry::insert_at`] once construction succeeds.
    pub fn mint(&mut self) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Store a record under a handle previously returned by [`BodyRegistry::mint`].
    pub fn insert_at(&mut self, handle: BodyHandle, record: T) {
        debug_assert!(handle.is_valid() && handle.0 < self.next_handle);
        self.bodies.insert(handle.0, record);
    }

    /// Remove a body by handle. Returns the removed record if it was live.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<T> {
        self.bodies.remove(&handle.0)
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&T> {
        self.bodies.get(&handle.0)
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut T> {
        self.bodies.get_mut(&handle.0)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle.0)
    }

    /// Iterate live bodies in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &T)> {
        self.bodies.iter().map(|(&id, record)| (BodyHandle(id), record))
    }

    /// Iterate live bodies mutably in ascending handle order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut T)> {
        self.bodies.iter_mut().map(|(&id, record)| (BodyHandle(id), record))
    }

    /// Live handles in ascending order.
    pub fn handles(&self) -> Vec<BodyHandle> {
        self.bodies.keys().map(|&id| BodyHandle(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Remove every body, yielding the records. The handle counter is kept.
    pub fn drain(&mut self) -> impl Iterator<Item = (BodyHandle, T)> {
        std::mem::take(&mut self.bodies)
            .into_iter()
            .map(|(id, record)| (BodyHandle(id), record))
    }
}

impl<T> Default for BodyRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
