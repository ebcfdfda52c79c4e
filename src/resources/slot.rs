//! Lazily-created GPU resource slots.
//!
//! Components and asset loaders never create GPU objects as a side effect of a
//! getter. Instead they hold a [`GpuSlot`], an explicit two-state machine:
//!
//! ```text
//!   Unloaded ──ensure_loaded──▶ Loaded(T)
//!      ▲                            │
//!      └──────────unload────────────┘
//! ```
//!
//! Dropping the payload is the only way GPU memory is released, so the owner
//! controls exactly when that happens.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one created GPU resource group.
///
/// Recreating a resource always yields a fresh id, which lets callers (and
/// tests) tell a cached resource from a rebuilt one without comparing GPU
/// handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Optional GPU payload with an explicit load/unload state machine.
#[derive(Debug)]
pub enum GpuSlot<T> {
    Unloaded,
    Loaded(T),
}

impl<T> Default for GpuSlot<T> {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl<T> GpuSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::Unloaded
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns the payload if the slot is loaded.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }

    /// Transitions `Unloaded → Loaded` by running `create`; a loaded slot is
    /// returned untouched and `create` is not called.
    pub fn ensure_loaded<E>(&mut self, create: impl FnOnce() -> Result<T, E>) -> Result<&mut T, E> {
        if let Self::Unloaded = self {
            *self = Self::Loaded(create()?);
        }
        match self {
            Self::Loaded(value) => Ok(value),
            Self::Unloaded => unreachable!("slot was loaded above"),
        }
    }

    /// Transitions back to `Unloaded`, handing out the previous payload.
    pub fn unload(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }

    /// Replaces the payload unconditionally, returning the old one.
    pub fn replace(&mut self, value: T) -> Option<T> {
        match std::mem::replace(self, Self::Loaded(value)) {
            Self::Loaded(old) => Some(old),
            Self::Unloaded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counted(Rc<Cell<u32>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn ensure_loaded_creates_once() {
        let mut slot: GpuSlot<u32> = GpuSlot::new();
        let mut calls = 0;
        for _ in 0..3 {
            slot.ensure_loaded::<()>(|| {
                calls += 1;
                Ok(7)
            })
            .unwrap();
        }
        assert_eq!(calls, 1);
        assert_eq!(slot.get(), Some(&7));
    }

    #[test]
    fn failed_create_keeps_slot_unloaded() {
        let mut slot: GpuSlot<u32> = GpuSlot::new();
        let res = slot.ensure_loaded(|| Err("boom"));
        assert!(res.is_err());
        assert!(!slot.is_loaded());
    }

    #[test]
    fn unload_drops_payload_once() {
        let drops = Rc::new(Cell::new(0));
        let mut slot = GpuSlot::new();
        slot.ensure_loaded::<()>(|| Ok(Counted(drops.clone()))).unwrap();

        drop(slot.unload());
        assert_eq!(drops.get(), 1);
        assert!(slot.unload().is_none());
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn resource_ids_are_unique() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }
}
