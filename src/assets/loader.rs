//! Reference-counted asset loaders
//!
//! An [`AssetLoader`] owns the CPU-side description of one asset (its
//! [`AssetSource`]) and lazily builds the GPU payload from it.
//!
//! # Lifetime rules
//! - `register_usage` / `deregister_usage` must be paired by every consumer.
//!   [`AssetHandle`] does the pairing automatically (register on creation and
//!   clone, deregister on drop).
//! - The payload exists only while the usage count is positive. It is built
//!   by the first [`AssetLoader::get_asset_data`] call after registration and
//!   released, through [`AssetSource::unload`], when the count returns to 0.
//! - [`AssetLoader::unload_gpu`] drops the payload without touching the count
//!   (device loss); the next access rebuilds it.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::errors::{EngineError, Result};
use crate::resources::slot::GpuSlot;

/// CPU-side description of an asset that knows how to build its GPU payload.
pub trait AssetSource {
    /// Whatever `load` needs to create the payload (usually the GPU interface).
    type Context;
    type Payload;

    fn load(&self, ctx: &Self::Context) -> Result<Self::Payload>;

    /// Releases a payload. The default simply drops it.
    fn unload(&self, payload: Self::Payload) {
        drop(payload);
    }
}

/// Loader shared between every consumer of one asset id.
pub type SharedLoader<S> = Rc<RefCell<AssetLoader<S>>>;

pub struct AssetLoader<S: AssetSource> {
    id: String,
    display_name: Option<String>,
    source: S,
    usage_count: u32,
    data: GpuSlot<S::Payload>,
}

impl<S: AssetSource> AssetLoader<S> {
    pub fn new(id: impl Into<String>, source: S) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            source,
            usage_count: 0,
            data: GpuSlot::new(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: Option<&str>) -> Self {
        self.display_name = name.map(str::to_string);
        self
    }

    /// Wraps the loader for sharing.
    #[must_use]
    pub fn shared(self) -> SharedLoader<S> {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.data.is_loaded()
    }

    /// Payload if currently loaded; never triggers a load.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<&S::Payload> {
        self.data.get()
    }

    pub fn register_usage(&mut self) {
        self.usage_count += 1;
    }

    /// Decrements the usage count and unloads the payload when it reaches 0.
    pub fn deregister_usage(&mut self) {
        if self.usage_count == 0 {
            log::warn!("Asset '{}' deregistered more often than registered", self.id);
            return;
        }
        self.usage_count -= 1;
        if self.usage_count == 0 {
            self.release();
        }
    }

    /// Returns the payload, building it on first access. Idempotent while loaded.
    ///
    /// Fails with [`EngineError::InvalidAsset`] when nobody registered usage:
    /// a payload without a consumer would never be released.
    pub fn get_asset_data(&mut self, ctx: &S::Context) -> Result<&S::Payload> {
        if self.usage_count == 0 {
            return Err(EngineError::InvalidAsset(format!(
                "asset '{}' accessed without registered usage",
                self.id
            )));
        }
        let source = &self.source;
        let data = self.data.ensure_loaded(|| source.load(ctx))?;
        Ok(&*data)
    }

    /// Drops the payload but keeps the usage count (device loss).
    pub fn unload_gpu(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(payload) = self.data.unload() {
            self.source.unload(payload);
        }
    }
}

impl<S: AssetSource> Drop for AssetLoader<S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S: AssetSource> fmt::Debug for AssetLoader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLoader")
            .field("id", &self.id)
            .field("usage_count", &self.usage_count)
            .field("loaded", &self.data.is_loaded())
            .finish_non_exhaustive()
    }
}

/// Counted reference to a shared loader.
///
/// Creating or cloning a handle registers one usage; dropping it deregisters
/// that usage, so the payload lives exactly as long as some handle does.
pub struct AssetHandle<S: AssetSource> {
    loader: SharedLoader<S>,
}

impl<S: AssetSource> AssetHandle<S> {
    pub fn new(loader: SharedLoader<S>) -> Self {
        loader.borrow_mut().register_usage();
        Self { loader }
    }

    #[inline]
    #[must_use]
    pub fn loader(&self) -> &SharedLoader<S> {
        &self.loader
    }

    #[must_use]
    pub fn id(&self) -> String {
        self.loader.borrow().id().to_string()
    }

    /// Builds the payload if needed.
    pub fn load(&self, ctx: &S::Context) -> Result<()> {
        self.loader.borrow_mut().get_asset_data(ctx).map(|_| ())
    }

    /// Borrow of the payload, if loaded.
    #[must_use]
    pub fn data(&self) -> Option<Ref<'_, S::Payload>> {
        Ref::filter_map(self.loader.borrow(), |loader| loader.payload()).ok()
    }

    /// Loads (if needed) and borrows the payload.
    pub fn get(&self, ctx: &S::Context) -> Result<Ref<'_, S::Payload>> {
        self.load(ctx)?;
        self.data().ok_or_else(|| {
            EngineError::InvalidAsset(format!("asset '{}' failed to stay loaded", self.id()))
        })
    }

    /// Whether both handles point at the same loader.
    #[must_use]
    pub fn same_asset(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.loader, &other.loader)
    }
}

impl<S: AssetSource> Clone for AssetHandle<S> {
    fn clone(&self) -> Self {
        Self::new(Rc::clone(&self.loader))
    }
}

impl<S: AssetSource> Drop for AssetHandle<S> {
    fn drop(&mut self) {
        self.loader.borrow_mut().deregister_usage();
    }
}

impl<S: AssetSource> fmt::Debug for AssetHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetHandle").field(&self.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counting {
        loads: Cell<u32>,
        unloads: Rc<Cell<u32>>,
    }

    impl AssetSource for Counting {
        type Context = ();
        type Payload = u32;

        fn load(&self, _ctx: &()) -> Result<u32> {
            self.loads.set(self.loads.get() + 1);
            Ok(self.loads.get())
        }

        fn unload(&self, _payload: u32) {
            self.unloads.set(self.unloads.get() + 1);
        }
    }

    #[test]
    fn access_without_usage_is_refused() {
        let mut loader = AssetLoader::new("a", Counting::default());
        assert!(loader.get_asset_data(&()).is_err());
        assert!(!loader.is_loaded());
    }

    #[test]
    fn deregister_underflow_is_ignored() {
        let mut loader = AssetLoader::new("a", Counting::default());
        loader.deregister_usage();
        assert_eq!(loader.usage_count(), 0);
    }

    #[test]
    fn unload_gpu_keeps_count_and_reloads() {
        let mut loader = AssetLoader::new("a", Counting::default());
        loader.register_usage();
        assert_eq!(*loader.get_asset_data(&()).unwrap(), 1);

        loader.unload_gpu();
        assert_eq!(loader.usage_count(), 1);
        assert!(!loader.is_loaded());
        assert_eq!(*loader.get_asset_data(&()).unwrap(), 2);
    }

    #[test]
    fn handles_pair_usage() {
        let unloads = Rc::new(Cell::new(0));
        let loader = AssetLoader::new(
            "a",
            Counting {
                unloads: unloads.clone(),
                ..Default::default()
            },
        )
        .shared();

        let h1 = AssetHandle::new(loader.clone());
        let h2 = h1.clone();
        assert_eq!(loader.borrow().usage_count(), 2);
        h1.load(&()).unwrap();

        drop(h1);
        assert!(loader.borrow().is_loaded());
        drop(h2);
        assert_eq!(loader.borrow().usage_count(), 0);
        assert!(!loader.borrow().is_loaded());
        assert_eq!(unloads.get(), 1);
    }
}
