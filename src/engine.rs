//! Engine Core Module
//!
//! [`Engine`] owns every subsystem and drives one frame per [`Engine::tick`].
//! It has no window management of its own; a host (winit, a test harness,
//! an editor) attaches a render target and forwards input.
//!
//! # Frame order
//!
//! 1. queued events are dispatched,
//! 2. scripts of the active scene run (`on_init` once, then `on_update`),
//! 3. global transforms are evaluated,
//! 4. transform, camera and light uniforms are written,
//! 5. the rendering procedure is recorded, submitted and presented,
//! 6. per-frame input state is reset.
//!
//! # Example
//!
//! ```rust,ignore
//! use aether::{Engine, RendererSettings};
//!
//! let mut engine = Engine::new(RendererSettings::default());
//! engine.init_with_window(window, 1280, 720).await?;
//!
//! loop {
//!     engine.tick(dt)?;
//! }
//! ```

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashSet;

use crate::app::events::EventManager;
use crate::app::input::InputManager;
use crate::app::scripts::{ScriptEnv, ScriptExecutor};
use crate::assets::manager::AssetManager;
use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::settings::RendererSettings;
use crate::renderer::{FrameStatus, RendererSystem};
use crate::scene::manager::SceneManager;
use crate::scene::transform_system::update_global_transforms;
use crate::scene::World;

/// The engine instance.
///
/// # Lifecycle
///
/// 1. Create with [`Engine::new`]; build scenes and register assets freely,
///    nothing touches the GPU yet.
/// 2. Request a device with [`Engine::init`] or [`Engine::init_with_window`].
/// 3. Call [`Engine::tick`] once per frame.
/// 4. Call [`Engine::shutdown`] to run `on_destroy` hooks.
pub struct Engine {
    pub world: World,
    pub scene_manager: SceneManager,
    pub assets: AssetManager,
    pub renderer: RendererSystem,
    pub input: InputManager,
    pub events: EventManager,
    pub scripts: ScriptExecutor,

    gpu: Option<GpuDataInterface>,
    time: f32,
    frame_count: u64,
}

impl Engine {
    /// Creates an engine without a GPU device.
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            world: World::new(),
            scene_manager: SceneManager::new(),
            assets: AssetManager::new(),
            renderer: RendererSystem::new(settings),
            input: InputManager::default(),
            events: EventManager::default(),
            scripts: ScriptExecutor::new(),
            gpu: None,
            time: 0.0,
            frame_count: 0,
        }
    }

    /// Requests a device with no render target (offscreen or attach-later use).
    pub async fn init(&mut self) -> Result<()> {
        let gpu = GpuDataInterface::request(wgpu::Instance::default(), None, self.renderer.settings()).await?;
        self.gpu = Some(gpu);
        Ok(())
    }

    /// Requests a device able to present to `window` and attaches it as the
    /// render target.
    pub async fn init_with_window<W>(&mut self, window: W, width: u32, height: u32) -> Result<()>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let gpu = GpuDataInterface::request(instance, Some(&surface), self.renderer.settings()).await?;
        self.renderer.set_render_target(&gpu, surface, width, height)?;
        self.gpu = Some(gpu);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn gpu(&self) -> Option<&GpuDataInterface> {
        self.gpu.as_ref()
    }

    /// Seconds accumulated over every `tick`.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // ========================================================================
    // Render target
    // ========================================================================

    /// Creates a surface for `window` on the engine's instance.
    pub fn create_surface<W>(&self, window: W) -> Result<wgpu::Surface<'static>>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let gpu = self.gpu.as_ref().ok_or(EngineError::NotInitialized)?;
        Ok(gpu.instance().create_surface(window)?)
    }

    pub fn set_render_target(&mut self, surface: wgpu::Surface<'static>, width: u32, height: u32) -> Result<()> {
        let gpu = self.gpu.as_ref().ok_or(EngineError::NotInitialized)?;
        self.renderer.set_render_target(gpu, surface, width, height)
    }

    /// Records the host's new size; applied at the start of the next frame.
    pub fn resize_render_target(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    /// Detaches the target. Subsequent ticks skip rendering.
    pub fn detach_render_target(&mut self) {
        if self.renderer.detach_render_target().is_some() {
            log::info!("Render target detached");
        }
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Advances the engine by `dt` seconds and renders the active scene.
    ///
    /// Without a device or render target the logic part of the frame still
    /// runs and [`FrameStatus::NoTarget`] is returned.
    pub fn tick(&mut self, dt: f32) -> Result<FrameStatus> {
        self.time += dt;
        self.frame_count += 1;

        self.events.process();

        let status = self.step_active_scene(dt);
        self.input.start_frame();
        status
    }

    fn step_active_scene(&mut self, dt: f32) -> Result<FrameStatus> {
        let Some(scene) = self.scene_manager.active_scene() else {
            return Ok(FrameStatus::NoActiveScene);
        };

        let mut env = ScriptEnv {
            input: &self.input,
            events: &mut self.events,
            assets: &self.assets,
            time: self.time,
            dt,
        };
        self.scripts.run(&mut self.world, scene, &mut env);

        update_global_transforms(&mut self.world, scene);

        let Some(gpu) = &self.gpu else {
            return Ok(FrameStatus::NoTarget);
        };
        self.renderer.render(gpu, &mut self.world, scene, &self.assets)
    }

    // ========================================================================
    // Device loss / teardown
    // ========================================================================

    /// Switches to a new device. Every GPU payload (asset loaders, component
    /// bind groups, pipelines) is dropped and recreated lazily; usage counts
    /// are kept. The render target belonged to the old instance and is
    /// detached, so the host must attach a new one.
    pub fn reinitialize(&mut self, gpu: GpuDataInterface) {
        self.assets.unload_all();
        self.world.release_gpu();
        self.renderer.release_gpu();
        self.gpu = Some(gpu);
        log::info!("Engine reinitialized on a new device");
    }

    /// Requests a fresh device and calls [`reinitialize`](Self::reinitialize).
    pub async fn recover_device(&mut self) -> Result<()> {
        let gpu = GpuDataInterface::request(wgpu::Instance::default(), None, self.renderer.settings()).await?;
        self.reinitialize(gpu);
        Ok(())
    }

    /// Runs `on_destroy` once on every script reachable from a scene.
    pub fn shutdown(&mut self) {
        let mut env = ScriptEnv {
            input: &self.input,
            events: &mut self.events,
            assets: &self.assets,
            time: self.time,
            dt: 0.0,
        };
        let mut destroyed = FxHashSet::default();
        let ids: Vec<String> = self.scene_manager.scene_ids().map(str::to_string).collect();
        for id in ids {
            if let Some(scene) = self.scene_manager.get_scene_or_none(&id) {
                self.scripts.destroy_scene(&mut self.world, scene, &mut env, &mut destroyed);
            }
        }
        self.events.process();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(RendererSettings::default())
    }
}
