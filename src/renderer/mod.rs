//! Renderer
//!
//! [`RendererSystem`] ties the presentable [`RenderTarget`] to the
//! [`RenderingProcedure`] and performs the per-frame uniform synchronization
//! that must precede it:
//!
//! 1. transforms of the scene,
//! 2. cameras (caching their inverse view-projection),
//! 3. lights (fitted against the active camera's cached projection).
//!
//! Reversing 2 and 3 fails with
//! [`MissingCameraProjection`](crate::errors::EngineError::MissingCameraProjection).

pub mod gpu;
pub mod passes;
pub mod procedure;
pub mod settings;
pub mod target;

pub use gpu::GpuDataInterface;
pub use procedure::{RenderingData, RenderingProcedure, RenderingStage, StageContext};
pub use settings::{RendererSettings, ShadowFit};
pub use target::RenderTarget;

use crate::assets::manager::AssetManager;
use crate::errors::Result;
use crate::scene::{
    CameraComponent, ComponentType, EntityKey, LightComponent, Scene, TransformComponent, World,
};

/// Outcome of one [`RendererSystem::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Commands were submitted and the frame presented.
    Rendered,
    /// No render target is attached; nothing was submitted.
    NoTarget,
    /// The scene manager has no active scene.
    NoActiveScene,
    /// The active scene has no camera entity.
    NoCamera,
    /// The target could not provide a texture this frame (lost, outdated, timeout).
    SurfaceUnavailable,
}

pub struct RendererSystem {
    settings: RendererSettings,
    target: Option<RenderTarget>,
    procedure: Option<RenderingProcedure>,
}

impl RendererSystem {
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            target: None,
            procedure: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Mutable settings. Pipeline-affecting fields take effect after
    /// [`rebuild`](Self::rebuild).
    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    // ========================================================================
    // Render target
    // ========================================================================

    pub fn set_render_target(
        &mut self,
        gpu: &GpuDataInterface,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let target = RenderTarget::new(gpu, surface, width, height, &self.settings)?;
        log::info!(
            "Render target attached: {}x{} {:?}",
            width,
            height,
            target.format()
        );
        self.target = Some(target);
        Ok(())
    }

    pub fn detach_render_target(&mut self) -> Option<RenderTarget> {
        self.target.take()
    }

    #[must_use]
    pub fn has_render_target(&self) -> bool {
        self.target.is_some()
    }

    /// Records a new logical size; the surface is reconfigured on the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(target) = &mut self.target {
            target.set_logical_size(width, height);
        }
    }

    /// Configured size of the attached target.
    #[must_use]
    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(RenderTarget::size)
    }

    /// Drops the procedure so pipelines are rebuilt on the next frame.
    pub fn rebuild(&mut self) {
        self.procedure = None;
    }

    /// Forgets every object created on the current device.
    pub(crate) fn release_gpu(&mut self) {
        self.procedure = None;
        self.target = None;
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Writes transform, camera and light uniforms of `scene`, in that order.
    ///
    /// `camera` is the entity whose cached projection the lights are fitted
    /// against. Every camera of the world forgets last frame's projection
    /// first, so a light can never be fitted against stale data.
    pub fn write_frame_uniforms(
        gpu: &GpuDataInterface,
        world: &mut World,
        scene: &Scene,
        camera: Option<EntityKey>,
        canvas: Option<(u32, u32)>,
        settings: &RendererSettings,
    ) -> Result<()> {
        for (_, component) in world.iter_mut::<CameraComponent>() {
            component.begin_frame();
        }

        for record in scene.get_components(world, &[ComponentType::Transform]) {
            if let Some(transform) = record
                .components
                .transform
                .and_then(|key| world.get_mut::<TransformComponent>(key))
            {
                gpu.write_transform(transform)?;
            }
        }

        for record in scene.get_components(world, &[ComponentType::Transform, ComponentType::Camera]) {
            let (Some(transform), Some(camera)) = (record.components.transform, record.components.camera) else {
                continue;
            };
            let global = world
                .get::<TransformComponent>(transform)
                .map_or(glam::Mat4::IDENTITY, TransformComponent::global);
            if let Some(camera) = world.get_mut::<CameraComponent>(camera) {
                gpu.write_camera(camera, global, canvas)?;
            }
        }

        let camera_inv_view_projection = camera
            .and_then(|entity| world.get_component_or_none::<CameraComponent>(entity))
            .and_then(CameraComponent::inv_view_projection);

        for record in scene.get_components(world, &[ComponentType::Transform, ComponentType::Light]) {
            let (Some(transform), Some(light)) = (record.components.transform, record.components.light) else {
                continue;
            };
            let global = world
                .get::<TransformComponent>(transform)
                .map_or(glam::Mat4::IDENTITY, TransformComponent::global);
            if let Some(light) = world.get_mut::<LightComponent>(light) {
                gpu.write_light(light, global, camera_inv_view_projection, &settings.shadow_fit)?;
            }
        }

        Ok(())
    }

    /// Synchronizes uniforms, runs the procedure and presents.
    ///
    /// Global transforms must already be up to date for this frame.
    pub fn render(
        &mut self,
        gpu: &GpuDataInterface,
        world: &mut World,
        scene: &Scene,
        assets: &AssetManager,
    ) -> Result<FrameStatus> {
        let Some(target) = &mut self.target else {
            return Ok(FrameStatus::NoTarget);
        };
        if target.sync_size(gpu) {
            log::debug!("Render target reconfigured to {:?}", target.size());
        }

        let Some(camera) = scene.active_camera(world) else {
            log::debug!("Scene '{}' has no camera, skipping frame", scene.id());
            return Ok(FrameStatus::NoCamera);
        };

        let canvas = target.size();
        Self::write_frame_uniforms(gpu, world, scene, Some(camera), Some(canvas), &self.settings)?;

        let Some((output, view)) = target.acquire(gpu) else {
            return Ok(FrameStatus::SurfaceUnavailable);
        };

        let format = target.format();
        if self
            .procedure
            .as_ref()
            .is_some_and(|procedure| procedure.target_format() != format)
        {
            self.procedure = None;
        }
        let settings = &self.settings;
        let procedure = self
            .procedure
            .get_or_insert_with(|| {
                let procedure = RenderingProcedure::new(gpu, settings, format);
                let stages: Vec<_> = procedure.stage_names().collect();
                log::info!("Built rendering procedure for {format:?}: {}", stages.join(" -> "));
                procedure
            });

        let mut data = RenderingData {
            target: view,
            target_format: format,
            depth: None,
            scene_id: scene.id().to_string(),
            camera,
            width: canvas.0,
            height: canvas.1,
        };
        let mut ctx = StageContext {
            gpu,
            world,
            scene,
            assets,
            settings,
        };
        let commands = procedure.execute(&mut ctx, &mut data)?;

        gpu.queue().submit(std::iter::once(commands));
        output.present();
        Ok(FrameStatus::Rendered)
    }
}

impl std::fmt::Debug for RendererSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSystem")
            .field("settings", &self.settings)
            .field("canvas", &self.canvas_size())
            .field("has_procedure", &self.procedure.is_some())
            .finish()
    }
}
