//! Rendering procedure
//!
//! A fixed, ordered list of [`RenderingStage`]s recorded into one command
//! encoder per frame. The finished command buffer is handed back to the
//! caller, which submits it atomically.

use crate::assets::manager::AssetManager;
use crate::errors::Result;
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::passes::{BillboardRenderer, DeferredPbrRenderer, ShadowMapper, UnlitRenderer};
use crate::renderer::settings::RendererSettings;
use crate::scene::{EntityKey, Scene, World};

/// Engine state a stage may read (and lazily create GPU resources in).
pub struct StageContext<'a> {
    pub gpu: &'a GpuDataInterface,
    pub world: &'a mut World,
    pub scene: &'a Scene,
    pub assets: &'a AssetManager,
    pub settings: &'a RendererSettings,
}

/// Per-frame record shared by every stage.
///
/// Stages may replace `depth` to hand their depth buffer to later stages.
#[derive(Debug, Clone)]
pub struct RenderingData {
    pub target: wgpu::TextureView,
    pub target_format: wgpu::TextureFormat,
    pub depth: Option<wgpu::TextureView>,
    pub scene_id: String,
    /// Entity carrying the active camera.
    pub camera: EntityKey,
    pub width: u32,
    pub height: u32,
}

/// One step of the procedure.
pub trait RenderingStage {
    fn name(&self) -> &'static str;

    /// Gathers draws and creates missing GPU resources. May update `data`.
    fn prepare(&mut self, ctx: &mut StageContext<'_>, data: &mut RenderingData) -> Result<()>;

    /// Records GPU commands for what `prepare` gathered.
    fn run(&self, data: &RenderingData, encoder: &mut wgpu::CommandEncoder);

    fn execute(
        &mut self,
        ctx: &mut StageContext<'_>,
        data: &mut RenderingData,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()> {
        self.prepare(ctx, data)?;
        encoder.push_debug_group(self.name());
        self.run(data, encoder);
        encoder.pop_debug_group();
        Ok(())
    }
}

/// The deferred procedure: shadow, G-buffer + lighting, billboard, unlit.
pub struct RenderingProcedure {
    stages: Vec<Box<dyn RenderingStage>>,
    target_format: wgpu::TextureFormat,
}

impl RenderingProcedure {
    #[must_use]
    pub fn new(gpu: &GpuDataInterface, settings: &RendererSettings, target_format: wgpu::TextureFormat) -> Self {
        let stages: Vec<Box<dyn RenderingStage>> = vec![
            Box::new(ShadowMapper::new(gpu)),
            Box::new(DeferredPbrRenderer::new(gpu, settings, target_format)),
            Box::new(BillboardRenderer::new(gpu, settings, target_format)),
            Box::new(UnlitRenderer::new(gpu, settings, target_format)),
        ];
        Self { stages, target_format }
    }

    /// Format of the color target the pipelines were built for.
    #[inline]
    #[must_use]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|stage| stage.name())
    }

    /// Runs every stage in order and returns the recorded commands.
    pub fn execute(&mut self, ctx: &mut StageContext<'_>, data: &mut RenderingData) -> Result<wgpu::CommandBuffer> {
        let mut encoder = ctx
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        for stage in &mut self.stages {
            stage.execute(ctx, data, &mut encoder)?;
        }

        Ok(encoder.finish())
    }
}
