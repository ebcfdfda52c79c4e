//! Presentable render target.
//!
//! The host owns the window; it hands over a [`wgpu::Surface`] and reports
//! size changes. The requested (logical) size is compared with the configured
//! size once per frame, and the surface is reconfigured before encoding when
//! they differ.

use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::settings::RendererSettings;

pub struct RenderTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    logical_size: (u32, u32),
}

impl RenderTarget {
    pub fn new(
        gpu: &GpuDataInterface,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let (width, height) = (width.max(1), height.max(1));
        let mut config = surface
            .get_default_config(gpu.adapter(), width, height)
            .ok_or_else(|| {
                EngineError::AdapterRequestFailed("Surface not supported by adapter".to_string())
            })?;
        config.present_mode = settings.present_mode();
        config.usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        surface.configure(gpu.device(), &config);

        Ok(Self {
            surface,
            config,
            logical_size: (width, height),
        })
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Size the surface is currently configured with.
    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Records the size the host wants. Applied by the next [`sync_size`](Self::sync_size).
    pub fn set_logical_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width, height);
    }

    /// Reconfigures the surface if the logical size changed. Zero-sized
    /// (minimized) targets keep their previous configuration.
    pub fn sync_size(&mut self, gpu: &GpuDataInterface) -> bool {
        let (width, height) = self.logical_size;
        if width == 0 || height == 0 || (width, height) == self.size() {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(gpu.device(), &self.config);
        true
    }

    /// Next frame's texture and a view onto it, or `None` when the surface
    /// cannot provide one this frame.
    pub fn acquire(&mut self, gpu: &GpuDataInterface) -> Option<(wgpu::SurfaceTexture, wgpu::TextureView)> {
        let output = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                log::warn!("Render target lost or outdated, reconfiguring");
                self.surface.configure(gpu.device(), &self.config);
                return None;
            }
            e => {
                log::error!("Failed to acquire render target texture: {e:?}");
                return None;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Some((output, view))
    }
}
