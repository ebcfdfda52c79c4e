//! GPU access
//!
//! [`GpuDataInterface`] wraps the adapter, device and queue behind a small
//! set of creation/upload helpers, plus the per-frame uniform writers for
//! transforms, cameras and lights. It also owns the [`LayoutRegistry`] built
//! for its device, so layouts are created once at initialization and rebuilt
//! only when `Engine::reinitialize` requests a new device.

use bytemuck::Pod;
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::errors::{EngineError, Result};
use crate::renderer::settings::{RendererSettings, ShadowFit};
use crate::resources::layouts::LayoutRegistry;
use crate::scene::{CameraComponent, LightComponent, TransformComponent};

/// Device-level handles, bind group layouts and upload helpers.
#[derive(Debug, Clone)]
pub struct GpuDataInterface {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    layouts: LayoutRegistry,
}

impl GpuDataInterface {
    /// Requests an adapter and device.
    ///
    /// `compatible_surface` should be passed whenever a surface already exists
    /// so the adapter is guaranteed to be able to present to it.
    pub async fn request(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
        settings: &RendererSettings,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| EngineError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Aether Device"),
                required_features: settings.required_features,
                required_limits: settings.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        log::info!("Using GPU adapter: {}", adapter.get_info().name);

        let layouts = LayoutRegistry::new(&device);
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            layouts,
        })
    }

    #[inline]
    #[must_use]
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    #[inline]
    #[must_use]
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    #[must_use]
    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    // ========================================================================
    // Creation helpers
    // ========================================================================

    pub fn create_uniform_buffer<T: Pod>(&self, label: &str, contents: &T) -> wgpu::Buffer {
        self.create_buffer_with_data(
            label,
            bytemuck::bytes_of(contents),
            wgpu::BufferUsages::UNIFORM,
        )
    }

    /// Creates a buffer initialised with `data`; `COPY_DST` is always added so
    /// the contents can be rewritten later.
    pub fn create_buffer_with_data(&self, label: &str, data: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            })
    }

    pub fn write_uniform<T: Pod>(&self, buffer: &wgpu::Buffer, value: &T) {
        self.queue.write_buffer(buffer, 0, bytemuck::bytes_of(value));
    }

    /// Creates a sampled 2D texture and uploads tightly packed texel rows.
    pub fn create_texture_with_data(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        data: &[u8],
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes_per_texel = format.block_copy_size(None).unwrap_or(4);
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_texel),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Creates a render attachment that later stages can also bind for reading.
    pub fn create_attachment(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    pub fn create_linear_sampler(&self, label: &str) -> wgpu::Sampler {
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        })
    }

    pub fn create_comparison_sampler(&self, label: &str) -> wgpu::Sampler {
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        })
    }

    pub fn create_shader(&self, label: &str, source: &str) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
    }

    // ========================================================================
    // Per-frame uniform writes
    // ========================================================================

    /// Writes model, inverse and normal matrices of one transform.
    pub fn write_transform(&self, transform: &mut TransformComponent) -> Result<()> {
        let uniform = transform.uniform();
        transform.ensure_bind_group(self)?.write(self, &uniform);
        Ok(())
    }

    /// Computes and writes camera matrices, caching the inverse
    /// view-projection on the component for the light pass of this frame.
    pub fn write_camera(
        &self,
        camera: &mut CameraComponent,
        global: Mat4,
        canvas: Option<(u32, u32)>,
    ) -> Result<()> {
        let uniform = camera.compute_uniform(global, canvas)?;
        camera.ensure_bind_group(self)?.write(self, &uniform);
        Ok(())
    }

    /// Computes and writes a light's base data. Requires the active camera to
    /// have been written earlier in the same frame.
    pub fn write_light(
        &self,
        light: &mut LightComponent,
        global: Mat4,
        camera_inv_view_projection: Option<Mat4>,
        fit: &ShadowFit,
    ) -> Result<()> {
        let uniform = light.compute_uniform(global, camera_inv_view_projection, fit)?;
        light.ensure_bind_group(self)?.write(self, &uniform);
        Ok(())
    }
}
