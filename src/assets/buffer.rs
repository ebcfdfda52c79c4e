use crate::assets::loader::AssetSource;
use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;

/// What a raw buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferTarget {
    #[default]
    Vertex,
    Index,
    Uniform,
}

impl BufferTarget {
    #[must_use]
    pub fn usages(self) -> wgpu::BufferUsages {
        match self {
            Self::Vertex => wgpu::BufferUsages::VERTEX,
            Self::Index => wgpu::BufferUsages::INDEX,
            Self::Uniform => wgpu::BufferUsages::UNIFORM,
        }
    }
}

/// Raw bytes of one imported buffer.
#[derive(Debug, Clone)]
pub struct BufferSource {
    pub bytes: Vec<u8>,
    pub target: BufferTarget,
}

impl BufferSource {
    #[must_use]
    pub fn new(bytes: Vec<u8>, target: BufferTarget) -> Self {
        Self { bytes, target }
    }
}

impl AssetSource for BufferSource {
    type Context = GpuDataInterface;
    type Payload = wgpu::Buffer;

    fn load(&self, gpu: &GpuDataInterface) -> Result<wgpu::Buffer> {
        if self.bytes.is_empty() {
            return Err(EngineError::InvalidAsset("empty buffer".to_string()));
        }
        Ok(gpu.create_buffer_with_data("Asset Buffer", &self.bytes, self.target.usages()))
    }

    fn unload(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }
}
