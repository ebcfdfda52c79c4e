//! Meshes assembled from shared buffers.
//!
//! A mesh does not own vertex data. Each stream (index or vertex attribute)
//! points at a byte range of a shared buffer loader; loading the mesh takes
//! one [`AssetHandle`] per stream, which keeps the buffers alive exactly as
//! long as the mesh payload exists.

use smallvec::SmallVec;

use crate::assets::buffer::BufferSource;
use crate::assets::loader::{AssetHandle, AssetSource, SharedLoader};
use crate::errors::{EngineError, Result};

/// Vertex attributes understood by the built-in pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    Tangent,
    TexCoord0,
}

impl VertexAttribute {
    /// Format every pipeline expects for this attribute. Streams are always
    /// tightly packed, so the format also fixes the stride.
    #[must_use]
    pub const fn format(self) -> wgpu::VertexFormat {
        match self {
            Self::Position | Self::Normal => wgpu::VertexFormat::Float32x3,
            Self::Tangent => wgpu::VertexFormat::Float32x4,
            Self::TexCoord0 => wgpu::VertexFormat::Float32x2,
        }
    }

    #[must_use]
    pub fn stride(self) -> u64 {
        self.format().size()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::Tangent => "TANGENT",
            Self::TexCoord0 => "TEXCOORD_0",
        }
    }
}

/// Byte range of a registered buffer interpreted as one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAccessor {
    pub buffer: String,
    pub attribute: VertexAttribute,
    pub byte_offset: u64,
    pub count: u32,
}

/// Byte range of a registered buffer interpreted as indices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAccessor {
    pub buffer: String,
    pub format: wgpu::IndexFormat,
    pub byte_offset: u64,
    pub count: u32,
}

/// Mesh as registered across the import boundary; buffers referenced by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshDescriptor {
    pub index: Option<IndexAccessor>,
    pub attributes: Vec<VertexAccessor>,
}

pub struct VertexStream<B: AssetSource> {
    pub attribute: VertexAttribute,
    pub byte_offset: u64,
    pub count: u32,
    pub buffer: SharedLoader<B>,
}

pub struct IndexStream<B: AssetSource> {
    pub format: wgpu::IndexFormat,
    pub byte_offset: u64,
    pub count: u32,
    pub buffer: SharedLoader<B>,
}

/// Buffer payload bound to a draw slot.
#[derive(Debug, Clone)]
pub struct BufferBinding<P> {
    pub buffer: P,
    pub byte_offset: u64,
}

/// Loaded mesh: cloned buffer payloads plus the handles that keep them alive.
pub struct GpuMesh<B: AssetSource = BufferSource> {
    pub index: Option<(BufferBinding<B::Payload>, wgpu::IndexFormat, u32)>,
    pub vertices: SmallVec<[(VertexAttribute, BufferBinding<B::Payload>); 4]>,
    pub vertex_count: u32,
    _buffers: SmallVec<[AssetHandle<B>; 4]>,
}

impl<B: AssetSource> GpuMesh<B> {
    #[must_use]
    pub fn vertex_buffer(&self, attribute: VertexAttribute) -> Option<&BufferBinding<B::Payload>> {
        self.vertices
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, binding)| binding)
    }

    /// Number of indices, or vertices for non-indexed meshes.
    #[must_use]
    pub fn element_count(&self) -> u32 {
        self.index.as_ref().map_or(self.vertex_count, |(_, _, count)| *count)
    }
}

/// CPU-side mesh: streams resolved to shared buffer loaders.
pub struct MeshSource<B: AssetSource = BufferSource> {
    index: Option<IndexStream<B>>,
    vertices: SmallVec<[VertexStream<B>; 4]>,
}

impl<B: AssetSource> MeshSource<B> {
    /// Validates and assembles a mesh. Every vertex stream must carry the
    /// same element count and a `Position` stream must be present.
    pub fn new(index: Option<IndexStream<B>>, vertices: Vec<VertexStream<B>>) -> Result<Self> {
        if !vertices.iter().any(|v| v.attribute == VertexAttribute::Position) {
            return Err(EngineError::InvalidAsset("mesh has no POSITION stream".to_string()));
        }
        if let Some(first) = vertices.first()
            && let Some(odd) = vertices.iter().find(|v| v.count != first.count)
        {
            return Err(EngineError::InvalidAsset(format!(
                "{} has {} elements but {} has {}",
                odd.attribute.name(),
                odd.count,
                first.attribute.name(),
                first.count
            )));
        }
        Ok(Self {
            index,
            vertices: vertices.into(),
        })
    }

    #[must_use]
    pub fn has_attribute(&self, attribute: VertexAttribute) -> bool {
        self.vertices.iter().any(|v| v.attribute == attribute)
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.first().map_or(0, |v| v.count)
    }
}

impl<B> AssetSource for MeshSource<B>
where
    B: AssetSource,
    B::Payload: Clone,
{
    type Context = B::Context;
    type Payload = GpuMesh<B>;

    fn load(&self, ctx: &B::Context) -> Result<GpuMesh<B>> {
        // Handles taken so far are dropped (and deregistered) if a later
        // stream fails to load.
        let mut handles: SmallVec<[AssetHandle<B>; 4]> = SmallVec::new();
        let mut bind = |loader: &SharedLoader<B>, byte_offset: u64| -> Result<BufferBinding<B::Payload>> {
            let handle = AssetHandle::new(loader.clone());
            let buffer = handle.get(ctx)?.clone();
            handles.push(handle);
            Ok(BufferBinding { buffer, byte_offset })
        };

        let index = match &self.index {
            Some(stream) => Some((bind(&stream.buffer, stream.byte_offset)?, stream.format, stream.count)),
            None => None,
        };

        let mut vertices = SmallVec::new();
        for stream in &self.vertices {
            vertices.push((stream.attribute, bind(&stream.buffer, stream.byte_offset)?));
        }

        Ok(GpuMesh {
            index,
            vertices,
            vertex_count: self.vertex_count(),
            _buffers: handles,
        })
    }
}
