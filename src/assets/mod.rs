//! Asset loading and lifetime.
//!
//! Assets are registered once as CPU data (decoded images, raw buffers, mesh
//! accessors, material factors) and uploaded lazily, on first use by a
//! registered consumer. See [`loader`] for the reference-counting rules.

pub mod buffer;
pub mod import;
pub mod loader;
pub mod manager;
pub mod material;
pub mod mesh;
pub mod texture;

pub use buffer::{BufferSource, BufferTarget};
pub use import::{NodeDescription, PrimitiveDescription, SceneDescription, build_scene};
pub use loader::{AssetHandle, AssetLoader, AssetSource, SharedLoader};
pub use manager::{AssetManager, AssetRegistry};
pub use material::{
    GpuMaterial, MaterialProps, MaterialSource, PbrMaterialProps, ShadingType, UnlitMaterialProps,
};
pub use mesh::{GpuMesh, IndexAccessor, MeshDescriptor, MeshSource, VertexAccessor, VertexAttribute};
pub use texture::{ColorSpace, GpuTexture, TextureSource};
