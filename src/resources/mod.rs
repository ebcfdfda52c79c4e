//! GPU-side resource primitives shared by components, assets and renderers:
//! - [`slot`]: lazy `Unloaded → Loaded` slots and resource ids
//! - [`bind_group`]: owned bind groups and the buffers/textures behind them
//! - [`layouts`]: per-device bind group layout registry
//! - [`uniforms`]: `Pod` uniform structs mirrored in WGSL

pub mod bind_group;
pub mod layouts;
pub mod slot;
pub mod uniforms;

pub use bind_group::{BindGroupData, BindGroupResource};
pub use layouts::LayoutRegistry;
pub use slot::{GpuSlot, ResourceId};
pub use uniforms::{
    AmbientUniform, CameraUniform, LightUniform, PbrMaterialUniform, TransformUniform,
    UnlitMaterialUniform,
};
