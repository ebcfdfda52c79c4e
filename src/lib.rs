#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Aether: a deferred 3D rendering engine core.
//!
//! Entities live in a [`World`] and are grouped into [`Scene`]s. Each frame,
//! [`Engine::tick`] runs scripts, evaluates the transform hierarchy, writes
//! uniforms and records the shadow, G-buffer, lighting, billboard and unlit
//! stages into one command buffer.

pub mod app;
pub mod assets;
pub mod engine;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use glam;
pub use wgpu;

pub use app::{EventManager, InputManager, Key, MouseButton, ScriptExecutor};
pub use assets::{AssetHandle, AssetLoader, AssetManager, AssetSource, ColorSpace, MaterialProps};
pub use engine::Engine;
pub use errors::{EngineError, Result};
pub use renderer::{FrameStatus, GpuDataInterface, RendererSettings, RendererSystem};
pub use scene::{
    BillboardComponent, CameraComponent, CameraProps, ComponentType, EntityKey, LightComponent,
    LightKind, LightProps, MeshRendererComponent, Projection, Scene, SceneManager, Script,
    ScriptComponent, ScriptContext, ShadowMapComponent, TransformComponent, TransformProps, World,
};
