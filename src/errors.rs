//! Error Types
//!
//! This module defines the error type used throughout the engine core.
//!
//! # Overview
//!
//! [`EngineError`] is split along the lines of how a failure is meant to be
//! handled:
//! - **Configuration** errors (missing device, canvas, or projection
//!   precondition) abort initialization or the current frame.
//! - **Lookup** errors (unknown scene, entity, or missing component) are
//!   returned to the caller; `*_or_none` / `has_*` variants are the sanctioned
//!   way to check first.
//! - **Import** errors describe data that could not be turned into an asset.
//!
//! Unknown asset ids and data-quality problems never surface here: they are
//! logged and substituted with a fallback locally.
//!
//! # Usage
//!
//! ```rust,ignore
//! use aether::errors::{EngineError, Result};
//!
//! fn lookup() -> Result<()> {
//!     Err(EngineError::UnknownScene("game".into()))
//! }
//! ```

use thiserror::Error;

use crate::scene::{ComponentType, EntityKey};

/// The main error type for the engine core.
#[derive(Error, Debug)]
pub enum EngineError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create a presentable surface for a window.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// An operation that needs the GPU ran before `Engine::init`.
    #[error("Engine has not been initialized with a GPU device")]
    NotInitialized,

    /// A camera resolves its aspect from the canvas but no render target is attached.
    #[error("Camera uses the canvas aspect ratio but no render target is attached")]
    CanvasRequired,

    /// Light uniforms were written before the camera uniforms of the same frame.
    #[error("Camera has no projection for this frame; write camera uniforms before lights")]
    MissingCameraProjection,

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No scene is registered under this id.
    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    /// No entity is registered under this id in the scene.
    #[error("Unknown entity '{entity}' in scene '{scene}'")]
    UnknownEntity {
        /// Scene that was searched
        scene: String,
        /// Requested entity id
        entity: String,
    },

    /// The entity has no component of the requested type.
    #[error("Entity '{entity}' has no {component:?} component")]
    MissingComponent {
        /// Id of the entity
        entity: String,
        /// Requested component type
        component: ComponentType,
    },

    /// An entity with this id already exists in the target scene.
    #[error("Entity '{entity}' already exists in scene '{scene}'")]
    DuplicateEntity {
        /// Target scene
        scene: String,
        /// Conflicting entity id
        entity: String,
    },

    /// An arena key that no longer refers to a live entity.
    #[error("Entity handle {0:?} does not refer to a live entity")]
    DanglingEntity(EntityKey),

    // ========================================================================
    // Import Errors
    // ========================================================================
    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Asset data is structurally invalid.
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),
}

impl From<image::ImageError> for EngineError {
    fn from(err: image::ImageError) -> Self {
        EngineError::ImageDecode(err.to_string())
    }
}

/// Alias for `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;
