//! Renderer Settings
//!
//! Configuration consumed by [`Engine::init`](crate::engine::Engine::init)
//! and by the rendering stages each frame.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use aether::renderer::RendererSettings;
//!
//! let settings = RendererSettings {
//!     vsync: false,
//!     ambient_intensity: 0.1,
//!     ..Default::default()
//! };
//! let mut engine = Engine::new(settings);
//! ```

use glam::Vec3;

// ---------------------------------------------------------------------------
// ShadowFit
// ---------------------------------------------------------------------------

/// Light-space projection parameters used when fitting light matrices.
///
/// Sun lights fit their XY extent to the camera frustum; the Z range is fixed
/// to `near..far` around the frustum center. Point lights use a fixed box of
/// half-size `point_extent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowFit {
    pub near: f32,
    pub far: f32,
    pub point_extent: f32,
}

impl Default for ShadowFit {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 200.0,
            point_extent: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global renderer configuration.
///
/// # Fields
///
/// | Field                     | Description                              | Default            |
/// |---------------------------|------------------------------------------|--------------------|
/// | `vsync`                   | Vertical sync enabled                    | `true`             |
/// | `power_preference`        | GPU adapter selection strategy           | `HighPerformance`  |
/// | `clear_color`             | Background color of the lighting stage   | Black (0,0,0,1)    |
/// | `ambient_color`           | Ambient light color                      | White              |
/// | `ambient_intensity`       | Ambient light scale                      | `0.03`             |
/// | `shadow_fit`              | Light-space projection parameters        | see [`ShadowFit`]  |
/// | `required_features`       | Required wgpu features                   | Empty              |
/// | `required_limits`         | Required wgpu limits                     | Default            |
/// | `depth_format`            | Scene depth buffer format                | `Depth32Float`     |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// When `true`, presentation waits for the display refresh.
    pub vsync: bool,

    /// GPU adapter selection preference.
    pub power_preference: wgpu::PowerPreference,

    pub clear_color: wgpu::Color,

    pub ambient_color: Vec3,
    pub ambient_intensity: f32,

    pub shadow_fit: ShadowFit,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Depth format shared by the G-buffer, billboard and unlit stages.
    ///
    /// The lighting stage reads depth through `texture_depth_2d`, so only
    /// depth-only formats are accepted.
    pub depth_format: wgpu::TextureFormat,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            ambient_color: Vec3::ONE,
            ambient_intensity: 0.03,
            shadow_fit: ShadowFit::default(),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            depth_format: wgpu::TextureFormat::Depth32Float,
        }
    }
}

impl RendererSettings {
    #[inline]
    #[must_use]
    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}
