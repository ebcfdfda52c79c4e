//! GPU uniform layouts.
//!
//! Every struct here is `#[repr(C)]` + `Pod` and mirrors a WGSL struct in
//! `renderer/shaders/common.wgsl` byte for byte.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Model, inverse-model and normal matrices of one transform (192 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub model: Mat4,
    pub inverse_model: Mat4,
    pub normal_model: Mat4,
}

impl TransformUniform {
    #[must_use]
    pub fn from_global(global: Mat4) -> Self {
        let inverse = global.inverse();
        Self {
            model: global,
            inverse_model: inverse,
            normal_model: inverse.transpose(),
        }
    }
}

impl Default for TransformUniform {
    fn default() -> Self {
        Self::from_global(Mat4::IDENTITY)
    }
}

/// Per-camera matrices (256 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: Mat4,
    pub view_projection: Mat4,
    pub inverse_view: Mat4,
    pub inverse_view_projection: Mat4,
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            inverse_view_projection: Mat4::IDENTITY,
        }
    }
}

/// Light base data (96 bytes).
///
/// `direction_or_position.w` is `0.0` for sun lights (xyz = direction the
/// light travels) and `1.0` for point lights (xyz = world position).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub direction_or_position: Vec4,
    pub view_projection: Mat4,
    pub color: Vec3,
    pub power: f32,
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            direction_or_position: Vec4::new(0.0, -1.0, 0.0, 0.0),
            view_projection: Mat4::IDENTITY,
            color: Vec3::ONE,
            power: 1.0,
        }
    }
}

/// PBR material factors (48 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PbrMaterialUniform {
    pub albedo_factor: Vec4,
    pub emission_factor: Vec3,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub occlusion_strength: f32,
    pub normal_scale: f32,
    pub _padding: f32,
}

/// Unlit material color (16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UnlitMaterialUniform {
    pub color_factor: Vec4,
}

/// Ambient term of the lighting stage (16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct AmbientUniform {
    pub color: Vec3,
    pub intensity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<TransformUniform>(), 192);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 256);
        assert_eq!(std::mem::size_of::<LightUniform>(), 96);
        assert_eq!(std::mem::size_of::<PbrMaterialUniform>(), 48);
        assert_eq!(std::mem::size_of::<UnlitMaterialUniform>(), 16);
        assert_eq!(std::mem::size_of::<AmbientUniform>(), 16);
    }

    #[test]
    fn normal_matrix_is_inverse_transpose() {
        let global = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = TransformUniform::from_global(global);
        let expected = Mat4::from_scale(Vec3::new(0.5, 1.0, 1.0));
        assert!(u.normal_model.abs_diff_eq(expected, 1e-6));
        assert!((u.model * u.inverse_model).abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }
}
