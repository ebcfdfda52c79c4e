use glam::{Mat4, Vec2, Vec3};

use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::settings::ShadowFit;
use crate::resources::bind_group::BindGroupData;
use crate::resources::slot::GpuSlot;
use crate::resources::uniforms::LightUniform;
use crate::scene::camera::frustum_corners;
use crate::scene::{EntityKey, LightKey, impl_component};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Directional light shining along the entity's local `-Z`.
    Sun,
    /// Omnidirectional light at the entity's position.
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightProps {
    pub kind: LightKind,
    /// Linear RGB.
    pub color: Vec3,
    pub power: f32,
    /// Only honoured for sun lights that also carry a `ShadowMapComponent`.
    pub cast_shadow: bool,
}

impl Default for LightProps {
    fn default() -> Self {
        Self {
            kind: LightKind::Sun,
            color: Vec3::ONE,
            power: 1.0,
            cast_shadow: false,
        }
    }
}

impl LightProps {
    #[must_use]
    pub fn sun(color: Vec3, power: f32) -> Self {
        Self {
            kind: LightKind::Sun,
            color,
            power,
            cast_shadow: false,
        }
    }

    #[must_use]
    pub fn point(color: Vec3, power: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            power,
            cast_shadow: false,
        }
    }

    #[must_use]
    pub fn with_shadow(mut self) -> Self {
        self.cast_shadow = true;
        self
    }
}

#[derive(Debug)]
pub struct LightComponent {
    pub props: LightProps,
    pub(crate) entity: EntityKey,
    pub(crate) bind_group: GpuSlot<BindGroupData>,
}

impl_component!(LightComponent, LightKey, Light, lights, light);

impl LightComponent {
    #[must_use]
    pub fn new(props: LightProps) -> Self {
        Self {
            props,
            entity: EntityKey::default(),
            bind_group: GpuSlot::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> LightKind {
        self.props.kind
    }

    #[must_use]
    pub fn casts_shadow(&self) -> bool {
        self.props.cast_shadow && self.props.kind == LightKind::Sun
    }

    /// Computes the light uniform for a light placed at `global`.
    ///
    /// `camera_inv_view_projection` is the active camera's cached inverse
    /// view-projection for this frame; `None` means the camera uniform was
    /// not written yet and yields [`EngineError::MissingCameraProjection`].
    pub fn compute_uniform(
        &self,
        global: Mat4,
        camera_inv_view_projection: Option<Mat4>,
        fit: &ShadowFit,
    ) -> Result<LightUniform> {
        let inv_view_projection =
            camera_inv_view_projection.ok_or(EngineError::MissingCameraProjection)?;

        let (direction_or_position, view_projection) = match self.props.kind {
            LightKind::Sun => {
                let direction = global.transform_vector3(Vec3::NEG_Z).normalize_or(Vec3::NEG_Y);
                (
                    direction.extend(0.0),
                    fit_sun_projection(direction, inv_view_projection, fit),
                )
            }
            LightKind::Point => {
                let position = global.w_axis.truncate();
                (position.extend(1.0), point_projection(position, fit))
            }
        };

        Ok(LightUniform {
            direction_or_position,
            view_projection,
            color: self.props.color,
            power: self.props.power,
        })
    }

    #[must_use]
    pub fn bind_group(&self) -> Option<&BindGroupData> {
        self.bind_group.get()
    }

    pub fn ensure_bind_group(&mut self, gpu: &GpuDataInterface) -> Result<&BindGroupData> {
        let data = self.bind_group.ensure_loaded(|| {
            Ok::<_, EngineError>(BindGroupData::uniform(
                gpu,
                &gpu.layouts().light,
                "Light",
                &LightUniform::default(),
            ))
        })?;
        Ok(&*data)
    }

    pub(crate) fn release_gpu(&mut self) {
        drop(self.bind_group.unload());
    }
}

fn light_up(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 { Vec3::X } else { Vec3::Y }
}

/// Orthographic light view-projection covering the camera frustum.
///
/// XY bounds are the min/max of the eight frustum corners in light view
/// space. The light eye sits `fit.far / 2` behind the frustum center, and the
/// depth range is fixed to `fit.near..fit.far`.
#[must_use]
pub fn fit_sun_projection(direction: Vec3, camera_inv_view_projection: Mat4, fit: &ShadowFit) -> Mat4 {
    let corners = frustum_corners(camera_inv_view_projection);
    let center = corners.iter().copied().sum::<Vec3>() / 8.0;

    let eye = center - direction * (fit.far * 0.5);
    let view = Mat4::look_to_rh(eye, direction, light_up(direction));

    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    for corner in corners {
        let p = view.transform_point3(corner).truncate();
        min = min.min(p);
        max = max.max(p);
    }

    Mat4::orthographic_rh(min.x, max.x, min.y, max.y, fit.near, fit.far) * view
}

/// Fixed-size downward box around a point light.
#[must_use]
pub fn point_projection(position: Vec3, fit: &ShadowFit) -> Mat4 {
    let e = fit.point_extent;
    Mat4::orthographic_rh(-e, e, -e, e, fit.near, fit.far)
        * Mat4::look_to_rh(position, Vec3::NEG_Y, Vec3::Z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn sun_fit_contains_every_frustum_corner() {
        let projection = Mat4::perspective_rh(1.0, 1.5, 0.5, 20.0);
        let view = Mat4::look_at_rh(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO, Vec3::Y);
        let inv = (projection * view).inverse();
        let direction = Vec3::new(-0.3, -1.0, -0.2).normalize();

        let light_vp = fit_sun_projection(direction, inv, &ShadowFit::default());

        for corner in frustum_corners(inv) {
            let clip = light_vp * corner.extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x.abs() <= 1.0 + 1e-3, "x out of range: {ndc}");
            assert!(ndc.y.abs() <= 1.0 + 1e-3, "y out of range: {ndc}");
            assert!((0.0..=1.0).contains(&ndc.z), "z out of range: {ndc}");
        }
    }

    #[test]
    fn point_light_encodes_position_with_w_one() {
        let light = LightComponent::new(LightProps::point(Vec3::ONE, 10.0));
        let global = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let u = light
            .compute_uniform(global, Some(Mat4::IDENTITY), &ShadowFit::default())
            .unwrap();
        assert_eq!(u.direction_or_position, Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(u.power, 10.0);
    }
}
