use glam::{Mat4, Vec3, Vec4};

use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;
use crate::resources::bind_group::BindGroupData;
use crate::resources::slot::GpuSlot;
use crate::resources::uniforms::CameraUniform;
use crate::scene::{CameraKey, EntityKey, impl_component};

/// Projection model of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// `fov_y` in radians. `aspect` is ignored when the camera follows the canvas.
    Perspective { fov_y: f32, aspect: f32 },
    /// Half extents of the view volume.
    Orthographic { x_mag: f32, y_mag: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraProps {
    pub projection: Projection,
    pub z_near: f32,
    pub z_far: f32,
    /// Take the aspect ratio from the render target instead of the projection.
    pub use_canvas_aspect: bool,
}

impl Default for CameraProps {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y: std::f32::consts::FRAC_PI_4,
                aspect: 16.0 / 9.0,
            },
            z_near: 0.1,
            z_far: 100.0,
            use_canvas_aspect: true,
        }
    }
}

/// A viewpoint placed by its entity's transform.
///
/// The camera looks down its local `-Z` axis with `+Y` up. Each frame its
/// uniform is computed from the entity's global transform; the inverse
/// view-projection produced by that step is cached here and consumed by
/// light frustum fitting later in the same frame.
#[derive(Debug)]
pub struct CameraComponent {
    pub props: CameraProps,
    inv_view_projection: Option<Mat4>,
    pub(crate) entity: EntityKey,
    pub(crate) bind_group: GpuSlot<BindGroupData>,
}

impl_component!(CameraComponent, CameraKey, Camera, cameras, camera);

impl CameraComponent {
    #[must_use]
    pub fn new(props: CameraProps) -> Self {
        Self {
            props,
            inv_view_projection: None,
            entity: EntityKey::default(),
            bind_group: GpuSlot::new(),
        }
    }

    /// Projection matrix for the given render target size.
    pub fn projection_matrix(&self, canvas: Option<(u32, u32)>) -> Result<Mat4> {
        let CameraProps {
            projection,
            z_near,
            z_far,
            use_canvas_aspect,
        } = self.props;

        match projection {
            Projection::Perspective { fov_y, aspect } => {
                let aspect = if use_canvas_aspect {
                    let (width, height) = canvas.ok_or(EngineError::CanvasRequired)?;
                    width as f32 / height.max(1) as f32
                } else {
                    aspect
                };
                Ok(Mat4::perspective_rh(fov_y, aspect, z_near, z_far))
            }
            Projection::Orthographic { x_mag, y_mag } => {
                let x_mag = if use_canvas_aspect {
                    let (width, height) = canvas.ok_or(EngineError::CanvasRequired)?;
                    y_mag * width as f32 / height.max(1) as f32
                } else {
                    x_mag
                };
                Ok(Mat4::orthographic_rh(-x_mag, x_mag, -y_mag, y_mag, z_near, z_far))
            }
        }
    }

    /// Computes the uniform for a camera placed at `global` and caches the
    /// inverse view-projection for the rest of the frame.
    ///
    /// Fails with [`EngineError::CanvasRequired`] when the camera follows the
    /// canvas aspect and `canvas` is `None`.
    pub fn compute_uniform(&mut self, global: Mat4, canvas: Option<(u32, u32)>) -> Result<CameraUniform> {
        let projection = self.projection_matrix(canvas)?;
        let view = global.inverse();
        let view_projection = projection * view;
        let inverse_view_projection = view_projection.inverse();

        self.inv_view_projection = Some(inverse_view_projection);

        Ok(CameraUniform {
            view,
            view_projection,
            inverse_view: global,
            inverse_view_projection,
        })
    }

    /// Inverse view-projection of the current frame, if the camera uniform
    /// has been computed since the last [`begin_frame`](Self::begin_frame).
    #[inline]
    #[must_use]
    pub fn inv_view_projection(&self) -> Option<Mat4> {
        self.inv_view_projection
    }

    /// Forgets last frame's projection.
    pub fn begin_frame(&mut self) {
        self.inv_view_projection = None;
    }

    /// World-space corners of the view frustum, near plane first.
    ///
    /// Uses the cached projection; `None` before `compute_uniform` ran.
    #[must_use]
    pub fn frustum_corners(&self) -> Option<[Vec3; 8]> {
        let inv = self.inv_view_projection?;
        Some(frustum_corners(inv))
    }

    #[must_use]
    pub fn bind_group(&self) -> Option<&BindGroupData> {
        self.bind_group.get()
    }

    pub fn ensure_bind_group(&mut self, gpu: &GpuDataInterface) -> Result<&BindGroupData> {
        let data = self.bind_group.ensure_loaded(|| {
            Ok::<_, EngineError>(BindGroupData::uniform(
                gpu,
                &gpu.layouts().camera,
                "Camera",
                &CameraUniform::default(),
            ))
        })?;
        Ok(&*data)
    }

    pub(crate) fn release_gpu(&mut self) {
        drop(self.bind_group.unload());
    }
}

/// Unprojects the eight NDC corners (z in `0..=1`) through `inv_view_projection`.
#[must_use]
pub fn frustum_corners(inv_view_projection: Mat4) -> [Vec3; 8] {
    const NDC: [(f32, f32, f32); 8] = [
        (-1.0, -1.0, 0.0),
        (1.0, -1.0, 0.0),
        (1.0, 1.0, 0.0),
        (-1.0, 1.0, 0.0),
        (-1.0, -1.0, 1.0),
        (1.0, -1.0, 1.0),
        (1.0, 1.0, 1.0),
        (-1.0, 1.0, 1.0),
    ];
    NDC.map(|(x, y, z)| {
        let p = inv_view_projection * Vec4::new(x, y, z, 1.0);
        p.truncate() / p.w
    })
}
