use glam::{Mat4, Quat, Vec3};

use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;
use crate::resources::bind_group::BindGroupData;
use crate::resources::slot::GpuSlot;
use crate::resources::uniforms::TransformUniform;
use crate::scene::{EntityKey, TransformKey, impl_component};

/// Local placement of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformProps {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Parent transform (non-owning). `None` marks a root.
    pub parent: Option<TransformKey>,
}

impl Default for TransformProps {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: None,
        }
    }
}

impl TransformProps {
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Option<TransformKey>) -> Self {
        self.parent = parent;
        self
    }
}

/// Position, rotation and scale of an entity relative to its parent.
///
/// `global` is written by [`update_global_transforms`](crate::scene::transform_system::update_global_transforms)
/// once per frame and is only meaningful after that pass ran.
#[derive(Debug)]
pub struct TransformComponent {
    pub props: TransformProps,
    pub(crate) global: Mat4,
    pub(crate) entity: EntityKey,
    pub(crate) bind_group: GpuSlot<BindGroupData>,
}

impl_component!(TransformComponent, TransformKey, Transform, transforms, transform);

impl TransformComponent {
    #[must_use]
    pub fn new(props: TransformProps) -> Self {
        Self {
            props,
            global: Mat4::IDENTITY,
            entity: EntityKey::default(),
            bind_group: GpuSlot::new(),
        }
    }

    /// Local matrix: translation, then rotation, then scale (`T · R · S`).
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.props.scale,
            self.props.rotation,
            self.props.position,
        )
    }

    #[inline]
    #[must_use]
    pub fn global(&self) -> Mat4 {
        self.global
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<TransformKey> {
        self.props.parent
    }

    pub fn set_parent(&mut self, parent: Option<TransformKey>) {
        self.props.parent = parent;
    }

    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.global.w_axis.truncate()
    }

    #[must_use]
    pub fn uniform(&self) -> TransformUniform {
        TransformUniform::from_global(self.global)
    }

    #[must_use]
    pub fn bind_group(&self) -> Option<&BindGroupData> {
        self.bind_group.get()
    }

    /// Returns the transform bind group, creating its uniform buffer on first use.
    pub fn ensure_bind_group(&mut self, gpu: &GpuDataInterface) -> Result<&BindGroupData> {
        let data = self.bind_group.ensure_loaded(|| {
            Ok::<_, EngineError>(BindGroupData::uniform(
                gpu,
                &gpu.layouts().transform,
                "Transform",
                &TransformUniform::default(),
            ))
        })?;
        Ok(&*data)
    }

    pub(crate) fn release_gpu(&mut self) {
        drop(self.bind_group.unload());
    }
}
