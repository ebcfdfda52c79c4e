use crate::assets::loader::AssetHandle;
use crate::assets::manager::AssetManager;
use crate::assets::material::{MaterialSource, ShadingType};
use crate::assets::mesh::MeshSource;
use crate::scene::{EntityKey, MeshRendererKey, impl_component};

/// One drawable: a mesh paired with the material it is shaded with.
#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    pub mesh: AssetHandle<MeshSource>,
    pub material: AssetHandle<MaterialSource>,
}

impl MeshPrimitive {
    #[must_use]
    pub fn new(mesh: AssetHandle<MeshSource>, material: AssetHandle<MaterialSource>) -> Self {
        Self { mesh, material }
    }

    /// Resolves both ids. Unknown materials fall back to the default one;
    /// an unknown mesh yields `None` and the primitive should be skipped.
    #[must_use]
    pub fn from_ids(assets: &AssetManager, mesh: &str, material: &str) -> Option<Self> {
        Some(Self {
            mesh: assets.mesh(mesh)?,
            material: assets.material(material),
        })
    }

    #[must_use]
    pub fn shading_type(&self) -> ShadingType {
        self.material.loader().borrow().source().shading_type()
    }
}

/// Ordered list of primitives drawn at the entity's transform.
///
/// Holding the primitives keeps their meshes and materials registered; the
/// GPU data is created the first time a renderer draws them.
#[derive(Debug, Default)]
pub struct MeshRendererComponent {
    pub primitives: Vec<MeshPrimitive>,
    pub(crate) entity: EntityKey,
}

impl_component!(MeshRendererComponent, MeshRendererKey, MeshRenderer, mesh_renderers, mesh_renderer);

impl MeshRendererComponent {
    #[must_use]
    pub fn new(primitives: Vec<MeshPrimitive>) -> Self {
        Self {
            primitives,
            entity: EntityKey::default(),
        }
    }
}
