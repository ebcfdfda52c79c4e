use crate::scene::{
    BillboardKey, CameraKey, ComponentType, LightKey, MeshRendererKey, ScriptKey, ShadowMapKey,
    TransformKey,
};

/// Fixed-shape record with one optional slot per known component type.
///
/// Holding a single `Option` per type is what guarantees that an entity never
/// carries two components of the same type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentSet {
    pub transform: Option<TransformKey>,
    pub camera: Option<CameraKey>,
    pub light: Option<LightKey>,
    pub mesh_renderer: Option<MeshRendererKey>,
    pub shadow_map: Option<ShadowMapKey>,
    pub billboard: Option<BillboardKey>,
    pub script: Option<ScriptKey>,
}

impl ComponentSet {
    #[must_use]
    pub fn has(&self, ty: ComponentType) -> bool {
        match ty {
            ComponentType::Transform => self.transform.is_some(),
            ComponentType::Camera => self.camera.is_some(),
            ComponentType::Light => self.light.is_some(),
            ComponentType::MeshRenderer => self.mesh_renderer.is_some(),
            ComponentType::ShadowMap => self.shadow_map.is_some(),
            ComponentType::Billboard => self.billboard.is_some(),
            ComponentType::Script => self.script.is_some(),
        }
    }

    /// Keeps only the slots named in `types`.
    #[must_use]
    pub fn reduced(&self, types: &[ComponentType]) -> Self {
        let keep = |ty: ComponentType| types.contains(&ty);
        Self {
            transform: self.transform.filter(|_| keep(ComponentType::Transform)),
            camera: self.camera.filter(|_| keep(ComponentType::Camera)),
            light: self.light.filter(|_| keep(ComponentType::Light)),
            mesh_renderer: self.mesh_renderer.filter(|_| keep(ComponentType::MeshRenderer)),
            shadow_map: self.shadow_map.filter(|_| keep(ComponentType::ShadowMap)),
            billboard: self.billboard.filter(|_| keep(ComponentType::Billboard)),
            script: self.script.filter(|_| keep(ComponentType::Script)),
        }
    }

    /// Types present in this set, in [`ComponentType::ALL`] order.
    #[must_use]
    pub fn types(&self) -> Vec<ComponentType> {
        ComponentType::ALL
            .into_iter()
            .filter(|ty| self.has(*ty))
            .collect()
    }
}

/// An entity: identity plus its component slots.
///
/// Entities live in the [`World`](crate::scene::World) arena; scenes refer to
/// them by [`EntityKey`](crate::scene::EntityKey), so the same entity may be
/// visible from several scenes at once.
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) id: String,
    pub(crate) components: ComponentSet,
}

impl Entity {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            components: ComponentSet::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    #[must_use]
    pub fn has_component(&self, ty: ComponentType) -> bool {
        self.components.has(ty)
    }

    #[must_use]
    pub fn component_types(&self) -> Vec<ComponentType> {
        self.components.types()
    }
}
