//! Entity-component scene model.
//!
//! - [`World`]: arena storage for entities and every component type
//! - [`Entity`]: string id + one optional slot per component type
//! - [`Scene`]: named entity set + typed component query
//! - [`SceneManager`]: scene registry, active scene, instancing and copies
//! - [`transform_system`]: per-frame global transform evaluation
//!
//! Components never own each other. Back-references (component → entity,
//! child transform → parent transform) are slotmap keys into the [`World`].

pub mod billboard;
pub mod camera;
pub mod entity;
pub mod light;
pub mod manager;
pub mod mesh_renderer;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod script;
pub mod shadow_map;
pub mod transform;
pub mod transform_system;
pub mod world;

pub use billboard::BillboardComponent;
pub use camera::{CameraComponent, CameraProps, Projection};
pub use entity::{ComponentSet, Entity};
pub use light::{LightComponent, LightKind, LightProps};
pub use manager::SceneManager;
pub use mesh_renderer::{MeshPrimitive, MeshRendererComponent};
pub use scene::{ComponentRecord, Scene};
pub use script::{Script, ScriptComponent, ScriptContext};
pub use shadow_map::ShadowMapComponent;
pub use transform::{TransformComponent, TransformProps};
pub use world::World;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct EntityKey;
    pub struct TransformKey;
    pub struct CameraKey;
    pub struct LightKey;
    pub struct MeshRendererKey;
    pub struct ShadowMapKey;
    pub struct BillboardKey;
    pub struct ScriptKey;
}

/// Tag of every known component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentType {
    Transform,
    Camera,
    Light,
    MeshRenderer,
    ShadowMap,
    Billboard,
    Script,
}

impl ComponentType {
    /// Every known type, in record order.
    pub const ALL: [ComponentType; 7] = [
        Self::Transform,
        Self::Camera,
        Self::Light,
        Self::MeshRenderer,
        Self::ShadowMap,
        Self::Billboard,
        Self::Script,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transform => "Transform",
            Self::Camera => "Camera",
            Self::Light => "Light",
            Self::MeshRenderer => "MeshRenderer",
            Self::ShadowMap => "ShadowMap",
            Self::Billboard => "Billboard",
            Self::Script => "Script",
        }
    }
}

/// A component type stored in its own [`World`] arena.
///
/// Implemented by `impl_component!` for every concrete component; the
/// associated functions route generic `World` operations to the right arena
/// and entity slot.
pub trait Component: Sized + 'static {
    const TYPE: ComponentType;
    type Key: slotmap::Key;

    fn arena(world: &World) -> &SlotMap<Self::Key, Self>;
    fn arena_mut(world: &mut World) -> &mut SlotMap<Self::Key, Self>;
    fn slot(set: &ComponentSet) -> Option<Self::Key>;
    fn slot_mut(set: &mut ComponentSet) -> &mut Option<Self::Key>;

    /// Entity this component was first attached to (non-owning).
    fn entity(&self) -> EntityKey;
    fn set_entity(&mut self, entity: EntityKey);
}

macro_rules! impl_component {
    ($component:ty, $key:ty, $tag:ident, $arena:ident, $slot:ident) => {
        impl $crate::scene::Component for $component {
            const TYPE: $crate::scene::ComponentType = $crate::scene::ComponentType::$tag;
            type Key = $key;

            fn arena(world: &$crate::scene::World) -> &slotmap::SlotMap<$key, Self> {
                &world.$arena
            }

            fn arena_mut(world: &mut $crate::scene::World) -> &mut slotmap::SlotMap<$key, Self> {
                &mut world.$arena
            }

            fn slot(set: &$crate::scene::ComponentSet) -> Option<$key> {
                set.$slot
            }

            fn slot_mut(set: &mut $crate::scene::ComponentSet) -> &mut Option<$key> {
                &mut set.$slot
            }

            fn entity(&self) -> $crate::scene::EntityKey {
                self.entity
            }

            fn set_entity(&mut self, entity: $crate::scene::EntityKey) {
                self.entity = entity;
            }
        }
    };
}

pub(crate) use impl_component;
