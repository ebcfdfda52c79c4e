//! Scene import boundary.
//!
//! An importer (glTF reader, procedural generator, test fixture) registers
//! its buffers, textures, materials and meshes on the [`AssetManager`], then
//! describes the node graph with a [`SceneDescription`]. [`build_scene`]
//! turns that graph into one [`Scene`] of entities whose transform parents
//! mirror the node hierarchy.

use glam::{Quat, Vec3};
use rustc_hash::FxHashSet;

use crate::assets::manager::AssetManager;
use crate::assets::material::ShadingType;
use crate::assets::mesh::VertexAttribute;
use crate::errors::{EngineError, Result};
use crate::scene::{
    CameraComponent, CameraProps, EntityKey, LightComponent, LightProps, MeshPrimitive,
    MeshRendererComponent, SceneManager, ShadowMapComponent, TransformComponent, TransformKey,
    TransformProps, World,
};

/// Attributes the G-buffer pipeline reads.
const PBR_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute::Position,
    VertexAttribute::Normal,
    VertexAttribute::Tangent,
    VertexAttribute::TexCoord0,
];

const UNLIT_ATTRIBUTES: [VertexAttribute; 2] = [VertexAttribute::Position, VertexAttribute::TexCoord0];

/// A registered mesh drawn with a registered material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveDescription {
    pub mesh: String,
    pub material: String,
}

impl PrimitiveDescription {
    #[must_use]
    pub fn new(mesh: &str, material: &str) -> Self {
        Self {
            mesh: mesh.to_string(),
            material: material.to_string(),
        }
    }
}

/// One node of the imported graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescription {
    /// Entity id. Unnamed nodes are called `node_<index>`.
    pub name: Option<String>,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Indices into [`SceneDescription::nodes`].
    pub children: Vec<usize>,
    pub camera: Option<CameraProps>,
    pub light: Option<LightProps>,
    /// Shadow map resolution, for shadow-casting suns.
    pub shadow_map: Option<u32>,
    pub primitives: Vec<PrimitiveDescription>,
}

impl Default for NodeDescription {
    fn default() -> Self {
        Self {
            name: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
            camera: None,
            light: None,
            shadow_map: None,
            primitives: Vec::new(),
        }
    }
}

impl NodeDescription {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDescription {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeDescription>,
    /// Root node indices. Empty means every node that is nobody's child.
    pub roots: Vec<usize>,
}

/// Creates (or replaces) the scene `description.id` and fills it with one
/// entity per reachable node.
///
/// Duplicate node names get a numeric suffix. Primitives whose mesh is
/// unknown, or lacks an attribute its shading model needs, are skipped with
/// a warning; the rest of the node is still built. Returns the created
/// entities in traversal order.
pub fn build_scene(
    world: &mut World,
    scene_manager: &mut SceneManager,
    assets: &AssetManager,
    description: &SceneDescription,
) -> Result<Vec<EntityKey>> {
    let node_count = description.nodes.len();
    let out_of_range = description
        .roots
        .iter()
        .chain(description.nodes.iter().flat_map(|n| n.children.iter()))
        .find(|&&index| index >= node_count);
    if let Some(index) = out_of_range {
        return Err(EngineError::InvalidAsset(format!(
            "scene '{}' references node {index} but has {node_count} nodes",
            description.id
        )));
    }

    let roots = if description.roots.is_empty() {
        let children: FxHashSet<usize> = description
            .nodes
            .iter()
            .flat_map(|n| n.children.iter().copied())
            .collect();
        (0..node_count).filter(|i| !children.contains(i)).collect()
    } else {
        description.roots.clone()
    };

    // A rebuilt scene keeps its id (and active status) but not its old entities.
    if let Ok(old) = scene_manager.get_scene_mut(&description.id) {
        old.destroy_entities(world);
    }
    let scene = scene_manager.create_scene(&description.id, &description.name);
    let mut taken: FxHashSet<String> = FxHashSet::default();
    let mut visited = vec![false; node_count];
    let mut created = Vec::with_capacity(node_count);

    // (node index, parent transform)
    let mut stack: Vec<(usize, Option<TransformKey>)> = roots.iter().rev().map(|&i| (i, None)).collect();

    while let Some((index, parent)) = stack.pop() {
        if std::mem::replace(&mut visited[index], true) {
            log::warn!(
                "Node {index} of scene '{}' is reachable twice, keeping the first",
                description.id
            );
            continue;
        }
        let node = &description.nodes[index];

        let id = unique_id(node.name.as_deref(), index, &mut taken);
        let entity = scene.create_entity(
            world,
            &id,
            TransformProps {
                position: node.position,
                rotation: node.rotation,
                scale: node.scale,
                parent,
            },
        )?;
        let transform = world.component_key::<TransformComponent>(entity);

        if let Some(camera) = node.camera {
            world.add_component(entity, CameraComponent::new(camera))?;
        }
        if let Some(light) = node.light {
            world.add_component(entity, LightComponent::new(light))?;
            if let Some(size) = node.shadow_map {
                world.add_component(entity, ShadowMapComponent::new(size))?;
            }
        }

        let primitives: Vec<MeshPrimitive> = node
            .primitives
            .iter()
            .filter_map(|p| resolve_primitive(assets, &id, p))
            .collect();
        if !primitives.is_empty() {
            world.add_component(entity, MeshRendererComponent::new(primitives))?;
        }

        created.push(entity);
        stack.extend(node.children.iter().rev().map(|&child| (child, transform)));
    }

    log::info!(
        "Built scene '{}' with {} entities",
        description.id,
        created.len()
    );
    Ok(created)
}

fn unique_id(name: Option<&str>, index: usize, taken: &mut FxHashSet<String>) -> String {
    let base = name.map_or_else(|| format!("node_{index}"), str::to_string);
    let mut id = base.clone();
    let mut suffix = 1;
    while taken.contains(&id) {
        id = format!("{base}_{suffix}");
        suffix += 1;
    }
    taken.insert(id.clone());
    id
}

fn resolve_primitive(assets: &AssetManager, node: &str, primitive: &PrimitiveDescription) -> Option<MeshPrimitive> {
    let resolved = MeshPrimitive::from_ids(assets, &primitive.mesh, &primitive.material)?;

    let required: &[VertexAttribute] = match resolved.shading_type() {
        ShadingType::Pbr => &PBR_ATTRIBUTES,
        ShadingType::Unlit => &UNLIT_ATTRIBUTES,
    };
    let missing = {
        let mesh = resolved.mesh.loader().borrow();
        required
            .iter()
            .find(|a| !mesh.source().has_attribute(**a))
            .copied()
    };
    if let Some(attribute) = missing {
        log::warn!(
            "Skipping primitive of node '{node}': mesh '{}' has no {} stream",
            primitive.mesh,
            attribute.name()
        );
        return None;
    }

    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_get_suffixes() {
        let mut taken = FxHashSet::default();
        assert_eq!(unique_id(Some("a"), 0, &mut taken), "a");
        assert_eq!(unique_id(Some("a"), 1, &mut taken), "a_1");
        assert_eq!(unique_id(None, 2, &mut taken), "node_2");
    }

    #[test]
    fn bad_child_index_is_rejected() {
        let mut world = World::new();
        let mut scenes = SceneManager::new();
        let assets = AssetManager::new();
        let description = SceneDescription {
            id: "broken".into(),
            name: "Broken".into(),
            nodes: vec![NodeDescription {
                children: vec![3],
                ..NodeDescription::named("root")
            }],
            roots: vec![],
        };

        let result = build_scene(&mut world, &mut scenes, &assets, &description);
        assert!(matches!(result, Err(EngineError::InvalidAsset(_))));
        assert!(!scenes.has_scene("broken"));
    }
}
