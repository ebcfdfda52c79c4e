//! Global transform evaluation.
//!
//! Each frame, every Transform reachable from the active scene gets
//! `global = parent.global · local`. Parents are visited before their
//! children (breadth-first from the roots), so a chain of any depth is
//! resolved in a single pass.

use std::collections::VecDeque;

use glam::Mat4;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::scene::{ComponentType, Scene, TransformComponent, TransformKey, World};

/// Recomputes the global matrix of every Transform in `scene`, plus any
/// ancestor transforms they hang from (which may belong to other scenes).
///
/// Returns the number of transforms updated. Transforms caught in a parent
/// cycle have no root and are left untouched.
pub fn update_global_transforms(world: &mut World, scene: &Scene) -> usize {
    let mut nodes: FxHashSet<TransformKey> = FxHashSet::default();

    for record in scene.get_components(world, &[ComponentType::Transform]) {
        let mut cursor = record.components.transform;
        while let Some(key) = cursor {
            if !nodes.insert(key) {
                break;
            }
            cursor = world.get::<TransformComponent>(key).and_then(TransformComponent::parent);
        }
    }
    nodes.retain(|key| world.get::<TransformComponent>(*key).is_some());

    let mut children: FxHashMap<TransformKey, Vec<TransformKey>> = FxHashMap::default();
    let mut queue: VecDeque<(TransformKey, Mat4)> = VecDeque::new();

    for &key in &nodes {
        match world.get::<TransformComponent>(key).and_then(TransformComponent::parent) {
            Some(parent) if nodes.contains(&parent) => {
                children.entry(parent).or_default().push(key);
            }
            _ => queue.push_back((key, Mat4::IDENTITY)),
        }
    }

    let mut updated = 0;
    while let Some((key, parent_global)) = queue.pop_front() {
        let Some(transform) = world.get_mut::<TransformComponent>(key) else {
            continue;
        };
        let global = parent_global * transform.to_matrix();
        transform.global = global;
        updated += 1;

        if let Some(kids) = children.get(&key) {
            queue.extend(kids.iter().map(|&child| (child, global)));
        }
    }

    if updated < nodes.len() {
        log::warn!(
            "{} transform(s) in scene '{}' are part of a parent cycle and were not updated",
            nodes.len() - updated,
            scene.id()
        );
    }

    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TransformProps;
    use glam::Vec3;

    #[test]
    fn cycle_is_skipped() {
        let mut world = World::new();
        let mut scene = Scene::new("s", "S");
        let a = scene.create_entity(&mut world, "a", TransformProps::default()).unwrap();
        let b = scene.create_entity(&mut world, "b", TransformProps::default()).unwrap();
        let ta = world.component_key::<TransformComponent>(a).unwrap();
        let tb = world.component_key::<TransformComponent>(b).unwrap();
        world.get_mut::<TransformComponent>(ta).unwrap().set_parent(Some(tb));
        world.get_mut::<TransformComponent>(tb).unwrap().set_parent(Some(ta));

        assert_eq!(update_global_transforms(&mut world, &scene), 0);
    }

    #[test]
    fn out_of_scene_parent_is_evaluated() {
        let mut world = World::new();
        let mut other = Scene::new("other", "Other");
        let mut scene = Scene::new("s", "S");
        let p = other
            .create_entity(&mut world, "p", TransformProps::from_position(Vec3::X))
            .unwrap();
        let tp = world.component_key::<TransformComponent>(p);
        let c = scene
            .create_entity(&mut world, "c", TransformProps::from_position(Vec3::Y).with_parent(tp))
            .unwrap();

        assert_eq!(update_global_transforms(&mut world, &scene), 2);
        let global = world.get_component::<TransformComponent>(c).unwrap().world_position();
        assert!((global - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }
}
