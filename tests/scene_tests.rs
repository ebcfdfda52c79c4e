//! Scene and SceneManager tests
//!
//! Tests for:
//! - One component per type per entity
//! - Typed component queries
//! - Lookup errors
//! - Scene instancing (ids, reparenting, shared components)
//! - Shallow scene copies
//! - Releasing replaced entities and scenes
//! - Building a scene from an import description

use aether::assets::{
    AssetManager, BufferTarget, MeshDescriptor, NodeDescription, PrimitiveDescription,
    SceneDescription, VertexAccessor, VertexAttribute, build_scene,
};
use aether::errors::EngineError;
use aether::scene::{
    BillboardComponent, CameraComponent, CameraProps, ComponentType, LightComponent, LightProps, MeshRendererComponent,
    Projection, SceneManager, TransformComponent, TransformProps, World,
};
use glam::Vec3;

// ============================================================================
// Helper
// ============================================================================

fn parent_of(world: &World, entity: aether::EntityKey) -> Option<aether::scene::TransformKey> {
    world.get_component::<TransformComponent>(entity).unwrap().parent()
}

fn transform_key(world: &World, entity: aether::EntityKey) -> aether::scene::TransformKey {
    world.component_key::<TransformComponent>(entity).unwrap()
}

// ============================================================================
// Components
// ============================================================================

#[test]
fn adding_a_second_component_of_a_type_replaces_the_first() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let scene = scenes.create_scene("main", "Main");
    let e = scene.create_entity(&mut world, "e", TransformProps::default()).unwrap();

    world.add_component(e, LightComponent::new(LightProps::point(Vec3::ONE, 1.0))).unwrap();
    world.add_component(e, LightComponent::new(LightProps::sun(Vec3::ONE, 2.0))).unwrap();

    assert_eq!(world.iter::<LightComponent>().count(), 1);
    let light = world.get_component::<LightComponent>(e).unwrap();
    assert!((light.props.power - 2.0).abs() < f32::EPSILON);
    assert_eq!(
        world.component_types(e),
        vec![ComponentType::Transform, ComponentType::Light]
    );
}

#[test]
fn missing_component_is_an_error_or_none() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let scene = scenes.create_scene("main", "Main");
    let e = scene.create_entity(&mut world, "e", TransformProps::default()).unwrap();

    let err = world.get_component::<CameraComponent>(e).unwrap_err();
    assert!(matches!(
        err,
        EngineError::MissingComponent { component: ComponentType::Camera, .. }
    ));
    assert!(world.get_component_or_none::<CameraComponent>(e).is_none());
    assert!(!world.has_component::<CameraComponent>(e));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn query_returns_only_entities_with_every_requested_type() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let scene = scenes.create_scene("main", "Main");
    let e1 = scene.create_entity(&mut world, "e1", TransformProps::default()).unwrap();
    let e2 = scene.create_entity(&mut world, "e2", TransformProps::default()).unwrap();
    world.add_component(e1, CameraComponent::new(CameraProps::default())).unwrap();

    let both = scene.get_components(&world, &[ComponentType::Transform, ComponentType::Camera]);
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].entity, e1);
    assert!(both[0].components.transform.is_some());
    assert!(both[0].components.camera.is_some());

    let transforms = scene.get_components(&world, &[ComponentType::Transform]);
    assert_eq!(transforms.len(), 2);
    assert!(transforms.iter().all(|r| r.components.camera.is_none()));
    assert!(transforms.iter().any(|r| r.entity == e2));
}

#[test]
fn empty_query_returns_every_entity_with_empty_records() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let scene = scenes.create_scene("main", "Main");
    scene.create_entity(&mut world, "a", TransformProps::default()).unwrap();
    scene.create_entity(&mut world, "b", TransformProps::default()).unwrap();

    let records = scene.get_components(&world, &[]);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.components.types().is_empty()));
}

// ============================================================================
// Lookups
// ============================================================================

#[test]
fn unknown_ids_are_reported() {
    let mut scenes = SceneManager::new();
    scenes.create_scene("main", "Main");

    assert!(matches!(scenes.get_scene("nope"), Err(EngineError::UnknownScene(_))));
    assert!(scenes.get_scene_or_none("nope").is_none());
    assert!(scenes.set_active_scene("nope").is_err());
    assert!(scenes.active_scene().is_none());

    let scene = scenes.get_scene("main").unwrap();
    assert!(matches!(
        scene.get_entity("ghost"),
        Err(EngineError::UnknownEntity { .. })
    ));
    assert!(!scene.has_entity("ghost"));
}

#[test]
fn active_camera_defaults_to_first_camera_entity() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let scene = scenes.create_scene("main", "Main");
    let b = scene.create_entity(&mut world, "b", TransformProps::default()).unwrap();
    let c = scene.create_entity(&mut world, "c", TransformProps::default()).unwrap();
    world.add_component(b, CameraComponent::new(CameraProps::default())).unwrap();
    world.add_component(c, CameraComponent::new(CameraProps::default())).unwrap();

    assert_eq!(scene.active_camera(&world), Some(b));
    scene.set_active_camera(&world, "c").unwrap();
    assert_eq!(scene.active_camera(&world), Some(c));
}

// ============================================================================
// Instancing
// ============================================================================

#[test]
fn instancing_reparents_roots_and_shares_components() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();

    let prefab = scenes.create_scene("prefab", "Prefab");
    let root = prefab
        .create_entity(&mut world, "root", TransformProps::from_position(Vec3::X))
        .unwrap();
    let root_transform = transform_key(&world, root);
    let child = prefab
        .create_entity(
            &mut world,
            "child",
            TransformProps::from_position(Vec3::Y).with_parent(Some(root_transform)),
        )
        .unwrap();
    prefab.create_entity(&mut world, "leaf", TransformProps::default()).unwrap();
    world.add_component(child, CameraComponent::new(CameraProps::default())).unwrap();

    let main = scenes.create_scene("main", "Main");
    let anchor = main.create_entity(&mut world, "anchor", TransformProps::default()).unwrap();
    let anchor_transform = transform_key(&world, anchor);

    let source = scenes.get_scene("prefab").unwrap().clone();
    scenes
        .instance_scene(&mut world, &source, "main", Some("anchor"))
        .unwrap();

    let main = scenes.get_scene("main").unwrap();
    assert_eq!(main.len(), 4);
    let new_root = main.get_entity("root").unwrap();
    let new_child = main.get_entity("child").unwrap();
    let new_leaf = main.get_entity("leaf").unwrap();
    assert_ne!(new_root, root);

    // Roots hang under the anchor, inner links point at the copies.
    assert_eq!(parent_of(&world, new_root), Some(anchor_transform));
    assert_eq!(parent_of(&world, new_leaf), Some(anchor_transform));
    assert_eq!(parent_of(&world, new_child), Some(transform_key(&world, new_root)));
    assert_ne!(transform_key(&world, new_root), root_transform);

    // Transforms are copies, everything else is shared.
    assert_eq!(
        world.get_component::<TransformComponent>(new_root).unwrap().props.position,
        Vec3::X
    );
    assert_eq!(
        world.component_key::<CameraComponent>(new_child),
        world.component_key::<CameraComponent>(child)
    );
    world.get_component_mut::<CameraComponent>(new_child).unwrap().props.projection =
        Projection::Orthographic { x_mag: 2.0, y_mag: 2.0 };
    assert!(matches!(
        world.get_component::<CameraComponent>(child).unwrap().props.projection,
        Projection::Orthographic { .. }
    ));
}

#[test]
fn instancing_into_a_scene_with_a_clashing_id_creates_nothing() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let prefab = scenes.create_scene("prefab", "Prefab");
    prefab.create_entity(&mut world, "a", TransformProps::default()).unwrap();
    prefab.create_entity(&mut world, "b", TransformProps::default()).unwrap();
    let main = scenes.create_scene("main", "Main");
    main.create_entity(&mut world, "b", TransformProps::default()).unwrap();

    let entities_before = world.entity_count();
    let source = scenes.get_scene("prefab").unwrap().clone();
    let result = scenes.instance_scene(&mut world, &source, "main", None);

    assert!(matches!(result, Err(EngineError::DuplicateEntity { .. })));
    assert_eq!(scenes.get_scene("main").unwrap().len(), 1);
    assert_eq!(world.entity_count(), entities_before);
}

#[test]
fn instancing_checks_target_and_parent() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    scenes.create_scene("main", "Main");
    let source = scenes.create_scene("prefab", "Prefab").clone();

    assert!(matches!(
        scenes.instance_scene(&mut world, &source, "missing", None),
        Err(EngineError::UnknownScene(_))
    ));
    assert!(matches!(
        scenes.instance_scene(&mut world, &source, "main", Some("ghost")),
        Err(EngineError::UnknownEntity { .. })
    ));
}

#[test]
fn scene_copy_shares_entities() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let original = scenes.create_scene("level", "Level");
    let e = original.create_entity(&mut world, "e", TransformProps::default()).unwrap();
    let original = original.clone();

    scenes.remove_scene("level");
    let copy = scenes.add_scene_copy(&original);

    assert_eq!(copy.id(), "level");
    assert_eq!(copy.get_entity("e").unwrap(), e);
}

// ============================================================================
// Replacement
// ============================================================================

#[test]
fn overwriting_an_entity_releases_its_assets() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let assets = AssetManager::new();
    let white = assets.get_texture_loader("white");

    let scene = scenes.create_scene("main", "Main");
    let lamp = scene.create_entity(&mut world, "lamp", TransformProps::default()).unwrap();
    world
        .add_component(lamp, BillboardComponent::new(assets.texture("white")))
        .unwrap();
    assert_eq!(white.borrow().usage_count(), 1);

    let replacement = scene.create_entity(&mut world, "lamp", TransformProps::default()).unwrap();

    assert_eq!(white.borrow().usage_count(), 0);
    assert_eq!(world.entity_count(), 1);
    assert!(world.entity(lamp).is_none());
    assert_eq!(scene.get_entity("lamp").unwrap(), replacement);
}

#[test]
fn destroying_a_scene_keeps_components_shared_with_instances() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let assets = AssetManager::new();
    let white = assets.get_texture_loader("white");

    let prefab = scenes.create_scene("prefab", "Prefab");
    let lamp = prefab.create_entity(&mut world, "lamp", TransformProps::default()).unwrap();
    world
        .add_component(lamp, BillboardComponent::new(assets.texture("white")))
        .unwrap();
    let prefab = prefab.clone();
    scenes.create_scene("main", "Main");
    scenes.instance_scene(&mut world, &prefab, "main", None).unwrap();

    assert!(scenes.destroy_scene(&mut world, "prefab"));
    assert!(!scenes.has_scene("prefab"));
    assert_eq!(white.borrow().usage_count(), 1);

    assert!(scenes.destroy_scene(&mut world, "main"));
    assert_eq!(white.borrow().usage_count(), 0);
    assert_eq!(world.entity_count(), 0);
    assert!(!scenes.destroy_scene(&mut world, "main"));
}

// ============================================================================
// Import
// ============================================================================

fn register_triangle(assets: &mut AssetManager, id: &str, attributes: &[VertexAttribute]) {
    let accessors = attributes
        .iter()
        .map(|&attribute| {
            let buffer = format!("{id}/{}", attribute.name());
            let bytes = vec![0u8; (attribute.stride() * 3) as usize];
            assets.register_buffer(&buffer, bytes, BufferTarget::Vertex, None);
            VertexAccessor {
                buffer,
                attribute,
                byte_offset: 0,
                count: 3,
            }
        })
        .collect();
    assets
        .register_mesh(
            id,
            &MeshDescriptor {
                index: None,
                attributes: accessors,
            },
            None,
        )
        .unwrap();
}

#[test]
fn build_scene_mirrors_hierarchy_and_skips_incomplete_meshes() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let mut assets = AssetManager::new();
    register_triangle(
        &mut assets,
        "full",
        &[
            VertexAttribute::Position,
            VertexAttribute::Normal,
            VertexAttribute::Tangent,
            VertexAttribute::TexCoord0,
        ],
    );
    register_triangle(&mut assets, "bare", &[VertexAttribute::Position]);

    let description = SceneDescription {
        id: "imported".into(),
        name: "Imported".into(),
        nodes: vec![
            NodeDescription {
                children: vec![1, 2],
                camera: Some(CameraProps::default()),
                ..NodeDescription::named("root")
            },
            NodeDescription {
                position: Vec3::new(0.0, 1.0, 0.0),
                primitives: vec![
                    PrimitiveDescription::new("full", "default"),
                    PrimitiveDescription::new("bare", "default"),
                ],
                ..NodeDescription::named("mesh")
            },
            NodeDescription {
                primitives: vec![PrimitiveDescription::new("bare", "default")],
                ..NodeDescription::named("mesh")
            },
        ],
        roots: vec![],
    };

    let created = build_scene(&mut world, &mut scenes, &assets, &description).unwrap();
    assert_eq!(created.len(), 3);

    let scene = scenes.get_scene("imported").unwrap();
    let root = scene.get_entity("root").unwrap();
    let mesh = scene.get_entity("mesh").unwrap();
    let bare = scene.get_entity("mesh_1").unwrap();

    assert!(world.has_component::<CameraComponent>(root));
    assert_eq!(parent_of(&world, mesh), Some(transform_key(&world, root)));
    assert_eq!(parent_of(&world, bare), Some(transform_key(&world, root)));

    let renderer = world.get_component::<MeshRendererComponent>(mesh).unwrap();
    assert_eq!(renderer.primitives.len(), 1);
    assert_eq!(renderer.primitives[0].mesh.id(), "full");
    assert!(!world.has_component::<MeshRendererComponent>(bare));
}

#[test]
fn rebuilding_a_scene_releases_the_previous_build() {
    let mut world = World::new();
    let mut scenes = SceneManager::new();
    let mut assets = AssetManager::new();
    register_triangle(
        &mut assets,
        "full",
        &[
            VertexAttribute::Position,
            VertexAttribute::Normal,
            VertexAttribute::Tangent,
            VertexAttribute::TexCoord0,
        ],
    );
    let mesh = assets.get_mesh_loader("full").unwrap();

    let description = SceneDescription {
        id: "imported".into(),
        name: "Imported".into(),
        nodes: vec![NodeDescription {
            primitives: vec![PrimitiveDescription::new("full", "default")],
            ..NodeDescription::named("mesh")
        }],
        roots: vec![],
    };

    build_scene(&mut world, &mut scenes, &assets, &description).unwrap();
    scenes.set_active_scene("imported").unwrap();
    assert_eq!(mesh.borrow().usage_count(), 1);

    build_scene(&mut world, &mut scenes, &assets, &description).unwrap();
    assert_eq!(mesh.borrow().usage_count(), 1);
    assert_eq!(world.entity_count(), 1);
    assert_eq!(scenes.active_scene_id(), Some("imported"));
}
