//! Asset loader tests
//!
//! Tests for:
//! - Usage counting and payload lifetime
//! - Payload caching while loaded
//! - Device-loss unload keeping usage counts
//! - Buffers shared between meshes
//! - AssetManager fail-soft lookups

use std::cell::Cell;
use std::rc::Rc;

use aether::assets::mesh::VertexStream;
use aether::assets::{
    AssetHandle, AssetLoader, AssetManager, AssetSource, BufferTarget, MeshDescriptor, MeshSource,
    SharedLoader, VertexAccessor, VertexAttribute,
};
use aether::errors::{EngineError, Result};

// ============================================================================
// Helper
// ============================================================================

/// Source whose payload is the number of the load that produced it.
#[derive(Default, Clone)]
struct Counting {
    loads: Rc<Cell<u32>>,
    unloads: Rc<Cell<u32>>,
}

impl AssetSource for Counting {
    type Context = ();
    type Payload = u32;

    fn load(&self, _ctx: &()) -> Result<u32> {
        self.loads.set(self.loads.get() + 1);
        Ok(self.loads.get())
    }

    fn unload(&self, _payload: u32) {
        self.unloads.set(self.unloads.get() + 1);
    }
}

fn position_only_mesh(buffer: &SharedLoader<Counting>) -> MeshSource<Counting> {
    MeshSource::new(
        None,
        vec![VertexStream {
            attribute: VertexAttribute::Position,
            byte_offset: 0,
            count: 3,
            buffer: buffer.clone(),
        }],
    )
    .unwrap()
}

// ============================================================================
// Usage counting
// ============================================================================

#[test]
fn n_registrations_n_deregistrations_unload() {
    let source = Counting::default();
    let mut loader = AssetLoader::new("tex", source.clone());

    for _ in 0..4 {
        loader.register_usage();
    }
    assert_eq!(*loader.get_asset_data(&()).unwrap(), 1);
    for _ in 0..4 {
        loader.deregister_usage();
    }

    assert_eq!(loader.usage_count(), 0);
    assert!(!loader.is_loaded());
    assert_eq!(source.loads.get(), 1);
    assert_eq!(source.unloads.get(), 1);
}

#[test]
fn one_remaining_usage_keeps_the_same_payload() {
    let source = Counting::default();
    let mut loader = AssetLoader::new("tex", source.clone());

    for _ in 0..3 {
        loader.register_usage();
    }
    let first = *loader.get_asset_data(&()).unwrap();
    loader.deregister_usage();
    loader.deregister_usage();

    assert!(loader.is_loaded());
    assert_eq!(*loader.get_asset_data(&()).unwrap(), first);
    assert_eq!(source.loads.get(), 1);
    assert_eq!(source.unloads.get(), 0);
}

#[test]
fn access_without_usage_is_refused() {
    let mut loader = AssetLoader::new("orphan", Counting::default());
    let result = loader.get_asset_data(&());
    assert!(matches!(result, Err(EngineError::InvalidAsset(_))));
    assert!(!loader.is_loaded());
}

#[test]
fn deregister_underflow_is_ignored() {
    let source = Counting::default();
    let mut loader = AssetLoader::new("tex", source.clone());
    loader.deregister_usage();
    assert_eq!(loader.usage_count(), 0);
    assert_eq!(source.unloads.get(), 0);
}

#[test]
fn unload_gpu_keeps_count_and_reloads_on_access() {
    let source = Counting::default();
    let mut loader = AssetLoader::new("tex", source.clone());
    loader.register_usage();
    loader.get_asset_data(&()).unwrap();

    loader.unload_gpu();
    assert_eq!(loader.usage_count(), 1);
    assert!(!loader.is_loaded());

    assert_eq!(*loader.get_asset_data(&()).unwrap(), 2);
    assert_eq!(source.unloads.get(), 1);
}

#[test]
fn handles_pair_registration_with_drop() {
    let loader = AssetLoader::new("tex", Counting::default()).shared();

    let a = AssetHandle::new(loader.clone());
    let b = a.clone();
    assert_eq!(loader.borrow().usage_count(), 2);
    assert!(a.same_asset(&b));

    a.load(&()).unwrap();
    drop(a);
    assert!(loader.borrow().is_loaded());
    drop(b);
    assert_eq!(loader.borrow().usage_count(), 0);
    assert!(!loader.borrow().is_loaded());
}

// ============================================================================
// Shared buffers
// ============================================================================

#[test]
fn buffer_shared_by_two_meshes_lives_until_both_unload() {
    let buffer_source = Counting::default();
    let buffer = AssetLoader::new("positions", buffer_source.clone()).shared();

    let mesh_a = AssetLoader::new("a", position_only_mesh(&buffer)).shared();
    let mesh_b = AssetLoader::new("b", position_only_mesh(&buffer)).shared();

    let handle_a = AssetHandle::new(mesh_a);
    let handle_b = AssetHandle::new(mesh_b);
    handle_a.load(&()).unwrap();
    handle_b.load(&()).unwrap();

    assert_eq!(buffer.borrow().usage_count(), 2);
    assert_eq!(buffer_source.loads.get(), 1);

    drop(handle_a);
    assert_eq!(buffer.borrow().usage_count(), 1);
    assert!(buffer.borrow().is_loaded());

    drop(handle_b);
    assert_eq!(buffer.borrow().usage_count(), 0);
    assert!(!buffer.borrow().is_loaded());
    assert_eq!(buffer_source.unloads.get(), 1);
}

#[test]
fn mesh_payload_binds_the_buffer_payload() {
    let buffer = AssetLoader::new("positions", Counting::default()).shared();
    let mesh = AssetHandle::new(AssetLoader::new("tri", position_only_mesh(&buffer)).shared());

    let payload = mesh.get(&()).unwrap();
    let binding = payload.vertex_buffer(VertexAttribute::Position).unwrap();
    assert_eq!(binding.buffer, 1);
    assert!(payload.vertex_buffer(VertexAttribute::Normal).is_none());
    assert_eq!(payload.element_count(), 3);
}

#[test]
fn mesh_without_position_is_rejected() {
    let buffer = AssetLoader::new("normals", Counting::default()).shared();
    let result = MeshSource::new(
        None,
        vec![VertexStream {
            attribute: VertexAttribute::Normal,
            byte_offset: 0,
            count: 3,
            buffer,
        }],
    );
    assert!(matches!(result, Err(EngineError::InvalidAsset(_))));
}

// ============================================================================
// AssetManager
// ============================================================================

#[test]
fn unknown_texture_and_material_fall_back() {
    let assets = AssetManager::new();
    assert_eq!(assets.texture("missing").id(), "error");
    assert_eq!(assets.material("missing").id(), "default");
    assert!(assets.mesh("missing").is_none());
}

#[test]
fn mesh_with_unknown_buffer_is_rejected() {
    let mut assets = AssetManager::new();
    let descriptor = MeshDescriptor {
        index: None,
        attributes: vec![VertexAccessor {
            buffer: "nowhere".into(),
            attribute: VertexAttribute::Position,
            byte_offset: 0,
            count: 3,
        }],
    };
    let result = assets.register_mesh("tri", &descriptor, None);
    assert!(matches!(result, Err(EngineError::InvalidAsset(_))));
    assert!(!assets.meshes.contains("tri"));
}

#[test]
fn registered_mesh_shares_the_registered_buffer() {
    let mut assets = AssetManager::new();
    let buffer = assets.register_buffer("positions", vec![0; 36], BufferTarget::Vertex, Some("Positions"));
    let descriptor = MeshDescriptor {
        index: None,
        attributes: vec![VertexAccessor {
            buffer: "positions".into(),
            attribute: VertexAttribute::Position,
            byte_offset: 0,
            count: 3,
        }],
    };
    assets.register_mesh("tri", &descriptor, None).unwrap();

    // Registration alone never registers usage or uploads.
    assert_eq!(buffer.borrow().usage_count(), 0);
    assert_eq!(buffer.borrow().display_name(), "Positions");
    assert_eq!(assets.buffers.loaded_count(), 0);

    let handle = assets.mesh("tri").unwrap();
    assert_eq!(handle.loader().borrow().usage_count(), 1);
    assert!(handle.loader().borrow().source().has_attribute(VertexAttribute::Position));
}
