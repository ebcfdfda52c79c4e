use image::RgbaImage;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::assets::buffer::{BufferSource, BufferTarget};
use crate::assets::loader::{AssetHandle, AssetLoader, AssetSource, SharedLoader};
use crate::assets::material::{MaterialProps, MaterialSource, PbrMaterialProps};
use crate::assets::mesh::{IndexStream, MeshDescriptor, MeshSource, VertexStream};
use crate::assets::texture::{ColorSpace, TextureSource};
use crate::errors::{EngineError, Result};

pub const ERROR_TEXTURE: &str = "error";
pub const WHITE_TEXTURE: &str = "white";
pub const BLACK_TEXTURE: &str = "black";
pub const NORMAL_TEXTURE: &str = "normal";
pub const DEFAULT_MATERIAL: &str = "default";

/// Id → loader map for one asset kind.
pub struct AssetRegistry<S: AssetSource> {
    kind: &'static str,
    loaders: FxHashMap<String, SharedLoader<S>>,
}

impl<S: AssetSource> AssetRegistry<S> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            loaders: FxHashMap::default(),
        }
    }

    /// Registers a loader, replacing (with a warning) any loader under the
    /// same id. Consumers holding the old loader keep it alive.
    pub fn insert(&mut self, loader: AssetLoader<S>) -> SharedLoader<S> {
        let id = loader.id().to_string();
        let shared = loader.shared();
        if self.loaders.insert(id.clone(), shared.clone()).is_some() {
            log::warn!("{} '{}' registered twice, replacing the previous one", self.kind, id);
        }
        shared
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<SharedLoader<S>> {
        self.loaders.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.loaders.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Number of loaders currently holding a payload.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaders.values().filter(|l| l.borrow().is_loaded()).count()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    fn unload_all(&self) {
        for loader in self.loaders.values() {
            loader.borrow_mut().unload_gpu();
        }
    }
}

/// Registry of every named asset loader.
///
/// Lookups are fail-soft: an unknown texture id resolves to the `"error"`
/// checkerboard and an unknown material id to `"default"`, each with a
/// warning. Unknown meshes and buffers resolve to `None`.
pub struct AssetManager {
    pub textures: AssetRegistry<TextureSource>,
    pub buffers: AssetRegistry<BufferSource>,
    pub meshes: AssetRegistry<MeshSource>,
    pub materials: AssetRegistry<MaterialSource>,
    error_texture: SharedLoader<TextureSource>,
    default_material: SharedLoader<MaterialSource>,
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetManager {
    /// Creates a manager with the built-in textures and default material
    /// registered. Nothing touches the GPU until first use.
    #[must_use]
    pub fn new() -> Self {
        let mut textures = AssetRegistry::new("Texture");
        let error_texture = textures.insert(
            AssetLoader::new(ERROR_TEXTURE, TextureSource::checker(64, 8))
                .with_display_name(Some("Missing Texture")),
        );
        textures.insert(AssetLoader::new(
            WHITE_TEXTURE,
            TextureSource::solid([255, 255, 255, 255], ColorSpace::Srgb),
        ));
        textures.insert(AssetLoader::new(
            BLACK_TEXTURE,
            TextureSource::solid([0, 0, 0, 255], ColorSpace::Srgb),
        ));
        textures.insert(AssetLoader::new(
            NORMAL_TEXTURE,
            TextureSource::solid([128, 128, 255, 255], ColorSpace::Linear),
        ));

        let default_props = MaterialProps::Pbr(PbrMaterialProps::default());
        let default_textures = default_props
            .texture_slots()
            .iter()
            .map(|id| textures.get(id).unwrap_or_else(|| error_texture.clone()))
            .collect();
        let mut materials = AssetRegistry::new("Material");
        let default_material = materials.insert(
            AssetLoader::new(DEFAULT_MATERIAL, MaterialSource::new(default_props, default_textures))
                .with_display_name(Some("Default Material")),
        );

        Self {
            textures,
            buffers: AssetRegistry::new("Buffer"),
            meshes: AssetRegistry::new("Mesh"),
            materials,
            error_texture,
            default_material,
        }
    }

    // ========================================================================
    // Registration (import boundary)
    // ========================================================================

    pub fn register_texture(
        &mut self,
        id: &str,
        image: RgbaImage,
        color_space: ColorSpace,
        display_name: Option<&str>,
    ) -> SharedLoader<TextureSource> {
        let loader = self.textures.insert(
            AssetLoader::new(id, TextureSource::new(image, color_space)).with_display_name(display_name),
        );
        if id == ERROR_TEXTURE {
            self.error_texture = loader.clone();
        }
        loader
    }

    /// Decodes an encoded image (PNG, JPEG) and registers it as a texture.
    pub async fn import_texture(
        &mut self,
        id: &str,
        bytes: &[u8],
        color_space: ColorSpace,
        display_name: Option<&str>,
    ) -> Result<SharedLoader<TextureSource>> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(self.register_texture(id, image, color_space, display_name))
    }

    pub fn register_buffer(
        &mut self,
        id: &str,
        bytes: Vec<u8>,
        target: BufferTarget,
        display_name: Option<&str>,
    ) -> SharedLoader<BufferSource> {
        self.buffers.insert(
            AssetLoader::new(id, BufferSource::new(bytes, target)).with_display_name(display_name),
        )
    }

    /// Registers a material. Texture ids are resolved now; unknown ids fall
    /// back to the error texture, empty slots to the built-in substitutes.
    pub fn register_material(
        &mut self,
        id: &str,
        props: MaterialProps,
        display_name: Option<&str>,
    ) -> SharedLoader<MaterialSource> {
        let textures: SmallVec<[_; 4]> = props
            .texture_slots()
            .iter()
            .map(|texture_id| self.get_texture_loader(texture_id))
            .collect();
        let loader = self.materials.insert(
            AssetLoader::new(id, MaterialSource::new(props, textures)).with_display_name(display_name),
        );
        if id == DEFAULT_MATERIAL {
            self.default_material = loader.clone();
        }
        loader
    }

    /// Registers a mesh whose accessors reference registered buffers.
    pub fn register_mesh(
        &mut self,
        id: &str,
        descriptor: &MeshDescriptor,
        display_name: Option<&str>,
    ) -> Result<SharedLoader<MeshSource>> {
        let buffer = |buffer_id: &str| {
            self.buffers.get(buffer_id).ok_or_else(|| {
                EngineError::InvalidAsset(format!("mesh '{id}' references unknown buffer '{buffer_id}'"))
            })
        };

        let index = match &descriptor.index {
            Some(accessor) => Some(IndexStream {
                format: accessor.format,
                byte_offset: accessor.byte_offset,
                count: accessor.count,
                buffer: buffer(&accessor.buffer)?,
            }),
            None => None,
        };

        let vertices = descriptor
            .attributes
            .iter()
            .map(|accessor| {
                Ok(VertexStream {
                    attribute: accessor.attribute,
                    byte_offset: accessor.byte_offset,
                    count: accessor.count,
                    buffer: buffer(&accessor.buffer)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let source = MeshSource::new(index, vertices)?;
        Ok(self
            .meshes
            .insert(AssetLoader::new(id, source).with_display_name(display_name)))
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Texture loader by id; unknown ids resolve to the error texture.
    #[must_use]
    pub fn get_texture_loader(&self, id: &str) -> SharedLoader<TextureSource> {
        self.textures.get(id).unwrap_or_else(|| {
            log::warn!("Unknown texture '{id}', using '{ERROR_TEXTURE}'");
            self.error_texture.clone()
        })
    }

    /// Material loader by id; unknown ids resolve to the default material.
    #[must_use]
    pub fn get_material_loader(&self, id: &str) -> SharedLoader<MaterialSource> {
        self.materials.get(id).unwrap_or_else(|| {
            log::warn!("Unknown material '{id}', using '{DEFAULT_MATERIAL}'");
            self.default_material.clone()
        })
    }

    #[must_use]
    pub fn get_mesh_loader(&self, id: &str) -> Option<SharedLoader<MeshSource>> {
        let loader = self.meshes.get(id);
        if loader.is_none() {
            log::warn!("Unknown mesh '{id}'");
        }
        loader
    }

    #[must_use]
    pub fn get_buffer_loader(&self, id: &str) -> Option<SharedLoader<BufferSource>> {
        let loader = self.buffers.get(id);
        if loader.is_none() {
            log::warn!("Unknown buffer '{id}'");
        }
        loader
    }

    /// Counted handle to a texture (fail-soft).
    #[must_use]
    pub fn texture(&self, id: &str) -> AssetHandle<TextureSource> {
        AssetHandle::new(self.get_texture_loader(id))
    }

    /// Counted handle to a material (fail-soft).
    #[must_use]
    pub fn material(&self, id: &str) -> AssetHandle<MaterialSource> {
        AssetHandle::new(self.get_material_loader(id))
    }

    #[must_use]
    pub fn mesh(&self, id: &str) -> Option<AssetHandle<MeshSource>> {
        self.get_mesh_loader(id).map(AssetHandle::new)
    }

    /// Drops every GPU payload while keeping usage counts (device loss).
    /// Meshes and materials go first so they release their buffers and
    /// textures before those are unloaded.
    pub fn unload_all(&self) {
        self.meshes.unload_all();
        self.materials.unload_all();
        self.buffers.unload_all();
        self.textures.unload_all();
    }
}
