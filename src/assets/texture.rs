use image::RgbaImage;

use crate::assets::loader::AssetSource;
use crate::errors::Result;
use crate::renderer::gpu::GpuDataInterface;

/// How texel values are interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Color data (albedo, emission, billboards): decoded from sRGB on sampling.
    #[default]
    Srgb,
    /// Non-color data (normals, occlusion/roughness/metallic).
    Linear,
}

impl ColorSpace {
    #[must_use]
    pub fn rgba8_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Decoded RGBA8 image waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct TextureSource {
    pub image: RgbaImage,
    pub color_space: ColorSpace,
}

impl TextureSource {
    #[must_use]
    pub fn new(image: RgbaImage, color_space: ColorSpace) -> Self {
        Self { image, color_space }
    }

    /// 1×1 texture of a single color.
    #[must_use]
    pub fn solid(rgba: [u8; 4], color_space: ColorSpace) -> Self {
        Self::new(RgbaImage::from_pixel(1, 1, image::Rgba(rgba)), color_space)
    }

    /// Magenta/black checkerboard used in place of unknown textures.
    #[must_use]
    pub fn checker(size: u32, cell: u32) -> Self {
        let cell = cell.max(1);
        let image = RgbaImage::from_fn(size, size, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                image::Rgba([255, 0, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        Self::new(image, ColorSpace::Srgb)
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Uploaded texture.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl AssetSource for TextureSource {
    type Context = GpuDataInterface;
    type Payload = GpuTexture;

    fn load(&self, gpu: &GpuDataInterface) -> Result<GpuTexture> {
        let (width, height) = self.image.dimensions();
        let (texture, view) = gpu.create_texture_with_data(
            "Asset Texture",
            width,
            height,
            self.color_space.rgba8_format(),
            self.image.as_raw(),
        );
        Ok(GpuTexture { texture, view })
    }

    fn unload(&self, payload: GpuTexture) {
        payload.texture.destroy();
    }
}
