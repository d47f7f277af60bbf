//! Texture atlas decoding and sampling configuration
//!
//! The atlas packs one region per layer edge to edge, so sampling must never
//! reach across region borders: no mipmaps and clamp-to-edge addressing.

use image::RgbaImage;

/// Sampling configuration attached to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSettings {
    pub wrap_u: wgpu::AddressMode,
    pub wrap_v: wgpu::AddressMode,
    pub filter: wgpu::FilterMode,
    /// Rows are stored bottom-up so V = 0 addresses the last image row
    pub flip_y: bool,
}

impl TextureSettings {
    /// Settings required by a packed layer atlas
    pub const ATLAS: Self = Self {
        wrap_u: wgpu::AddressMode::ClampToEdge,
        wrap_v: wgpu::AddressMode::ClampToEdge,
        filter: wgpu::FilterMode::Linear,
        flip_y: true,
    };

    /// Sampler matching these settings; single mip level only
    pub fn sampler_descriptor(&self) -> wgpu::SamplerDescriptor<'static> {
        wgpu::SamplerDescriptor {
            label: Some("Atlas Sampler"),
            address_mode_u: self.wrap_u,
            address_mode_v: self.wrap_v,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: self.filter,
            min_filter: self.filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }
    }
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self::ATLAS
    }
}

/// Decoded RGBA atlas shared by every layer
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    image: RgbaImage,
    settings: TextureSettings,
}

impl TextureAtlas {
    /// Decode an encoded image (PNG, JPEG) into an atlas with the atlas sampling settings
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self::from_image(image, TextureSettings::ATLAS))
    }

    /// Wrap an already decoded image, applying the row flip when requested
    pub fn from_image(mut image: RgbaImage, settings: TextureSettings) -> Self {
        if settings.flip_y {
            image::imageops::flip_vertical_in_place(&mut image);
        }
        log::debug!(
            "Atlas ready: {}x{} (flip_y: {})",
            image.width(),
            image.height(),
            settings.flip_y
        );
        Self { image, settings }
    }

    /// Get the texture width
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Get the texture height
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Sampling configuration
    pub fn settings(&self) -> &TextureSettings {
        &self.settings
    }

    /// Tightly packed RGBA8 rows in upload order
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Pixel at `(x, y)` in upload order
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }
}
