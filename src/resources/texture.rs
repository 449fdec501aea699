//! Texture loading and managed texture objects

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::lifecycle::{ResourceKey, SharedResource, TeardownError};
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use std::sync::Arc;

/// Decoded texture data
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DeviceResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(|e| DeviceError::ImageDecode(e.to_string()))?;
        Ok(Self::from_image(img, &name))
    }

    /// Load texture from encoded bytes
    pub fn from_bytes(bytes: &[u8], name: &str) -> DeviceResult<Self> {
        let img =
            image::load_from_memory(bytes).map_err(|e| DeviceError::ImageDecode(e.to_string()))?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();
        let data = rgba.into_raw();

        Self {
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            data,
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8UnormSrgb,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Create a default white texture
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// Create a default black texture
    pub fn black() -> Self {
        Self::solid_color([0, 0, 0, 255], "black")
    }

    /// Create a checkerboard texture
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            format: TextureFormat::Rgba8UnormSrgb,
            data,
            name: "checkerboard".to_string(),
        }
    }
}

/// A GPU texture with managed lifetime
pub struct Texture2d {
    device: Arc<dyn GraphicsDevice>,
    handle: TextureHandle,
    key: ResourceKey,
    width: u32,
    height: u32,
    format: TextureFormat,
    name: String,
}

impl std::fmt::Debug for Texture2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture2d")
            .field("handle", &self.handle)
            .field("key", &self.key)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("name", &self.name)
            .finish()
    }
}

impl Texture2d {
    /// Create a texture from a descriptor, optionally uploading pixels.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        desc: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> DeviceResult<Self> {
        let handle = device.create_texture(desc, pixels)?;
        Ok(Self {
            device: device.clone(),
            handle,
            key: ResourceKey::next(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            name: desc.label.clone().unwrap_or_default(),
        })
    }

    /// Create and upload a decoded texture.
    pub fn from_data(device: &Arc<dyn GraphicsDevice>, data: &TextureData) -> DeviceResult<Self> {
        Self::new(
            device,
            &TextureDescriptor {
                label: Some(data.name.clone()),
                width: data.width,
                height: data.height,
                format: data.format,
                sampler: SamplerOptions::default(),
            },
            Some(&data.data),
        )
    }

    /// Create an uninitialized render target texture.
    pub fn render_target(
        device: &Arc<dyn GraphicsDevice>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> DeviceResult<Self> {
        Self::new(
            device,
            &TextureDescriptor {
                label: None,
                width,
                height,
                format,
                sampler: SamplerOptions {
                    min_filter: FilterMode::Nearest,
                    mag_filter: FilterMode::Nearest,
                    ..SamplerOptions::default()
                },
            },
            None,
        )
    }

    /// Replace the texture's contents.
    pub fn write(&self, pixels: &[u8]) -> DeviceResult<()> {
        self.device.write_texture(self.handle, pixels)
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release the underlying texture. Do not call directly on a texture
    /// placed under shared reference counting.
    pub fn destroy(&self) -> DeviceResult<()> {
        self.device.destroy_texture(self.handle)
    }
}

impl SharedResource for Texture2d {
    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn release_resource(&self) -> Result<(), TeardownError> {
        self.destroy().map_err(TeardownError::new)
    }
}
