//! Managed framebuffer objects

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::lifecycle::{ResourceKey, SharedResource, TeardownError};
use crate::resources::Texture2d;
use std::sync::Arc;

/// An off-screen render target owning its attachment textures
pub struct Framebuffer {
    device: Arc<dyn GraphicsDevice>,
    handle: FramebufferHandle,
    key: ResourceKey,
    width: u32,
    height: u32,
    color: Vec<Texture2d>,
    depth: Option<Texture2d>,
}

impl Framebuffer {
    /// Create a framebuffer with one render-target texture per color format
    /// and an optional depth attachment.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        width: u32,
        height: u32,
        color_formats: &[TextureFormat],
        depth_format: Option<TextureFormat>,
    ) -> DeviceResult<Self> {
        let mut color = Vec::with_capacity(color_formats.len());
        for format in color_formats {
            color.push(Texture2d::render_target(device, width, height, *format)?);
        }
        let depth = match depth_format {
            Some(format) => Some(Texture2d::render_target(device, width, height, format)?),
            None => None,
        };

        let color_handles: Vec<_> = color.iter().map(|t| t.handle()).collect();
        let handle =
            device.create_framebuffer(&color_handles, depth.as_ref().map(|t| t.handle()))?;
        Ok(Self {
            device: device.clone(),
            handle,
            key: ResourceKey::next(),
            width,
            height,
            color,
            depth,
        })
    }

    /// Bind as the render target and cover it with the viewport.
    pub fn bind(&self) -> DeviceResult<()> {
        self.device.bind_framebuffer(Some(self.handle))?;
        self.device
            .set_viewport(0, 0, self.width as i32, self.height as i32);
        Ok(())
    }

    pub fn handle(&self) -> FramebufferHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color attachment textures, in attachment order.
    pub fn color_attachments(&self) -> &[Texture2d] {
        &self.color
    }

    pub fn depth_attachment(&self) -> Option<&Texture2d> {
        self.depth.as_ref()
    }

    /// Release the framebuffer and its attachments. Do not call directly on
    /// a framebuffer placed under shared reference counting.
    pub fn destroy(&self) -> DeviceResult<()> {
        self.device.destroy_framebuffer(self.handle)?;
        for texture in &self.color {
            texture.destroy()?;
        }
        if let Some(depth) = &self.depth {
            depth.destroy()?;
        }
        Ok(())
    }
}

impl SharedResource for Framebuffer {
    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn release_resource(&self) -> Result<(), TeardownError> {
        self.destroy().map_err(TeardownError::new)
    }
}
