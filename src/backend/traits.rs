//! Device abstraction traits
//!
//! [`GraphicsDevice`] is the contract every device implementation satisfies.
//! The crate ships a GL implementation over `glow`; tests substitute a
//! recording mock.

use crate::backend::types::*;
use crate::layout::LayoutDescriptor;
use std::ops::Range;
use thiserror::Error;

/// Device error type
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("failed to create vertex array: {0}")]
    VertexArrayCreationFailed(String),
    #[error("failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("failed to compile {stage} shader: {log}")]
    ShaderCompilationFailed { stage: ShaderStage, log: String },
    #[error("failed to link program: {0}")]
    ProgramLinkFailed(String),
    #[error("framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u64 },
    #[error("failed to decode image: {0}")]
    ImageDecode(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Handle to a GPU buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

/// Handle to a vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(u64);

/// Handle to a framebuffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(u64);

impl BufferHandle {
    /// Wrap a raw device-assigned id.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// The raw device-assigned id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl VertexArrayHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl TextureHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl ProgramHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl FramebufferHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Main graphics device trait
///
/// Methods take `&self`: implementations guard their handle tables with
/// interior mutability so managed resource wrappers can share one device
/// behind an `Arc`. Object-safe by design — wrappers hold
/// `Arc<dyn GraphicsDevice>`.
pub trait GraphicsDevice {
    // Buffer objects

    /// Create a buffer object and upload its initial contents.
    fn create_buffer(
        &self,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[u8],
    ) -> DeviceResult<BufferHandle>;

    /// Overwrite part of a buffer object.
    fn write_buffer(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> DeviceResult<()>;

    /// Destroy a buffer object.
    fn destroy_buffer(&self, buffer: BufferHandle) -> DeviceResult<()>;

    // Vertex arrays

    /// Create a vertex array binding a vertex buffer through a derived
    /// layout, with an optional index buffer.
    ///
    /// Attribute locations are assigned positionally from the layout's
    /// section order. A matrix section is decomposed into consecutive
    /// per-column attribute pointers at this level (the deriver keeps one
    /// section per matrix field).
    fn create_vertex_array(
        &self,
        vertex_buffer: BufferHandle,
        index_buffer: Option<(BufferHandle, IndexFormat)>,
        layout: &LayoutDescriptor,
    ) -> DeviceResult<VertexArrayHandle>;

    /// Destroy a vertex array object.
    fn destroy_vertex_array(&self, vertex_array: VertexArrayHandle) -> DeviceResult<()>;

    // Textures

    /// Create a texture, optionally uploading initial pixel data.
    fn create_texture(
        &self,
        desc: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> DeviceResult<TextureHandle>;

    /// Replace a texture's pixel contents.
    fn write_texture(&self, texture: TextureHandle, pixels: &[u8]) -> DeviceResult<()>;

    /// Destroy a texture.
    fn destroy_texture(&self, texture: TextureHandle) -> DeviceResult<()>;

    // Shader programs

    /// Compile and link a program from vertex and fragment source.
    fn create_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> DeviceResult<ProgramHandle>;

    /// Destroy a shader program.
    fn destroy_program(&self, program: ProgramHandle) -> DeviceResult<()>;

    // Framebuffers

    /// Create a framebuffer from color attachments and an optional depth
    /// attachment.
    fn create_framebuffer(
        &self,
        color_attachments: &[TextureHandle],
        depth_attachment: Option<TextureHandle>,
    ) -> DeviceResult<FramebufferHandle>;

    /// Destroy a framebuffer object.
    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) -> DeviceResult<()>;

    // Drawing

    /// Bind a framebuffer as the render target, or the default target when
    /// `None`.
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) -> DeviceResult<()>;

    /// Set the viewport rectangle.
    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32);

    /// Clear the bound render target.
    fn clear(&self, color: Option<[f32; 4]>, depth: Option<f32>);

    /// Draw a range of vertices (or indices, when the vertex array carries
    /// an index buffer) with the given program.
    fn draw(
        &self,
        program: ProgramHandle,
        vertex_array: VertexArrayHandle,
        mode: PrimitiveMode,
        range: Range<u32>,
    ) -> DeviceResult<()>;
}
