//! OpenGL device implementation over `glow`
//!
//! Context creation and entry-point loading stay outside this crate: the
//! device wraps an existing [`glow::Context`] and owns only the GL objects
//! it creates. Handle tables live behind a mutex so the device can be used
//! through `&self` from the managed resource wrappers.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::layout::{BaseType, FieldShape, LayoutDescriptor};
use glow::HasContext;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::Range;

struct BufferEntry {
    raw: glow::Buffer,
    target: u32,
}

struct VertexArrayEntry {
    raw: glow::VertexArray,
    index_format: Option<IndexFormat>,
}

struct TextureEntry {
    raw: glow::Texture,
    width: u32,
    height: u32,
    format: TextureFormat,
}

#[derive(Default)]
struct Tables {
    buffers: HashMap<u64, BufferEntry>,
    vertex_arrays: HashMap<u64, VertexArrayEntry>,
    textures: HashMap<u64, TextureEntry>,
    programs: HashMap<u64, glow::Program>,
    framebuffers: HashMap<u64, glow::Framebuffer>,
    next_buffer_id: u64,
    next_vertex_array_id: u64,
    next_texture_id: u64,
    next_program_id: u64,
    next_framebuffer_id: u64,
}

/// GL device over an existing context
pub struct GlDevice {
    gl: glow::Context,
    tables: Mutex<Tables>,
}

impl GlDevice {
    /// Wrap an already-created GL context.
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// The wrapped context, for callers that need GL state this device does
    /// not model.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn buffer_target(kind: BufferKind) -> u32 {
        match kind {
            BufferKind::Vertex => glow::ARRAY_BUFFER,
            BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
            BufferKind::Uniform => glow::UNIFORM_BUFFER,
        }
    }

    fn usage_hint(usage: BufferUsage) -> u32 {
        match usage {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
            BufferUsage::Stream => glow::STREAM_DRAW,
        }
    }

    fn primitive_mode(mode: PrimitiveMode) -> u32 {
        match mode {
            PrimitiveMode::Points => glow::POINTS,
            PrimitiveMode::Lines => glow::LINES,
            PrimitiveMode::LineStrip => glow::LINE_STRIP,
            PrimitiveMode::Triangles => glow::TRIANGLES,
            PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
            PrimitiveMode::TriangleFan => glow::TRIANGLE_FAN,
        }
    }

    fn component_type(base: BaseType) -> u32 {
        match base {
            BaseType::I8 => glow::BYTE,
            BaseType::U8 => glow::UNSIGNED_BYTE,
            BaseType::I16 => glow::SHORT,
            BaseType::U16 => glow::UNSIGNED_SHORT,
            BaseType::I32 => glow::INT,
            BaseType::U32 => glow::UNSIGNED_INT,
            BaseType::F16 => glow::HALF_FLOAT,
            BaseType::F32 => glow::FLOAT,
            BaseType::F64 => glow::DOUBLE,
        }
    }

    /// (internal format, pixel format, component type) triple for
    /// `tex_image_2d`.
    fn texture_format(format: TextureFormat) -> (i32, u32, u32) {
        match format {
            TextureFormat::Rgba8Unorm => (glow::RGBA8 as i32, glow::RGBA, glow::UNSIGNED_BYTE),
            TextureFormat::Rgba8UnormSrgb => {
                (glow::SRGB8_ALPHA8 as i32, glow::RGBA, glow::UNSIGNED_BYTE)
            }
            TextureFormat::R8Unorm => (glow::R8 as i32, glow::RED, glow::UNSIGNED_BYTE),
            TextureFormat::Rgba16Float => (glow::RGBA16F as i32, glow::RGBA, glow::HALF_FLOAT),
            TextureFormat::Rgba32Float => (glow::RGBA32F as i32, glow::RGBA, glow::FLOAT),
            TextureFormat::Depth32Float => (
                glow::DEPTH_COMPONENT32F as i32,
                glow::DEPTH_COMPONENT,
                glow::FLOAT,
            ),
            TextureFormat::Depth24PlusStencil8 => (
                glow::DEPTH24_STENCIL8 as i32,
                glow::DEPTH_STENCIL,
                glow::UNSIGNED_INT_24_8,
            ),
        }
    }

    fn filter(mode: FilterMode) -> i32 {
        match mode {
            FilterMode::Nearest => glow::NEAREST as i32,
            FilterMode::Linear => glow::LINEAR as i32,
        }
    }

    fn wrap(mode: WrapMode) -> i32 {
        match mode {
            WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
            WrapMode::Repeat => glow::REPEAT as i32,
            WrapMode::MirrorRepeat => glow::MIRRORED_REPEAT as i32,
        }
    }

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> DeviceResult<glow::Shader> {
        let shader_type = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self
                .gl
                .create_shader(shader_type)
                .map_err(|log| DeviceError::ShaderCompilationFailed { stage, log })?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                log::warn!("{stage} shader compilation failed: {log}");
                return Err(DeviceError::ShaderCompilationFailed { stage, log });
            }
            Ok(shader)
        }
    }

    /// Configure one attribute pointer per layout section, positionally.
    /// Matrix sections expand to one pointer per column on consecutive
    /// locations.
    unsafe fn apply_layout(&self, layout: &LayoutDescriptor) {
        let mut location: u32 = 0;
        for section in layout.sections() {
            let stride = section.byte_stride() as i32;
            let base = section.base_type();
            let component_type = Self::component_type(base);
            match section.shape() {
                FieldShape::Scalar(_) | FieldShape::Vector { .. } => {
                    let count = section.shape().component_count() as i32;
                    let offset = section.byte_offset() as i32;
                    if base.is_integer() && !section.normalized() {
                        self.gl
                            .vertex_attrib_pointer_i32(location, count, component_type, stride, offset);
                    } else {
                        self.gl.vertex_attrib_pointer_f32(
                            location,
                            count,
                            component_type,
                            section.normalized(),
                            stride,
                            offset,
                        );
                    }
                    self.gl.enable_vertex_attrib_array(location);
                    location += 1;
                }
                FieldShape::Matrix { columns, rows, .. } => {
                    let column_size = rows as usize * base.byte_size();
                    for column in 0..columns {
                        let offset =
                            (section.byte_offset() + column as usize * column_size) as i32;
                        self.gl.vertex_attrib_pointer_f32(
                            location,
                            rows as i32,
                            component_type,
                            section.normalized(),
                            stride,
                            offset,
                        );
                        self.gl.enable_vertex_attrib_array(location);
                        location += 1;
                    }
                }
            }
        }
    }
}

impl GraphicsDevice for GlDevice {
    fn create_buffer(
        &self,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[u8],
    ) -> DeviceResult<BufferHandle> {
        let target = Self::buffer_target(kind);
        let raw = unsafe {
            let raw = self
                .gl
                .create_buffer()
                .map_err(DeviceError::BufferCreationFailed)?;
            self.gl.bind_buffer(target, Some(raw));
            self.gl
                .buffer_data_u8_slice(target, data, Self::usage_hint(usage));
            self.gl.bind_buffer(target, None);
            raw
        };

        let mut tables = self.tables.lock();
        tables.next_buffer_id += 1;
        let id = tables.next_buffer_id;
        tables.buffers.insert(id, BufferEntry { raw, target });
        log::debug!("created {kind:?} buffer {id} ({} bytes)", data.len());
        Ok(BufferHandle::from_raw(id))
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: usize, data: &[u8]) -> DeviceResult<()> {
        let (raw, target) = {
            let tables = self.tables.lock();
            let entry = tables
                .buffers
                .get(&buffer.raw())
                .ok_or(DeviceError::UnknownHandle {
                    kind: "buffer",
                    id: buffer.raw(),
                })?;
            (entry.raw, entry.target)
        };
        unsafe {
            self.gl.bind_buffer(target, Some(raw));
            self.gl
                .buffer_sub_data_u8_slice(target, offset as i32, data);
            self.gl.bind_buffer(target, None);
        }
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) -> DeviceResult<()> {
        let entry = self.tables.lock().buffers.remove(&buffer.raw()).ok_or(
            DeviceError::UnknownHandle {
                kind: "buffer",
                id: buffer.raw(),
            },
        )?;
        unsafe {
            self.gl.delete_buffer(entry.raw);
        }
        log::debug!("destroyed buffer {}", buffer.raw());
        Ok(())
    }

    fn create_vertex_array(
        &self,
        vertex_buffer: BufferHandle,
        index_buffer: Option<(BufferHandle, IndexFormat)>,
        layout: &LayoutDescriptor,
    ) -> DeviceResult<VertexArrayHandle> {
        let (vertex_raw, index_raw) = {
            let tables = self.tables.lock();
            let vertex = tables
                .buffers
                .get(&vertex_buffer.raw())
                .ok_or(DeviceError::UnknownHandle {
                    kind: "buffer",
                    id: vertex_buffer.raw(),
                })?
                .raw;
            let index = match index_buffer {
                Some((handle, _)) => Some(
                    tables
                        .buffers
                        .get(&handle.raw())
                        .ok_or(DeviceError::UnknownHandle {
                            kind: "buffer",
                            id: handle.raw(),
                        })?
                        .raw,
                ),
                None => None,
            };
            (vertex, index)
        };

        let raw = unsafe {
            let raw = self
                .gl
                .create_vertex_array()
                .map_err(DeviceError::VertexArrayCreationFailed)?;
            self.gl.bind_vertex_array(Some(raw));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_raw));
            self.apply_layout(layout);
            if let Some(index_raw) = index_raw {
                // recorded in VAO state while it is bound
                self.gl
                    .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_raw));
            }
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            raw
        };

        let mut tables = self.tables.lock();
        tables.next_vertex_array_id += 1;
        let id = tables.next_vertex_array_id;
        tables.vertex_arrays.insert(
            id,
            VertexArrayEntry {
                raw,
                index_format: index_buffer.map(|(_, format)| format),
            },
        );
        log::debug!(
            "created vertex array {id} ({} sections, stride {})",
            layout.len(),
            layout.item_size()
        );
        Ok(VertexArrayHandle::from_raw(id))
    }

    fn destroy_vertex_array(&self, vertex_array: VertexArrayHandle) -> DeviceResult<()> {
        let entry = self
            .tables
            .lock()
            .vertex_arrays
            .remove(&vertex_array.raw())
            .ok_or(DeviceError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.raw(),
            })?;
        unsafe {
            self.gl.delete_vertex_array(entry.raw);
        }
        log::debug!("destroyed vertex array {}", vertex_array.raw());
        Ok(())
    }

    fn create_texture(
        &self,
        desc: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> DeviceResult<TextureHandle> {
        if let Some(pixels) = pixels {
            let expected = (desc.width * desc.height * desc.format.bytes_per_pixel()) as usize;
            if pixels.len() != expected {
                return Err(DeviceError::TextureCreationFailed(format!(
                    "pixel data is {} bytes, expected {expected} for {}x{} {:?}",
                    pixels.len(),
                    desc.width,
                    desc.height,
                    desc.format
                )));
            }
        }
        let (internal, format, component) = Self::texture_format(desc.format);
        let raw = unsafe {
            let raw = self
                .gl
                .create_texture()
                .map_err(DeviceError::TextureCreationFailed)?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(raw));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                desc.width as i32,
                desc.height as i32,
                0,
                format,
                component,
                pixels,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                Self::filter(desc.sampler.min_filter),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                Self::filter(desc.sampler.mag_filter),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                Self::wrap(desc.sampler.wrap_u),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                Self::wrap(desc.sampler.wrap_v),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            raw
        };

        let mut tables = self.tables.lock();
        tables.next_texture_id += 1;
        let id = tables.next_texture_id;
        tables.textures.insert(
            id,
            TextureEntry {
                raw,
                width: desc.width,
                height: desc.height,
                format: desc.format,
            },
        );
        log::debug!(
            "created texture {id} ({}x{} {:?}, label {:?})",
            desc.width,
            desc.height,
            desc.format,
            desc.label
        );
        Ok(TextureHandle::from_raw(id))
    }

    fn write_texture(&self, texture: TextureHandle, pixels: &[u8]) -> DeviceResult<()> {
        let (raw, width, height, format) = {
            let tables = self.tables.lock();
            let entry = tables
                .textures
                .get(&texture.raw())
                .ok_or(DeviceError::UnknownHandle {
                    kind: "texture",
                    id: texture.raw(),
                })?;
            (entry.raw, entry.width, entry.height, entry.format)
        };
        let expected = (width * height * format.bytes_per_pixel()) as usize;
        if pixels.len() != expected {
            return Err(DeviceError::TextureCreationFailed(format!(
                "pixel data is {} bytes, expected {expected} for {width}x{height} {format:?}",
                pixels.len()
            )));
        }
        let (internal, gl_format, component) = Self::texture_format(format);
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(raw));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                width as i32,
                height as i32,
                0,
                gl_format,
                component,
                Some(pixels),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    }

    fn destroy_texture(&self, texture: TextureHandle) -> DeviceResult<()> {
        let entry = self.tables.lock().textures.remove(&texture.raw()).ok_or(
            DeviceError::UnknownHandle {
                kind: "texture",
                id: texture.raw(),
            },
        )?;
        unsafe {
            self.gl.delete_texture(entry.raw);
        }
        log::debug!("destroyed texture {}", texture.raw());
        Ok(())
    }

    fn create_program(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> DeviceResult<ProgramHandle> {
        let vertex_shader = self.compile_shader(ShaderStage::Vertex, vertex_source)?;
        let fragment_shader = match self.compile_shader(ShaderStage::Fragment, fragment_source) {
            Ok(shader) => shader,
            Err(err) => {
                unsafe {
                    self.gl.delete_shader(vertex_shader);
                }
                return Err(err);
            }
        };

        let raw = unsafe {
            let program = self
                .gl
                .create_program()
                .map_err(DeviceError::ProgramLinkFailed)?;
            self.gl.attach_shader(program, vertex_shader);
            self.gl.attach_shader(program, fragment_shader);
            self.gl.link_program(program);
            let linked = self.gl.get_program_link_status(program);
            self.gl.detach_shader(program, vertex_shader);
            self.gl.detach_shader(program, fragment_shader);
            self.gl.delete_shader(vertex_shader);
            self.gl.delete_shader(fragment_shader);
            if !linked {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                log::warn!("program link failed: {log}");
                return Err(DeviceError::ProgramLinkFailed(log));
            }
            program
        };

        let mut tables = self.tables.lock();
        tables.next_program_id += 1;
        let id = tables.next_program_id;
        tables.programs.insert(id, raw);
        log::debug!("created program {id}");
        Ok(ProgramHandle::from_raw(id))
    }

    fn destroy_program(&self, program: ProgramHandle) -> DeviceResult<()> {
        let raw = self.tables.lock().programs.remove(&program.raw()).ok_or(
            DeviceError::UnknownHandle {
                kind: "program",
                id: program.raw(),
            },
        )?;
        unsafe {
            self.gl.delete_program(raw);
        }
        log::debug!("destroyed program {}", program.raw());
        Ok(())
    }

    fn create_framebuffer(
        &self,
        color_attachments: &[TextureHandle],
        depth_attachment: Option<TextureHandle>,
    ) -> DeviceResult<FramebufferHandle> {
        let mut color_raw = Vec::with_capacity(color_attachments.len());
        let depth_raw = {
            let tables = self.tables.lock();
            for handle in color_attachments {
                let entry =
                    tables
                        .textures
                        .get(&handle.raw())
                        .ok_or(DeviceError::UnknownHandle {
                            kind: "texture",
                            id: handle.raw(),
                        })?;
                color_raw.push(entry.raw);
            }
            match depth_attachment {
                Some(handle) => {
                    let entry =
                        tables
                            .textures
                            .get(&handle.raw())
                            .ok_or(DeviceError::UnknownHandle {
                                kind: "texture",
                                id: handle.raw(),
                            })?;
                    Some((entry.raw, entry.format))
                }
                None => None,
            }
        };

        let raw = unsafe {
            let raw = self
                .gl
                .create_framebuffer()
                .map_err(DeviceError::FramebufferIncomplete)?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(raw));
            let mut draw_buffers = Vec::with_capacity(color_raw.len());
            for (i, texture) in color_raw.iter().enumerate() {
                let attachment = glow::COLOR_ATTACHMENT0 + i as u32;
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment,
                    glow::TEXTURE_2D,
                    Some(*texture),
                    0,
                );
                draw_buffers.push(attachment);
            }
            if !draw_buffers.is_empty() {
                self.gl.draw_buffers(&draw_buffers);
            }
            if let Some((texture, format)) = depth_raw {
                let attachment = if format == TextureFormat::Depth24PlusStencil8 {
                    glow::DEPTH_STENCIL_ATTACHMENT
                } else {
                    glow::DEPTH_ATTACHMENT
                };
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment,
                    glow::TEXTURE_2D,
                    Some(texture),
                    0,
                );
            }
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                self.gl.delete_framebuffer(raw);
                return Err(DeviceError::FramebufferIncomplete(format!(
                    "status {status:#x}"
                )));
            }
            raw
        };

        let mut tables = self.tables.lock();
        tables.next_framebuffer_id += 1;
        let id = tables.next_framebuffer_id;
        tables.framebuffers.insert(id, raw);
        log::debug!(
            "created framebuffer {id} ({} color attachments)",
            color_attachments.len()
        );
        Ok(FramebufferHandle::from_raw(id))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) -> DeviceResult<()> {
        let raw = self
            .tables
            .lock()
            .framebuffers
            .remove(&framebuffer.raw())
            .ok_or(DeviceError::UnknownHandle {
                kind: "framebuffer",
                id: framebuffer.raw(),
            })?;
        unsafe {
            self.gl.delete_framebuffer(raw);
        }
        log::debug!("destroyed framebuffer {}", framebuffer.raw());
        Ok(())
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) -> DeviceResult<()> {
        let raw = match framebuffer {
            Some(handle) => Some(
                *self
                    .tables
                    .lock()
                    .framebuffers
                    .get(&handle.raw())
                    .ok_or(DeviceError::UnknownHandle {
                        kind: "framebuffer",
                        id: handle.raw(),
                    })?,
            ),
            None => None,
        };
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, raw);
        }
        Ok(())
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe {
            self.gl.viewport(x, y, width, height);
        }
    }

    fn clear(&self, color: Option<[f32; 4]>, depth: Option<f32>) {
        let mut mask = 0;
        unsafe {
            if let Some([r, g, b, a]) = color {
                self.gl.clear_color(r, g, b, a);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if let Some(depth) = depth {
                self.gl.clear_depth_f32(depth);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
    }

    fn draw(
        &self,
        program: ProgramHandle,
        vertex_array: VertexArrayHandle,
        mode: PrimitiveMode,
        range: Range<u32>,
    ) -> DeviceResult<()> {
        let (program_raw, vertex_array_raw, index_format) = {
            let tables = self.tables.lock();
            let program_raw =
                *tables
                    .programs
                    .get(&program.raw())
                    .ok_or(DeviceError::UnknownHandle {
                        kind: "program",
                        id: program.raw(),
                    })?;
            let entry = tables.vertex_arrays.get(&vertex_array.raw()).ok_or(
                DeviceError::UnknownHandle {
                    kind: "vertex array",
                    id: vertex_array.raw(),
                },
            )?;
            (program_raw, entry.raw, entry.index_format)
        };

        let count = range.end.saturating_sub(range.start) as i32;
        let gl_mode = Self::primitive_mode(mode);
        unsafe {
            self.gl.use_program(Some(program_raw));
            self.gl.bind_vertex_array(Some(vertex_array_raw));
            match index_format {
                Some(format) => {
                    let element_type = match format {
                        IndexFormat::Uint16 => glow::UNSIGNED_SHORT,
                        IndexFormat::Uint32 => glow::UNSIGNED_INT,
                    };
                    let offset = range.start as usize * format.byte_size();
                    self.gl
                        .draw_elements(gl_mode, count, element_type, offset as i32);
                }
                None => {
                    self.gl.draw_arrays(gl_mode, range.start as i32, count);
                }
            }
            self.gl.bind_vertex_array(None);
            self.gl.use_program(None);
        }
        Ok(())
    }
}
