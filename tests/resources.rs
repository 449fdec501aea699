use gl_hal::backend::{
    BufferHandle, BufferKind, BufferUsage, DeviceError, DeviceResult, FramebufferHandle,
    GraphicsDevice, IndexFormat, PrimitiveMode, ProgramHandle, ShaderStage, TextureDescriptor,
    TextureFormat, TextureHandle, VertexArrayHandle,
};
use gl_hal::layout::LayoutDescriptor;
use gl_hal::lifecycle::SharedHandle;
use gl_hal::resources::{
    Framebuffer, GpuBuffer, MeshData, ShaderProgram, Texture2d, TextureData, VertexArray,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// Recording device
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DeviceState {
    next_id: u64,
    live_buffers: HashSet<u64>,
    live_vertex_arrays: HashSet<u64>,
    live_textures: HashSet<u64>,
    live_programs: HashSet<u64>,
    live_framebuffers: HashSet<u64>,
    destroyed_buffers: usize,
    destroyed_vertex_arrays: usize,
    destroyed_textures: usize,
    destroyed_programs: usize,
    destroyed_framebuffers: usize,
    captured_layouts: Vec<LayoutDescriptor>,
    captured_index_formats: Vec<Option<IndexFormat>>,
    draws: Vec<(u64, u64, Range<u32>)>,
}

impl DeviceState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mock device capturing every call for later assertions.
#[derive(Default)]
struct RecordingDevice {
    state: Mutex<DeviceState>,
}

impl RecordingDevice {
    fn live_objects(&self) -> usize {
        let state = self.state.lock();
        state.live_buffers.len()
            + state.live_vertex_arrays.len()
            + state.live_textures.len()
            + state.live_programs.len()
            + state.live_framebuffers.len()
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(
        &self,
        _kind: BufferKind,
        _usage: BufferUsage,
        _data: &[u8],
    ) -> DeviceResult<BufferHandle> {
        let mut state = self.state.lock();
        let id = state.next();
        state.live_buffers.insert(id);
        Ok(BufferHandle::from_raw(id))
    }

    fn write_buffer(&self, buffer: BufferHandle, _offset: usize, _data: &[u8]) -> DeviceResult<()> {
        let state = self.state.lock();
        if state.live_buffers.contains(&buffer.raw()) {
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle {
                kind: "buffer",
                id: buffer.raw(),
            })
        }
    }

    fn destroy_buffer(&self, buffer: BufferHandle) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if state.live_buffers.remove(&buffer.raw()) {
            state.destroyed_buffers += 1;
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle {
                kind: "buffer",
                id: buffer.raw(),
            })
        }
    }

    fn create_vertex_array(
        &self,
        vertex_buffer: BufferHandle,
        index_buffer: Option<(BufferHandle, IndexFormat)>,
        layout: &LayoutDescriptor,
    ) -> DeviceResult<VertexArrayHandle> {
        let mut state = self.state.lock();
        if !state.live_buffers.contains(&vertex_buffer.raw()) {
            return Err(DeviceError::UnknownHandle {
                kind: "buffer",
                id: vertex_buffer.raw(),
            });
        }
        state.captured_layouts.push(layout.clone());
        state
            .captured_index_formats
            .push(index_buffer.map(|(_, format)| format));
        let id = state.next();
        state.live_vertex_arrays.insert(id);
        Ok(VertexArrayHandle::from_raw(id))
    }

    fn destroy_vertex_array(&self, vertex_array: VertexArrayHandle) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if state.live_vertex_arrays.remove(&vertex_array.raw()) {
            state.destroyed_vertex_arrays += 1;
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.raw(),
            })
        }
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
                    "expected {expected} bytes, got {}",
                    pixels.len()
                )));
            }
        }
        let mut state = self.state.lock();
        let id = state.next();
        state.live_textures.insert(id);
        Ok(TextureHandle::from_raw(id))
    }

    fn write_texture(&self, texture: TextureHandle, _pixels: &[u8]) -> DeviceResult<()> {
        let state = self.state.lock();
        if state.live_textures.contains(&texture.raw()) {
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle {
                kind: "texture",
                id: texture.raw(),
            })
        }
    }

    fn destroy_texture(&self, texture: TextureHandle) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if state.live_textures.remove(&texture.raw()) {
            state.destroyed_textures += 1;
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle {
                kind: "texture",
                id: texture.raw(),
            })
        }
    }

    fn create_program(
        &self,
        vertex_source: &str,
        _fragment_source: &str,
    ) -> DeviceResult<ProgramHandle> {
        if vertex_source.contains("#error") {
            return Err(DeviceError::ShaderCompilationFailed {
                stage: ShaderStage::Vertex,
                log: "simulated compile error".to_string(),
            });
        }
        let mut state = self.state.lock();
        let id = state.next();
        state.live_programs.insert(id);
        Ok(ProgramHandle::from_raw(id))
    }

    fn destroy_program(&self, program: ProgramHandle) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if state.live_programs.remove(&program.raw()) {
            state.destroyed_programs += 1;
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle {
                kind: "program",
                id: program.raw(),
            })
        }
    }

    fn create_framebuffer(
        &self,
        color_attachments: &[TextureHandle],
        depth_attachment: Option<TextureHandle>,
    ) -> DeviceResult<FramebufferHandle> {
        let mut state = self.state.lock();
        for texture in color_attachments
            .iter()
            .chain(depth_attachment.as_ref())
        {
            if !state.live_textures.contains(&texture.raw()) {
                return Err(DeviceError::UnknownHandle {
                    kind: "texture",
                    id: texture.raw(),
                });
            }
        }
        let id = state.next();
        state.live_framebuffers.insert(id);
        Ok(FramebufferHandle::from_raw(id))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if state.live_framebuffers.remove(&framebuffer.raw()) {
            state.destroyed_framebuffers += 1;
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle {
                kind: "framebuffer",
                id: framebuffer.raw(),
            })
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>) -> DeviceResult<()> {
        if let Some(handle) = framebuffer {
            let state = self.state.lock();
            if !state.live_framebuffers.contains(&handle.raw()) {
                return Err(DeviceError::UnknownHandle {
                    kind: "framebuffer",
                    id: handle.raw(),
                });
            }
        }
        Ok(())
    }

    fn set_viewport(&self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    fn clear(&self, _color: Option<[f32; 4]>, _depth: Option<f32>) {}

    fn draw(
        &self,
        program: ProgramHandle,
        vertex_array: VertexArrayHandle,
        _mode: PrimitiveMode,
        range: Range<u32>,
    ) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if !state.live_programs.contains(&program.raw()) {
            return Err(DeviceError::UnknownHandle {
                kind: "program",
                id: program.raw(),
            });
        }
        if !state.live_vertex_arrays.contains(&vertex_array.raw()) {
            return Err(DeviceError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.raw(),
            });
        }
        state.draws.push((program.raw(), vertex_array.raw(), range));
        Ok(())
    }
}

fn recording_device() -> (Arc<RecordingDevice>, Arc<dyn GraphicsDevice>) {
    let recording = Arc::new(RecordingDevice::default());
    let device: Arc<dyn GraphicsDevice> = recording.clone();
    (recording, device)
}

// ---------------------------------------------------------------------------
// Vertex arrays and layout consumption
// ---------------------------------------------------------------------------

#[test]
fn vertex_array_derives_and_forwards_its_layout() {
    init_logging();
    let (recording, device) = recording_device();

    let mesh = MeshData::cube();
    let vertex_array = VertexArray::from_mesh(&device, &mesh, BufferUsage::Static).unwrap();

    assert_eq!(vertex_array.vertex_count(), 24);
    assert_eq!(vertex_array.index_count(), 36);
    assert_eq!(vertex_array.element_count(), 36);

    let state = recording.state.lock();
    assert_eq!(state.captured_layouts.len(), 1);
    let layout = &state.captured_layouts[0];
    assert_eq!(layout.len(), 3);
    let offsets: Vec<_> = layout.sections().iter().map(|s| s.byte_offset()).collect();
    assert_eq!(offsets, [0, 12, 24]);
    assert_eq!(layout.item_size(), 32);
    assert_eq!(state.captured_index_formats[0], Some(IndexFormat::Uint32));
}

#[test]
fn draw_covers_the_whole_element_range() {
    let (recording, device) = recording_device();

    let mesh = MeshData::quad();
    let vertex_array = VertexArray::from_mesh(&device, &mesh, BufferUsage::Static).unwrap();
    let program = ShaderProgram::new(&device, "flat", "void main() {}", "void main() {}").unwrap();

    vertex_array
        .draw(program.handle(), PrimitiveMode::Triangles)
        .unwrap();

    let state = recording.state.lock();
    assert_eq!(state.draws.len(), 1);
    assert_eq!(state.draws[0].2, 0..6);
}

// ---------------------------------------------------------------------------
// Shared lifecycle over the device
// ---------------------------------------------------------------------------

#[test]
fn shared_vertex_array_destroys_gpu_objects_exactly_once() {
    let (recording, device) = recording_device();

    let mesh = MeshData::quad();
    let vertex_array = VertexArray::from_mesh(&device, &mesh, BufferUsage::Static).unwrap();
    assert_eq!(recording.live_objects(), 3); // vertex + index buffer + vao

    let shared = SharedHandle::new(vertex_array).unwrap();
    let second = shared.clone();
    drop(shared);
    assert_eq!(recording.live_objects(), 3);

    drop(second);
    let state = recording.state.lock();
    assert_eq!(state.destroyed_vertex_arrays, 1);
    assert_eq!(state.destroyed_buffers, 2);
    drop(state);
    assert_eq!(recording.live_objects(), 0);
}

#[test]
fn shared_buffer_survives_while_any_owner_remains() {
    let (recording, device) = recording_device();

    let buffer = GpuBuffer::from_slice(
        &device,
        BufferKind::Uniform,
        BufferUsage::Dynamic,
        &[0.0f32; 16],
    )
    .unwrap();
    assert_eq!(buffer.len(), 64);

    let first = SharedHandle::new(buffer).unwrap();
    let second = first.clone();

    first.write(0, &[1.0f32; 4]).unwrap();
    drop(first);
    assert_eq!(recording.state.lock().destroyed_buffers, 0);

    second.release().unwrap();
    assert_eq!(recording.state.lock().destroyed_buffers, 1);
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

#[test]
fn texture_data_generators_fill_expected_sizes() {
    let checker = TextureData::checkerboard(32, [255, 0, 0, 255], [0, 0, 0, 255]);
    assert_eq!(checker.width, 32);
    assert_eq!(checker.data.len(), 32 * 32 * 4);

    let white = TextureData::white();
    assert_eq!(white.data, vec![255, 255, 255, 255]);
    assert_eq!(white.format, TextureFormat::Rgba8UnormSrgb);
}

#[test]
fn texture_upload_validates_pixel_sizes() {
    let (_, device) = recording_device();

    let data = TextureData::checkerboard(16, [255, 255, 255, 255], [0, 0, 0, 255]);
    let texture = Texture2d::from_data(&device, &data).unwrap();
    assert_eq!(texture.width(), 16);
    assert_eq!(texture.name(), "checkerboard");

    let err = Texture2d::new(
        &device,
        &TextureDescriptor {
            width: 4,
            height: 4,
            ..TextureDescriptor::default()
        },
        Some(&[0u8; 3]),
    )
    .unwrap_err();
    assert!(matches!(err, DeviceError::TextureCreationFailed(_)));
}

// ---------------------------------------------------------------------------
// Programs and framebuffers
// ---------------------------------------------------------------------------

#[test]
fn shader_compile_failure_surfaces_the_log() {
    let (_, device) = recording_device();

    let err = ShaderProgram::new(&device, "broken", "#error nope", "void main() {}").unwrap_err();
    match err {
        DeviceError::ShaderCompilationFailed { stage, log } => {
            assert_eq!(stage, ShaderStage::Vertex);
            assert!(log.contains("simulated"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn framebuffer_owns_its_attachments() {
    let (recording, device) = recording_device();

    let framebuffer = Framebuffer::new(
        &device,
        256,
        256,
        &[TextureFormat::Rgba8Unorm, TextureFormat::Rgba16Float],
        Some(TextureFormat::Depth32Float),
    )
    .unwrap();
    assert_eq!(framebuffer.color_attachments().len(), 2);
    assert!(framebuffer.depth_attachment().is_some());
    assert_eq!(recording.live_objects(), 4); // 3 textures + framebuffer

    framebuffer.bind().unwrap();

    let shared = SharedHandle::new(framebuffer).unwrap();
    drop(shared);

    let state = recording.state.lock();
    assert_eq!(state.destroyed_framebuffers, 1);
    assert_eq!(state.destroyed_textures, 3);
}
