//! Managed vertex arrays
//!
//! A [`VertexArray`] owns its vertex (and optional index) buffer and the
//! layout derived once from the record type's schema. The descriptor is the
//! per-type cache point: derived at construction, reused at every draw.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::layout::{derive_layout, LayoutDescriptor, VertexRecord};
use crate::lifecycle::{ResourceKey, SharedResource, TeardownError};
use crate::resources::{GpuBuffer, MeshData, ResourceError};
use bytemuck::Pod;
use std::sync::Arc;

/// A vertex array object with its buffers and derived layout
pub struct VertexArray {
    device: Arc<dyn GraphicsDevice>,
    handle: VertexArrayHandle,
    key: ResourceKey,
    layout: LayoutDescriptor,
    vertex_buffer: GpuBuffer,
    index_buffer: Option<(GpuBuffer, IndexFormat)>,
    vertex_count: u32,
    index_count: u32,
}

impl VertexArray {
    /// Create a vertex array for a registered record type, deriving its
    /// layout from the type's schema.
    pub fn new<T: VertexRecord + Pod>(
        device: &Arc<dyn GraphicsDevice>,
        vertices: &[T],
        indices: Option<&[u32]>,
        usage: BufferUsage,
    ) -> Result<Self, ResourceError> {
        let layout = derive_layout(&T::schema())?;
        let vertex_buffer = GpuBuffer::from_slice(device, BufferKind::Vertex, usage, vertices)?;
        let index_buffer = match indices {
            Some(indices) => Some((
                GpuBuffer::from_slice(device, BufferKind::Index, usage, indices)?,
                IndexFormat::Uint32,
            )),
            None => None,
        };
        let handle = device.create_vertex_array(
            vertex_buffer.handle(),
            index_buffer
                .as_ref()
                .map(|(buffer, format)| (buffer.handle(), *format)),
            &layout,
        )?;
        Ok(Self {
            device: device.clone(),
            handle,
            key: ResourceKey::next(),
            layout,
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.map(|i| i.len() as u32).unwrap_or(0),
        })
    }

    /// Create a vertex array from standard mesh data.
    pub fn from_mesh(
        device: &Arc<dyn GraphicsDevice>,
        mesh: &MeshData,
        usage: BufferUsage,
    ) -> Result<Self, ResourceError> {
        Self::new(device, &mesh.vertices, Some(&mesh.indices), usage)
    }

    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }

    /// The layout derived from the record type's schema.
    pub fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of elements one full draw covers: indices when indexed,
    /// vertices otherwise.
    pub fn element_count(&self) -> u32 {
        if self.index_buffer.is_some() {
            self.index_count
        } else {
            self.vertex_count
        }
    }

    /// Draw the whole array with the given program.
    pub fn draw(&self, program: ProgramHandle, mode: PrimitiveMode) -> DeviceResult<()> {
        self.device
            .draw(program, self.handle, mode, 0..self.element_count())
    }

    /// Release the vertex array and its buffers. Do not call directly on a
    /// vertex array placed under shared reference counting.
    pub fn destroy(&self) -> DeviceResult<()> {
        self.device.destroy_vertex_array(self.handle)?;
        self.vertex_buffer.destroy()?;
        if let Some((buffer, _)) = &self.index_buffer {
            buffer.destroy()?;
        }
        Ok(())
    }
}

impl SharedResource for VertexArray {
    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn release_resource(&self) -> Result<(), TeardownError> {
        self.destroy().map_err(TeardownError::new)
    }
}
