//! Managed buffer objects

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::lifecycle::{ResourceKey, SharedResource, TeardownError};
use bytemuck::Pod;
use std::sync::Arc;

/// A GPU buffer object with managed lifetime
///
/// Created from raw bytes or any `Pod` slice. Participates in the shared
/// lifecycle: wrap it in a [`SharedHandle`](crate::lifecycle::SharedHandle)
/// when more than one owner holds it, and let the registry drive
/// destruction from then on.
pub struct GpuBuffer {
    device: Arc<dyn GraphicsDevice>,
    handle: BufferHandle,
    key: ResourceKey,
    kind: BufferKind,
    usage: BufferUsage,
    len: usize,
}

impl GpuBuffer {
    /// Create a buffer and upload its initial contents.
    pub fn from_bytes(
        device: &Arc<dyn GraphicsDevice>,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[u8],
    ) -> DeviceResult<Self> {
        let handle = device.create_buffer(kind, usage, data)?;
        Ok(Self {
            device: device.clone(),
            handle,
            key: ResourceKey::next(),
            kind,
            usage,
            len: data.len(),
        })
    }

    /// Create a buffer from a slice of plain-old-data items.
    pub fn from_slice<T: Pod>(
        device: &Arc<dyn GraphicsDevice>,
        kind: BufferKind,
        usage: BufferUsage,
        items: &[T],
    ) -> DeviceResult<Self> {
        Self::from_bytes(device, kind, usage, bytemuck::cast_slice(items))
    }

    /// Overwrite part of the buffer, starting at `offset` bytes.
    pub fn write<T: Pod>(&self, offset: usize, items: &[T]) -> DeviceResult<()> {
        self.device
            .write_buffer(self.handle, offset, bytemuck::cast_slice(items))
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Release the underlying buffer object. Do not call directly on a
    /// buffer placed under shared reference counting.
    pub fn destroy(&self) -> DeviceResult<()> {
        self.device.destroy_buffer(self.handle)
    }
}

impl SharedResource for GpuBuffer {
    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn release_resource(&self) -> Result<(), TeardownError> {
        self.destroy().map_err(TeardownError::new)
    }
}
