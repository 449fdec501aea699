//! Managed resource objects
//!
//! Wrapper classes over the device: buffers, vertex arrays, textures,
//! shader programs, and framebuffers. Every wrapper implements
//! [`SharedResource`](crate::lifecycle::SharedResource) so it can be placed
//! under shared reference counting.

mod buffer;
mod framebuffer;
mod mesh;
mod shader;
mod texture;
mod vertex_array;

pub use buffer::*;
pub use framebuffer::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;
pub use vertex_array::*;

use crate::backend::DeviceError;
use crate::layout::LayoutError;
use thiserror::Error;

/// Error raised while building a managed resource
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}
