//! GL HAL - A managed hardware-abstraction layer over OpenGL
//!
//! Wraps GL objects (buffer objects, vertex arrays, shader programs,
//! framebuffers, textures) in managed resource classes on top of a device
//! trait, with two core subsystems:
//!
//! - **Layout derivation**: record types describe their fields once through
//!   a declarative schema; the deriver computes per-attribute offsets and a
//!   shared stride for interleaved GPU upload
//! - **Shared lifecycle**: a process-wide reference-counted registry that
//!   tears each shared resource down exactly once when its count returns to
//!   zero
//!
//! # Features
//! - Schema-driven interleaved vertex layouts with explicit or packed
//!   offsets, normalization flags, and ignored fields
//! - Reference-counted resource registry safe for concurrent use
//! - Managed wrappers over buffers, vertex arrays, textures, programs, and
//!   framebuffers
//! - GL device implementation over `glow` (context creation stays with the
//!   caller)

pub mod backend;
pub mod layout;
pub mod lifecycle;
pub mod resources;

pub use backend::gl::GlDevice;
pub use backend::{DeviceError, GraphicsDevice};
pub use layout::{derive_layout, derive_layout_of, LayoutDescriptor, RecordSchema, VertexRecord};
pub use lifecycle::{ResourceRegistry, SharedHandle, SharedResource};
