//! Device abstraction layer
//!
//! Provides the common trait and types the managed resource wrappers are
//! written against, plus the GL implementation.

pub mod gl;
pub mod traits;
pub mod types;

pub use traits::*;
pub use types::*;
