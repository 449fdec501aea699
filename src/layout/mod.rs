//! Interleaved vertex-layout derivation
//!
//! Record types describe their fields once through a [`RecordSchema`]; the
//! deriver turns the schema into a [`LayoutDescriptor`] consumed by vertex
//! arrays when configuring attribute pointers.

mod derive;
mod schema;

pub use derive::*;
pub use schema::*;
