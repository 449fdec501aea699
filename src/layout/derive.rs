//! Interleaved layout derivation
//!
//! Walks a [`RecordSchema`] and computes one [`ArraySection`] per eligible
//! field: offsets are either explicit or packed sequentially over eligible
//! fields, and every section shares one stride equal to the record size.
//! The deriver is pure and stateless; callers cache the result per record
//! type.

use crate::layout::schema::{BaseType, FieldShape, RecordSchema, VertexRecord};
use thiserror::Error;

/// Layout derivation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("record type `{record}` has no eligible fields")]
    NoEligibleFields { record: &'static str },
    #[error("field `{field}`: vector component count {count} is outside 1..=4")]
    InvalidVectorArity { field: &'static str, count: u8 },
    #[error("field `{field}`: matrix shape {columns}x{rows} is outside 2..=4 per dimension")]
    InvalidMatrixShape {
        field: &'static str,
        columns: u8,
        rows: u8,
    },
}

/// One physical sub-array inside an interleaved buffer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySection {
    name: &'static str,
    shape: FieldShape,
    byte_offset: usize,
    byte_stride: usize,
    normalized: bool,
}

impl ArraySection {
    /// Name of the originating field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Component shape (scalar, vector, or whole matrix — matrix fields are
    /// not decomposed into per-column sections at this level).
    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// Semantic element type of the section's components.
    pub fn base_type(&self) -> BaseType {
        self.shape.base_type()
    }

    /// Offset of the section's first element from the start of one record.
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Distance between consecutive records; identical for every section of
    /// one layout and equal to the record size.
    pub fn byte_stride(&self) -> usize {
        self.byte_stride
    }

    /// Whether integer components are reinterpreted as normalized
    /// fixed-point on read.
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// Size of one element of this section in bytes.
    pub fn byte_size(&self) -> usize {
        self.shape.byte_size()
    }
}

/// Ordered section list plus the total record byte size. Immutable once
/// derived; one descriptor per distinct record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDescriptor {
    sections: Vec<ArraySection>,
    item_size: usize,
}

impl LayoutDescriptor {
    /// Sections in field declaration order.
    pub fn sections(&self) -> &[ArraySection] {
        &self.sections
    }

    /// Total byte size of one interleaved record.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn validate_shape(field: &'static str, shape: FieldShape) -> Result<(), LayoutError> {
    match shape {
        FieldShape::Scalar(_) => Ok(()),
        FieldShape::Vector { count, .. } => {
            if (1..=4).contains(&count) {
                Ok(())
            } else {
                Err(LayoutError::InvalidVectorArity { field, count })
            }
        }
        FieldShape::Matrix { columns, rows, .. } => {
            if (2..=4).contains(&columns) && (2..=4).contains(&rows) {
                Ok(())
            } else {
                Err(LayoutError::InvalidMatrixShape {
                    field,
                    columns,
                    rows,
                })
            }
        }
    }
}

/// Derive the interleaved layout of a record schema.
///
/// Fields are visited in declaration order; ignored fields produce no
/// section and contribute no bytes to packed offsets. Each section's offset
/// is its explicit offset when pinned, otherwise the packed running offset.
/// The stride of every section equals the total record size. A schema with
/// zero eligible fields is an error, not an empty layout.
pub fn derive_layout(schema: &RecordSchema) -> Result<LayoutDescriptor, LayoutError> {
    let mut sections = Vec::new();
    let mut cursor = 0usize;

    for field in schema.fields() {
        if field.ignored {
            continue;
        }
        let shape = field.shape;
        validate_shape(field.name, shape)?;

        let offset = field.offset.unwrap_or(cursor);
        cursor = cursor.max(offset + shape.byte_size());

        sections.push(ArraySection {
            name: field.name,
            shape,
            byte_offset: offset,
            byte_stride: 0, // patched below once the record size is known
            normalized: field.normalized,
        });
    }

    if sections.is_empty() {
        return Err(LayoutError::NoEligibleFields {
            record: schema.name(),
        });
    }

    let item_size = cursor;
    for section in &mut sections {
        section.byte_stride = item_size;
    }

    Ok(LayoutDescriptor {
        sections,
        item_size,
    })
}

/// Derive the layout of a registered record type.
pub fn derive_layout_of<T: VertexRecord>() -> Result<LayoutDescriptor, LayoutError> {
    derive_layout(&T::schema())
}
