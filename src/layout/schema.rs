//! Record schemas: the declarative description of one interleaved buffer item
//!
//! A [`RecordSchema`] lists the fields of a vertex (or uniform-block) record
//! in declaration order. Each field resolves to a [`FieldShape`] either from
//! an explicit shape or from a [`FieldKind`] token describing the field's
//! declared type. The schema is registered once per record type and consumed
//! by [`derive_layout`](crate::layout::derive_layout).

/// Semantic element type of one attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F16,
    F32,
    F64,
}

impl BaseType {
    /// Size of one component in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            BaseType::I8 | BaseType::U8 => 1,
            BaseType::I16 | BaseType::U16 | BaseType::F16 => 2,
            BaseType::I32 | BaseType::U32 | BaseType::F32 => 4,
            BaseType::F64 => 8,
        }
    }

    /// Whether components of this type are integers (candidates for
    /// normalized fixed-point reads).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            BaseType::I8
                | BaseType::U8
                | BaseType::I16
                | BaseType::U16
                | BaseType::I32
                | BaseType::U32
        )
    }
}

/// Component shape of one field: a scalar, a vector of 1..=4 components, or
/// a column-major matrix of 2..=4 columns by 2..=4 rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Scalar(BaseType),
    Vector { base: BaseType, count: u8 },
    Matrix { base: BaseType, columns: u8, rows: u8 },
}

impl FieldShape {
    /// Base element type of the shape.
    pub fn base_type(&self) -> BaseType {
        match self {
            FieldShape::Scalar(base) => *base,
            FieldShape::Vector { base, .. } => *base,
            FieldShape::Matrix { base, .. } => *base,
        }
    }

    /// Total number of components (a scalar counts as 1, a matrix as
    /// columns x rows).
    pub fn component_count(&self) -> u32 {
        match self {
            FieldShape::Scalar(_) => 1,
            FieldShape::Vector { count, .. } => *count as u32,
            FieldShape::Matrix { columns, rows, .. } => (*columns as u32) * (*rows as u32),
        }
    }

    /// Total size of the field in bytes.
    pub fn byte_size(&self) -> usize {
        self.base_type().byte_size() * self.component_count() as usize
    }
}

/// Built-in mapping tokens for common declared field types.
///
/// When a field carries no explicit shape metadata, its declared type is
/// named by one of these and resolved through [`FieldKind::shape`]. The
/// vector and matrix tokens follow the `glam` single-precision types; the
/// packed integer tokens cover the usual normalized attribute encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    F32,
    F64,
    I32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    U8x2,
    U8x4,
    I8x4,
    U16x2,
    I16x2,
    I16x4,
    F16x2,
    F16x4,
}

impl FieldKind {
    /// Resolve the token to its component shape.
    pub fn shape(&self) -> FieldShape {
        match self {
            FieldKind::F32 => FieldShape::Scalar(BaseType::F32),
            FieldKind::F64 => FieldShape::Scalar(BaseType::F64),
            FieldKind::I32 => FieldShape::Scalar(BaseType::I32),
            FieldKind::U32 => FieldShape::Scalar(BaseType::U32),
            FieldKind::Vec2 => FieldShape::Vector {
                base: BaseType::F32,
                count: 2,
            },
            FieldKind::Vec3 => FieldShape::Vector {
                base: BaseType::F32,
                count: 3,
            },
            FieldKind::Vec4 => FieldShape::Vector {
                base: BaseType::F32,
                count: 4,
            },
            FieldKind::Mat2 => FieldShape::Matrix {
                base: BaseType::F32,
                columns: 2,
                rows: 2,
            },
            FieldKind::Mat3 => FieldShape::Matrix {
                base: BaseType::F32,
                columns: 3,
                rows: 3,
            },
            FieldKind::Mat4 => FieldShape::Matrix {
                base: BaseType::F32,
                columns: 4,
                rows: 4,
            },
            FieldKind::U8x2 => FieldShape::Vector {
                base: BaseType::U8,
                count: 2,
            },
            FieldKind::U8x4 => FieldShape::Vector {
                base: BaseType::U8,
                count: 4,
            },
            FieldKind::I8x4 => FieldShape::Vector {
                base: BaseType::I8,
                count: 4,
            },
            FieldKind::U16x2 => FieldShape::Vector {
                base: BaseType::U16,
                count: 2,
            },
            FieldKind::I16x2 => FieldShape::Vector {
                base: BaseType::I16,
                count: 2,
            },
            FieldKind::I16x4 => FieldShape::Vector {
                base: BaseType::I16,
                count: 4,
            },
            FieldKind::F16x2 => FieldShape::Vector {
                base: BaseType::F16,
                count: 2,
            },
            FieldKind::F16x4 => FieldShape::Vector {
                base: BaseType::F16,
                count: 4,
            },
        }
    }
}

/// One schema entry describing a single field of the record.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub(crate) name: &'static str,
    pub(crate) shape: FieldShape,
    pub(crate) normalized: bool,
    pub(crate) ignored: bool,
    pub(crate) offset: Option<usize>,
}

impl FieldDescriptor {
    /// Describe a field by its declared type token.
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self::with_shape(name, kind.shape())
    }

    /// Describe a field by an explicit component shape.
    pub fn with_shape(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            shape,
            normalized: false,
            ignored: false,
            offset: None,
        }
    }

    /// Mark integer components for normalized fixed-point reads.
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Exclude the field from the derived layout.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Pin the field to an explicit byte offset instead of the packed
    /// running offset. Used when the schema mirrors a `#[repr(C)]` struct
    /// whose in-memory layout carries fields the GPU never reads.
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Resolved component shape.
    pub fn shape(&self) -> FieldShape {
        self.shape
    }
}

/// Ordered field list describing one record type. Field order is the
/// declaration order of the record and is externally meaningful: section i
/// of the derived layout binds attribute location i.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    /// Build a schema from an explicit field list.
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { name, fields }
    }

    /// Start an empty schema for incremental construction.
    pub fn builder(name: &'static str) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            schema: Self {
                name,
                fields: Vec::new(),
            },
        }
    }

    /// Record type name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All fields in declaration order, ignored ones included.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// Incremental [`RecordSchema`] construction.
pub struct RecordSchemaBuilder {
    schema: RecordSchema,
}

impl RecordSchemaBuilder {
    /// Append a field described by its declared type token.
    pub fn field(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(FieldDescriptor::new(name, kind))
    }

    /// Append a fully specified field descriptor.
    pub fn push(mut self, field: FieldDescriptor) -> Self {
        self.schema.fields.push(field);
        self
    }

    pub fn build(self) -> RecordSchema {
        self.schema
    }
}

/// Registration point for record types with a fixed schema.
///
/// Implemented once per vertex/uniform record; the derived layout is
/// obtained through [`derive_layout_of`](crate::layout::derive_layout_of)
/// and cached by the owning buffer object.
pub trait VertexRecord {
    fn schema() -> RecordSchema;
}
