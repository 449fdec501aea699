//! CPU-side geometry and the standard vertex record

use crate::layout::{FieldKind, RecordSchema, VertexRecord};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Standard vertex with position, normal, and UV
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl VertexRecord for Vertex {
    fn schema() -> RecordSchema {
        RecordSchema::builder("Vertex")
            .field("position", FieldKind::Vec3)
            .field("normal", FieldKind::Vec3)
            .field("uv", FieldKind::Vec2)
            .build()
    }
}

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub name: String,
}

impl MeshData {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Create a unit quad on the XY plane facing +Z
    pub fn quad() -> Self {
        let mut mesh = MeshData::new("quad");

        let corners = [
            (Vec3::new(-0.5, -0.5, 0.0), Vec2::new(0.0, 1.0)),
            (Vec3::new(0.5, -0.5, 0.0), Vec2::new(1.0, 1.0)),
            (Vec3::new(0.5, 0.5, 0.0), Vec2::new(1.0, 0.0)),
            (Vec3::new(-0.5, 0.5, 0.0), Vec2::new(0.0, 0.0)),
        ];
        for (position, uv) in corners {
            mesh.vertices.push(Vertex {
                position,
                normal: Vec3::Z,
                uv,
            });
        }
        mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);

        mesh
    }

    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let mut mesh = MeshData::new("cube");

        // One face per axis direction, four vertices each
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, -Vec3::X, Vec3::Y),
            (Vec3::X, -Vec3::Z, Vec3::Y),
            (-Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, -Vec3::Z),
            (-Vec3::Y, Vec3::X, Vec3::Z),
        ];

        for (face, (normal, right, up)) in faces.into_iter().enumerate() {
            let center = normal * 0.5;
            let uvs = [
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ];
            let offsets = [
                -right * 0.5 - up * 0.5,
                right * 0.5 - up * 0.5,
                right * 0.5 + up * 0.5,
                -right * 0.5 + up * 0.5,
            ];
            for (offset, uv) in offsets.into_iter().zip(uvs) {
                mesh.vertices.push(Vertex {
                    position: center + offset,
                    normal,
                    uv,
                });
            }
            let base = (face * 4) as u32;
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }
}
