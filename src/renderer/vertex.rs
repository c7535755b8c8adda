//! Vertex format and procedural geometry

use bytemuck::{Pod, Zeroable};

/// Vertex with position and normal, tightly packed (stride 6 floats).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    /// Vertex buffer layout: position at location 0, normal at location 1.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// 36 vertices (12 triangles) of an axis-aligned cube spanning
/// `-half_extent..=half_extent` on every axis, with flat outward normals.
#[must_use]
pub fn cube_vertices(half_extent: f32) -> Vec<Vertex> {
    let l = half_extent;

    // (normal, four corners in fan order)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        // Back (-Z)
        ([0.0, 0.0, -1.0], [[-l, -l, -l], [l, -l, -l], [l, l, -l], [-l, l, -l]]),
        // Front (+Z)
        ([0.0, 0.0, 1.0], [[-l, -l, l], [l, -l, l], [l, l, l], [-l, l, l]]),
        // Left (-X)
        ([-1.0, 0.0, 0.0], [[-l, l, l], [-l, l, -l], [-l, -l, -l], [-l, -l, l]]),
        // Right (+X)
        ([1.0, 0.0, 0.0], [[l, l, l], [l, l, -l], [l, -l, -l], [l, -l, l]]),
        // Bottom (-Y)
        ([0.0, -1.0, 0.0], [[-l, -l, -l], [l, -l, -l], [l, -l, l], [-l, -l, l]]),
        // Top (+Y)
        ([0.0, 1.0, 0.0], [[-l, l, -l], [l, l, -l], [l, l, l], [-l, l, l]]),
    ];

    let mut vertices = Vec::with_capacity(36);
    for (normal, [a, b, c, d]) in faces {
        for position in [a, b, c, c, d, a] {
            vertices.push(Vertex::new(position, normal));
        }
    }
    vertices
}

/// A single triangle in the XY plane facing +Z.
#[must_use]
pub fn triangle_vertices() -> Vec<Vertex> {
    let normal = [0.0, 0.0, 1.0];
    vec![
        Vertex::new([-0.5, -0.5, 0.0], normal),
        Vertex::new([0.5, -0.5, 0.0], normal),
        Vertex::new([0.0, 0.5, 0.0], normal),
    ]
}
